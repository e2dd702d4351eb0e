use crate::descriptor::UnknownKeys;

/// Runtime knobs of a decode call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Applied to records whose descriptor does not pick a mode itself.
    pub unknown_keys: UnknownKeys,
    /// Caller's access level; `None` skips write-access checks.
    pub access_level: Option<u32>,
    /// Deepest container nesting accepted before `DepthLimit`.
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            unknown_keys: UnknownKeys::Ignore,
            access_level: None,
            max_depth: 128,
        }
    }
}

impl DecodeOptions {
    pub fn strict() -> Self {
        Self {
            unknown_keys: UnknownKeys::Reject,
            ..Self::default()
        }
    }

    pub fn with_access_level(mut self, level: u32) -> Self {
        self.access_level = Some(level);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Runtime knobs of an encode call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Caller's access level; `None` emits every field.
    pub access_level: Option<u32>,
}

impl EncodeOptions {
    pub fn with_access_level(mut self, level: u32) -> Self {
        self.access_level = Some(level);
        self
    }
}
