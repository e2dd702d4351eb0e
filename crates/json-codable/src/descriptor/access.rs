/// Gate on one direction (read or write) of a field.
///
/// A non-empty `allowed` list wins over `min_level`: the level must then be
/// listed explicitly. The default rule admits every level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessRule {
    pub min_level: u32,
    pub allowed: Vec<u32>,
}

impl AccessRule {
    pub fn open() -> Self {
        Self::default()
    }

    pub fn min(level: u32) -> Self {
        Self {
            min_level: level,
            allowed: Vec::new(),
        }
    }

    pub fn only(levels: impl IntoIterator<Item = u32>) -> Self {
        Self {
            min_level: 0,
            allowed: levels.into_iter().collect(),
        }
    }

    pub fn permits(&self, level: u32) -> bool {
        if self.allowed.is_empty() {
            level >= self.min_level
        } else {
            self.allowed.contains(&level)
        }
    }

    pub fn is_open(&self) -> bool {
        self.min_level == 0 && self.allowed.is_empty()
    }
}

/// Read rule applies when encoding, write rule when decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldAccess {
    pub read: AccessRule,
    pub write: AccessRule,
}

impl FieldAccess {
    pub fn both(rule: AccessRule) -> Self {
        Self {
            read: rule.clone(),
            write: rule,
        }
    }

    pub(crate) fn can_read(&self, level: Option<u32>) -> bool {
        level.map_or(true, |l| self.read.permits(l))
    }

    pub(crate) fn can_write(&self, level: Option<u32>) -> bool {
        level.map_or(true, |l| self.write.permits(l))
    }
}
