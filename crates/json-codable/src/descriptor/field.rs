use std::fmt;
use std::sync::Arc;

use super::access::{AccessRule, FieldAccess};
use super::coder::CoderRef;
use super::Kind;

/// One declared member of a record type.
#[derive(Clone)]
pub struct FieldDescriptor {
    member: String,
    key: String,
    kind: Kind,
    required: bool,
    ignored: bool,
    coder: Option<CoderRef>,
    /// `Some(None)` flattens with the default `<key>_` prefix.
    flatten: Option<Option<String>>,
    access: FieldAccess,
}

impl FieldDescriptor {
    /// A field keyed by its member name. Optional kinds start out not required.
    pub fn new(member: impl Into<String>, kind: Kind) -> Self {
        let member = member.into();
        let required = !kind.is_optional();
        Self {
            key: member.clone(),
            member,
            kind,
            required,
            ignored: false,
            coder: None,
            flatten: None,
            access: FieldAccess::default(),
        }
    }

    pub fn rename(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Missing key decodes to absent; the typed layer fills in the default.
    pub fn default(self) -> Self {
        self.required(false)
    }

    pub fn ignore(mut self) -> Self {
        self.ignored = true;
        self.required = false;
        self
    }

    pub fn with_coder(mut self, coder: CoderRef) -> Self {
        self.coder = Some(coder);
        self
    }

    pub fn flatten(mut self) -> Self {
        self.flatten = Some(None);
        self
    }

    pub fn flatten_with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.flatten = Some(Some(prefix.into()));
        self
    }

    pub fn access(mut self, access: FieldAccess) -> Self {
        self.access = access;
        self
    }

    pub fn read_access(mut self, rule: AccessRule) -> Self {
        self.access.read = rule;
        self
    }

    pub fn write_access(mut self, rule: AccessRule) -> Self {
        self.access.write = rule;
        self
    }

    pub fn member(&self) -> &str {
        &self.member
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    pub fn coder(&self) -> Option<&CoderRef> {
        self.coder.as_ref()
    }

    pub fn is_flattened(&self) -> bool {
        self.flatten.is_some()
    }

    /// Effective key prefix of a flattened field.
    pub fn flatten_prefix(&self) -> Option<String> {
        self.flatten
            .as_ref()
            .map(|p| p.clone().unwrap_or_else(|| format!("{}_", self.key)))
    }

    pub fn field_access(&self) -> &FieldAccess {
        &self.access
    }
}

impl PartialEq for FieldDescriptor {
    fn eq(&self, other: &Self) -> bool {
        let same_coder = match (&self.coder, &other.coder) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        same_coder
            && self.member == other.member
            && self.key == other.key
            && self.kind == other.kind
            && self.required == other.required
            && self.ignored == other.ignored
            && self.flatten == other.flatten
            && self.access == other.access
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("member", &self.member)
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("ignored", &self.ignored)
            .field("coder", &self.coder.is_some())
            .field("flatten", &self.flatten)
            .field("access", &self.access)
            .finish()
    }
}
