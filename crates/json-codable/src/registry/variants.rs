use indexmap::IndexMap;

use crate::strategy::TypeRef;

/// One discriminator value of a polymorphic base, bound to its variant type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantEntry {
    tag: String,
    variant: TypeRef,
}

impl VariantEntry {
    pub(crate) fn new(tag: String, variant: TypeRef) -> Self {
        Self { tag, variant }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn variant(&self) -> &TypeRef {
        &self.variant
    }

    pub fn variant_name(&self) -> &str {
        &self.variant.name
    }
}

/// Variants of one base, in registration order.
#[derive(Debug, Clone, Default)]
pub struct VariantTable {
    entries: IndexMap<String, VariantEntry>,
}

impl VariantTable {
    pub fn get(&self, tag: &str) -> Option<&VariantEntry> {
        self.entries.get(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariantEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn insert(&mut self, entry: VariantEntry) {
        self.entries.insert(entry.tag.clone(), entry);
    }
}
