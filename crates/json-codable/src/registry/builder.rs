use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::codable::Codable;
use crate::descriptor::{Kind, TypeDescriptor};
use crate::diagnostics::{Diagnostics, Problem};
use crate::engine::derive;
use crate::error::RegistryError;
use crate::strategy::{CodingStrategy, TypeRef, TypeResolver};

use super::sealed::Registry;
use super::variants::{VariantEntry, VariantTable};
use super::{SlotId, TypeEntry};

#[derive(Debug)]
enum Slot {
    /// Referenced but not registered yet. Records who referenced it.
    Pending { referenced_by: Vec<(String, Option<String>)> },
    Defined(Arc<TypeEntry>),
}

/// Registration phase of the registry.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    /// Slot table; a type's position is its `SlotId`.
    types: IndexMap<String, Slot>,
    /// Variant tables by base type name.
    variants: IndexMap<String, VariantTable>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once `name` is registered (pending references do not count).
    pub fn contains(&self, name: &str) -> bool {
        self.defined(name).is_some()
    }

    pub fn descriptor(&self, name: &str) -> Option<&TypeDescriptor> {
        self.defined(name).map(|e| e.descriptor())
    }

    fn defined(&self, name: &str) -> Option<&Arc<TypeEntry>> {
        match self.types.get(name) {
            Some(Slot::Defined(entry)) => Some(entry),
            _ => None,
        }
    }

    /// Validates `descriptor`, derives its codec and fills its slot.
    ///
    /// Registering an identical descriptor again is a no-op.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> Result<Arc<TypeEntry>, RegistryError> {
        let name = descriptor.name().to_owned();
        if let Some(existing) = self.defined(&name) {
            if existing.descriptor == descriptor {
                return Ok(existing.clone());
            }
            return Err(RegistryError::ConflictingType(name));
        }
        self.check_variant_bindings(&descriptor)?;

        let slot = self.reserve(&name);
        let (encoder, decoder) = derive(&descriptor, self)?;
        for field in descriptor.fields() {
            if let Some(target) = field.kind().referenced_type() {
                if let Some(Slot::Pending { referenced_by }) = self.types.get_mut(target) {
                    referenced_by.push((name.clone(), Some(field.member().to_owned())));
                }
            }
        }

        let entry = Arc::new(TypeEntry {
            descriptor,
            encoder,
            decoder,
        });
        if let Some((_, s)) = self.types.get_index_mut(slot.index()) {
            *s = Slot::Defined(entry.clone());
        }
        debug!(
            type_name = %name,
            slot = slot.index(),
            fields = entry.descriptor.fields().len(),
            "registered codable type"
        );
        Ok(entry)
    }

    /// Registers `T` and every type it references.
    pub fn register_type<T: Codable>(&mut self) -> Result<(), RegistryError> {
        T::register(self)
    }

    /// Binds discriminator value `tag` of `base` to the record type `variant`.
    ///
    /// Either type may still be unregistered; the binding is then checked
    /// when it arrives, and again at seal.
    pub fn register_variant(&mut self, base: &str, tag: &str, variant: &str) -> Result<(), RegistryError> {
        if tag.is_empty() {
            return Err(RegistryError::EmptyDiscriminatorValue { base: base.to_owned() });
        }
        let key = match self.defined(base) {
            Some(entry) => Some(
                entry
                    .descriptor
                    .discriminator_key()
                    .ok_or_else(|| RegistryError::NotPolymorphic(base.to_owned()))?
                    .to_owned(),
            ),
            None => None,
        };
        if let Some(entry) = self.defined(variant) {
            if !entry.descriptor.is_record() {
                return Err(RegistryError::NotARecord(variant.to_owned()));
            }
            if let Some(key) = key.filter(|k| entry.descriptor.keys().any(|own| own == k)) {
                return Err(RegistryError::DiscriminatorCollision {
                    base: base.to_owned(),
                    variant: variant.to_owned(),
                    key,
                });
            }
        }
        if let Some(existing) = self.variants.get(base).and_then(|t| t.get(tag)) {
            if existing.variant_name() == variant {
                return Ok(());
            }
            return Err(RegistryError::DuplicateDiscriminator {
                base: base.to_owned(),
                tag: tag.to_owned(),
                existing: existing.variant_name().to_owned(),
                variant: variant.to_owned(),
            });
        }

        self.reserve_for(base, variant);
        let slot = self.reserve_for(variant, base);
        self.variants.entry(base.to_owned()).or_default().insert(VariantEntry::new(
            tag.to_owned(),
            TypeRef {
                name: variant.to_owned(),
                slot,
            },
        ));
        debug!(base, tag, variant, "bound polymorphic variant");
        Ok(())
    }

    /// Binds `tag` of `base` to the Rust type `T`, which must describe a record.
    pub fn register_variant_of<T: Codable>(&mut self, base: &str, tag: &str) -> Result<(), RegistryError> {
        match T::kind() {
            Kind::Nested(name) => self.register_variant(base, tag, &name),
            other => Err(RegistryError::NotARecord(other.to_string())),
        }
    }

    /// Checks the bindings `descriptor` takes part in, as base or as variant.
    fn check_variant_bindings(&self, descriptor: &TypeDescriptor) -> Result<(), RegistryError> {
        let name = descriptor.name();
        if let Some(table) = self.variants.get(name) {
            let key = descriptor
                .discriminator_key()
                .ok_or_else(|| RegistryError::NotPolymorphic(name.to_owned()))?;
            for entry in table.iter() {
                if let Some(variant) = self.defined(entry.variant_name()) {
                    if variant.descriptor.keys().any(|k| k == key) {
                        return Err(RegistryError::DiscriminatorCollision {
                            base: name.to_owned(),
                            variant: entry.variant_name().to_owned(),
                            key: key.to_owned(),
                        });
                    }
                }
            }
        }
        for (base, table) in &self.variants {
            if !table.iter().any(|e| e.variant_name() == name) {
                continue;
            }
            if !descriptor.is_record() {
                return Err(RegistryError::NotARecord(name.to_owned()));
            }
            let key = self.defined(base).and_then(|b| b.descriptor.discriminator_key());
            if let Some(key) = key.filter(|k| descriptor.keys().any(|own| own == *k)) {
                return Err(RegistryError::DiscriminatorCollision {
                    base: base.clone(),
                    variant: name.to_owned(),
                    key: key.to_owned(),
                });
            }
        }
        Ok(())
    }

    fn reserve(&mut self, name: &str) -> SlotId {
        if let Some(index) = self.types.get_index_of(name) {
            return SlotId::new(index);
        }
        let slot = SlotId::new(self.types.len());
        self.types.insert(
            name.to_owned(),
            Slot::Pending {
                referenced_by: Vec::new(),
            },
        );
        trace!(type_name = name, slot = slot.index(), "reserved pending slot");
        slot
    }

    fn reserve_for(&mut self, name: &str, referrer: &str) -> SlotId {
        let slot = self.reserve(name);
        if let Some(Slot::Pending { referenced_by }) = self.types.get_mut(name) {
            referenced_by.push((referrer.to_owned(), None));
        }
        slot
    }

    /// Ends the registration phase.
    ///
    /// Fails with every error found across the type graph; warnings are kept
    /// on the sealed registry.
    pub fn seal(&self) -> Result<Registry, Diagnostics> {
        let mut diags = Diagnostics::new();
        let mut entries = IndexMap::with_capacity(self.types.len());
        for (name, slot) in &self.types {
            match slot {
                Slot::Pending { referenced_by } if referenced_by.is_empty() => {
                    diags.error(name, None, Problem::UnresolvedType(name.clone()));
                }
                Slot::Pending { referenced_by } => {
                    for (owner, field) in referenced_by {
                        diags.error(owner, field.as_deref(), Problem::UnresolvedType(name.clone()));
                    }
                }
                Slot::Defined(entry) => {
                    entries.insert(name.clone(), entry.clone());
                }
            }
        }

        for entry in entries.values() {
            self.check_fields(entry, &mut diags);
            self.check_flattened_keys(entry.descriptor(), &mut diags);
        }
        self.check_variants(&mut diags);

        if diags.has_errors() {
            return Err(diags);
        }
        debug!(
            types = entries.len(),
            bases = self.variants.len(),
            warnings = diags.len(),
            "sealed codec registry"
        );
        Ok(Registry::new(entries, self.variants.clone(), diags))
    }

    fn check_fields(&self, entry: &TypeEntry, diags: &mut Diagnostics) {
        let owner = entry.descriptor.name();
        for field in entry.descriptor.fields() {
            if field.is_ignored() {
                continue;
            }
            if field.is_flattened() {
                if let Some(target) = field.kind().type_name().and_then(|t| self.defined(t)) {
                    if !target.descriptor.is_record() {
                        diags.error(
                            owner,
                            Some(field.member()),
                            Problem::FlattenTarget(target.descriptor.name().to_owned()),
                        );
                    }
                }
            }
        }
        for (member, strategy) in entry.encoder.plan().strategies() {
            self.check_strategy(owner, member, strategy, diags);
        }
    }

    fn check_strategy(&self, owner: &str, member: &str, strategy: &CodingStrategy, diags: &mut Diagnostics) {
        match strategy {
            CodingStrategy::Nested(target) => {
                if self.defined(&target.name).is_some_and(|t| t.descriptor.is_polymorphic()) {
                    diags.error(owner, Some(member), Problem::PolymorphicAsNested(target.name.clone()));
                }
            }
            CodingStrategy::Polymorphic(target) => {
                if self.defined(&target.name).is_some_and(|t| !t.descriptor.is_polymorphic()) {
                    diags.error(owner, Some(member), Problem::NotPolymorphicBase(target.name.clone()));
                }
            }
            CodingStrategy::Collection(inner) | CodingStrategy::Map(inner) | CodingStrategy::Optional(inner) => {
                self.check_strategy(owner, member, inner, diags)
            }
            CodingStrategy::Direct(_) | CodingStrategy::Any | CodingStrategy::Custom(_) => {}
        }
    }

    /// Keys a record writes into its own object, flattened records expanded.
    fn expanded_keys(
        &self,
        descriptor: &TypeDescriptor,
        prefix: &str,
        stack: &mut Vec<String>,
        out: &mut Vec<String>,
    ) -> Result<(), String> {
        for field in descriptor.fields() {
            if field.is_ignored() {
                continue;
            }
            let Some(own) = field.flatten_prefix() else {
                out.push(format!("{}{}", prefix, field.key()));
                continue;
            };
            let Some(target) = field.kind().type_name() else {
                continue;
            };
            if stack.iter().any(|t| t == target) {
                return Err(target.to_owned());
            }
            if let Some(entry) = self.defined(target).filter(|e| e.descriptor.is_record()) {
                stack.push(target.to_owned());
                self.expanded_keys(&entry.descriptor, &format!("{}{}", prefix, own), stack, out)?;
                stack.pop();
            }
        }
        Ok(())
    }

    fn check_flattened_keys(&self, descriptor: &TypeDescriptor, diags: &mut Diagnostics) {
        if !descriptor.fields().iter().any(|f| f.is_flattened()) {
            return;
        }
        let name = descriptor.name();
        let mut stack = vec![name.to_owned()];
        let mut keys = Vec::new();
        if let Err(cycle) = self.expanded_keys(descriptor, "", &mut stack, &mut keys) {
            diags.error(name, None, Problem::FlattenCycle(cycle));
            return;
        }
        let mut seen = std::collections::HashSet::new();
        for key in keys {
            if !seen.insert(key.clone()) {
                diags.error(name, None, Problem::FlattenedKeyCollision(key));
            }
        }
    }

    fn check_variants(&self, diags: &mut Diagnostics) {
        for (name, slot) in &self.types {
            let Slot::Defined(base) = slot else { continue };
            let Some(key) = base.descriptor.discriminator_key() else {
                continue;
            };
            let Some(table) = self.variants.get(name).filter(|t| !t.is_empty()) else {
                diags.warning(name, None, Problem::NoVariants);
                continue;
            };
            for entry in table.iter() {
                let Some(variant) = self.defined(entry.variant_name()) else {
                    continue;
                };
                let mut keys = Vec::new();
                let mut stack = vec![entry.variant_name().to_owned()];
                // cycles are reported on the variant itself
                if self
                    .expanded_keys(&variant.descriptor, "", &mut stack, &mut keys)
                    .is_ok()
                    && keys.iter().any(|k| k == key)
                {
                    diags.error(
                        name,
                        None,
                        Problem::DiscriminatorCollision {
                            variant: entry.variant_name().to_owned(),
                            key: key.to_owned(),
                        },
                    );
                }
            }
        }
    }
}

impl TypeResolver for RegistryBuilder {
    fn resolve_type(&mut self, name: &str) -> Option<SlotId> {
        Some(self.reserve(name))
    }
}
