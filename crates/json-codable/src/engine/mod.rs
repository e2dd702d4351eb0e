//! Derivation Engine.
//!
//! [`derive`] compiles a [`TypeDescriptor`] once into a [`TypePlan`] (every
//! field's strategy resolved, every referenced type bound to a slot) and hands
//! out an [`Encoder`] and a [`Decoder`] sharing it. Running them needs a
//! [`CodecTable`] to follow slot references; the sealed registry is one.
//!
//! Both directions are pure: no state is kept between calls and a failing
//! decode never yields a partially built value.

mod decode;
mod encode;
mod options;

use std::sync::Arc;

pub use options::{DecodeOptions, EncodeOptions};

pub(crate) use decode::{decode_plan, decode_strategy, DecodeCx};
pub(crate) use encode::{encode_plan, encode_strategy, EncodeCx};

use crate::descriptor::{FieldAccess, TypeDescriptor, TypeShape, UnknownKeys};
use crate::error::{DecodeError, EncodeError};
use crate::node::JsonNode;
use crate::registry::SlotId;
use crate::strategy::{resolve_field, CodingStrategy, TypeRef, TypeResolver, UnresolvedType};
use crate::value::Value;

/// Lookup of compiled plans by slot, and of polymorphic variants by tag.
pub trait CodecTable {
    fn plan(&self, slot: SlotId) -> Option<&TypePlan>;
    fn variant(&self, base: &str, tag: &str) -> Option<&TypePlan>;
}

/// Compiled form of one descriptor.
#[derive(Debug)]
pub struct TypePlan {
    pub(crate) name: String,
    pub(crate) body: PlanBody,
}

#[derive(Debug)]
pub(crate) enum PlanBody {
    Record {
        fields: Vec<FieldPlan>,
        /// Declared field count, ignored fields included.
        len: usize,
        unknown_keys: Option<UnknownKeys>,
    },
    Polymorphic {
        discriminator_key: String,
    },
    Enumeration {
        variants: Vec<String>,
    },
}

#[derive(Debug)]
pub(crate) struct FieldPlan {
    pub member: String,
    pub key: String,
    /// Position in the record, ignored fields counted.
    pub index: usize,
    pub strategy: CodingStrategy,
    /// Not required: absent values are omitted, missing or null keys decode to absent.
    pub required: bool,
    pub access: FieldAccess,
    pub placement: Placement,
}

#[derive(Debug)]
pub(crate) enum Placement {
    Keyed,
    Flatten { prefix: String, target: TypeRef },
}

pub(crate) struct RecordParts<'a> {
    pub fields: &'a [FieldPlan],
    pub len: usize,
    pub unknown_keys: Option<UnknownKeys>,
}

impl TypePlan {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_record(&self) -> bool {
        matches!(self.body, PlanBody::Record { .. })
    }

    pub fn is_polymorphic(&self) -> bool {
        matches!(self.body, PlanBody::Polymorphic { .. })
    }

    pub(crate) fn record(&self) -> Option<RecordParts<'_>> {
        match &self.body {
            PlanBody::Record {
                fields,
                len,
                unknown_keys,
            } => Some(RecordParts {
                fields,
                len: *len,
                unknown_keys: *unknown_keys,
            }),
            _ => None,
        }
    }

    /// Field strategies, in declaration order.
    pub fn strategies(&self) -> impl Iterator<Item = (&str, &CodingStrategy)> {
        self.record()
            .map(|r| r.fields)
            .unwrap_or_default()
            .iter()
            .map(|f| (f.member.as_str(), &f.strategy))
    }
}

#[derive(Debug, Clone)]
pub struct Encoder {
    plan: Arc<TypePlan>,
}

impl Encoder {
    pub fn type_name(&self) -> &str {
        &self.plan.name
    }

    pub fn plan(&self) -> &TypePlan {
        &self.plan
    }

    pub fn encode(
        &self,
        value: &Value,
        table: &dyn CodecTable,
        opts: &EncodeOptions,
    ) -> Result<JsonNode, EncodeError> {
        encode_plan(&self.plan, value, &EncodeCx { table, opts })
    }
}

#[derive(Debug, Clone)]
pub struct Decoder {
    plan: Arc<TypePlan>,
}

impl Decoder {
    pub fn type_name(&self) -> &str {
        &self.plan.name
    }

    pub fn plan(&self) -> &TypePlan {
        &self.plan
    }

    pub fn decode(
        &self,
        node: &JsonNode,
        table: &dyn CodecTable,
        opts: &DecodeOptions,
    ) -> Result<Value, DecodeError> {
        decode_plan(&self.plan, node, &DecodeCx::new(table, opts))
    }
}

/// Compiles `descriptor` into an encoder/decoder pair.
///
/// Referenced types are bound through `resolver`; their codecs need not
/// exist yet, only their slots.
pub fn derive(
    descriptor: &TypeDescriptor,
    resolver: &mut dyn TypeResolver,
) -> Result<(Encoder, Decoder), UnresolvedType> {
    let body = match descriptor.shape() {
        TypeShape::Record {
            fields,
            unknown_keys,
        } => {
            let mut plans = Vec::with_capacity(fields.len());
            for (index, field) in fields.iter().enumerate() {
                if field.is_ignored() {
                    continue;
                }
                let strategy = resolve_field(field, resolver)?;
                let placement = match (field.flatten_prefix(), &strategy) {
                    (Some(prefix), CodingStrategy::Nested(target)) => Placement::Flatten {
                        prefix,
                        target: target.clone(),
                    },
                    _ => Placement::Keyed,
                };
                plans.push(FieldPlan {
                    member: field.member().to_owned(),
                    key: field.key().to_owned(),
                    index,
                    strategy,
                    required: field.is_required(),
                    access: field.field_access().clone(),
                    placement,
                });
            }
            PlanBody::Record {
                fields: plans,
                len: fields.len(),
                unknown_keys: *unknown_keys,
            }
        }
        TypeShape::Polymorphic { discriminator_key } => PlanBody::Polymorphic {
            discriminator_key: discriminator_key.clone(),
        },
        TypeShape::Enumeration { variants } => PlanBody::Enumeration {
            variants: variants.clone(),
        },
    };
    let plan = Arc::new(TypePlan {
        name: descriptor.name().to_owned(),
        body,
    });
    Ok((Encoder { plan: plan.clone() }, Decoder { plan }))
}

#[cfg(test)]
pub(crate) mod testing {
    //! A minimal codec table for engine tests, independent of the registry.

    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    pub struct Table {
        names: HashMap<String, SlotId>,
        plans: Vec<Option<(Encoder, Decoder)>>,
        variants: HashMap<(String, String), String>,
    }

    impl TypeResolver for Table {
        fn resolve_type(&mut self, name: &str) -> Option<SlotId> {
            if let Some(slot) = self.names.get(name) {
                return Some(*slot);
            }
            let slot = SlotId::new(self.plans.len());
            self.plans.push(None);
            self.names.insert(name.to_owned(), slot);
            Some(slot)
        }
    }

    impl CodecTable for Table {
        fn plan(&self, slot: SlotId) -> Option<&TypePlan> {
            self.plans.get(slot.index())?.as_ref().map(|(e, _)| e.plan())
        }

        fn variant(&self, base: &str, tag: &str) -> Option<&TypePlan> {
            let name = self.variants.get(&(base.to_owned(), tag.to_owned()))?;
            self.plan(*self.names.get(name)?)
        }
    }

    impl Table {
        pub fn add(&mut self, descriptor: TypeDescriptor) -> &mut Self {
            let slot = self.resolve_type(descriptor.name()).unwrap();
            let pair = derive(&descriptor, self).unwrap();
            self.plans[slot.index()] = Some(pair);
            self
        }

        pub fn bind(&mut self, base: &str, tag: &str, variant: &str) -> &mut Self {
            self.variants
                .insert((base.to_owned(), tag.to_owned()), variant.to_owned());
            self
        }

        pub fn encode(&self, name: &str, value: &Value) -> Result<JsonNode, EncodeError> {
            self.encode_with(name, value, &EncodeOptions::default())
        }

        pub fn encode_with(
            &self,
            name: &str,
            value: &Value,
            opts: &EncodeOptions,
        ) -> Result<JsonNode, EncodeError> {
            let (encoder, _) = self.pair(name);
            encoder.encode(value, self, opts)
        }

        pub fn decode(&self, name: &str, node: &JsonNode) -> Result<Value, DecodeError> {
            self.decode_with(name, node, &DecodeOptions::default())
        }

        pub fn decode_with(
            &self,
            name: &str,
            node: &JsonNode,
            opts: &DecodeOptions,
        ) -> Result<Value, DecodeError> {
            let (_, decoder) = self.pair(name);
            decoder.decode(node, self, opts)
        }

        fn pair(&self, name: &str) -> &(Encoder, Decoder) {
            let slot = self.names[name];
            self.plans[slot.index()].as_ref().unwrap()
        }
    }
}
