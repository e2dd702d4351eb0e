use crate::descriptor::PrimitiveKind;
use crate::error::EncodeError;
use crate::node::{JsonNode, JsonObject, Number};
use crate::path::PathStep;
use crate::strategy::{CodingStrategy, TypeRef};
use crate::value::{Record, Value};

use super::{CodecTable, EncodeOptions, FieldPlan, Placement, PlanBody, TypePlan};

pub(crate) struct EncodeCx<'a> {
    pub table: &'a dyn CodecTable,
    pub opts: &'a EncodeOptions,
}

impl<'a> EncodeCx<'a> {
    fn plan(&self, target: &TypeRef) -> Result<&'a TypePlan, EncodeError> {
        self.table
            .plan(target.slot)
            .ok_or_else(|| EncodeError::Unregistered(target.name.clone()))
    }
}

pub(crate) fn encode_plan(plan: &TypePlan, value: &Value, cx: &EncodeCx<'_>) -> Result<JsonNode, EncodeError> {
    match &plan.body {
        PlanBody::Record { fields, .. } => {
            let Value::Record(record) = value else {
                return Err(EncodeError::mismatch("record", value.kind_name()));
            };
            let mut out = JsonObject::with_capacity(fields.len());
            encode_fields(fields, record, "", &mut out, cx)?;
            Ok(JsonNode::Object(out))
        }
        PlanBody::Polymorphic { discriminator_key } => {
            let Value::Variant(variant) = value else {
                return Err(EncodeError::mismatch("variant", value.kind_name()));
            };
            let tag = variant.tag();
            let target = cx
                .table
                .variant(&plan.name, tag)
                .ok_or_else(|| EncodeError::UnregisteredVariant {
                    path: String::new(),
                    base: plan.name.clone(),
                    tag: tag.to_owned(),
                })?;
            let parts = target
                .record()
                .ok_or_else(|| EncodeError::mismatch("record", "variant"))?;
            let mut out = JsonObject::with_capacity(parts.fields.len() + 1);
            out.insert(discriminator_key.clone(), JsonNode::String(tag.to_owned()));
            encode_fields(parts.fields, variant.record(), "", &mut out, cx)?;
            Ok(JsonNode::Object(out))
        }
        PlanBody::Enumeration { variants } => match value {
            Value::Str(name) if variants.contains(name) => Ok(JsonNode::String(name.clone())),
            Value::Str(name) => Err(EncodeError::UnregisteredVariant {
                path: String::new(),
                base: plan.name.clone(),
                tag: name.clone(),
            }),
            other => Err(EncodeError::mismatch("string", other.kind_name())),
        },
    }
}

/// Writes the fields of `record` into `out`, keys prefixed by `prefix`.
fn encode_fields(
    fields: &[FieldPlan],
    record: &Record,
    prefix: &str,
    out: &mut JsonObject,
    cx: &EncodeCx<'_>,
) -> Result<(), EncodeError> {
    for field in fields {
        if !field.access.can_read(cx.opts.access_level) {
            continue;
        }
        let value = record.get(field.index).unwrap_or(&Value::Absent);
        match &field.placement {
            Placement::Flatten { prefix: own, target } => {
                let Value::Record(inner) = value else {
                    return Err(EncodeError::mismatch("record", value.kind_name())
                        .within(PathStep::Key(field.key.clone())));
                };
                let parts = cx
                    .plan(target)?
                    .record()
                    .ok_or_else(|| EncodeError::mismatch("record", "enumeration"))?;
                encode_fields(parts.fields, inner, &format!("{}{}", prefix, own), out, cx)?;
            }
            Placement::Keyed => {
                let key = format!("{}{}", prefix, field.key);
                if value.is_absent() {
                    if field.required {
                        return Err(EncodeError::mismatch("value", "absent").within(PathStep::Key(key)));
                    }
                    continue;
                }
                let node = encode_strategy(&field.strategy, value, cx)
                    .map_err(|e| e.within(PathStep::Key(key.clone())))?;
                out.insert(key, node);
            }
        }
    }
    Ok(())
}

pub(crate) fn encode_strategy(
    strategy: &CodingStrategy,
    value: &Value,
    cx: &EncodeCx<'_>,
) -> Result<JsonNode, EncodeError> {
    match strategy {
        CodingStrategy::Direct(p) => encode_primitive(*p, value),
        CodingStrategy::Any => match value {
            Value::Node(node) => Ok(node.clone()),
            other => Err(EncodeError::mismatch("json", other.kind_name())),
        },
        CodingStrategy::Nested(target) | CodingStrategy::Polymorphic(target) => {
            encode_plan(cx.plan(target)?, value, cx)
        }
        CodingStrategy::Collection(element) => {
            let Value::Seq(items) = value else {
                return Err(EncodeError::mismatch("sequence", value.kind_name()));
            };
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(encode_strategy(element, item, cx).map_err(|e| e.within(PathStep::Index(i)))?);
            }
            Ok(JsonNode::Array(out))
        }
        CodingStrategy::Map(inner) => {
            let Value::Map(entries) = value else {
                return Err(EncodeError::mismatch("map", value.kind_name()));
            };
            let mut out = JsonObject::with_capacity(entries.len());
            for (key, item) in entries {
                let node = encode_strategy(inner, item, cx).map_err(|e| e.within(PathStep::Key(key.clone())))?;
                out.insert(key.clone(), node);
            }
            Ok(JsonNode::Object(out))
        }
        CodingStrategy::Optional(inner) => match value {
            Value::Absent => Ok(JsonNode::Null),
            present => encode_strategy(inner, present, cx),
        },
        CodingStrategy::Custom(coder) => coder
            .encode(value)
            .map_err(|message| EncodeError::CustomCoderFailure {
                path: String::new(),
                message,
            }),
    }
}

fn encode_primitive(kind: PrimitiveKind, value: &Value) -> Result<JsonNode, EncodeError> {
    match (kind, value) {
        (PrimitiveKind::Bool, Value::Bool(b)) => Ok(JsonNode::Bool(*b)),
        (PrimitiveKind::String, Value::Str(s)) => Ok(JsonNode::String(s.clone())),
        (PrimitiveKind::Char, Value::Str(s)) if s.chars().count() == 1 => Ok(JsonNode::String(s.clone())),
        (PrimitiveKind::F32 | PrimitiveKind::F64, Value::Float(f)) => Number::from_f64(*f)
            .map(JsonNode::Number)
            .ok_or(EncodeError::NonFiniteNumber { path: String::new() }),
        (PrimitiveKind::F32 | PrimitiveKind::F64, Value::Int(i)) => Ok(JsonNode::Number(Number::from_i128(*i))),
        (kind, Value::Int(i)) if kind.int_range().is_some_and(|(lo, hi)| (lo..=hi).contains(i)) => {
            Ok(JsonNode::Number(Number::from_i128(*i)))
        }
        (kind, other) => Err(EncodeError::mismatch(kind.name(), other.kind_name())),
    }
}
