use indexmap::IndexMap;

use crate::descriptor::{PrimitiveKind, UnknownKeys};
use crate::error::DecodeError;
use crate::node::{JsonNode, JsonObject, Number};
use crate::strategy::{CodingStrategy, TypeRef};
use crate::value::{Record, Value, Variant};

use super::{CodecTable, DecodeOptions, FieldPlan, Placement, PlanBody, RecordParts, TypePlan};

/// 2^24, the integer precision of an `f32`.
pub(crate) struct DecodeCx<'a> {
    table: &'a dyn CodecTable,
    opts: &'a DecodeOptions,
    depth: usize,
}

impl<'a> DecodeCx<'a> {
    pub fn new(table: &'a dyn CodecTable, opts: &'a DecodeOptions) -> Self {
        Self { table, opts, depth: 0 }
    }

    fn plan(&self, target: &TypeRef) -> Result<&'a TypePlan, DecodeError> {
        self.table
            .plan(target.slot)
            .ok_or_else(|| DecodeError::Unregistered(target.name.clone()))
    }

    /// Context one container level down.
    fn descend(&self) -> Result<DecodeCx<'a>, DecodeError> {
        let depth = self.depth + 1;
        if depth > self.opts.max_depth {
            return Err(DecodeError::DepthLimit(self.opts.max_depth));
        }
        Ok(DecodeCx {
            table: self.table,
            opts: self.opts,
            depth,
        })
    }
}

pub(crate) fn decode_plan(plan: &TypePlan, node: &JsonNode, cx: &DecodeCx<'_>) -> Result<Value, DecodeError> {
    match &plan.body {
        PlanBody::Record { .. } => {
            let obj = expect_object(node)?;
            let cx = cx.descend()?;
            let parts = plan
                .record()
                .ok_or_else(|| DecodeError::mismatch("record", "variant"))?;
            let mut consumed = vec![false; obj.len()];
            let record = decode_record(&parts, obj, &mut consumed, &cx)?;
            Ok(Value::Record(record))
        }
        PlanBody::Polymorphic { discriminator_key } => {
            let obj = expect_object(node)?;
            let cx = cx.descend()?;
            let (index, _, tag_node) = obj
                .get_full(discriminator_key.as_str())
                .ok_or_else(|| DecodeError::MissingField(discriminator_key.clone()))?;
            let tag = tag_node
                .as_str()
                .ok_or_else(|| DecodeError::mismatch("string", tag_node.kind_name()).in_field(discriminator_key))?;
            let parts = cx
                .table
                .variant(&plan.name, tag)
                .and_then(TypePlan::record)
                .ok_or_else(|| DecodeError::UnknownVariant(tag.to_owned()))?;
            let mut consumed = vec![false; obj.len()];
            consumed[index] = true;
            let record = decode_record(&parts, obj, &mut consumed, &cx)?;
            Ok(Value::Variant(Variant::new(tag, record)))
        }
        PlanBody::Enumeration { variants } => match node {
            JsonNode::String(name) if variants.contains(name) => Ok(Value::Str(name.clone())),
            JsonNode::String(name) => Err(DecodeError::UnknownVariant(name.clone())),
            JsonNode::Number(n) => n
                .as_i128()
                .and_then(|i| usize::try_from(i).ok())
                .and_then(|i| variants.get(i))
                .map(|name| Value::Str(name.clone()))
                .ok_or_else(|| DecodeError::UnknownVariant(n.to_string())),
            other => Err(DecodeError::mismatch("string", other.kind_name())),
        },
    }
}

fn expect_object(node: &JsonNode) -> Result<&JsonObject, DecodeError> {
    node.as_object()
        .ok_or_else(|| DecodeError::mismatch("object", node.kind_name()))
}

/// Decodes one record from `obj`, then applies the unknown-key policy.
fn decode_record(
    parts: &RecordParts<'_>,
    obj: &JsonObject,
    consumed: &mut [bool],
    cx: &DecodeCx<'_>,
) -> Result<Record, DecodeError> {
    let record = decode_fields(parts.fields, parts.len, obj, "", consumed, cx)?;
    if parts.unknown_keys.unwrap_or(cx.opts.unknown_keys) == UnknownKeys::Reject {
        // first unclaimed key in input order
        if let Some(i) = consumed.iter().position(|seen| !seen) {
            if let Some((key, _)) = obj.get_index(i) {
                return Err(DecodeError::UnknownField(key.clone()));
            }
        }
    }
    Ok(record)
}

fn decode_fields(
    fields: &[FieldPlan],
    len: usize,
    obj: &JsonObject,
    prefix: &str,
    consumed: &mut [bool],
    cx: &DecodeCx<'_>,
) -> Result<Record, DecodeError> {
    let mut values = vec![Value::Absent; len];
    for field in fields {
        let value = match &field.placement {
            Placement::Keyed => {
                let key = format!("{}{}", prefix, field.key);
                match obj.get_full(key.as_str()) {
                    Some((i, _, node)) => {
                        consumed[i] = true;
                        if !field.access.can_write(cx.opts.access_level) {
                            return Err(DecodeError::AccessDenied(key));
                        }
                        if node.is_null() && !field.required {
                            Value::Absent
                        } else {
                            decode_strategy(&field.strategy, node, cx).map_err(|e| e.in_field(&key))?
                        }
                    }
                    None if field.required => return Err(DecodeError::MissingField(key)),
                    None => Value::Absent,
                }
            }
            Placement::Flatten { prefix: own, target } => {
                let parts = cx
                    .plan(target)?
                    .record()
                    .ok_or_else(|| DecodeError::mismatch("record", "enumeration"))?;
                let nested = format!("{}{}", prefix, own);
                Value::Record(decode_fields(parts.fields, parts.len, obj, &nested, consumed, cx)?)
            }
        };
        if let Some(slot) = values.get_mut(field.index) {
            *slot = value;
        }
    }
    Ok(Record::new(values))
}

pub(crate) fn decode_strategy(
    strategy: &CodingStrategy,
    node: &JsonNode,
    cx: &DecodeCx<'_>,
) -> Result<Value, DecodeError> {
    match strategy {
        CodingStrategy::Direct(p) => decode_primitive(*p, node),
        CodingStrategy::Any => Ok(Value::Node(node.clone())),
        CodingStrategy::Nested(target) | CodingStrategy::Polymorphic(target) => {
            decode_plan(cx.plan(target)?, node, cx)
        }
        CodingStrategy::Collection(element) => {
            let items = node
                .as_array()
                .ok_or_else(|| DecodeError::mismatch("array", node.kind_name()))?;
            let cx = cx.descend()?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    decode_strategy(element, item, &cx).map_err(|e| DecodeError::ElementError(i, Box::new(e)))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Seq)
        }
        CodingStrategy::Map(inner) => {
            let obj = expect_object(node)?;
            let cx = cx.descend()?;
            obj.iter()
                .map(|(key, item)| {
                    decode_strategy(inner, item, &cx)
                        .map(|v| (key.clone(), v))
                        .map_err(|e| DecodeError::EntryError(key.clone(), Box::new(e)))
                })
                .collect::<Result<IndexMap<_, _>, _>>()
                .map(Value::Map)
        }
        CodingStrategy::Optional(inner) => match node {
            JsonNode::Null => Ok(Value::Absent),
            present => decode_strategy(inner, present, cx),
        },
        CodingStrategy::Custom(coder) => coder.decode(node).map_err(DecodeError::CustomCoderFailure),
    }
}

fn decode_primitive(kind: PrimitiveKind, node: &JsonNode) -> Result<Value, DecodeError> {
    let mismatch = || DecodeError::mismatch(kind.name(), node.kind_name());
    match kind {
        PrimitiveKind::Bool => node.as_bool().map(Value::Bool).ok_or_else(mismatch),
        PrimitiveKind::String => node.as_str().map(|s| Value::Str(s.to_owned())).ok_or_else(mismatch),
        PrimitiveKind::Char => match node.as_str() {
            Some(s) if s.chars().count() == 1 => Ok(Value::Str(s.to_owned())),
            _ => Err(mismatch()),
        },
        PrimitiveKind::F32 | PrimitiveKind::F64 => decode_float(kind, node.as_number().ok_or_else(mismatch)?),
        _ => {
            let n = node.as_number().ok_or_else(mismatch)?;
            let out_of_range = || DecodeError::NumericRange {
                value: n.to_string(),
                target: kind.name(),
            };
            let (lo, hi) = kind.int_range().ok_or_else(mismatch)?;
            let i = n.as_i128().ok_or_else(out_of_range)?;
            if i < lo || i > hi {
                return Err(out_of_range());
            }
            Ok(Value::Int(i))
        }
    }
}

/// Integers must be exact in the target width; fractional values round to
/// the nearest representable float as long as they are within range.
fn decode_float(kind: PrimitiveKind, n: Number) -> Result<Value, DecodeError> {
    let out_of_range = || DecodeError::NumericRange {
        value: n.to_string(),
        target: kind.name(),
    };
    if let Some(i) = n.as_i128() {
        let digits = match kind {
            PrimitiveKind::F32 => f32::MANTISSA_DIGITS,
            _ => f64::MANTISSA_DIGITS,
        };
        if !fits_mantissa(i, digits) {
            return Err(out_of_range());
        }
        return Ok(Value::Float(i as f64));
    }
    let f = n.as_f64();
    if kind == PrimitiveKind::F32 && f.abs() > f32::MAX as f64 {
        return Err(out_of_range());
    }
    Ok(Value::Float(f))
}

/// Whether `i` survives a trip through a float with `digits` significand bits.
fn fits_mantissa(i: i128, digits: u32) -> bool {
    let m = i.unsigned_abs();
    m == 0 || (m >> m.trailing_zeros()) < (1u128 << digits)
}
