use std::cell::Cell;
use std::fmt;

use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Number as JsonNumber, Value};

use crate::error::BackendError;
use crate::node::{JsonNode, JsonObject, Number};

use super::Backend;

const NAME: &str = "serde_json";

/// Tree-model backend on `serde_json::Value` (with `preserve_order`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeJsonBackend {
    pub pretty: bool,
}

impl SerdeJsonBackend {
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Backend for SerdeJsonBackend {
    type Tree = Value;

    fn name(&self) -> &'static str {
        NAME
    }

    fn parse(&self, bytes: &[u8]) -> Result<Value, BackendError> {
        let duplicate = Cell::new(None);
        let mut de = serde_json::Deserializer::from_slice(bytes);
        let tree = UniqueKeys { duplicate: &duplicate }
            .deserialize(&mut de)
            .and_then(|tree| de.end().map(|()| tree));
        tree.map_err(|e| match duplicate.take() {
            Some(key) => BackendError::DuplicateKey { backend: NAME, key },
            None => BackendError::Parse {
                backend: NAME,
                message: e.to_string(),
            },
        })
    }

    fn serialize(&self, tree: &Value) -> Result<Vec<u8>, BackendError> {
        let out = if self.pretty {
            serde_json::to_vec_pretty(tree)
        } else {
            serde_json::to_vec(tree)
        };
        out.map_err(|e| BackendError::Serialize {
            backend: NAME,
            message: e.to_string(),
        })
    }

    fn to_backend(&self, node: &JsonNode) -> Result<Value, BackendError> {
        to_json(node)
    }

    fn from_backend(&self, tree: Value) -> Result<JsonNode, BackendError> {
        JsonNode::try_from(tree)
    }
}

/// Builds a `Value` like serde_json's own visitor, but fails on a repeated
/// object key instead of keeping the last one. The key is left in `duplicate`.
#[derive(Clone, Copy)]
struct UniqueKeys<'a> {
    duplicate: &'a Cell<Option<String>>,
}

impl<'de> DeserializeSeed<'de> for UniqueKeys<'_> {
    type Value = Value;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for UniqueKeys<'_> {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> Result<Value, E> {
        Ok(Value::Bool(b))
    }

    fn visit_i64<E: de::Error>(self, i: i64) -> Result<Value, E> {
        Ok(Value::from(i))
    }

    fn visit_u64<E: de::Error>(self, u: u64) -> Result<Value, E> {
        Ok(Value::from(u))
    }

    fn visit_f64<E: de::Error>(self, f: f64) -> Result<Value, E> {
        Ok(JsonNumber::from_f64(f).map_or(Value::Null, Value::Number))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<Value, E> {
        Ok(Value::String(s.to_owned()))
    }

    fn visit_string<E: de::Error>(self, s: String) -> Result<Value, E> {
        Ok(Value::String(s))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element_seed(self)? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut out = Map::new();
        while let Some(key) = map.next_key::<String>()? {
            if out.contains_key(&key) {
                let message = format!("duplicate object key `{key}`");
                self.duplicate.set(Some(key));
                return Err(de::Error::custom(message));
            }
            let value = map.next_value_seed(self)?;
            out.insert(key, value);
        }
        Ok(Value::Object(out))
    }
}

fn to_json(node: &JsonNode) -> Result<Value, BackendError> {
    Ok(match node {
        JsonNode::Null => Value::Null,
        JsonNode::Bool(b) => Value::Bool(*b),
        JsonNode::Number(n) => Value::Number(number_to_json(*n)?),
        JsonNode::String(s) => Value::String(s.clone()),
        JsonNode::Array(items) => Value::Array(items.iter().map(to_json).collect::<Result<_, _>>()?),
        JsonNode::Object(obj) => {
            let mut out = Map::with_capacity(obj.len());
            for (k, v) in obj {
                out.insert(k.clone(), to_json(v)?);
            }
            Value::Object(out)
        }
    })
}

fn number_to_json(n: Number) -> Result<JsonNumber, BackendError> {
    match n.as_i128() {
        Some(i) => {
            if let Ok(u) = u64::try_from(i) {
                Ok(JsonNumber::from(u))
            } else if let Ok(s) = i64::try_from(i) {
                Ok(JsonNumber::from(s))
            } else {
                Err(BackendError::NumberOutOfRange {
                    backend: NAME,
                    value: i.to_string(),
                })
            }
        }
        None => JsonNumber::from_f64(n.as_f64()).ok_or(BackendError::NonFiniteNumber { backend: NAME }),
    }
}

impl TryFrom<Value> for JsonNode {
    type Error = BackendError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Ok(match value {
            Value::Null => JsonNode::Null,
            Value::Bool(b) => JsonNode::Bool(b),
            Value::Number(n) => JsonNode::Number(number_from_json(&n)?),
            Value::String(s) => JsonNode::String(s),
            Value::Array(items) => JsonNode::Array(
                items
                    .into_iter()
                    .map(JsonNode::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(map) => {
                let mut out = JsonObject::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k, JsonNode::try_from(v)?);
                }
                JsonNode::Object(out)
            }
        })
    }
}

fn number_from_json(n: &JsonNumber) -> Result<Number, BackendError> {
    if let Some(u) = n.as_u64() {
        return Ok(Number::from(u));
    }
    if let Some(i) = n.as_i64() {
        return Ok(Number::from(i));
    }
    n.as_f64()
        .and_then(Number::from_f64)
        .ok_or(BackendError::NonFiniteNumber { backend: NAME })
}
