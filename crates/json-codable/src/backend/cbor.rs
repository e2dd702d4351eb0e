use ciborium::value::{Integer, Value as CborValue};

use crate::error::BackendError;
use crate::node::{JsonNode, JsonObject, Number};

use super::Backend;

const NAME: &str = "cbor";

/// Alternate backend on the `ciborium` CBOR tree.
///
/// CBOR keeps integers and floats apart and allows integers up to 64 bits of
/// magnitude in either sign; both are folded into the canonical `Number`.
/// Only the JSON-compatible subset is accepted: text keys, no byte strings,
/// no tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct CborBackend;

impl Backend for CborBackend {
    type Tree = CborValue;

    fn name(&self) -> &'static str {
        NAME
    }

    fn parse(&self, bytes: &[u8]) -> Result<CborValue, BackendError> {
        ciborium::de::from_reader(bytes).map_err(|e| BackendError::Parse {
            backend: NAME,
            message: e.to_string(),
        })
    }

    fn serialize(&self, tree: &CborValue) -> Result<Vec<u8>, BackendError> {
        let mut out = Vec::new();
        ciborium::ser::into_writer(tree, &mut out).map_err(|e| BackendError::Serialize {
            backend: NAME,
            message: e.to_string(),
        })?;
        Ok(out)
    }

    fn to_backend(&self, node: &JsonNode) -> Result<CborValue, BackendError> {
        to_cbor(node)
    }

    fn from_backend(&self, tree: CborValue) -> Result<JsonNode, BackendError> {
        from_cbor(tree)
    }
}

fn to_cbor(node: &JsonNode) -> Result<CborValue, BackendError> {
    Ok(match node {
        JsonNode::Null => CborValue::Null,
        JsonNode::Bool(b) => CborValue::Bool(*b),
        JsonNode::Number(n) => match n.as_i128() {
            Some(i) => CborValue::Integer(Integer::try_from(i).map_err(|_| BackendError::NumberOutOfRange {
                backend: NAME,
                value: i.to_string(),
            })?),
            None => CborValue::Float(n.as_f64()),
        },
        JsonNode::String(s) => CborValue::Text(s.clone()),
        JsonNode::Array(items) => CborValue::Array(items.iter().map(to_cbor).collect::<Result<_, _>>()?),
        JsonNode::Object(obj) => {
            let mut entries = Vec::with_capacity(obj.len());
            for (k, v) in obj {
                entries.push((CborValue::Text(k.clone()), to_cbor(v)?));
            }
            CborValue::Map(entries)
        }
    })
}

fn from_cbor(value: CborValue) -> Result<JsonNode, BackendError> {
    Ok(match value {
        CborValue::Null => JsonNode::Null,
        CborValue::Bool(b) => JsonNode::Bool(b),
        CborValue::Integer(i) => JsonNode::Number(Number::from_i128(i128::from(i))),
        CborValue::Float(f) => {
            JsonNode::Number(Number::from_f64(f).ok_or(BackendError::NonFiniteNumber { backend: NAME })?)
        }
        CborValue::Text(s) => JsonNode::String(s),
        CborValue::Array(items) => {
            JsonNode::Array(items.into_iter().map(from_cbor).collect::<Result<_, _>>()?)
        }
        CborValue::Map(entries) => {
            let mut out = JsonObject::with_capacity(entries.len());
            for (k, v) in entries {
                let CborValue::Text(key) = k else {
                    return Err(BackendError::NonStringKey { backend: NAME });
                };
                if out.contains_key(&key) {
                    return Err(BackendError::DuplicateKey { backend: NAME, key });
                }
                out.insert(key, from_cbor(v)?);
            }
            JsonNode::Object(out)
        }
        CborValue::Bytes(_) => {
            return Err(BackendError::Unsupported {
                backend: NAME,
                what: "byte string",
            })
        }
        CborValue::Tag(..) => {
            return Err(BackendError::Unsupported {
                backend: NAME,
                what: "tagged",
            })
        }
        _ => {
            return Err(BackendError::Unsupported {
                backend: NAME,
                what: "unknown CBOR",
            })
        }
    })
}
