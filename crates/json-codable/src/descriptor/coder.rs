use std::fmt;
use std::sync::Arc;

use crate::node::JsonNode;
use crate::value::Value;

/// Field-level override of the resolved coding strategy.
///
/// Errors are plain messages; the engine attaches the field location and
/// reports them as `CustomCoderFailure`.
pub trait FieldCoder: Send + Sync + fmt::Debug {
    fn encode(&self, value: &Value) -> Result<JsonNode, String>;
    fn decode(&self, node: &JsonNode) -> Result<Value, String>;
}

pub type CoderRef = Arc<dyn FieldCoder>;

type EncodeFn = dyn Fn(&Value) -> Result<JsonNode, String> + Send + Sync;
type DecodeFn = dyn Fn(&JsonNode) -> Result<Value, String> + Send + Sync;

/// A [`FieldCoder`] made of two closures.
pub struct FnCoder {
    name: &'static str,
    encode: Box<EncodeFn>,
    decode: Box<DecodeFn>,
}

impl fmt::Debug for FnCoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCoder").field("name", &self.name).finish()
    }
}

impl FieldCoder for FnCoder {
    fn encode(&self, value: &Value) -> Result<JsonNode, String> {
        (self.encode)(value)
    }

    fn decode(&self, node: &JsonNode) -> Result<Value, String> {
        (self.decode)(node)
    }
}

pub fn coder_fn<E, D>(name: &'static str, encode: E, decode: D) -> CoderRef
where
    E: Fn(&Value) -> Result<JsonNode, String> + Send + Sync + 'static,
    D: Fn(&JsonNode) -> Result<Value, String> + Send + Sync + 'static,
{
    Arc::new(FnCoder {
        name,
        encode: Box::new(encode),
        decode: Box::new(decode),
    })
}
