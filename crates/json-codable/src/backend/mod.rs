//! Backend Adapter Interface.
//!
//! A backend owns parsing and serialization; the engine only ever sees
//! [`JsonNode`]. Adapters normalize the backend's number and key rules into
//! the node model and report anything that cannot cross the boundary
//! unchanged, so `from_backend(to_backend(n)) == n` for every node they accept.

mod cbor;
mod json;

pub use cbor::CborBackend;
pub use json::SerdeJsonBackend;

use crate::error::BackendError;
use crate::node::JsonNode;

pub trait Backend {
    /// The backend's own tree model.
    type Tree;

    fn name(&self) -> &'static str;

    fn parse(&self, bytes: &[u8]) -> Result<Self::Tree, BackendError>;

    fn serialize(&self, tree: &Self::Tree) -> Result<Vec<u8>, BackendError>;

    fn to_backend(&self, node: &JsonNode) -> Result<Self::Tree, BackendError>;

    fn from_backend(&self, tree: Self::Tree) -> Result<JsonNode, BackendError>;
}
