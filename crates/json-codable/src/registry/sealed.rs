use std::sync::Arc;

use indexmap::IndexMap;

use crate::backend::Backend;
use crate::codable::Codable;
use crate::descriptor::{Kind, TypeDescriptor};
use crate::diagnostics::Diagnostics;
use crate::engine::{
    decode_strategy, encode_strategy, CodecTable, DecodeCx, DecodeOptions, EncodeCx, EncodeOptions, TypePlan,
};
use crate::error::{CodecError, DecodeError, EncodeError};
use crate::node::JsonNode;
use crate::strategy::{resolve, CodingStrategy, TypeResolver, UnresolvedType};
use crate::value::Value;

use super::variants::VariantTable;
use super::{SlotId, TypeEntry};

/// Sealed, immutable registry. Cloning is cheap and reads take no lock.
#[derive(Debug, Clone)]
pub struct Registry {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    /// Same order as the builder's slot table, so `SlotId`s stay valid.
    types: IndexMap<String, Arc<TypeEntry>>,
    variants: IndexMap<String, VariantTable>,
    diagnostics: Diagnostics,
}

impl CodecTable for Inner {
    fn plan(&self, slot: SlotId) -> Option<&TypePlan> {
        self.types
            .get_index(slot.index())
            .map(|(_, entry)| entry.encoder().plan())
    }

    fn variant(&self, base: &str, tag: &str) -> Option<&TypePlan> {
        let entry = self.variants.get(base)?.get(tag)?;
        self.plan(entry.variant().slot)
    }
}

/// Binds names to the slots of a sealed registry; never reserves.
struct Lookup<'a>(&'a Inner);

impl TypeResolver for Lookup<'_> {
    fn resolve_type(&mut self, name: &str) -> Option<SlotId> {
        self.0.types.get_index_of(name).map(SlotId::new)
    }
}

impl Registry {
    pub(crate) fn new(
        types: IndexMap<String, Arc<TypeEntry>>,
        variants: IndexMap<String, VariantTable>,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                types,
                variants,
                diagnostics,
            }),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.types.contains_key(name)
    }

    pub fn descriptor(&self, name: &str) -> Option<&TypeDescriptor> {
        self.inner.types.get(name).map(|e| e.descriptor())
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.inner.types.keys().map(String::as_str)
    }

    /// Warnings collected at seal.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.inner.diagnostics
    }

    pub fn variants(&self, base: &str) -> Option<&VariantTable> {
        self.inner.variants.get(base)
    }

    /// Registered type bound to `tag` of `base`.
    pub fn variant(&self, base: &str, tag: &str) -> Option<&TypeEntry> {
        let entry = self.variants(base)?.get(tag)?;
        self.inner
            .types
            .get_index(entry.variant().slot.index())
            .map(|(_, e)| e.as_ref())
    }

    pub fn codec(&self, name: &str) -> Option<TypeCodec<'_>> {
        let entry = self.inner.types.get(name)?;
        Some(TypeCodec { registry: self, entry })
    }

    fn strategy(&self, kind: &Kind) -> Result<CodingStrategy, UnresolvedType> {
        resolve(kind, &mut Lookup(&self.inner))
    }

    /// Encodes a dynamic value of any kind built from registered types.
    pub fn encode_value(&self, kind: &Kind, value: &Value, opts: &EncodeOptions) -> Result<JsonNode, EncodeError> {
        let strategy = self
            .strategy(kind)
            .map_err(|UnresolvedType(name)| EncodeError::Unregistered(name))?;
        encode_strategy(&strategy, value, &EncodeCx { table: &*self.inner, opts })
    }

    pub fn decode_value(&self, kind: &Kind, node: &JsonNode, opts: &DecodeOptions) -> Result<Value, DecodeError> {
        let strategy = self
            .strategy(kind)
            .map_err(|UnresolvedType(name)| DecodeError::Unregistered(name))?;
        decode_strategy(&strategy, node, &DecodeCx::new(&*self.inner, opts))
    }

    pub fn to_node<T: Codable>(&self, value: &T) -> Result<JsonNode, EncodeError> {
        self.to_node_with(value, &EncodeOptions::default())
    }

    pub fn to_node_with<T: Codable>(&self, value: &T, opts: &EncodeOptions) -> Result<JsonNode, EncodeError> {
        self.encode_value(&T::kind(), &value.to_value(), opts)
    }

    pub fn from_node<T: Codable>(&self, node: &JsonNode) -> Result<T, DecodeError> {
        self.from_node_with(node, &DecodeOptions::default())
    }

    pub fn from_node_with<T: Codable>(&self, node: &JsonNode, opts: &DecodeOptions) -> Result<T, DecodeError> {
        T::from_value(self.decode_value(&T::kind(), node, opts)?)
    }

    /// Encodes `value` to bytes through `backend`.
    pub fn encode<T: Codable, B: Backend>(&self, value: &T, backend: &B) -> Result<Vec<u8>, CodecError> {
        let node = self.to_node(value)?;
        let tree = backend.to_backend(&node)?;
        Ok(backend.serialize(&tree)?)
    }

    /// Decodes bytes produced by `backend` into a `T`.
    pub fn decode<T: Codable, B: Backend>(&self, bytes: &[u8], backend: &B) -> Result<T, CodecError> {
        let node = backend.from_backend(backend.parse(bytes)?)?;
        Ok(self.from_node(&node)?)
    }

    /// Encodes a dynamic value of the registered type `name`.
    pub fn encode_type<B: Backend>(&self, name: &str, value: &Value, backend: &B) -> Result<Vec<u8>, CodecError> {
        let codec = self
            .codec(name)
            .ok_or_else(|| EncodeError::Unregistered(name.to_owned()))?;
        let tree = backend.to_backend(&codec.encode(value)?)?;
        Ok(backend.serialize(&tree)?)
    }

    pub fn decode_type<B: Backend>(&self, name: &str, bytes: &[u8], backend: &B) -> Result<Value, CodecError> {
        let codec = self
            .codec(name)
            .ok_or_else(|| DecodeError::Unregistered(name.to_owned()))?;
        let node = backend.from_backend(backend.parse(bytes)?)?;
        Ok(codec.decode(&node)?)
    }
}

/// Encoder/decoder pair of one registered type, bound to its registry.
#[derive(Debug, Clone, Copy)]
pub struct TypeCodec<'a> {
    registry: &'a Registry,
    entry: &'a TypeEntry,
}

impl<'a> TypeCodec<'a> {
    pub fn descriptor(&self) -> &'a TypeDescriptor {
        self.entry.descriptor()
    }

    pub fn encode(&self, value: &Value) -> Result<JsonNode, EncodeError> {
        self.encode_with(value, &EncodeOptions::default())
    }

    pub fn encode_with(&self, value: &Value, opts: &EncodeOptions) -> Result<JsonNode, EncodeError> {
        self.entry.encoder().encode(value, &*self.registry.inner, opts)
    }

    pub fn decode(&self, node: &JsonNode) -> Result<Value, DecodeError> {
        self.decode_with(node, &DecodeOptions::default())
    }

    pub fn decode_with(&self, node: &JsonNode, opts: &DecodeOptions) -> Result<Value, DecodeError> {
        self.entry.decoder().decode(node, &*self.registry.inner, opts)
    }
}
