//! `json-codable`: reflection-free JSON codec derivation.
//!
//! A [`TypeDescriptor`] states a type's shape: its fields, their JSON keys,
//! optionality, custom coders and access rules. The [`registry`] resolves
//! each field to a [`CodingStrategy`] once and derives an
//! [`Encoder`]/[`Decoder`] pair per type. Those work on the backend-neutral
//! [`JsonNode`] tree; a [`Backend`] turns that tree into bytes.
//!
//! Rust types take part through [`Codable`], usually derived:
//!
//! ```ignore
//! use json_codable::{Codable, RegistryBuilder, SerdeJsonBackend};
//!
//! #[derive(Codable, Debug, PartialEq)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//!     #[codable(rename = "label")]
//!     name: Option<String>,
//! }
//!
//! let mut builder = RegistryBuilder::new();
//! builder.register_type::<Point>()?;
//! let registry = builder.seal()?;
//! let bytes = registry.encode(&Point { x: 1, y: 2, name: None }, &SerdeJsonBackend::default())?;
//! assert_eq!(bytes, br#"{"x":1,"y":2}"#);
//! ```

extern crate self as json_codable;

pub mod backend;
pub mod codable;
pub mod descriptor;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod global;
pub mod node;
pub mod path;
pub mod registry;
pub mod strategy;
pub mod value;

pub use backend::{Backend, CborBackend, SerdeJsonBackend};
pub use codable::Codable;
pub use descriptor::{
    coder_fn, AccessRule, CoderRef, FieldAccess, FieldCoder, FieldDescriptor, Kind, PrimitiveKind,
    TypeDescriptor, TypeShape, UnknownKeys,
};
pub use diagnostics::{Diagnostic, Diagnostics, Problem, Severity};
pub use engine::{derive, CodecTable, DecodeOptions, Decoder, EncodeOptions, Encoder, TypePlan};
pub use error::{BackendError, CodecError, DecodeError, DescriptorError, EncodeError, RegistryError};
pub use node::{JsonNode, JsonObject, Number};
pub use registry::{Registry, RegistryBuilder, SlotId, TypeCodec, TypeEntry};
pub use strategy::{CodingStrategy, TypeRef, TypeResolver};
pub use value::{Record, RecordReader, Value, Variant};

#[cfg(feature = "derive")]
pub use json_codable_derive::Codable;
