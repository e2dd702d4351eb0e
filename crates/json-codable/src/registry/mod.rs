//! Type and variant registry.
//!
//! Registration happens on a [`RegistryBuilder`] (exclusive, `&mut self`).
//! Every type name owns a slot; a slot referenced before its type is
//! registered stays pending, which is what lets mutually recursive types
//! resolve without eager construction. [`RegistryBuilder::seal`] checks the
//! whole graph and produces an immutable [`Registry`] whose reads take no lock.

mod builder;
mod sealed;
mod variants;

use std::fmt;

pub use builder::RegistryBuilder;
pub use sealed::{Registry, TypeCodec};
pub use variants::{VariantEntry, VariantTable};

use crate::descriptor::TypeDescriptor;
use crate::engine::{Decoder, Encoder};

/// Index of a type in the registry's slot table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u32);

impl SlotId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A registered type: its descriptor and the codec derived from it.
#[derive(Debug)]
pub struct TypeEntry {
    descriptor: TypeDescriptor,
    encoder: Encoder,
    decoder: Decoder,
}

impl TypeEntry {
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }
}
