//! Process-wide registry.
//!
//! Registration goes into one shared [`RegistryBuilder`] behind a mutex. The
//! first query seals it; from then on reads go through a `OnceLock` without
//! locking and every registration call fails with [`RegistryError::Sealed`].
//! A seal that fails leaves the builder open so the caller can fix it up.

use std::sync::OnceLock;

use parking_lot::Mutex;
use tracing::debug;

use crate::backend::{Backend, SerdeJsonBackend};
use crate::codable::Codable;
use crate::descriptor::TypeDescriptor;
use crate::diagnostics::Diagnostics;
use crate::error::{BackendError, CodecError, RegistryError};
use crate::registry::{Registry, RegistryBuilder};

static BUILDER: Mutex<Option<RegistryBuilder>> = Mutex::new(None);
static SEALED: OnceLock<Registry> = OnceLock::new();

fn with_builder<R>(f: impl FnOnce(&mut RegistryBuilder) -> Result<R, RegistryError>) -> Result<R, RegistryError> {
    let mut guard = BUILDER.lock();
    if SEALED.get().is_some() {
        return Err(RegistryError::Sealed);
    }
    f(guard.get_or_insert_with(RegistryBuilder::new))
}

/// Registers `T` and every type it references.
pub fn register<T: Codable>() -> Result<(), RegistryError> {
    with_builder(|b| b.register_type::<T>())
}

pub fn register_descriptor(descriptor: TypeDescriptor) -> Result<(), RegistryError> {
    with_builder(|b| b.register(descriptor).map(drop))
}

pub fn register_variant(base: &str, tag: &str, variant: &str) -> Result<(), RegistryError> {
    with_builder(|b| b.register_variant(base, tag, variant))
}

pub fn is_sealed() -> bool {
    SEALED.get().is_some()
}

/// The sealed registry, sealing it on first call.
pub fn registry() -> Result<&'static Registry, Diagnostics> {
    if let Some(registry) = SEALED.get() {
        return Ok(registry);
    }
    let guard = BUILDER.lock();
    if let Some(registry) = SEALED.get() {
        return Ok(registry);
    }
    let registry = match guard.as_ref() {
        Some(builder) => builder.seal()?,
        None => RegistryBuilder::new().seal()?,
    };
    debug!("sealed process-wide registry");
    Ok(SEALED.get_or_init(|| registry))
}

pub fn encode<T: Codable, B: Backend>(value: &T, backend: &B) -> Result<Vec<u8>, CodecError> {
    registry()?.encode(value, backend)
}

pub fn decode<T: Codable, B: Backend>(bytes: &[u8], backend: &B) -> Result<T, CodecError> {
    registry()?.decode(bytes, backend)
}

/// Compact JSON text through [`SerdeJsonBackend`].
pub fn to_json_string<T: Codable>(value: &T) -> Result<String, CodecError> {
    let bytes = encode(value, &SerdeJsonBackend::default())?;
    String::from_utf8(bytes).map_err(|e| {
        CodecError::Backend(BackendError::Serialize {
            backend: "serde_json",
            message: e.to_string(),
        })
    })
}

pub fn from_json_str<T: Codable>(text: &str) -> Result<T, CodecError> {
    decode(text.as_bytes(), &SerdeJsonBackend::default())
}
