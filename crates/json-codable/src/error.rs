//! Error taxonomy.
//!
//! Registration-time failures (`DescriptorError`, `RegistryError`) abort the
//! registration of one type or variant. Runtime failures (`DecodeError`,
//! `EncodeError`, `BackendError`) are returned to the caller and never leave a
//! partially built value behind.

use thiserror::Error;

use crate::diagnostics::Diagnostics;
use crate::path::{format_pointer, PathStep};
use crate::strategy::UnresolvedType;

/// A type description that cannot be turned into a codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("type name must not be empty")]
    EmptyTypeName,

    #[error("{type_name}: field `{member}` has an empty JSON key")]
    EmptyKey { type_name: String, member: String },

    #[error("{type_name}: member `{member}` is declared twice")]
    DuplicateMember { type_name: String, member: String },

    #[error("{type_name}: JSON key `{key}` of `{second}` collides with `{first}`")]
    KeyCollision {
        type_name: String,
        key: String,
        first: String,
        second: String,
    },

    #[error("{type_name}: field `{member}` has an unsupported shape: {reason}")]
    UnsupportedShape {
        type_name: String,
        member: String,
        reason: String,
    },

    #[error("{type_name}: polymorphic base types cannot declare fields")]
    FieldsOnPolymorphicBase { type_name: String },

    #[error("{type_name}: discriminator key must not be empty")]
    EmptyDiscriminatorKey { type_name: String },

    #[error("{type_name}: invalid enumeration: {reason}")]
    InvalidEnumeration { type_name: String, reason: String },
}

/// Registration-phase failures of the type and variant registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("type `{0}` is already registered with a different descriptor")]
    ConflictingType(String),

    #[error("discriminator `{tag}` of `{base}` is already bound to `{existing}`, cannot bind `{variant}`")]
    DuplicateDiscriminator {
        base: String,
        tag: String,
        existing: String,
        variant: String,
    },

    #[error("variant `{variant}` of `{base}` declares the discriminator key `{key}`")]
    DiscriminatorCollision {
        base: String,
        variant: String,
        key: String,
    },

    #[error("discriminator value for `{base}` must not be empty")]
    EmptyDiscriminatorValue { base: String },

    #[error("`{0}` is not a polymorphic base type")]
    NotPolymorphic(String),

    #[error("`{0}` is not a record type and cannot be a variant")]
    NotARecord(String),

    #[error(transparent)]
    Unresolved(#[from] UnresolvedType),

    #[error("the registry is sealed; no further registration is possible")]
    Sealed,
}

/// Failure to turn a JSON tree into a value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("unknown field `{0}`")]
    UnknownField(String),

    #[error("unknown variant `{0}`")]
    UnknownVariant(String),

    #[error("element {0}: {1}")]
    ElementError(usize, Box<DecodeError>),

    #[error("entry `{0}`: {1}")]
    EntryError(String, Box<DecodeError>),

    #[error("field `{0}`: {1}")]
    FieldError(String, Box<DecodeError>),

    #[error("number {value} is out of range for {target}")]
    NumericRange { value: String, target: &'static str },

    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("field `{0}` is not writable at this access level")]
    AccessDenied(String),

    #[error("custom coder failed: {0}")]
    CustomCoderFailure(String),

    #[error("input nests deeper than {0} levels")]
    DepthLimit(usize),

    #[error("type `{0}` is not registered")]
    Unregistered(String),
}

impl DecodeError {
    pub(crate) fn mismatch(expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch { expected, found }
    }

    pub(crate) fn in_field(self, key: &str) -> Self {
        Self::FieldError(key.to_owned(), Box::new(self))
    }

    /// The innermost error, with all location wrappers removed.
    pub fn root_cause(&self) -> &DecodeError {
        match self {
            Self::ElementError(_, cause) | Self::EntryError(_, cause) | Self::FieldError(_, cause) => {
                cause.root_cause()
            }
            other => other,
        }
    }

    /// JSON Pointer to the failing location.
    ///
    /// Missing, unknown and access-denied keys point at the key itself.
    pub fn path(&self) -> String {
        let mut steps = Vec::new();
        let mut current = self;
        loop {
            match current {
                Self::ElementError(i, cause) => {
                    steps.push(PathStep::Index(*i));
                    current = cause;
                }
                Self::EntryError(key, cause) | Self::FieldError(key, cause) => {
                    steps.push(PathStep::Key(key.clone()));
                    current = cause;
                }
                Self::MissingField(key) | Self::UnknownField(key) | Self::AccessDenied(key) => {
                    steps.push(PathStep::Key(key.clone()));
                    break;
                }
                _ => break,
            }
        }
        format_pointer(&steps)
    }
}

/// Failure to turn a value into a JSON tree.
///
/// Values produced by `Codable` implementations for registered types only
/// reach `CustomCoderFailure` and `NonFiniteNumber`; the remaining variants
/// report hand-built dynamic values that do not match their descriptor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("custom coder at `{path}` failed: {message}")]
    CustomCoderFailure { path: String, message: String },

    #[error("non-finite number at `{path}`")]
    NonFiniteNumber { path: String },

    #[error("value at `{path}` does not match its descriptor: expected {expected}, found {found}")]
    ShapeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("variant `{tag}` at `{path}` is not registered for `{base}`")]
    UnregisteredVariant {
        path: String,
        base: String,
        tag: String,
    },

    #[error("type `{0}` is not registered")]
    Unregistered(String),
}

impl EncodeError {
    pub(crate) fn mismatch(expected: &'static str, found: &'static str) -> Self {
        Self::ShapeMismatch {
            path: String::new(),
            expected,
            found,
        }
    }

    /// Prepends a location step while the error travels outwards.
    pub(crate) fn within(mut self, step: PathStep) -> Self {
        let prefix = format_pointer(std::slice::from_ref(&step));
        match &mut self {
            Self::CustomCoderFailure { path, .. }
            | Self::NonFiniteNumber { path }
            | Self::ShapeMismatch { path, .. }
            | Self::UnregisteredVariant { path, .. } => path.insert_str(0, &prefix),
            Self::Unregistered(_) => {}
        }
        self
    }
}

/// Failure inside a backend adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("{backend}: parse failed: {message}")]
    Parse {
        backend: &'static str,
        message: String,
    },

    #[error("{backend}: serialization failed: {message}")]
    Serialize {
        backend: &'static str,
        message: String,
    },

    #[error("{backend}: number {value} is outside the representable range")]
    NumberOutOfRange {
        backend: &'static str,
        value: String,
    },

    #[error("{backend}: non-finite numbers have no JSON representation")]
    NonFiniteNumber { backend: &'static str },

    #[error("{backend}: object keys must be strings")]
    NonStringKey { backend: &'static str },

    #[error("{backend}: duplicate object key `{key}`")]
    DuplicateKey { backend: &'static str, key: String },

    #[error("{backend}: {what} values have no JSON representation")]
    Unsupported {
        backend: &'static str,
        what: &'static str,
    },
}

/// Umbrella error of the byte-level encode/decode surface.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Seal(#[from] Diagnostics),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_path_follows_wrappers() {
        let err = DecodeError::FieldError(
            "items".into(),
            Box::new(DecodeError::ElementError(
                2,
                Box::new(DecodeError::MissingField("na/me".into())),
            )),
        );
        assert_eq!(err.path(), "/items/2/na~1me");
        assert_eq!(err.root_cause(), &DecodeError::MissingField("na/me".into()));
    }

    #[test]
    fn decode_path_of_leaf_mismatch_is_its_container() {
        let err = DecodeError::mismatch("string", "number").in_field("name");
        assert_eq!(err.path(), "/name");
        assert_eq!(err.to_string(), "field `name`: expected string, found number");
    }

    #[test]
    fn encode_path_is_built_outwards() {
        let err = EncodeError::mismatch("bool", "string")
            .within(PathStep::Key("flag".into()))
            .within(PathStep::Index(0))
            .within(PathStep::Key("rows".into()));
        match err {
            EncodeError::ShapeMismatch { path, .. } => assert_eq!(path, "/rows/0/flag"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
