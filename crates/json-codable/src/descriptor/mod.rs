//! Type Descriptor Model.
//!
//! A [`TypeDescriptor`] is the static description of one codable type, built
//! once at registration time and never mutated afterwards. It has one of three
//! shapes:
//!
//! - record: ordered [`FieldDescriptor`]s, each mapped to one JSON key,
//! - polymorphic base: a discriminator key; variants are bound in the registry,
//! - enumeration: ordered variant names, encoded as a JSON string.
//!
//! Construction goes through [`TypeDescriptorBuilder`], whose `build` rejects
//! every shape the engine cannot code (see [`DescriptorError`]).

mod access;
mod coder;
mod field;

use std::collections::{HashMap, HashSet};
use std::fmt;

pub use access::{AccessRule, FieldAccess};
pub use coder::{coder_fn, CoderRef, FieldCoder, FnCoder};
pub use field::FieldDescriptor;

use crate::error::DescriptorError;
use crate::strategy::check_shape;

/// Scalar shapes mapped directly onto a JSON bool, number or string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    I128,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Char,
    String,
}

impl PrimitiveKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::I128 => "i128",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Char => "char",
            Self::String => "string",
        }
    }

    /// Inclusive bounds of integer kinds.
    pub fn int_range(self) -> Option<(i128, i128)> {
        let range = match self {
            Self::I8 => (i8::MIN as i128, i8::MAX as i128),
            Self::I16 => (i16::MIN as i128, i16::MAX as i128),
            Self::I32 => (i32::MIN as i128, i32::MAX as i128),
            Self::I64 => (i64::MIN as i128, i64::MAX as i128),
            Self::I128 => (i128::MIN, i128::MAX),
            Self::U8 => (0, u8::MAX as i128),
            Self::U16 => (0, u16::MAX as i128),
            Self::U32 => (0, u32::MAX as i128),
            Self::U64 => (0, u64::MAX as i128),
            _ => return None,
        };
        Some(range)
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

/// Declared shape of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Kind {
    Primitive(PrimitiveKind),
    /// Another registered type, by name: a record or an enumeration.
    Nested(String),
    Collection(Box<Kind>),
    Optional(Box<Kind>),
    /// A polymorphic base type, by name.
    Polymorphic(String),
    /// JSON object with string keys and uniform values.
    Map(Box<Kind>),
    /// Raw JSON passed through as is.
    Any,
}

impl Kind {
    pub fn primitive(p: PrimitiveKind) -> Self {
        Self::Primitive(p)
    }

    pub fn bool() -> Self {
        Self::Primitive(PrimitiveKind::Bool)
    }

    pub fn string() -> Self {
        Self::Primitive(PrimitiveKind::String)
    }

    pub fn nested(type_name: impl Into<String>) -> Self {
        Self::Nested(type_name.into())
    }

    pub fn list(element: Kind) -> Self {
        Self::Collection(Box::new(element))
    }

    pub fn optional(inner: Kind) -> Self {
        Self::Optional(Box::new(inner))
    }

    pub fn polymorphic(base: impl Into<String>) -> Self {
        Self::Polymorphic(base.into())
    }

    pub fn map(value: Kind) -> Self {
        Self::Map(Box::new(value))
    }

    pub fn any() -> Self {
        Self::Any
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional(_))
    }

    /// Type named directly by this kind (not by its elements).
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::Nested(name) | Self::Polymorphic(name) => Some(name),
            _ => None,
        }
    }

    /// Type name reached through this kind and its wrappers, if any.
    pub fn referenced_type(&self) -> Option<&str> {
        match self {
            Self::Nested(name) | Self::Polymorphic(name) => Some(name),
            Self::Collection(inner) | Self::Optional(inner) | Self::Map(inner) => inner.referenced_type(),
            Self::Primitive(_) | Self::Any => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => f.write_str(p.name()),
            Self::Nested(name) | Self::Polymorphic(name) => f.write_str(name),
            Self::Collection(inner) => write!(f, "list of {inner}"),
            Self::Optional(inner) => write!(f, "optional {inner}"),
            Self::Map(inner) => write!(f, "map of {inner}"),
            Self::Any => f.write_str("any"),
        }
    }
}

/// What the decoder does with object keys no field claims.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownKeys {
    #[default]
    Ignore,
    Reject,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeShape {
    Record {
        fields: Vec<FieldDescriptor>,
        /// `None` defers to `DecodeOptions::unknown_keys`.
        unknown_keys: Option<UnknownKeys>,
    },
    Polymorphic {
        discriminator_key: String,
    },
    Enumeration {
        variants: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    name: String,
    shape: TypeShape,
}

impl TypeDescriptor {
    pub fn record(name: impl Into<String>) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder::new(name.into(), BuilderShape::Record)
    }

    pub fn polymorphic(name: impl Into<String>, discriminator_key: impl Into<String>) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder::new(name.into(), BuilderShape::Polymorphic(discriminator_key.into()))
    }

    pub fn enumeration(name: impl Into<String>) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder::new(name.into(), BuilderShape::Enumeration(Vec::new()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &TypeShape {
        &self.shape
    }

    /// Declared fields; empty for non-record shapes.
    pub fn fields(&self) -> &[FieldDescriptor] {
        match &self.shape {
            TypeShape::Record { fields, .. } => fields,
            _ => &[],
        }
    }

    pub fn field(&self, member: &str) -> Option<&FieldDescriptor> {
        self.fields().iter().find(|f| f.member() == member)
    }

    pub fn discriminator_key(&self) -> Option<&str> {
        match &self.shape {
            TypeShape::Polymorphic { discriminator_key } => Some(discriminator_key),
            _ => None,
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self.shape, TypeShape::Record { .. })
    }

    pub fn is_polymorphic(&self) -> bool {
        matches!(self.shape, TypeShape::Polymorphic { .. })
    }

    /// JSON keys emitted directly by this record, in declaration order.
    /// Flattened and ignored fields contribute none.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields()
            .iter()
            .filter(|f| !f.is_ignored() && !f.is_flattened())
            .map(FieldDescriptor::key)
    }
}

enum BuilderShape {
    Record,
    Polymorphic(String),
    Enumeration(Vec<String>),
}

/// Builder for [`TypeDescriptor`].
pub struct TypeDescriptorBuilder {
    name: String,
    shape: BuilderShape,
    fields: Vec<FieldDescriptor>,
    unknown_keys: Option<UnknownKeys>,
}

impl TypeDescriptorBuilder {
    fn new(name: String, shape: BuilderShape) -> Self {
        Self {
            name,
            shape,
            fields: Vec::new(),
            unknown_keys: None,
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Required field keyed by its member name.
    pub fn prop(self, member: impl Into<String>, kind: Kind) -> Self {
        self.field(FieldDescriptor::new(member, kind))
    }

    /// Optional field: `inner` is wrapped in `Kind::Optional`.
    pub fn opt(self, member: impl Into<String>, inner: Kind) -> Self {
        self.field(FieldDescriptor::new(member, Kind::optional(inner)))
    }

    pub fn variant(mut self, name: impl Into<String>) -> Self {
        if let BuilderShape::Enumeration(variants) = &mut self.shape {
            variants.push(name.into());
        }
        self
    }

    pub fn unknown_keys(mut self, mode: UnknownKeys) -> Self {
        self.unknown_keys = Some(mode);
        self
    }

    pub fn strict(self) -> Self {
        self.unknown_keys(UnknownKeys::Reject)
    }

    pub fn build(self) -> Result<TypeDescriptor, DescriptorError> {
        if self.name.is_empty() {
            return Err(DescriptorError::EmptyTypeName);
        }
        let shape = match self.shape {
            BuilderShape::Record => {
                validate_fields(&self.name, &self.fields)?;
                TypeShape::Record {
                    fields: self.fields,
                    unknown_keys: self.unknown_keys,
                }
            }
            BuilderShape::Polymorphic(discriminator_key) => {
                if !self.fields.is_empty() {
                    return Err(DescriptorError::FieldsOnPolymorphicBase { type_name: self.name });
                }
                if discriminator_key.is_empty() {
                    return Err(DescriptorError::EmptyDiscriminatorKey { type_name: self.name });
                }
                TypeShape::Polymorphic { discriminator_key }
            }
            BuilderShape::Enumeration(variants) => {
                validate_variants(&self.name, &variants)?;
                TypeShape::Enumeration { variants }
            }
        };
        Ok(TypeDescriptor { name: self.name, shape })
    }
}

fn validate_fields(type_name: &str, fields: &[FieldDescriptor]) -> Result<(), DescriptorError> {
    let unsupported = |member: &str, reason: String| DescriptorError::UnsupportedShape {
        type_name: type_name.to_owned(),
        member: member.to_owned(),
        reason,
    };

    let mut members = HashSet::new();
    let mut keys: HashMap<&str, &str> = HashMap::new();
    for field in fields {
        let member = field.member();
        if !members.insert(member) {
            return Err(DescriptorError::DuplicateMember {
                type_name: type_name.to_owned(),
                member: member.to_owned(),
            });
        }
        if field.key().is_empty() {
            return Err(DescriptorError::EmptyKey {
                type_name: type_name.to_owned(),
                member: member.to_owned(),
            });
        }
        check_shape(field.kind()).map_err(|reason| unsupported(member, reason))?;
        if field.kind().is_optional() && field.is_required() {
            return Err(unsupported(member, "optional field cannot be required".into()));
        }
        if field.is_ignored() {
            if field.coder().is_some() {
                return Err(unsupported(member, "ignored field cannot carry a custom coder".into()));
            }
            continue;
        }
        if field.is_flattened() {
            if !matches!(field.kind(), Kind::Nested(_)) {
                return Err(unsupported(member, "only nested record fields can be flattened".into()));
            }
            if field.coder().is_some() {
                return Err(unsupported(member, "flattened field cannot carry a custom coder".into()));
            }
            continue;
        }
        // first collision in declaration order is reported; never last-wins
        if let Some(first) = keys.insert(field.key(), member) {
            return Err(DescriptorError::KeyCollision {
                type_name: type_name.to_owned(),
                key: field.key().to_owned(),
                first: first.to_owned(),
                second: member.to_owned(),
            });
        }
    }
    Ok(())
}

fn validate_variants(type_name: &str, variants: &[String]) -> Result<(), DescriptorError> {
    let invalid = |reason: String| DescriptorError::InvalidEnumeration {
        type_name: type_name.to_owned(),
        reason,
    };
    if variants.is_empty() {
        return Err(invalid("no variants".into()));
    }
    let mut seen = HashSet::new();
    for v in variants {
        if v.is_empty() {
            return Err(invalid("empty variant name".into()));
        }
        if !seen.insert(v.as_str()) {
            return Err(invalid(format!("variant `{}` is declared twice", v)));
        }
    }
    Ok(())
}
