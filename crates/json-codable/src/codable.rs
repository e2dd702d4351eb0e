//! The [`Codable`] trait: how a Rust type describes itself to the engine.
//!
//! Implementations are normally generated by `#[derive(Codable)]`; the impls
//! here cover std scalars, strings, smart pointers, options, sequences and
//! string-keyed maps.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::hash::BuildHasher;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::descriptor::{Kind, PrimitiveKind};
use crate::error::{DecodeError, RegistryError};
use crate::node::JsonNode;
use crate::registry::RegistryBuilder;
use crate::value::Value;

pub trait Codable: Sized + 'static {
    /// Shape of this type when used as a field.
    fn kind() -> Kind;

    /// Registers the descriptors this type needs, its own included.
    /// Must be idempotent; the default registers nothing.
    fn register(registry: &mut RegistryBuilder) -> Result<(), RegistryError> {
        let _ = registry;
        Ok(())
    }

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, DecodeError>;
}

macro_rules! codable_int {
    ($($t:ty => $kind:ident),* $(,)?) => {
        $(
            impl Codable for $t {
                fn kind() -> Kind {
                    Kind::Primitive(PrimitiveKind::$kind)
                }

                fn to_value(&self) -> Value {
                    Value::Int(*self as i128)
                }

                fn from_value(value: Value) -> Result<Self, DecodeError> {
                    match value {
                        Value::Int(i) => <$t>::try_from(i).map_err(|_| DecodeError::NumericRange {
                            value: i.to_string(),
                            target: stringify!($t),
                        }),
                        other => Err(DecodeError::mismatch(stringify!($t), other.kind_name())),
                    }
                }
            }
        )*
    };
}

codable_int!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    i128 => I128,
    isize => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => U64,
);

impl Codable for f64 {
    fn kind() -> Kind {
        Kind::Primitive(PrimitiveKind::F64)
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            other => Err(DecodeError::mismatch("f64", other.kind_name())),
        }
    }
}

impl Codable for f32 {
    fn kind() -> Kind {
        Kind::Primitive(PrimitiveKind::F32)
    }

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Float(f) => Ok(f as f32),
            Value::Int(i) => Ok(i as f32),
            other => Err(DecodeError::mismatch("f32", other.kind_name())),
        }
    }
}

impl Codable for bool {
    fn kind() -> Kind {
        Kind::bool()
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(DecodeError::mismatch("bool", other.kind_name())),
        }
    }
}

impl Codable for String {
    fn kind() -> Kind {
        Kind::string()
    }

    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        value.into_str()
    }
}

impl Codable for char {
    fn kind() -> Kind {
        Kind::Primitive(PrimitiveKind::Char)
    }

    fn to_value(&self) -> Value {
        Value::Str(self.to_string())
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        let s = value.into_str()?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(DecodeError::mismatch("char", "string")),
        }
    }
}

impl Codable for JsonNode {
    fn kind() -> Kind {
        Kind::Any
    }

    fn to_value(&self) -> Value {
        Value::Node(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Node(node) => Ok(node),
            other => Err(DecodeError::mismatch("json", other.kind_name())),
        }
    }
}

impl<T: Codable> Codable for Option<T> {
    fn kind() -> Kind {
        Kind::optional(T::kind())
    }

    fn register(registry: &mut RegistryBuilder) -> Result<(), RegistryError> {
        T::register(registry)
    }

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Absent,
        }
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Absent => Ok(None),
            present => T::from_value(present).map(Some),
        }
    }
}

macro_rules! codable_pointer {
    ($($ptr:ident),*) => {
        $(
            impl<T: Codable> Codable for $ptr<T> {
                fn kind() -> Kind {
                    T::kind()
                }

                fn register(registry: &mut RegistryBuilder) -> Result<(), RegistryError> {
                    T::register(registry)
                }

                fn to_value(&self) -> Value {
                    (**self).to_value()
                }

                fn from_value(value: Value) -> Result<Self, DecodeError> {
                    T::from_value(value).map($ptr::new)
                }
            }
        )*
    };
}

codable_pointer!(Box, Rc, Arc);

fn seq_from_value<T: Codable, C: FromIterator<T>>(value: Value) -> Result<C, DecodeError> {
    value
        .into_seq()?
        .into_iter()
        .enumerate()
        .map(|(i, v)| T::from_value(v).map_err(|e| DecodeError::ElementError(i, Box::new(e))))
        .collect()
}

macro_rules! codable_seq {
    ($($seq:ident),*) => {
        $(
            impl<T: Codable> Codable for $seq<T> {
                fn kind() -> Kind {
                    Kind::list(T::kind())
                }

                fn register(registry: &mut RegistryBuilder) -> Result<(), RegistryError> {
                    T::register(registry)
                }

                fn to_value(&self) -> Value {
                    Value::Seq(self.iter().map(Codable::to_value).collect())
                }

                fn from_value(value: Value) -> Result<Self, DecodeError> {
                    seq_from_value(value)
                }
            }
        )*
    };
}

codable_seq!(Vec, VecDeque);

fn entries_from_value<T: Codable>(value: Value) -> Result<Vec<(String, T)>, DecodeError> {
    value
        .into_map()?
        .into_iter()
        .map(|(k, v)| match T::from_value(v) {
            Ok(v) => Ok((k, v)),
            Err(e) => Err(DecodeError::EntryError(k, Box::new(e))),
        })
        .collect()
}

impl<T: Codable> Codable for BTreeMap<String, T> {
    fn kind() -> Kind {
        Kind::map(T::kind())
    }

    fn register(registry: &mut RegistryBuilder) -> Result<(), RegistryError> {
        T::register(registry)
    }

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        Ok(entries_from_value(value)?.into_iter().collect())
    }
}

impl<T: Codable> Codable for IndexMap<String, T> {
    fn kind() -> Kind {
        Kind::map(T::kind())
    }

    fn register(registry: &mut RegistryBuilder) -> Result<(), RegistryError> {
        T::register(registry)
    }

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        Ok(entries_from_value(value)?.into_iter().collect())
    }
}

impl<T: Codable, S: BuildHasher + Default + 'static> Codable for HashMap<String, T, S> {
    fn kind() -> Kind {
        Kind::map(T::kind())
    }

    fn register(registry: &mut RegistryBuilder) -> Result<(), RegistryError> {
        T::register(registry)
    }

    /// Entries are sorted by key so output does not depend on hash order.
    fn to_value(&self) -> Value {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        Value::Map(entries.into_iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        Ok(entries_from_value(value)?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_of_std_types() {
        assert_eq!(u16::kind(), Kind::Primitive(PrimitiveKind::U16));
        assert_eq!(usize::kind(), Kind::Primitive(PrimitiveKind::U64));
        assert_eq!(
            Option::<Vec<String>>::kind(),
            Kind::optional(Kind::list(Kind::string()))
        );
        assert_eq!(
            BTreeMap::<String, Box<f32>>::kind(),
            Kind::map(Kind::Primitive(PrimitiveKind::F32))
        );
        assert_eq!(JsonNode::kind(), Kind::Any);
    }

    #[test]
    fn option_maps_to_absent() {
        assert_eq!(None::<u8>.to_value(), Value::Absent);
        assert_eq!(Option::<u8>::from_value(Value::Absent).unwrap(), None);
        assert_eq!(Option::<u8>::from_value(Value::Int(4)).unwrap(), Some(4));
    }

    #[test]
    fn sequence_errors_carry_the_index() {
        let value = Value::Seq(vec![Value::Int(1), Value::Int(2), Value::Int(300)]);
        let err = Vec::<u8>::from_value(value).unwrap_err();
        assert!(matches!(err, DecodeError::ElementError(2, _)));

        let err = Vec::<u8>::from_value(Value::Bool(true)).unwrap_err();
        assert_eq!(err, DecodeError::mismatch("sequence", "bool"));
    }

    #[test]
    fn hash_map_output_is_sorted() {
        let mut m = HashMap::new();
        for k in ["d", "a", "c", "b"] {
            m.insert(k.to_owned(), 1u8);
        }
        let Value::Map(entries) = m.to_value() else {
            panic!("expected a map");
        };
        assert_eq!(entries.keys().collect::<Vec<_>>(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn char_needs_one_scalar() {
        assert_eq!(char::from_value(Value::from("ß")).unwrap(), 'ß');
        assert!(char::from_value(Value::from("ab")).is_err());
    }
}
