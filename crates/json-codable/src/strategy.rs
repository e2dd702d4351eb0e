//! Coding Strategy Resolver.
//!
//! Turns a field's declared [`Kind`] into a [`CodingStrategy`]: the resolved
//! plan the engine runs without looking at the descriptor again. References to
//! other types are bound to registry slots through a [`TypeResolver`], so a
//! strategy can point at a type whose codec does not exist yet (mutual
//! recursion resolves lazily, by slot index).

use std::fmt;

use crate::descriptor::{CoderRef, FieldDescriptor, Kind, PrimitiveKind};
use crate::registry::SlotId;

/// A type bound to its registry slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    pub name: String,
    pub slot: SlotId,
}

#[derive(Debug, Clone)]
pub enum CodingStrategy {
    Direct(PrimitiveKind),
    Any,
    Nested(TypeRef),
    Collection(Box<CodingStrategy>),
    Map(Box<CodingStrategy>),
    Optional(Box<CodingStrategy>),
    Polymorphic(TypeRef),
    Custom(CoderRef),
}

impl CodingStrategy {
    /// Human-readable form, e.g. `list<optional<i32>>`.
    pub fn describe(&self) -> String {
        self.to_string()
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional(_))
    }
}

impl fmt::Display for CodingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(p) => f.write_str(p.name()),
            Self::Any => f.write_str("any"),
            Self::Nested(r) => f.write_str(&r.name),
            Self::Collection(el) => write!(f, "list<{}>", el),
            Self::Map(v) => write!(f, "map<{}>", v),
            Self::Optional(inner) => write!(f, "optional<{}>", inner),
            Self::Polymorphic(r) => write!(f, "poly<{}>", r.name),
            Self::Custom(_) => f.write_str("custom"),
        }
    }
}

/// Binds type names to registry slots.
pub trait TypeResolver {
    /// Slot of `name`, or `None` when this resolver cannot bind it.
    fn resolve_type(&mut self, name: &str) -> Option<SlotId>;
}

/// A referenced type could not be bound to a slot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("type `{0}` is not registered")]
pub struct UnresolvedType(pub String);

pub fn resolve(kind: &Kind, resolver: &mut dyn TypeResolver) -> Result<CodingStrategy, UnresolvedType> {
    let strategy = match kind {
        Kind::Primitive(p) => CodingStrategy::Direct(*p),
        Kind::Any => CodingStrategy::Any,
        Kind::Nested(name) => CodingStrategy::Nested(bind(name, resolver)?),
        Kind::Polymorphic(name) => CodingStrategy::Polymorphic(bind(name, resolver)?),
        Kind::Collection(el) => CodingStrategy::Collection(Box::new(resolve(el, resolver)?)),
        Kind::Map(v) => CodingStrategy::Map(Box::new(resolve(v, resolver)?)),
        Kind::Optional(inner) => CodingStrategy::Optional(Box::new(resolve(inner, resolver)?)),
    };
    Ok(strategy)
}

/// Strategy of one field. A custom coder replaces the resolved strategy but
/// keeps the optional wrapper, so absent values are still omitted.
pub fn resolve_field(
    field: &FieldDescriptor,
    resolver: &mut dyn TypeResolver,
) -> Result<CodingStrategy, UnresolvedType> {
    match field.coder() {
        Some(coder) if field.kind().is_optional() => Ok(CodingStrategy::Optional(Box::new(
            CodingStrategy::Custom(coder.clone()),
        ))),
        Some(coder) => Ok(CodingStrategy::Custom(coder.clone())),
        None => resolve(field.kind(), resolver),
    }
}

fn bind(name: &str, resolver: &mut dyn TypeResolver) -> Result<TypeRef, UnresolvedType> {
    let slot = resolver
        .resolve_type(name)
        .ok_or_else(|| UnresolvedType(name.to_owned()))?;
    Ok(TypeRef {
        name: name.to_owned(),
        slot,
    })
}

/// Rejects kinds no strategy exists for.
///
/// `Optional(Optional(_))` has no JSON encoding that keeps the two absent
/// states apart. Empty type names cannot be bound.
pub fn check_shape(kind: &Kind) -> Result<(), String> {
    match kind {
        Kind::Optional(inner) if inner.is_optional() => Err("optional of optional".into()),
        Kind::Nested(name) | Kind::Polymorphic(name) if name.is_empty() => {
            Err("empty type reference".into())
        }
        Kind::Optional(inner) | Kind::Collection(inner) | Kind::Map(inner) => check_shape(inner),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    struct Table(HashMap<String, SlotId>);

    impl TypeResolver for Table {
        fn resolve_type(&mut self, name: &str) -> Option<SlotId> {
            let next = SlotId::new(self.0.len());
            Some(*self.0.entry(name.to_owned()).or_insert(next))
        }
    }

    struct Nothing;

    impl TypeResolver for Nothing {
        fn resolve_type(&mut self, _name: &str) -> Option<SlotId> {
            None
        }
    }

    #[test]
    fn resolves_nested_wrappers() {
        let kind = Kind::list(Kind::optional(Kind::primitive(PrimitiveKind::I32)));
        let s = resolve(&kind, &mut Table::default()).unwrap();
        assert_eq!(s.describe(), "list<optional<i32>>");

        let kind = Kind::map(Kind::polymorphic("Shape"));
        let s = resolve(&kind, &mut Table::default()).unwrap();
        assert_eq!(s.describe(), "map<poly<Shape>>");
    }

    #[test]
    fn references_share_slots() {
        let mut table = Table::default();
        let a = resolve(&Kind::nested("Node"), &mut table).unwrap();
        let b = resolve(&Kind::list(Kind::nested("Node")), &mut table).unwrap();
        match (a, b) {
            (CodingStrategy::Nested(a), CodingStrategy::Collection(inner)) => match *inner {
                CodingStrategy::Nested(b) => assert_eq!(a.slot, b.slot),
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unbound_reference_is_reported() {
        let err = resolve(&Kind::optional(Kind::nested("Ghost")), &mut Nothing).unwrap_err();
        assert_eq!(err, UnresolvedType("Ghost".into()));
    }

    #[test]
    fn custom_coder_keeps_optional_wrapper() {
        use crate::descriptor::coder_fn;
        use crate::node::JsonNode;
        use crate::value::Value;

        let coder = coder_fn("null", |_| Ok(JsonNode::Null), |_| Ok(Value::Absent));
        let field = FieldDescriptor::new("x", Kind::optional(Kind::string())).with_coder(coder);
        let s = resolve_field(&field, &mut Nothing).unwrap();
        assert_eq!(s.describe(), "optional<custom>");
    }

    #[test]
    fn check_shape_rejects_double_optional_anywhere() {
        let bad = Kind::list(Kind::optional(Kind::optional(Kind::bool())));
        assert!(check_shape(&bad).is_err());
        assert!(check_shape(&Kind::list(Kind::optional(Kind::bool()))).is_ok());
        assert!(check_shape(&Kind::nested("")).is_err());
    }
}
