//! [`JsonNode`]: the backend-neutral JSON value the engine produces and consumes.
//!
//! Every backend adapter translates its own tree into this model, so the engine
//! never sees backend-specific number categories or key ordering rules.

use std::fmt;

use indexmap::IndexMap;

/// Ordered JSON object. Keys are unique and keep insertion order.
pub type JsonObject = IndexMap<String, JsonNode>;

/// 2^53, the largest magnitude at which every integer is exactly an `f64`.
pub(crate) const MAX_SAFE_INTEGER: i128 = 9_007_199_254_740_992;

/// Backend-neutral JSON value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JsonNode {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<JsonNode>),
    Object(JsonObject),
}

impl JsonNode {
    /// Short name of the node category, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[JsonNode]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&JsonObject> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Object member lookup; `None` for missing keys and non-objects.
    pub fn get(&self, key: &str) -> Option<&JsonNode> {
        self.as_object().and_then(|obj| obj.get(key))
    }

    /// Object keys in insertion order (empty for non-objects).
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Self::Object(obj) => obj.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

impl From<bool> for JsonNode {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for JsonNode {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for JsonNode {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Number> for JsonNode {
    fn from(n: Number) -> Self {
        Self::Number(n)
    }
}

impl From<Vec<JsonNode>> for JsonNode {
    fn from(items: Vec<JsonNode>) -> Self {
        Self::Array(items)
    }
}

impl From<JsonObject> for JsonNode {
    fn from(obj: JsonObject) -> Self {
        Self::Object(obj)
    }
}

macro_rules! node_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for JsonNode {
                fn from(v: $t) -> Self {
                    Self::Number(Number::from(v))
                }
            }
        )*
    };
}

node_from_int!(i8, i16, i32, i64, i128, u8, u16, u32, u64);

// -------------------------------------------------------------------------
// Number

/// Canonical JSON number.
///
/// Integers are kept exactly (up to 128 bits). Finite floats that hold an
/// integral value below 2^53 are stored as integers, so `1`, `1.0` and a CBOR
/// half-float `1.0` all compare equal no matter which backend produced them.
/// `-0.0` stays a float to keep its sign.
#[derive(Debug, Clone, Copy)]
pub struct Number(N);

#[derive(Debug, Clone, Copy)]
enum N {
    Int(i128),
    Float(f64),
}

impl Number {
    pub fn from_i128(i: i128) -> Self {
        Self(N::Int(i))
    }

    /// Returns `None` for NaN and infinities, which JSON cannot carry.
    pub fn from_f64(f: f64) -> Option<Self> {
        if !f.is_finite() {
            return None;
        }
        let negative_zero = f == 0.0 && f.is_sign_negative();
        if f.fract() == 0.0 && f.abs() < MAX_SAFE_INTEGER as f64 && !negative_zero {
            return Some(Self(N::Int(f as i128)));
        }
        Some(Self(N::Float(f)))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.0, N::Int(_))
    }

    /// Exact integer value, `None` for non-integral numbers.
    pub fn as_i128(&self) -> Option<i128> {
        match self.0 {
            N::Int(i) => Some(i),
            N::Float(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_i128().and_then(|i| i64::try_from(i).ok())
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.as_i128().and_then(|i| u64::try_from(i).ok())
    }

    /// Nearest `f64`. Integers beyond 2^53 round.
    pub fn as_f64(&self) -> f64 {
        match self.0 {
            N::Int(i) => i as f64,
            N::Float(f) => f,
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self.0, other.0) {
            (N::Int(a), N::Int(b)) => a == b,
            (N::Float(a), N::Float(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            N::Int(i) => write!(f, "{}", i),
            N::Float(v) => write!(f, "{}", v),
        }
    }
}

macro_rules! number_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Number {
                fn from(v: $t) -> Self {
                    Self(N::Int(i128::from(v)))
                }
            }
        )*
    };
}

number_from_int!(i8, i16, i32, i64, i128, u8, u16, u32, u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_floats_are_canonical_integers() {
        assert_eq!(Number::from_f64(1.0), Some(Number::from(1)));
        assert_eq!(Number::from_f64(-42.0), Some(Number::from(-42)));
        assert!(Number::from_f64(1.5).is_some_and(|n| !n.is_integer()));
    }

    #[test]
    fn large_floats_stay_floats() {
        let n = Number::from_f64(1e300).unwrap();
        assert!(!n.is_integer());
        assert_eq!(n.as_f64(), 1e300);
    }

    #[test]
    fn negative_zero_keeps_sign() {
        let n = Number::from_f64(-0.0).unwrap();
        assert!(!n.is_integer());
        assert!(n.as_f64().is_sign_negative());
    }

    #[test]
    fn non_finite_is_rejected() {
        assert!(Number::from_f64(f64::NAN).is_none());
        assert!(Number::from_f64(f64::INFINITY).is_none());
    }

    #[test]
    fn integer_accessors_check_range() {
        let big = Number::from(u64::MAX);
        assert_eq!(big.as_u64(), Some(u64::MAX));
        assert_eq!(big.as_i64(), None);
        assert_eq!(Number::from(-1).as_u64(), None);
    }

    #[test]
    fn node_helpers() {
        let mut obj = JsonObject::new();
        obj.insert("b".into(), JsonNode::from(1u8));
        obj.insert("a".into(), JsonNode::from("x"));
        let node = JsonNode::Object(obj);
        assert_eq!(node.keys(), vec!["b", "a"]);
        assert_eq!(node.get("a").and_then(JsonNode::as_str), Some("x"));
        assert_eq!(node.kind_name(), "object");
        assert!(node.get("zzz").is_none());
    }
}
