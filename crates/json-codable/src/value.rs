//! [`Value`]: the typed-value model the engine encodes from and decodes into.
//!
//! `Codable` implementations convert Rust values to and from this model; the
//! engine maps it to [`JsonNode`](crate::JsonNode) under a type's descriptor.
//! A [`Record`] is positional: one entry per declared field, in declaration
//! order, so key naming and omission rules live in the descriptor alone.

use indexmap::IndexMap;

use crate::codable::Codable;
use crate::error::DecodeError;
use crate::node::JsonNode;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value: an empty optional, a defaulted field left out, or an ignored field.
    #[default]
    Absent,
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(String),
    Seq(Vec<Value>),
    Map(IndexMap<String, Value>),
    Record(Record),
    Variant(Variant),
    /// Raw JSON passed through untouched (`Kind::Any`).
    Node(JsonNode),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Seq(_) => "sequence",
            Self::Map(_) => "map",
            Self::Record(_) => "record",
            Self::Variant(_) => "variant",
            Self::Node(_) => "json",
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn record(fields: Vec<Value>) -> Self {
        Self::Record(Record::new(fields))
    }

    pub fn variant(tag: impl Into<String>, record: Record) -> Self {
        Self::Variant(Variant::new(tag, record))
    }

    pub fn into_record(self) -> Result<Record, DecodeError> {
        match self {
            Self::Record(record) => Ok(record),
            other => Err(DecodeError::mismatch("record", other.kind_name())),
        }
    }

    pub fn into_variant(self) -> Result<Variant, DecodeError> {
        match self {
            Self::Variant(variant) => Ok(variant),
            other => Err(DecodeError::mismatch("variant", other.kind_name())),
        }
    }

    pub fn into_seq(self) -> Result<Vec<Value>, DecodeError> {
        match self {
            Self::Seq(items) => Ok(items),
            other => Err(DecodeError::mismatch("sequence", other.kind_name())),
        }
    }

    pub fn into_map(self) -> Result<IndexMap<String, Value>, DecodeError> {
        match self {
            Self::Map(entries) => Ok(entries),
            other => Err(DecodeError::mismatch("map", other.kind_name())),
        }
    }

    pub fn into_str(self) -> Result<String, DecodeError> {
        match self {
            Self::Str(s) => Ok(s),
            other => Err(DecodeError::mismatch("string", other.kind_name())),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Self::Int(i128::from(v))
                }
            }
        )*
    };
}

value_from_int!(i8, i16, i32, i64, i128, u8, u16, u32, u64);

/// Field values of one record, positional in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<Value>,
}

impl Record {
    pub fn new(fields: Vec<Value>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.fields.get(index)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn into_fields(self) -> Vec<Value> {
        self.fields
    }
}

/// One concrete variant of a polymorphic base, selected by its discriminator value.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    tag: String,
    record: Record,
}

impl Variant {
    pub fn new(tag: impl Into<String>, record: Record) -> Self {
        Self {
            tag: tag.into(),
            record,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn into_parts(self) -> (String, Record) {
        (self.tag, self.record)
    }
}

/// Sequential reader over a decoded record, used by derived `from_value`.
pub struct RecordReader {
    fields: std::vec::IntoIter<Value>,
}

impl RecordReader {
    pub fn new(value: Value) -> Result<Self, DecodeError> {
        let record = value.into_record()?;
        Ok(Self {
            fields: record.into_fields().into_iter(),
        })
    }

    fn next_value(&mut self) -> Value {
        self.fields.next().unwrap_or(Value::Absent)
    }

    /// Reads the next field. An absent value for a non-optional type is a missing field.
    pub fn read<T: Codable>(&mut self, member: &str) -> Result<T, DecodeError> {
        let value = self.next_value();
        if value.is_absent() && !T::kind().is_optional() {
            return Err(DecodeError::MissingField(member.to_owned()));
        }
        T::from_value(value).map_err(|e| e.in_field(member))
    }

    /// Reads the next field, substituting `Default` when it is absent.
    pub fn read_or_default<T: Codable + Default>(&mut self, member: &str) -> Result<T, DecodeError> {
        match self.next_value() {
            Value::Absent => Ok(T::default()),
            value => T::from_value(value).map_err(|e| e.in_field(member)),
        }
    }

    /// Skips an ignored field and yields its default.
    pub fn skip<T: Default>(&mut self) -> T {
        self.fields.next();
        T::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_reads_positionally() {
        let value = Value::record(vec![
            Value::from("ada"),
            Value::Absent,
            Value::from(36u32),
            Value::Absent,
        ]);
        let mut reader = RecordReader::new(value).unwrap();
        let name: String = reader.read("name").unwrap();
        let nick: Option<String> = reader.read("nick").unwrap();
        let age: u32 = reader.read("age").unwrap();
        let cache: Vec<u8> = reader.skip();
        assert_eq!(name, "ada");
        assert_eq!(nick, None);
        assert_eq!(age, 36);
        assert!(cache.is_empty());
    }

    #[test]
    fn reader_reports_missing_required() {
        let mut reader = RecordReader::new(Value::record(vec![Value::Absent])).unwrap();
        let err = reader.read::<String>("name").unwrap_err();
        assert_eq!(err, DecodeError::MissingField("name".into()));
    }

    #[test]
    fn reader_defaults_absent_fields() {
        let mut reader = RecordReader::new(Value::record(vec![])).unwrap();
        let n: u16 = reader.read_or_default("n").unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn reader_requires_a_record() {
        let err = RecordReader::new(Value::from(true)).err().unwrap();
        assert_eq!(
            err,
            DecodeError::TypeMismatch {
                expected: "record",
                found: "bool"
            }
        );
    }
}
