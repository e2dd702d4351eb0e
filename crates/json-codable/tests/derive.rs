//! Derived `Codable` types end to end through a sealed registry.

use std::collections::BTreeMap;

use json_codable::{
    coder_fn, CborBackend, Codable, CodecError, CoderRef, DecodeError, DecodeOptions, EncodeOptions, JsonNode, Registry,
    RegistryBuilder, SerdeJsonBackend, Value,
};
use serde_json::json;

fn registry_for<T: Codable>() -> Registry {
    let mut builder = RegistryBuilder::new();
    builder.register_type::<T>().unwrap();
    builder.seal().unwrap()
}

fn to_json<T: Codable>(registry: &Registry, value: &T) -> serde_json::Value {
    let bytes = registry.encode(value, &SerdeJsonBackend::default()).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn from_json<T: Codable>(registry: &Registry, value: serde_json::Value) -> Result<T, CodecError> {
    registry.decode(&serde_json::to_vec(&value).unwrap(), &SerdeJsonBackend::default())
}

fn decode_error(err: CodecError) -> DecodeError {
    match err {
        CodecError::Decode(e) => e,
        other => panic!("expected a decode error, got {other:?}"),
    }
}

#[derive(Codable, Debug, Clone, PartialEq)]
struct Address {
    street: String,
    city: String,
}

#[derive(Codable, Debug, Clone, PartialEq)]
struct Person {
    #[codable(rename = "fullName")]
    name: String,
    age: u8,
    email: Option<String>,
    address: Address,
    tags: Vec<String>,
    scores: BTreeMap<String, f64>,
}

fn ada() -> Person {
    Person {
        name: "Ada".into(),
        age: 36,
        email: None,
        address: Address {
            street: "1 Analytical Way".into(),
            city: "London".into(),
        },
        tags: vec!["math".into()],
        scores: BTreeMap::from([("logic".to_owned(), 9.5)]),
    }
}

#[test]
fn record_round_trip_in_declaration_order() {
    let registry = registry_for::<Person>();
    let out = to_json(&registry, &ada());
    assert_eq!(
        out,
        json!({
            "fullName": "Ada",
            "age": 36,
            "address": {"street": "1 Analytical Way", "city": "London"},
            "tags": ["math"],
            "scores": {"logic": 9.5}
        })
    );
    let keys: Vec<_> = out.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, ["fullName", "age", "address", "tags", "scores"]);

    let back: Person = from_json(&registry, out).unwrap();
    assert_eq!(back, ada());
}

#[test]
fn absent_optional_is_omitted_and_missing_or_null_decode_to_none() {
    let registry = registry_for::<Person>();
    let out = to_json(&registry, &ada());
    assert!(out.get("email").is_none());

    let mut with_null = out.clone();
    with_null["email"] = serde_json::Value::Null;
    let a: Person = from_json(&registry, out).unwrap();
    let b: Person = from_json(&registry, with_null).unwrap();
    assert_eq!(a.email, None);
    assert_eq!(a, b);

    let mut present = ada();
    present.email = Some("ada@example.org".into());
    let out = to_json(&registry, &present);
    assert_eq!(out["email"], json!("ada@example.org"));
}

#[test]
fn missing_required_field_is_reported_with_its_key() {
    let registry = registry_for::<Person>();
    let err = decode_error(
        from_json::<Person>(
            &registry,
            json!({"fullName": "Ada", "address": {"street": "x", "city": "y"}, "tags": [], "scores": {}}),
        )
        .unwrap_err(),
    );
    assert_eq!(err, DecodeError::MissingField("age".into()));

    let err = decode_error(
        from_json::<Person>(
            &registry,
            json!({"fullName": "Ada", "age": 1, "address": {"street": "x"}, "tags": [], "scores": {}}),
        )
        .unwrap_err(),
    );
    assert_eq!(err.root_cause(), &DecodeError::MissingField("city".into()));
    assert_eq!(err.path(), "/address/city");
}

#[test]
fn numeric_range_and_type_mismatch() {
    let registry = registry_for::<Person>();
    let base = to_json(&registry, &ada());

    let mut too_old = base.clone();
    too_old["age"] = json!(300);
    let err = decode_error(from_json::<Person>(&registry, too_old).unwrap_err());
    assert_eq!(
        err.root_cause(),
        &DecodeError::NumericRange {
            value: "300".into(),
            target: "u8"
        }
    );

    let mut fractional = base.clone();
    fractional["age"] = json!(3.5);
    let err = decode_error(from_json::<Person>(&registry, fractional).unwrap_err());
    assert!(matches!(err.root_cause(), DecodeError::NumericRange { .. }));

    let mut wrong = base;
    wrong["fullName"] = json!(12);
    let err = decode_error(from_json::<Person>(&registry, wrong).unwrap_err());
    assert_eq!(
        err.root_cause(),
        &DecodeError::TypeMismatch {
            expected: "string",
            found: "number"
        }
    );
    assert_eq!(err.path(), "/fullName");
}

#[derive(Codable, Debug, PartialEq)]
struct Batch {
    ids: Vec<u16>,
}

#[test]
fn element_failure_carries_its_index() {
    let registry = registry_for::<Batch>();
    let err = decode_error(from_json::<Batch>(&registry, json!({"ids": [1, 2, "three", 4]})).unwrap_err());
    let DecodeError::FieldError(key, cause) = &err else {
        panic!("expected a field error, got {err:?}");
    };
    assert_eq!(key, "ids");
    assert!(matches!(**cause, DecodeError::ElementError(2, _)));
    assert_eq!(err.path(), "/ids/2");
}

#[derive(Codable, Debug, PartialEq)]
struct Lenient {
    id: u32,
}

#[derive(Codable, Debug, PartialEq)]
#[codable(strict)]
struct Strict {
    id: u32,
}

#[test]
fn unknown_keys_are_ignored_unless_strict() {
    let lenient = registry_for::<Lenient>();
    let value: Lenient = from_json(&lenient, json!({"id": 1, "extra": true})).unwrap();
    assert_eq!(value, Lenient { id: 1 });

    let node = JsonNode::try_from(json!({"id": 1, "extra": true, "more": 2})).unwrap();
    let err = lenient
        .from_node_with::<Lenient>(&node, &DecodeOptions::strict())
        .unwrap_err();
    assert_eq!(err, DecodeError::UnknownField("extra".into()));

    let strict = registry_for::<Strict>();
    let err = decode_error(from_json::<Strict>(&strict, json!({"id": 1, "extra": true})).unwrap_err());
    assert_eq!(err, DecodeError::UnknownField("extra".into()));
}

#[derive(Codable, Debug, PartialEq, Default)]
struct Settings {
    name: String,
    #[codable(default)]
    retries: u32,
    #[codable(default)]
    labels: Vec<String>,
    #[codable(skip)]
    cache: Vec<u8>,
}

#[test]
fn skipped_fields_never_cross_and_defaults_fill_in() {
    let registry = registry_for::<Settings>();
    let value = Settings {
        name: "svc".into(),
        retries: 3,
        labels: vec![],
        cache: vec![1, 2, 3],
    };
    let out = to_json(&registry, &value);
    assert_eq!(out, json!({"name": "svc", "retries": 3, "labels": []}));

    let back: Settings = from_json(&registry, json!({"name": "svc", "cache": [9]})).unwrap();
    assert_eq!(
        back,
        Settings {
            name: "svc".into(),
            ..Settings::default()
        }
    );
}

#[derive(Codable, Debug, PartialEq)]
struct Audit {
    created_by: String,
    revision: u32,
}

#[derive(Codable, Debug, PartialEq)]
#[codable(strict)]
struct Document {
    title: String,
    #[codable(flatten = "audit_")]
    audit: Audit,
    body: String,
}

#[test]
fn flattened_record_merges_into_parent() {
    let registry = registry_for::<Document>();
    let doc = Document {
        title: "Notes".into(),
        audit: Audit {
            created_by: "ada".into(),
            revision: 2,
        },
        body: "...".into(),
    };
    let out = to_json(&registry, &doc);
    let keys: Vec<_> = out.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, ["title", "audit_created_by", "audit_revision", "body"]);

    let back: Document = from_json(&registry, out).unwrap();
    assert_eq!(back, doc);
}

#[derive(Codable, Debug, PartialEq)]
struct Account {
    id: u64,
    #[codable(read_level = 2)]
    balance: i64,
    #[codable(write_level = 5)]
    owner: String,
}

#[test]
fn access_levels_filter_encode_and_guard_decode() {
    let registry = registry_for::<Account>();
    let codec = registry.codec("Account").unwrap();
    let account = Account {
        id: 7,
        balance: -20,
        owner: "ops".into(),
    };

    let full = registry.to_node(&account).unwrap();
    assert_eq!(full.keys(), vec!["id", "balance", "owner"]);

    let low = codec
        .encode_with(&account.to_value(), &EncodeOptions::default().with_access_level(1))
        .unwrap();
    assert_eq!(low.keys(), vec!["id", "owner"]);

    let err = codec
        .decode_with(&full, &DecodeOptions::default().with_access_level(3))
        .unwrap_err();
    assert_eq!(err, DecodeError::AccessDenied("owner".into()));

    let decoded = codec
        .decode_with(&full, &DecodeOptions::default().with_access_level(5))
        .unwrap();
    assert_eq!(Account::from_value(decoded).unwrap(), account);
}

fn hex_coder() -> CoderRef {
    coder_fn(
        "hex",
        |value| match value {
            Value::Int(i) => Ok(JsonNode::from(format!("{:x}", i))),
            other => Err(format!("expected an integer, got {}", other.kind_name())),
        },
        |node| {
            let text = node.as_str().ok_or("expected a hex string")?;
            i128::from_str_radix(text, 16)
                .map(Value::Int)
                .map_err(|e| e.to_string())
        },
    )
}

#[derive(Codable, Debug, PartialEq)]
struct Color {
    name: String,
    #[codable(with = "hex_coder")]
    rgb: u32,
}

#[test]
fn custom_coder_replaces_strategy() {
    let registry = registry_for::<Color>();
    let teal = Color {
        name: "teal".into(),
        rgb: 0x008080,
    };
    let out = to_json(&registry, &teal);
    assert_eq!(out, json!({"name": "teal", "rgb": "8080"}));
    assert_eq!(from_json::<Color>(&registry, out).unwrap(), teal);

    let err = decode_error(from_json::<Color>(&registry, json!({"name": "x", "rgb": "zz"})).unwrap_err());
    assert!(matches!(err.root_cause(), DecodeError::CustomCoderFailure(_)));
    assert_eq!(err.path(), "/rgb");
}

#[derive(Codable, Debug, PartialEq)]
struct Wall {
    paint: Color,
}

#[derive(Codable, Debug, PartialEq)]
struct Door {
    frame: Color,
    panel: Option<Color>,
}

#[test]
fn custom_coder_type_shared_by_two_parents() {
    let mut builder = RegistryBuilder::new();
    builder.register_type::<Wall>().unwrap();
    builder.register_type::<Door>().unwrap();
    builder.register_type::<Color>().unwrap();
    let registry = builder.seal().unwrap();

    let door = Door {
        frame: Color {
            name: "oak".into(),
            rgb: 0xa0522d,
        },
        panel: None,
    };
    let out = to_json(&registry, &door);
    assert_eq!(out, json!({"frame": {"name": "oak", "rgb": "a0522d"}}));
    assert_eq!(from_json::<Door>(&registry, out).unwrap(), door);
}

#[derive(Codable, Debug, PartialEq)]
struct Reading {
    value: f32,
    total: f64,
}

#[test]
fn whole_floats_beyond_the_mantissa_round_trip() {
    let registry = registry_for::<Reading>();
    for (value, total) in [(33_554_432.0f32, 1e17), (1e10, -(2f64.powi(60))), (-16_777_216.0, 0.0)] {
        let reading = Reading { value, total };
        let json = SerdeJsonBackend::default();
        let bytes = registry.encode(&reading, &json).unwrap();
        assert_eq!(registry.decode::<Reading, _>(&bytes, &json).unwrap(), reading);

        let bytes = registry.encode(&reading, &CborBackend).unwrap();
        assert_eq!(registry.decode::<Reading, _>(&bytes, &CborBackend).unwrap(), reading);
    }
}

#[derive(Codable, Debug, Clone, Copy, PartialEq)]
enum Level {
    #[codable(rename = "low")]
    Low,
    #[codable(rename = "high")]
    High,
}

#[derive(Codable, Debug, PartialEq)]
struct Alarm {
    level: Level,
    history: Vec<Level>,
}

#[test]
fn unit_enums_encode_as_names() {
    let registry = registry_for::<Alarm>();
    let alarm = Alarm {
        level: Level::High,
        history: vec![Level::Low, Level::High],
    };
    let out = to_json(&registry, &alarm);
    assert_eq!(out, json!({"level": "high", "history": ["low", "high"]}));
    assert_eq!(from_json::<Alarm>(&registry, out).unwrap(), alarm);

    let by_ordinal: Alarm = from_json(&registry, json!({"level": 0, "history": []})).unwrap();
    assert_eq!(by_ordinal.level, Level::Low);

    let err = decode_error(from_json::<Alarm>(&registry, json!({"level": "medium", "history": []})).unwrap_err());
    assert_eq!(err.root_cause(), &DecodeError::UnknownVariant("medium".into()));
}

#[derive(Codable, Debug, PartialEq)]
struct Department {
    name: String,
    staff: Vec<Employee>,
}

#[derive(Codable, Debug, PartialEq)]
struct Employee {
    name: String,
    department: Option<Box<Department>>,
}

#[test]
fn mutually_recursive_types_register_and_round_trip() {
    let registry = registry_for::<Department>();
    assert!(registry.contains("Department"));
    assert!(registry.contains("Employee"));

    let dept = Department {
        name: "R&D".into(),
        staff: vec![Employee {
            name: "Grace".into(),
            department: Some(Box::new(Department {
                name: "Compilers".into(),
                staff: vec![],
            })),
        }],
    };
    let out = to_json(&registry, &dept);
    assert_eq!(
        out,
        json!({
            "name": "R&D",
            "staff": [{"name": "Grace", "department": {"name": "Compilers", "staff": []}}]
        })
    );
    assert_eq!(from_json::<Department>(&registry, out).unwrap(), dept);
}

#[derive(Codable, Debug, PartialEq)]
struct Tree {
    children: Vec<Tree>,
}

#[test]
fn depth_limit_stops_deep_input() {
    let registry = registry_for::<Tree>();
    let mut node = json!({"children": []});
    for _ in 0..10 {
        node = json!({ "children": [node] });
    }
    let tree = JsonNode::try_from(node).unwrap();
    let codec = registry.codec("Tree").unwrap();
    assert!(codec.decode(&tree).is_ok());

    let err = codec
        .decode_with(&tree, &DecodeOptions::default().with_max_depth(8))
        .unwrap_err();
    assert_eq!(err.root_cause(), &DecodeError::DepthLimit(8));
}

#[test]
fn non_finite_floats_do_not_encode() {
    let registry = registry_for::<Person>();
    let mut person = ada();
    person.scores.insert("broken".into(), f64::NAN);
    let err = registry.encode(&person, &SerdeJsonBackend::default()).unwrap_err();
    assert!(matches!(err, CodecError::Encode(_)));
}
