//! Discriminator-based polymorphic dispatch.

use json_codable::{
    Codable, CodecError, DecodeError, Diagnostics, EncodeError, JsonNode, Kind, PrimitiveKind, Problem, Record,
    RegistryBuilder, RegistryError, SerdeJsonBackend, TypeDescriptor, Value,
};
use serde_json::json;

fn node(value: serde_json::Value) -> JsonNode {
    JsonNode::try_from(value).unwrap()
}

fn record(name: &str, fields: &[(&str, Kind)]) -> TypeDescriptor {
    fields
        .iter()
        .fold(TypeDescriptor::record(name), |b, (member, kind)| b.prop(*member, kind.clone()))
        .build()
        .unwrap()
}

fn base_with_two_variants() -> RegistryBuilder {
    let mut builder = RegistryBuilder::new();
    builder
        .register(TypeDescriptor::polymorphic("Event", "kind").build().unwrap())
        .unwrap();
    builder
        .register(record("A", &[("x", Kind::primitive(PrimitiveKind::I32))]))
        .unwrap();
    builder
        .register(record("B", &[("label", Kind::string())]))
        .unwrap();
    builder.register_variant("Event", "a", "A").unwrap();
    builder.register_variant("Event", "b", "B").unwrap();
    builder
}

#[test]
fn dispatches_on_the_discriminator_value() {
    let registry = base_with_two_variants().seal().unwrap();
    let codec = registry.codec("Event").unwrap();

    let value = codec.decode(&node(json!({"kind": "a", "x": 5}))).unwrap();
    assert_eq!(value, Value::variant("a", Record::new(vec![Value::Int(5)])));

    let value = codec.decode(&node(json!({"label": "hi", "kind": "b"}))).unwrap();
    assert_eq!(value, Value::variant("b", Record::new(vec![Value::from("hi")])));

    let err = codec.decode(&node(json!({"kind": "c", "x": 5}))).unwrap_err();
    assert_eq!(err, DecodeError::UnknownVariant("c".into()));
}

#[test]
fn discriminator_must_be_a_present_string() {
    let registry = base_with_two_variants().seal().unwrap();
    let codec = registry.codec("Event").unwrap();

    let err = codec.decode(&node(json!({"x": 5}))).unwrap_err();
    assert_eq!(err, DecodeError::MissingField("kind".into()));

    let err = codec.decode(&node(json!({"kind": 1, "x": 5}))).unwrap_err();
    assert_eq!(err.path(), "/kind");
}

#[test]
fn encoding_writes_the_discriminator_first() {
    let registry = base_with_two_variants().seal().unwrap();
    let codec = registry.codec("Event").unwrap();
    let out = codec
        .encode(&Value::variant("b", Record::new(vec![Value::from("hi")])))
        .unwrap();
    assert_eq!(out.keys(), vec!["kind", "label"]);

    let err = codec
        .encode(&Value::variant("z", Record::new(vec![])))
        .unwrap_err();
    assert!(matches!(err, EncodeError::UnregisteredVariant { ref tag, .. } if tag == "z"));
}

#[test]
fn duplicate_discriminator_fails_in_either_order() {
    for (first, second) in [("A", "B"), ("B", "A")] {
        let mut builder = RegistryBuilder::new();
        builder
            .register(TypeDescriptor::polymorphic("Event", "kind").build().unwrap())
            .unwrap();
        builder.register(record("A", &[])).unwrap();
        builder.register(record("B", &[])).unwrap();
        builder.register_variant("Event", "same", first).unwrap();
        let err = builder.register_variant("Event", "same", second).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateDiscriminator {
                base: "Event".into(),
                tag: "same".into(),
                existing: first.into(),
                variant: second.into(),
            }
        );
    }
}

#[test]
fn rebinding_the_same_variant_is_idempotent() {
    let mut builder = base_with_two_variants();
    builder.register_variant("Event", "a", "A").unwrap();
    let registry = builder.seal().unwrap();
    assert_eq!(registry.variants("Event").unwrap().len(), 2);
}

#[test]
fn variant_may_not_declare_the_discriminator_key() {
    let mut builder = RegistryBuilder::new();
    builder
        .register(TypeDescriptor::polymorphic("Event", "kind").build().unwrap())
        .unwrap();
    builder.register(record("Bad", &[("kind", Kind::string())])).unwrap();
    let err = builder.register_variant("Event", "bad", "Bad").unwrap_err();
    assert!(matches!(err, RegistryError::DiscriminatorCollision { .. }));
}

#[test]
fn base_without_variants_seals_with_a_warning() {
    let mut builder = RegistryBuilder::new();
    builder
        .register(TypeDescriptor::polymorphic("Lonely", "type").build().unwrap())
        .unwrap();
    let registry = builder.seal().unwrap();
    let diags: &Diagnostics = registry.diagnostics();
    assert!(!diags.has_errors());
    assert!(diags.contains(&Problem::NoVariants));
}

#[derive(Codable, Debug, Clone, PartialEq)]
struct Circle {
    radius: f64,
}

#[derive(Codable, Debug, Clone, PartialEq)]
struct Rect {
    width: f64,
    height: f64,
}

#[derive(Codable, Debug, Clone, PartialEq)]
#[codable(discriminator = "type")]
enum Shape {
    #[codable(rename = "circle")]
    Circle(Circle),
    #[codable(rename = "rect")]
    Rect(Rect),
}

#[derive(Codable, Debug, PartialEq)]
struct Drawing {
    shapes: Vec<Shape>,
    focus: Option<Shape>,
}

fn drawing_registry() -> json_codable::Registry {
    let mut builder = RegistryBuilder::new();
    builder.register_type::<Drawing>().unwrap();
    builder.seal().unwrap()
}

#[test]
fn derived_enum_round_trips_as_tagged_objects() {
    let registry = drawing_registry();
    let drawing = Drawing {
        shapes: vec![
            Shape::Circle(Circle { radius: 1.5 }),
            Shape::Rect(Rect {
                width: 2.0,
                height: 3.0,
            }),
        ],
        focus: None,
    };
    let bytes = registry.encode(&drawing, &SerdeJsonBackend::default()).unwrap();
    let out: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        out,
        json!({
            "shapes": [
                {"type": "circle", "radius": 1.5},
                {"type": "rect", "width": 2, "height": 3}
            ]
        })
    );
    let back: Drawing = registry.decode(&bytes, &SerdeJsonBackend::default()).unwrap();
    assert_eq!(back, drawing);
}

#[test]
fn unknown_tag_inside_a_collection_reports_its_position() {
    let registry = drawing_registry();
    let bytes = serde_json::to_vec(&json!({
        "shapes": [{"type": "circle", "radius": 1}, {"type": "hexagon"}]
    }))
    .unwrap();
    let err = registry
        .decode::<Drawing, _>(&bytes, &SerdeJsonBackend::default())
        .unwrap_err();
    let CodecError::Decode(err) = err else {
        panic!("expected a decode error");
    };
    assert_eq!(err.root_cause(), &DecodeError::UnknownVariant("hexagon".into()));
    assert_eq!(err.path(), "/shapes/1");
}

#[test]
fn polymorphic_field_must_point_at_a_base() {
    let mut builder = RegistryBuilder::new();
    builder.register(record("Plain", &[])).unwrap();
    builder
        .register(record("Holder", &[("item", Kind::polymorphic("Plain"))]))
        .unwrap();
    let diags = builder.seal().unwrap_err();
    assert!(diags.contains(&Problem::NotPolymorphicBase("Plain".into())));

    let mut builder = base_with_two_variants();
    builder
        .register(record("Holder", &[("item", Kind::nested("Event"))]))
        .unwrap();
    let diags = builder.seal().unwrap_err();
    assert!(diags.contains(&Problem::PolymorphicAsNested("Event".into())));
}
