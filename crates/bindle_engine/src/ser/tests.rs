use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec;

use serde_json::json;

use super::{EncodeOptions, SerializeDriver, serialize};
use crate::de::deserialize;
use crate::error::BindError;
use crate::fixtures::*;
use crate::model::BeanCache;
use crate::refs::BackRef;
use crate::registry::{GetTypeMeta, TypeRegistry};
use crate::value::Value;

fn encode<T: GetTypeMeta>(value: &T) -> serde_json::Value {
    let types = registry::<T>();
    let cache = BeanCache::new();
    serialize_with(&types, &cache, EncodeOptions::new(), value)
}

fn serialize_with<T: GetTypeMeta>(
    registry: &TypeRegistry,
    cache: &BeanCache,
    options: EncodeOptions,
    value: &T,
) -> serde_json::Value {
    SerializeDriver::new(registry)
        .with_cache(cache)
        .with_options(options)
        .serialize(value, serde_json::value::Serializer)
        .unwrap()
}

fn person() -> Person {
    Person {
        name: String::from("Ann"),
        age: 30,
        email: None,
        tags: vec![String::from("a")],
    }
}

#[test]
fn writes_declared_properties() {
    assert_eq!(encode(&person()), json!({ "name": "Ann", "age": 30, "tags": ["a"] }));

    let full = Person {
        email: Some(String::from("ann@example.com")),
        ..person()
    };
    assert_eq!(
        encode(&full),
        json!({ "name": "Ann", "age": 30, "email": "ann@example.com", "tags": ["a"] })
    );
}

#[test]
fn include_policy_leaves_out_empty_values() {
    let empty = Person {
        tags: vec![],
        email: Some(String::new()),
        ..person()
    };
    assert_eq!(encode(&empty), json!({ "name": "Ann", "age": 30 }));

    // Bean level is non-null, `phone` always and `nick` non-empty.
    assert_eq!(encode(&Contact::default()), json!({ "phone": null, "notes": [] }));

    let contact = Contact {
        phone: Some(String::new()),
        fax: Some(String::new()),
        notes: vec![String::from("n")],
        nick: String::from("jo"),
    };
    assert_eq!(
        encode(&contact),
        json!({ "phone": "", "fax": "", "notes": ["n"], "nick": "jo" })
    );
}

#[test]
fn output_decodes_back() {
    let types = registry::<Person>();
    let text = serde_json::to_string(&SerializeDriver::new(&types).value(&person())).unwrap();
    let decoded: Person = deserialize(&types, &mut serde_json::Deserializer::from_str(&text)).unwrap();
    assert_eq!(decoded, person());

    let types = registry::<Drawing>();
    let drawing = Drawing {
        title: String::from("t"),
        shape: ExternalShape::Circle(Circle { radius: 2.0 }),
    };
    let text = serde_json::to_string(&SerializeDriver::new(&types).value(&drawing)).unwrap();
    let decoded: Drawing = deserialize(&types, &mut serde_json::Deserializer::from_str(&text)).unwrap();
    assert_eq!(decoded, drawing);

    let types = registry::<DeducedShape>();
    let circle = DeducedShape::Circle(Circle { radius: 3.0 });
    let text = serde_json::to_string(&SerializeDriver::new(&types).value(&circle)).unwrap();
    let decoded: DeducedShape = deserialize(&types, &mut serde_json::Deserializer::from_str(&text)).unwrap();
    assert_eq!(decoded, circle);
}

#[test]
fn subtype_placements() {
    assert_eq!(
        encode(&EmbeddedShape::Circle(Circle { radius: 1.5 })),
        json!({ "kind": "circle", "radius": 1.5 })
    );
    assert_eq!(
        encode(&ObjectShape::Square(Square { side: 2.0 })),
        json!({ "square": { "side": 2.0 } })
    );
    assert_eq!(
        encode(&ArrayShape::Circle(Circle { radius: 0.5 })),
        json!(["circle", { "radius": 0.5 }])
    );
    assert_eq!(
        encode(&DeducedShape::Square(Square { side: 4.0 })),
        json!({ "side": 4.0 })
    );
    assert_eq!(
        encode(&Drawing {
            title: String::from("t"),
            shape: ExternalShape::Square(Square { side: 1.0 }),
        }),
        json!({ "title": "t", "kind": "square", "shape": { "side": 1.0 } })
    );
}

#[test]
fn unwrapped_properties_are_flattened() {
    let marker = Marker {
        id: 1,
        position: Position { x: 3, y: 4 },
    };
    assert_eq!(encode(&marker), json!({ "id": 1, "pos_x": 3, "pos_y": 4 }));
}

#[test]
fn any_getter_entries_are_inline() {
    let mut extra = BTreeMap::new();
    extra.insert(String::from("flag"), Value::Bool(true));
    extra.insert(String::from("note"), Value::from("x"));
    let record = Record { id: 7, extra };
    assert_eq!(encode(&record), json!({ "id": 7, "flag": true, "note": "x" }));
}

#[test]
fn views_leave_out_properties() {
    let types = registry::<Profile>();
    let cache = BeanCache::new();
    let profile = Profile {
        name: String::from("n"),
        secret: String::from("s"),
    };

    let public = serialize_with(&types, &cache, EncodeOptions::new().views(&["public"]), &profile);
    assert_eq!(public, json!({ "name": "n" }));
    let admin = serialize_with(&types, &cache, EncodeOptions::new().views(&["admin"]), &profile);
    assert_eq!(admin, json!({ "name": "n", "secret": "s" }));
    assert_eq!(encode(&profile), admin);
}

#[test]
fn wrapper_and_delegating_beans() {
    assert_eq!(encode(&Envelope { id: 3 }), json!({ "envelope": { "id": 3 } }));
    assert_eq!(encode(&Cents(250)), json!(250));
}

#[test]
fn back_references_are_not_written() {
    let parent = Parent {
        name: String::from("p"),
        children: vec![Child {
            name: String::from("a"),
            parent: BackRef::dangling(),
        }],
    };
    assert_eq!(encode(&parent), json!({ "name": "p", "children": [{ "name": "a" }] }));
}

#[test]
fn typed_errors_are_recovered() {
    let types = TypeRegistry::new();
    let err = serialize(&types, &person(), serde_json::value::Serializer).unwrap_err();
    assert!(matches!(err, BindError::UnregisteredType { .. }));

    let person = person();
    let driver = SerializeDriver::new(&types);
    let encoded = driver.value(&person);
    assert!(serde_json::to_string(&encoded).is_err());
    assert!(matches!(encoded.take_error(), Some(BindError::UnregisteredType { .. })));
}
