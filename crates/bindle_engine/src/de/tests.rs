use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use super::{DecodeOptions, DeserializeDriver, deserialize, deserialize_into};
use crate::error::BindError;
use crate::fixtures::*;
use crate::model::BeanCache;
use crate::refs::Managed;
use crate::registry::{GetTypeMeta, TypeRegistry};
use crate::value::Value;

fn json<T: GetTypeMeta + 'static>(input: &str) -> Result<T, BindError> {
    let types = registry::<T>();
    let cache = BeanCache::new();
    DeserializeDriver::new(&types)
        .with_cache(&cache)
        .deserialize(&mut serde_json::Deserializer::from_str(input))
}

// -----------------------------------------------------------------------------
// Properties

#[test]
fn binds_creator_and_setter_properties() {
    let person: Person =
        json(r#"{"name":"Ann","age":30,"email":"ann@example.com","tags":["a","b"]}"#).unwrap();
    assert_eq!(
        person,
        Person {
            name: String::from("Ann"),
            age: 30,
            email: Some(String::from("ann@example.com")),
            tags: vec![String::from("a"), String::from("b")],
        }
    );
}

#[test]
fn key_order_does_not_matter() {
    let a: Person = json(r#"{"name":"Ann","age":30,"tags":["x"],"email":null}"#).unwrap();
    let b: Person = json(r#"{"tags":["x"],"email":null,"years":30,"name":"Ann"}"#).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.email, None);
}

#[test]
fn duplicate_keys_fail() {
    assert_eq!(
        json::<Person>(r#"{"name":"Ann","age":30,"name":"Bob"}"#).unwrap_err(),
        BindError::DuplicateProperty {
            type_name: "Person",
            property: String::from("name"),
        }
    );
    // An alias names the same property.
    assert_eq!(
        json::<Person>(r#"{"name":"Ann","age":30,"years":31}"#).unwrap_err(),
        BindError::DuplicateProperty {
            type_name: "Person",
            property: String::from("age"),
        }
    );
}

#[test]
fn required_properties() {
    let missing = BindError::MissingRequiredProperty {
        type_name: "Person",
        property: String::from("age"),
    };
    assert_eq!(json::<Person>(r#"{"name":"Ann"}"#).unwrap_err(), missing);
    assert_eq!(json::<Person>(r#"{"name":"Ann","age":null}"#).unwrap_err(), missing);

    let person: Person = json(r#"{"name":"Ann","age":1}"#).unwrap();
    assert!(person.tags.is_empty());
}

#[test]
fn renamed_and_defaulted_properties() {
    let renamed: Renamed = json(r#"{"first-name":"Ann","zip-code":12345}"#).unwrap();
    assert_eq!(
        renamed,
        Renamed {
            first_name: String::from("Ann"),
            zip_code: 12345,
        }
    );
    assert_eq!(
        json::<Renamed>(r#"{"first_name":"Ann","zip-code":1}"#).unwrap_err(),
        BindError::UnknownProperty {
            type_name: "Renamed",
            property: String::from("first_name"),
        }
    );

    // An explicit null counts as absent and takes the default.
    assert_eq!(json::<Fallback>(r#"{"a":null}"#).unwrap(), Fallback { a: 7 });
    assert_eq!(json::<Fallback>("{}").unwrap(), Fallback { a: 7 });
    assert_eq!(json::<Fallback>(r#"{"a":2}"#).unwrap(), Fallback { a: 2 });
}

#[test]
fn many_properties() {
    let fields: Vec<String> = (0..70).rev().map(|i| format!(r#""p{i}":{i}"#)).collect();

    let wide: Wide = json(&format!("{{{}}}", fields.join(","))).unwrap();
    let expected: [i32; 70] = core::array::from_fn(|i| i as i32);
    assert_eq!(wide.values, expected);

    assert_eq!(
        json::<Wide>(&format!(r#"{{{},"p66":0}}"#, fields.join(","))).unwrap_err(),
        BindError::DuplicateProperty {
            type_name: "Wide",
            property: String::from("p66"),
        }
    );
    assert_eq!(
        json::<Wide>(&format!("{{{}}}", fields[..69].join(","))).unwrap_err(),
        BindError::MissingRequiredProperty {
            type_name: "Wide",
            property: String::from("p0"),
        }
    );
}

#[test]
fn unknown_keys() {
    assert_eq!(
        json::<Person>(r#"{"name":"Ann","age":1,"nickname":"A"}"#).unwrap_err(),
        BindError::UnknownProperty {
            type_name: "Person",
            property: String::from("nickname"),
        }
    );

    let lenient: Lenient = json(r#"{"b":{"nested":[1,2,{"c":null}]},"a":5}"#).unwrap();
    assert_eq!(lenient, Lenient { a: 5 });
}

#[test]
fn format_errors_name_the_path() {
    let err = json::<Person>(r#"{"name":"Ann","age":"old"}"#).unwrap_err();
    assert!(matches!(
        err,
        BindError::InvalidFormat { type_name: "Person", ref property, ref path, argument: "u32", .. }
            if property == "age" && path == "age"
    ));

    let err = json::<Family>(r#"{"children":[{"name":"a"},{"name":5}]}"#).unwrap_err();
    assert!(matches!(
        err,
        BindError::InvalidFormat { type_name: "Kid", ref property, ref path, .. }
            if property == "name" && path == "children[1].name"
    ));
}

#[test]
fn unregistered_types_fail() {
    let types = TypeRegistry::new();
    let err = deserialize::<Person, _>(&types, &mut serde_json::Deserializer::from_str("{}")).unwrap_err();
    assert!(matches!(err, BindError::UnregisteredType { .. }));
}

// -----------------------------------------------------------------------------
// Bean shapes

#[test]
fn unwrapped_properties_bind_flat_keys() {
    let marker: Marker = json(r#"{"pos_y":4,"id":1,"pos_x":3}"#).unwrap();
    assert_eq!(
        marker,
        Marker {
            id: 1,
            position: Position { x: 3, y: 4 },
        }
    );

    assert_eq!(
        json::<Marker>(r#"{"id":1,"pos_y":4}"#).unwrap_err(),
        BindError::MissingRequiredProperty {
            type_name: "Marker",
            property: String::from("pos_x"),
        }
    );
    assert_eq!(
        json::<Marker>(r#"{"id":1,"pos_x":3,"pos_y":4,"position":{}}"#).unwrap_err(),
        BindError::UnknownProperty {
            type_name: "Marker",
            property: String::from("position"),
        }
    );
}

#[test]
fn any_setter_collects_unknown_keys() {
    let record: Record = json(r#"{"id":1,"extra":true,"other":"x"}"#).unwrap();
    assert_eq!(record.id, 1);
    assert_eq!(record.extra.len(), 2);
    assert_eq!(record.extra.get("extra"), Some(&Value::Bool(true)));
    assert_eq!(record.extra.get("other"), Some(&Value::from("x")));
}

#[test]
fn any_setter_forms() {
    let bag: StringBag = json(r#"{"a":"x","id":1,"b":"y"}"#).unwrap();
    let mut extra = BTreeMap::new();
    extra.insert(String::from("a"), String::from("x"));
    extra.insert(String::from("b"), String::from("y"));
    assert_eq!(bag, StringBag { id: 1, extra });
    assert!(matches!(
        json::<StringBag>(r#"{"id":1,"a":5}"#).unwrap_err(),
        BindError::InvalidFormat { type_name: "StringBag", .. }
    ));

    let bag: EntryBag = json(r#"{"x":1,"id":2,"y":-3}"#).unwrap();
    assert_eq!(bag.id, 2);
    assert_eq!(bag.counts.get("x"), Some(&1));
    assert_eq!(bag.counts.get("y"), Some(&-3));

    let bag: ParamBag = json(r#"{"flag":true,"id":3}"#).unwrap();
    assert_eq!(bag.id, 3);
    assert_eq!(bag.extra.get("flag"), Some(&Value::Bool(true)));
    let bag: ParamBag = json(r#"{"id":4}"#).unwrap();
    assert!(bag.extra.is_empty());
}

#[test]
fn wrapper_property() {
    assert_eq!(json::<Envelope>(r#"{"envelope":{"id":3}}"#).unwrap(), Envelope { id: 3 });
    assert_eq!(
        json::<Envelope>(r#"{"id":3}"#).unwrap_err(),
        BindError::UnknownProperty {
            type_name: "Envelope",
            property: String::from("id"),
        }
    );
}

#[test]
fn delegating_creator() {
    assert_eq!(json::<Cents>("250").unwrap(), Cents(250));
}

#[test]
fn nesting_is_limited() {
    let mut input = String::new();
    for _ in 0..20 {
        input.push_str(r#"{"children":["#);
    }
    for _ in 0..20 {
        input.push_str("]}");
    }

    let types = registry::<Node>();
    let cache = BeanCache::new();
    let shallow = DeserializeDriver::new(&types)
        .with_cache(&cache)
        .with_options(DecodeOptions::new().max_depth(16));
    let err = shallow
        .deserialize::<Node, _>(&mut serde_json::Deserializer::from_str(&input))
        .unwrap_err();
    assert_eq!(err, BindError::Recursion { type_name: "Node" });

    let node: Node = DeserializeDriver::new(&types)
        .with_cache(&cache)
        .deserialize(&mut serde_json::Deserializer::from_str(&input))
        .unwrap();
    let mut depth = 1;
    let mut current = &node;
    while let Some(next) = current.children.first() {
        depth += 1;
        current = next;
    }
    assert_eq!(depth, 20);
}

// -----------------------------------------------------------------------------
// Subtypes

#[test]
fn embedded_subtypes() {
    assert_eq!(
        json::<EmbeddedShape>(r#"{"kind":"circle","radius":1.5}"#).unwrap(),
        EmbeddedShape::Circle(Circle { radius: 1.5 })
    );
    // Keys before the discriminator are buffered.
    assert_eq!(
        json::<EmbeddedShape>(r#"{"side":2.0,"kind":"square"}"#).unwrap(),
        EmbeddedShape::Square(Square { side: 2.0 })
    );

    assert_eq!(
        json::<EmbeddedShape>(r#"{"kind":"triangle","side":1.0}"#).unwrap_err(),
        BindError::UnknownSubtype {
            type_name: "EmbeddedShape",
            discriminator: String::from("triangle"),
        }
    );
    assert_eq!(
        json::<EmbeddedShape>(r#"{"side":1.0}"#).unwrap_err(),
        BindError::MissingDiscriminator {
            type_name: "EmbeddedShape",
            property: String::from("kind"),
        }
    );
    assert_eq!(
        json::<EmbeddedShape>(r#"{"kind":"circle","kind":"square","radius":1.0}"#).unwrap_err(),
        BindError::DuplicateProperty {
            type_name: "EmbeddedShape",
            property: String::from("kind"),
        }
    );
}

#[test]
fn embedded_subtype_properties() {
    // Integers widen into floating point properties, live or replayed.
    assert_eq!(
        json::<EmbeddedShape>(r#"{"kind":"circle","radius":5}"#).unwrap(),
        EmbeddedShape::Circle(Circle { radius: 5.0 })
    );
    assert_eq!(
        json::<EmbeddedShape>(r#"{"radius":5,"kind":"circle"}"#).unwrap(),
        EmbeddedShape::Circle(Circle { radius: 5.0 })
    );

    // A key buffered before the discriminator and repeated after it.
    assert_eq!(
        json::<EmbeddedShape>(r#"{"radius":1,"kind":"circle","radius":2}"#).unwrap_err(),
        BindError::DuplicateProperty {
            type_name: "Circle",
            property: String::from("radius"),
        }
    );
    assert_eq!(
        json::<EmbeddedShape>(r#"{"kind":"circle","side":1.0}"#).unwrap_err(),
        BindError::UnknownProperty {
            type_name: "Circle",
            property: String::from("side"),
        }
    );
}

#[test]
fn deduced_subtypes() {
    assert_eq!(
        json::<DeducedShape>(r#"{"radius":1.5}"#).unwrap(),
        DeducedShape::Circle(Circle { radius: 1.5 })
    );
    assert_eq!(
        json::<DeducedShape>(r#"{"side":2}"#).unwrap(),
        DeducedShape::Square(Square { side: 2.0 })
    );

    assert_eq!(
        json::<DeducedShape>("{}").unwrap_err(),
        BindError::AmbiguousSubtype {
            type_name: "DeducedShape",
            discriminator: String::new(),
        }
    );
    assert_eq!(
        json::<DeducedShape>(r#"{"radius":1,"side":2}"#).unwrap_err(),
        BindError::UnknownSubtype {
            type_name: "DeducedShape",
            discriminator: String::from("radius, side"),
        }
    );
    assert_eq!(
        json::<DeducedShape>(r#"{"radius":1,"radius":2}"#).unwrap_err(),
        BindError::DuplicateProperty {
            type_name: "Circle",
            property: String::from("radius"),
        }
    );
}

#[test]
fn default_subtype() {
    let circle = DefaultedShape::Circle(Circle { radius: 2.0 });
    assert_eq!(json::<DefaultedShape>(r#"{"radius":2.0}"#).unwrap(), circle);
    assert_eq!(json::<DefaultedShape>(r#"{"kind":"hexagon","radius":2.0}"#).unwrap(), circle);
}

#[test]
fn wrapper_subtypes() {
    assert_eq!(
        json::<ObjectShape>(r#"{"square":{"side":3.0}}"#).unwrap(),
        ObjectShape::Square(Square { side: 3.0 })
    );
    assert_eq!(
        json::<ArrayShape>(r#"["circle",{"radius":0.5}]"#).unwrap(),
        ArrayShape::Circle(Circle { radius: 0.5 })
    );

    assert!(matches!(
        json::<ObjectShape>("{}").unwrap_err(),
        BindError::MalformedSubtype { type_name: "ObjectShape", .. }
    ));
    assert!(matches!(
        json::<ArrayShape>(r#"["circle"]"#).unwrap_err(),
        BindError::MalformedSubtype { type_name: "ArrayShape", .. }
    ));
    assert!(matches!(
        json::<ArrayShape>(r#"["circle",{"radius":0.5},1]"#).unwrap_err(),
        BindError::MalformedSubtype { type_name: "ArrayShape", .. }
    ));
}

#[test]
fn external_discriminator() {
    let drawing: Drawing = json(r#"{"title":"t","kind":"square","shape":{"side":1.0}}"#).unwrap();
    assert_eq!(drawing.shape, ExternalShape::Square(Square { side: 1.0 }));

    // The body may arrive before its discriminator.
    let drawing: Drawing = json(r#"{"shape":{"radius":2.0},"title":"t","kind":"circle"}"#).unwrap();
    assert_eq!(drawing.shape, ExternalShape::Circle(Circle { radius: 2.0 }));

    assert_eq!(
        json::<Drawing>(r#"{"title":"t","shape":{"radius":2.0}}"#).unwrap_err(),
        BindError::MissingDiscriminator {
            type_name: "ExternalShape",
            property: String::from("kind"),
        }
    );
}

// -----------------------------------------------------------------------------
// References, views and patching

#[test]
fn back_references_point_to_the_owner() {
    let types = registry::<Managed<Parent>>();
    let cache = BeanCache::new();
    let input = r#"{"name":"p","children":[{"name":"a"},{"name":"b","parent":{"ignored":true}}]}"#;
    let parent: Managed<Parent> = DeserializeDriver::new(&types)
        .with_cache(&cache)
        .deserialize(&mut serde_json::Deserializer::from_str(input))
        .unwrap();

    let inner = parent.get().unwrap();
    assert_eq!(inner.name, "p");
    assert_eq!(inner.children.len(), 2);
    for child in &inner.children {
        assert!(child.parent.points_to(&parent));
    }

    let orphan: Child = json(r#"{"name":"orphan"}"#).unwrap();
    assert!(orphan.parent.is_dangling());
}

#[test]
fn views_filter_properties() {
    let types = registry::<Profile>();
    let cache = BeanCache::new();
    let input = r#"{"name":"n","secret":"s"}"#;

    let public = DeserializeDriver::new(&types)
        .with_cache(&cache)
        .with_options(DecodeOptions::new().views(&["public"]));
    let profile: Profile = public
        .deserialize(&mut serde_json::Deserializer::from_str(input))
        .unwrap();
    assert_eq!(profile.secret, "");

    let admin = DeserializeDriver::new(&types)
        .with_cache(&cache)
        .with_options(DecodeOptions::new().views(&["admin"]));
    let profile: Profile = admin
        .deserialize(&mut serde_json::Deserializer::from_str(input))
        .unwrap();
    assert_eq!(profile.secret, "s");

    // Without an active view every property binds.
    assert_eq!(
        json::<Profile>(r#"{"name":"n"}"#).unwrap_err(),
        BindError::MissingRequiredProperty {
            type_name: "Profile",
            property: String::from("secret"),
        }
    );
}

#[test]
fn deserialize_into_patches() {
    let types = registry::<Settings>();
    let mut settings = Settings {
        volume: 3,
        theme: String::from("dark"),
    };
    deserialize_into(&types, &mut serde_json::Deserializer::from_str(r#"{"volume":7}"#), &mut settings).unwrap();
    assert_eq!(
        settings,
        Settings {
            volume: 7,
            theme: String::from("dark"),
        }
    );

    let err = deserialize_into(
        &types,
        &mut serde_json::Deserializer::from_str(r#"{"volume":1,"volume":2}"#),
        &mut settings,
    )
    .unwrap_err();
    assert_eq!(
        err,
        BindError::DuplicateProperty {
            type_name: "Settings",
            property: String::from("volume"),
        }
    );
}

#[test]
fn deserialize_into_rejects_unwritable_properties() {
    let types = registry::<Marker>();
    let mut marker = Marker {
        id: 1,
        position: Position { x: 0, y: 0 },
    };
    let err = deserialize_into(&types, &mut serde_json::Deserializer::from_str(r#"{"id":5}"#), &mut marker)
        .unwrap_err();
    assert_eq!(
        err,
        BindError::UnknownProperty {
            type_name: "Marker",
            property: String::from("id"),
        }
    );

    let types = registry::<Envelope>();
    let err = deserialize_into(
        &types,
        &mut serde_json::Deserializer::from_str(r#"{"envelope":{"id":1}}"#),
        &mut Envelope::default(),
    )
    .unwrap_err();
    assert!(matches!(err, BindError::Unsupported { type_name: "Envelope", .. }));
}

// -----------------------------------------------------------------------------
// Other formats

#[test]
fn ron_input() {
    let types = registry::<Person>();
    let input = "#![enable(implicit_some)]\n{ \"name\": \"Ann\", \"age\": 30, \"email\": \"ann@example.com\" }";
    let mut deserializer = ron::de::Deserializer::from_str(input).unwrap();
    let person: Person = deserialize(&types, &mut deserializer).unwrap();
    assert_eq!(person.name, "Ann");
    assert_eq!(person.age, 30);
    assert_eq!(person.email.as_deref(), Some("ann@example.com"));
}
