//! Bean declarations shared by the decode and encode tests.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::decl::{
    AccessorDecl, AnySetterDecl, BeanBuilder, Include, NamingStrategy, SubtypePlacement, SubtypesDecl,
};
use crate::refs::BackRef;
use crate::registry::{GetTypeMeta, TypeMeta, TypeRegistry};
use crate::value::Value;

pub fn registry<T: GetTypeMeta>() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register::<T>();
    registry
}

// -----------------------------------------------------------------------------
// Plain beans

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub name: String,
    pub age: u32,
    pub email: Option<String>,
    pub tags: Vec<String>,
}

impl GetTypeMeta for Person {
    fn get_type_meta() -> TypeMeta {
        BeanBuilder::<Person>::new()
            .creator(2, |args| {
                Ok(Person {
                    name: args.take(0)?,
                    age: args.take(1)?,
                    email: None,
                    tags: Vec::new(),
                })
            })
            .accessor(AccessorDecl::param::<String>("name", 0))
            .accessor(AccessorDecl::param::<u32>("age", 1).alias("years"))
            .accessor(AccessorDecl::getter("name", |p: &Person| &p.name))
            .accessor(AccessorDecl::getter("age", |p: &Person| &p.age))
            .accessor(AccessorDecl::field("email", |p: &Person| &p.email, |p: &mut Person| &mut p.email))
            .accessor(
                AccessorDecl::field("tags", |p: &Person| &p.tags, |p: &mut Person| &mut p.tags).required(false),
            )
            .build()
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Kid {
    pub name: String,
}

impl GetTypeMeta for Kid {
    fn get_type_meta() -> TypeMeta {
        BeanBuilder::<Kid>::new()
            .default_constructor(Kid::default)
            .accessor(AccessorDecl::field("name", |k: &Kid| &k.name, |k: &mut Kid| &mut k.name))
            .build()
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Family {
    pub children: Vec<Kid>,
}

impl GetTypeMeta for Family {
    fn get_type_meta() -> TypeMeta {
        BeanBuilder::<Family>::new()
            .default_constructor(Family::default)
            .accessor(
                AccessorDecl::field("children", |f: &Family| &f.children, |f: &mut Family| &mut f.children)
                    .required(false),
            )
            .build()
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Lenient {
    pub a: i32,
}

impl GetTypeMeta for Lenient {
    fn get_type_meta() -> TypeMeta {
        BeanBuilder::<Lenient>::new()
            .default_constructor(Lenient::default)
            .ignore_unknown(true)
            .accessor(AccessorDecl::field("a", |l: &Lenient| &l.a, |l: &mut Lenient| &mut l.a))
            .build()
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Settings {
    pub volume: u8,
    pub theme: String,
}

impl GetTypeMeta for Settings {
    fn get_type_meta() -> TypeMeta {
        BeanBuilder::<Settings>::new()
            .default_constructor(Settings::default)
            .accessor(AccessorDecl::field("volume", |s: &Settings| &s.volume, |s: &mut Settings| &mut s.volume))
            .accessor(AccessorDecl::field("theme", |s: &Settings| &s.theme, |s: &mut Settings| &mut s.theme))
            .build()
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Profile {
    pub name: String,
    pub secret: String,
}

impl GetTypeMeta for Profile {
    fn get_type_meta() -> TypeMeta {
        BeanBuilder::<Profile>::new()
            .default_constructor(Profile::default)
            .accessor(AccessorDecl::field("name", |p: &Profile| &p.name, |p: &mut Profile| &mut p.name))
            .accessor(
                AccessorDecl::field("secret", |p: &Profile| &p.secret, |p: &mut Profile| &mut p.secret)
                    .views(&["admin"]),
            )
            .build()
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Contact {
    pub phone: Option<String>,
    pub fax: Option<String>,
    pub notes: Vec<String>,
    pub nick: String,
}

impl GetTypeMeta for Contact {
    fn get_type_meta() -> TypeMeta {
        BeanBuilder::<Contact>::new()
            .default_constructor(Contact::default)
            .include(Include::NonNull)
            .accessor(
                AccessorDecl::field("phone", |c: &Contact| &c.phone, |c: &mut Contact| &mut c.phone)
                    .include(Include::Always),
            )
            .accessor(AccessorDecl::field("fax", |c: &Contact| &c.fax, |c: &mut Contact| &mut c.fax))
            .accessor(
                AccessorDecl::field("notes", |c: &Contact| &c.notes, |c: &mut Contact| &mut c.notes)
                    .required(false),
            )
            .accessor(
                AccessorDecl::field("nick", |c: &Contact| &c.nick, |c: &mut Contact| &mut c.nick)
                    .required(false)
                    .include(Include::NonEmpty),
            )
            .build()
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Renamed {
    pub first_name: String,
    pub zip_code: i32,
}

impl GetTypeMeta for Renamed {
    fn get_type_meta() -> TypeMeta {
        BeanBuilder::<Renamed>::new()
            .default_constructor(Renamed::default)
            .rename_all(NamingStrategy::KebabCase)
            .accessor(AccessorDecl::field(
                "first_name",
                |r: &Renamed| &r.first_name,
                |r: &mut Renamed| &mut r.first_name,
            ))
            .accessor(AccessorDecl::field("zip_code", |r: &Renamed| &r.zip_code, |r: &mut Renamed| &mut r.zip_code))
            .build()
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Fallback {
    pub a: i32,
}

impl GetTypeMeta for Fallback {
    fn get_type_meta() -> TypeMeta {
        BeanBuilder::<Fallback>::new()
            .default_constructor(Fallback::default)
            .accessor(AccessorDecl::field("a", |f: &Fallback| &f.a, |f: &mut Fallback| &mut f.a).default_value(7_i32))
            .build()
    }
}

/// More properties than fit one machine word of tracking bits.
#[derive(Debug, PartialEq)]
pub struct Wide {
    pub values: [i32; 70],
}

macro_rules! wide_fields {
    ($builder:expr; $($i:literal)*) => {
        $builder
            $(.accessor(AccessorDecl::field(
                concat!("p", $i),
                |w: &Wide| &w.values[$i],
                |w: &mut Wide| &mut w.values[$i],
            )))*
    };
}

impl GetTypeMeta for Wide {
    fn get_type_meta() -> TypeMeta {
        let builder = BeanBuilder::<Wide>::new().default_constructor(|| Wide { values: [0; 70] });
        wide_fields!(builder;
            0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16 17 18 19 20 21 22 23 24 25 26 27 28 29
            30 31 32 33 34 35 36 37 38 39 40 41 42 43 44 45 46 47 48 49 50 51 52 53 54 55 56 57 58 59
            60 61 62 63 64 65 66 67 68 69
        )
        .build()
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Envelope {
    pub id: i32,
}

impl GetTypeMeta for Envelope {
    fn get_type_meta() -> TypeMeta {
        BeanBuilder::<Envelope>::new()
            .default_constructor(Envelope::default)
            .wrapper_property("envelope")
            .accessor(AccessorDecl::field("id", |e: &Envelope| &e.id, |e: &mut Envelope| &mut e.id))
            .build()
    }
}

#[derive(Debug, PartialEq)]
pub struct Cents(pub u64);

impl GetTypeMeta for Cents {
    fn get_type_meta() -> TypeMeta {
        BeanBuilder::<Cents>::new()
            .delegating(Cents, |c: &Cents| &c.0)
            .build()
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Node {
    pub children: Vec<Node>,
}

impl GetTypeMeta for Node {
    fn get_type_meta() -> TypeMeta {
        BeanBuilder::<Node>::new()
            .default_constructor(Node::default)
            .accessor(
                AccessorDecl::field("children", |n: &Node| &n.children, |n: &mut Node| &mut n.children)
                    .required(false),
            )
            .build()
    }
}

// -----------------------------------------------------------------------------
// Unwrapped

#[derive(Debug, PartialEq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl GetTypeMeta for Position {
    fn get_type_meta() -> TypeMeta {
        BeanBuilder::<Position>::new()
            .creator(1, |args| Ok(Position { x: args.take(0)?, y: 0 }))
            .accessor(AccessorDecl::param::<i32>("x", 0))
            .accessor(AccessorDecl::getter("x", |p: &Position| &p.x))
            .accessor(AccessorDecl::field("y", |p: &Position| &p.y, |p: &mut Position| &mut p.y))
            .build()
    }
}

#[derive(Debug, PartialEq)]
pub struct Marker {
    pub id: i32,
    pub position: Position,
}

impl GetTypeMeta for Marker {
    fn get_type_meta() -> TypeMeta {
        BeanBuilder::<Marker>::new()
            .creator(2, |args| {
                Ok(Marker {
                    id: args.take(0)?,
                    position: args.take(1)?,
                })
            })
            .accessor(AccessorDecl::param::<i32>("id", 0))
            .accessor(AccessorDecl::param::<Position>("position", 1).unwrapped_with("pos_", ""))
            .accessor(AccessorDecl::getter("id", |m: &Marker| &m.id))
            .accessor(AccessorDecl::getter("position", |m: &Marker| &m.position))
            .build()
    }
}

// -----------------------------------------------------------------------------
// Any setter

#[derive(Debug, Default, PartialEq)]
pub struct Record {
    pub id: i32,
    pub extra: BTreeMap<String, Value>,
}

impl GetTypeMeta for Record {
    fn get_type_meta() -> TypeMeta {
        BeanBuilder::<Record>::new()
            .default_constructor(Record::default)
            .accessor(AccessorDecl::field("id", |r: &Record| &r.id, |r: &mut Record| &mut r.id))
            .any_setter(
                AnySetterDecl::map(|r: &mut Record, extra: BTreeMap<String, Value>| r.extra = extra)
                    .getter(|r: &Record| &r.extra),
            )
            .build()
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct StringBag {
    pub id: i32,
    pub extra: BTreeMap<String, String>,
}

impl GetTypeMeta for StringBag {
    fn get_type_meta() -> TypeMeta {
        BeanBuilder::<StringBag>::new()
            .default_constructor(StringBag::default)
            .accessor(AccessorDecl::field("id", |b: &StringBag| &b.id, |b: &mut StringBag| &mut b.id))
            .any_setter(AnySetterDecl::map(|b: &mut StringBag, extra: BTreeMap<String, String>| {
                b.extra = extra;
            }))
            .build()
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct EntryBag {
    pub id: i32,
    pub counts: BTreeMap<String, i64>,
}

impl GetTypeMeta for EntryBag {
    fn get_type_meta() -> TypeMeta {
        BeanBuilder::<EntryBag>::new()
            .default_constructor(EntryBag::default)
            .accessor(AccessorDecl::field("id", |b: &EntryBag| &b.id, |b: &mut EntryBag| &mut b.id))
            .any_setter(
                AnySetterDecl::entry(|b: &mut EntryBag, key: String, count: i64| {
                    b.counts.insert(key, count);
                })
                .getter(|b: &EntryBag| &b.counts),
            )
            .build()
    }
}

#[derive(Debug, PartialEq)]
pub struct ParamBag {
    pub id: i32,
    pub extra: BTreeMap<String, Value>,
}

impl GetTypeMeta for ParamBag {
    fn get_type_meta() -> TypeMeta {
        BeanBuilder::<ParamBag>::new()
            .creator(2, |args| {
                Ok(ParamBag {
                    id: args.take(0)?,
                    extra: args.take(1)?,
                })
            })
            .accessor(AccessorDecl::param::<i32>("id", 0))
            .accessor(AccessorDecl::getter("id", |b: &ParamBag| &b.id))
            .any_setter(AnySetterDecl::param::<BTreeMap<String, Value>>(1).getter(|b: &ParamBag| &b.extra))
            .build()
    }
}

// -----------------------------------------------------------------------------
// Back references

#[derive(Debug, Default)]
pub struct Parent {
    pub name: String,
    pub children: Vec<Child>,
}

impl GetTypeMeta for Parent {
    fn get_type_meta() -> TypeMeta {
        BeanBuilder::<Parent>::new()
            .default_constructor(Parent::default)
            .accessor(AccessorDecl::field("name", |p: &Parent| &p.name, |p: &mut Parent| &mut p.name))
            .accessor(
                AccessorDecl::field("children", |p: &Parent| &p.children, |p: &mut Parent| &mut p.children)
                    .required(false)
                    .managed_ref("parent"),
            )
            .build()
    }
}

#[derive(Debug, Default)]
pub struct Child {
    pub name: String,
    pub parent: BackRef<Parent>,
}

impl GetTypeMeta for Child {
    fn get_type_meta() -> TypeMeta {
        BeanBuilder::<Child>::new()
            .default_constructor(Child::default)
            .accessor(AccessorDecl::field("name", |c: &Child| &c.name, |c: &mut Child| &mut c.name))
            .accessor(
                AccessorDecl::field("parent", |c: &Child| &c.parent, |c: &mut Child| &mut c.parent)
                    .back_ref("parent"),
            )
            .build()
    }
}

// -----------------------------------------------------------------------------
// Subtypes

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Circle {
    pub radius: f64,
}

impl GetTypeMeta for Circle {
    fn get_type_meta() -> TypeMeta {
        BeanBuilder::<Circle>::new()
            .default_constructor(Circle::default)
            .accessor(AccessorDecl::field("radius", |c: &Circle| &c.radius, |c: &mut Circle| &mut c.radius))
            .build()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Square {
    pub side: f64,
}

impl GetTypeMeta for Square {
    fn get_type_meta() -> TypeMeta {
        BeanBuilder::<Square>::new()
            .default_constructor(Square::default)
            .accessor(AccessorDecl::field("side", |s: &Square| &s.side, |s: &mut Square| &mut s.side))
            .build()
    }
}

macro_rules! shape {
    ($name:ident, $placement:expr $(, default = $default:literal)?) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum $name {
            Circle(Circle),
            Square(Square),
        }

        impl GetTypeMeta for $name {
            fn get_type_meta() -> TypeMeta {
                let subtypes = SubtypesDecl::new($placement)
                    .discriminator("kind")
                    .subtype(&["circle"], $name::Circle, |s: &$name| match s {
                        $name::Circle(c) => Some(c),
                        _ => None,
                    })
                    .subtype(&["square"], $name::Square, |s: &$name| match s {
                        $name::Square(q) => Some(q),
                        _ => None,
                    });
                $(let subtypes = subtypes.default_subtype($default);)?
                BeanBuilder::<$name>::new().subtypes(subtypes).build()
            }
        }
    };
}

shape!(EmbeddedShape, SubtypePlacement::EmbeddedProperty);
shape!(ObjectShape, SubtypePlacement::WrapperObject);
shape!(ArrayShape, SubtypePlacement::WrapperArray);
shape!(ExternalShape, SubtypePlacement::ExternalProperty);
shape!(DefaultedShape, SubtypePlacement::EmbeddedProperty, default = "circle");
shape!(DeducedShape, SubtypePlacement::Deduction);

#[derive(Debug, PartialEq)]
pub struct Drawing {
    pub title: String,
    pub shape: ExternalShape,
}

impl GetTypeMeta for Drawing {
    fn get_type_meta() -> TypeMeta {
        BeanBuilder::<Drawing>::new()
            .creator(2, |args| {
                Ok(Drawing {
                    title: args.take(0)?,
                    shape: args.take(1)?,
                })
            })
            .accessor(AccessorDecl::param::<String>("title", 0))
            .accessor(AccessorDecl::param::<ExternalShape>("shape", 1).external_discriminator("kind"))
            .accessor(AccessorDecl::getter("title", |d: &Drawing| &d.title))
            .accessor(AccessorDecl::getter("shape", |d: &Drawing| &d.shape))
            .build()
    }
}
