use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use super::erased::{ErasedConvert, ErasedGetter, FnConvert, FnProbe};
use crate::registry::{GetTypeMeta, TypeRef, TypeRegistry};

/// Where the discriminator of a subtyped value is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SubtypePlacement {
    /// `{"@type": "circle", "radius": 5}`
    #[default]
    EmbeddedProperty,
    /// `{"circle": {"radius": 5}}`
    WrapperObject,
    /// `["circle", {"radius": 5}]`
    WrapperArray,
    /// `{"shape_type": "circle", "shape": {"radius": 5}}`, declared on the
    /// referencing property with
    /// [`external_discriminator`](super::AccessorDecl::external_discriminator).
    ExternalProperty,
    /// `{"radius": 5}`, no discriminator at all: the subtype is the one
    /// whose properties cover every key of the object.
    Deduction,
}

/// Discriminator property name used when none is declared.
pub const DEFAULT_DISCRIMINATOR: &str = "@type";

/// One concrete subtype of a polymorphic type.
#[derive(Clone)]
pub(crate) struct SubtypeDecl {
    pub ty: TypeRef,
    pub names: Vec<String>,
    pub upcast: Arc<dyn ErasedConvert>,
    pub downcast: Arc<dyn ErasedGetter>,
    pub dependency: fn(&mut TypeRegistry),
}

/// The subtypes of a polymorphic type and how they are told apart.
///
/// ```
/// use bindle_engine::decl::{SubtypePlacement, SubtypesDecl};
///
/// struct Circle { radius: i32 }
/// struct Square { side: i32 }
/// enum Shape { Circle(Circle), Square(Square) }
/// # use bindle_engine::registry::{GetTypeMeta, TypeMeta};
/// # use bindle_engine::decl::BeanBuilder;
/// # impl GetTypeMeta for Circle { fn get_type_meta() -> TypeMeta { unimplemented!() } }
/// # impl GetTypeMeta for Square { fn get_type_meta() -> TypeMeta { unimplemented!() } }
///
/// let subtypes = SubtypesDecl::new(SubtypePlacement::EmbeddedProperty)
///     .discriminator("kind")
///     .subtype(&["circle"], Shape::Circle, |s| match s {
///         Shape::Circle(c) => Some(c),
///         _ => None,
///     })
///     .subtype(&["square"], Shape::Square, |s| match s {
///         Shape::Square(q) => Some(q),
///         _ => None,
///     });
/// # let _ = subtypes;
/// ```
#[derive(Clone)]
pub struct SubtypesDecl {
    pub(crate) placement: SubtypePlacement,
    pub(crate) discriminator: String,
    pub(crate) subtypes: Vec<SubtypeDecl>,
    pub(crate) default_subtype: Option<String>,
}

impl SubtypesDecl {
    pub fn new(placement: SubtypePlacement) -> Self {
        Self {
            placement,
            discriminator: String::from(DEFAULT_DISCRIMINATOR),
            subtypes: Vec::new(),
            default_subtype: None,
        }
    }

    /// Name of the discriminator property for embedded placement.
    pub fn discriminator(mut self, name: impl Into<String>) -> Self {
        self.discriminator = name.into();
        self
    }

    /// Adds subtype `S` under `names`; its short type name if `names` is empty.
    ///
    /// `upcast` wraps a decoded `S` into the supertype, `downcast` finds it
    /// again when encoding.
    pub fn subtype<T: 'static, S: GetTypeMeta>(
        mut self,
        names: &[&str],
        upcast: fn(S) -> T,
        downcast: fn(&T) -> Option<&S>,
    ) -> Self {
        self.subtypes.push(SubtypeDecl {
            ty: TypeRef::of::<S>(),
            names: names.iter().map(|n| String::from(*n)).collect(),
            upcast: Arc::new(FnConvert { f: upcast }),
            downcast: Arc::new(FnProbe { f: downcast }),
            dependency: TypeRegistry::register::<S>,
        });
        self
    }

    /// The subtype used when the discriminator is absent or not recognized.
    pub fn default_subtype(mut self, name: impl Into<String>) -> Self {
        self.default_subtype = Some(name.into());
        self
    }

    #[inline]
    pub fn placement(&self) -> SubtypePlacement {
        self.placement
    }
}

impl fmt::Debug for SubtypesDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubtypesDecl")
            .field("placement", &self.placement)
            .field("discriminator", &self.discriminator)
            .field(
                "subtypes",
                &self.subtypes.iter().map(|s| (s.ty, &s.names)).collect::<Vec<_>>(),
            )
            .field("default_subtype", &self.default_subtype)
            .finish()
    }
}
