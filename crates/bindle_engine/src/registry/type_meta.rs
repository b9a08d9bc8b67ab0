use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use serde_core::Serialize;
use serde_core::de::DeserializeOwned;

use super::adapters::{
    BackRefAdapter, BoxedValue, LeafAdapter, ListAdapter, ManagedAdapter, MapAdapter,
    OptionAdapter,
};
use super::{TypeRef, TypeRegistry};
use crate::decl::BeanDecl;

// -----------------------------------------------------------------------------
// TypeKind

/// How values of a registered type are bound.
#[derive(Clone)]
pub enum TypeKind {
    /// Bound as a whole through serde.
    Leaf(LeafAdapter),
    /// The dynamic [`Value`](crate::Value) tree.
    Value,
    Option(OptionAdapter),
    List(ListAdapter),
    Map(MapAdapter),
    /// A structured type bound property by property.
    Bean(Arc<BeanDecl>),
    /// An owner slot that back references point to.
    Managed(ManagedAdapter),
    /// A back reference, bound from the enclosing managed reference.
    BackRef(BackRefAdapter),
}

impl TypeKind {
    /// A short name of the kind, used in error messages and logs.
    pub fn name(&self) -> &'static str {
        match self {
            TypeKind::Leaf(_) => "leaf",
            TypeKind::Value => "value",
            TypeKind::Option(_) => "option",
            TypeKind::List(_) => "list",
            TypeKind::Map(_) => "map",
            TypeKind::Bean(_) => "bean",
            TypeKind::Managed(_) => "managed",
            TypeKind::BackRef(_) => "back reference",
        }
    }
}

impl fmt::Debug for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// -----------------------------------------------------------------------------
// TypeMeta

/// Registry entry of one type.
///
/// Created by [`GetTypeMeta::get_type_meta`] and stored in a
/// [`TypeRegistry`].
#[derive(Clone)]
pub struct TypeMeta {
    ty: TypeRef,
    kind: TypeKind,
    default: Option<fn() -> BoxedValue>,
    dependencies: Vec<fn(&mut TypeRegistry)>,
}

fn default_boxed<T: Default + 'static>() -> BoxedValue {
    Box::new(T::default())
}

impl TypeMeta {
    #[inline]
    pub fn new<T: 'static>(kind: TypeKind) -> Self {
        Self {
            ty: TypeRef::of::<T>(),
            kind,
            default: None,
            dependencies: Vec::new(),
        }
    }

    /// A leaf type with no natural default; absent optional values of it
    /// are a missing-property error.
    #[inline]
    pub fn leaf<T: DeserializeOwned + Serialize + 'static>() -> Self {
        Self::new::<T>(TypeKind::Leaf(LeafAdapter::of::<T>()))
    }

    /// A leaf type whose [`Default`] is used when a non-required value is absent.
    #[inline]
    pub fn leaf_default<T: DeserializeOwned + Serialize + Default + 'static>() -> Self {
        Self::leaf::<T>().with_default::<T>()
    }

    /// A bean type described by `decl`.
    pub fn bean<T: 'static>(decl: BeanDecl) -> Self {
        let dependencies = decl.dependencies().to_vec();
        let mut meta = Self::new::<T>(TypeKind::Bean(Arc::new(decl)));
        meta.dependencies = dependencies;
        meta
    }

    /// Sets the natural default used for absent, non-required values.
    ///
    /// `D` must be the described type.
    #[inline]
    pub fn with_default<D: Default + 'static>(mut self) -> Self {
        debug_assert!(self.ty.is::<D>(), "default of another type");
        self.default = Some(default_boxed::<D>);
        self
    }

    /// Registers `D` together with this type.
    #[inline]
    pub fn with_dependency<D: GetTypeMeta>(mut self) -> Self {
        self.dependencies.push(TypeRegistry::register::<D>);
        self
    }

    #[inline(always)]
    pub fn ty(&self) -> TypeRef {
        self.ty
    }

    #[inline(always)]
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// Returns the bean declaration if this is a bean type.
    #[inline]
    pub fn bean_decl(&self) -> Option<&Arc<BeanDecl>> {
        match &self.kind {
            TypeKind::Bean(decl) => Some(decl),
            _ => None,
        }
    }

    /// The value an absent, non-required property of this type takes.
    ///
    /// Options are `None`, lists and maps are empty, back references dangle.
    pub fn natural_default(&self) -> Option<BoxedValue> {
        if let Some(default) = self.default {
            return Some(default());
        }
        match &self.kind {
            TypeKind::Option(adapter) => Some(adapter.none()),
            TypeKind::List(adapter) => adapter.from_items(Vec::new()),
            TypeKind::Map(adapter) => adapter.from_entries(Vec::new()),
            TypeKind::Value => Some(Box::new(crate::Value::Null)),
            _ => None,
        }
    }

    /// The value an explicit null of a nullable property binds to.
    pub fn null_value(&self) -> Option<BoxedValue> {
        match &self.kind {
            TypeKind::Option(adapter) => Some(adapter.none()),
            TypeKind::Value => Some(Box::new(crate::Value::Null)),
            _ => self.natural_default(),
        }
    }

    /// Returns `true` if the type has a null representation of its own.
    #[inline]
    pub fn accepts_null(&self) -> bool {
        matches!(self.kind, TypeKind::Option(_) | TypeKind::Value)
    }

    #[inline]
    pub(crate) fn dependencies(&self) -> &[fn(&mut TypeRegistry)] {
        &self.dependencies
    }
}

impl fmt::Debug for TypeMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMeta")
            .field("ty", &self.ty)
            .field("kind", &self.kind)
            .field("dependencies", &self.dependencies.len())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// GetTypeMeta

/// Types that can describe themselves to a [`TypeRegistry`].
///
/// Bean types implement it with [`BeanBuilder`](crate::decl::BeanBuilder):
///
/// ```
/// use bindle_engine::decl::{AccessorDecl, BeanBuilder};
/// use bindle_engine::registry::{GetTypeMeta, TypeMeta};
///
/// #[derive(Default)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl GetTypeMeta for Point {
///     fn get_type_meta() -> TypeMeta {
///         BeanBuilder::<Point>::new()
///             .default_constructor(Point::default)
///             .accessor(AccessorDecl::field("x", |p: &Point| &p.x, |p: &mut Point| &mut p.x))
///             .accessor(AccessorDecl::field("y", |p: &Point| &p.y, |p: &mut Point| &mut p.y))
///             .build()
///     }
/// }
/// ```
pub trait GetTypeMeta: 'static {
    fn get_type_meta() -> TypeMeta;
}
