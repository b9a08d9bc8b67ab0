use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use super::Include;
use super::erased::{ErasedGetter, ErasedSetter, FieldSetter, FnGetter, FnSetter};
use crate::registry::{BoxedValue, GetTypeMeta, TypeRef, TypeRegistry};

// -----------------------------------------------------------------------------
// DefaultValue

/// An explicit default of a property, used when the property is absent.
#[derive(Clone)]
pub struct DefaultValue {
    ty: TypeRef,
    make: Arc<dyn Fn() -> BoxedValue + Send + Sync>,
}

impl DefaultValue {
    pub fn of<V: Clone + Send + Sync + 'static>(value: V) -> Self {
        Self {
            ty: TypeRef::of::<V>(),
            make: Arc::new(move || Box::new(value.clone())),
        }
    }

    #[inline]
    pub fn ty(&self) -> TypeRef {
        self.ty
    }

    /// Creates a fresh copy of the default.
    #[inline]
    pub fn make(&self) -> BoxedValue {
        (self.make)()
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DefaultValue({})", self.ty)
    }
}

// -----------------------------------------------------------------------------
// AccessorDecl

/// The element a property is reached through.
#[derive(Clone)]
pub(crate) enum AccessorKind {
    /// Readable and writable.
    Field {
        get: Arc<dyn ErasedGetter>,
        set: Arc<dyn ErasedSetter>,
    },
    Getter(Arc<dyn ErasedGetter>),
    Setter(Arc<dyn ErasedSetter>),
    /// Positional creator parameter.
    Param(usize),
}

impl AccessorKind {
    /// Name precedence: getter, setter, field, creator parameter.
    #[inline]
    pub(crate) fn priority(&self) -> u8 {
        match self {
            AccessorKind::Getter(_) => 0,
            AccessorKind::Setter(_) => 1,
            AccessorKind::Field { .. } => 2,
            AccessorKind::Param(_) => 3,
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            AccessorKind::Getter(_) => "getter",
            AccessorKind::Setter(_) => "setter",
            AccessorKind::Field { .. } => "field",
            AccessorKind::Param(_) => "creator parameter",
        }
    }
}

/// One declared accessor of a bean property with its annotations.
///
/// Accessors sharing a name describe the same logical property; the
/// introspector merges them.
///
/// ```
/// use bindle_engine::decl::AccessorDecl;
///
/// struct Person {
///     name: String,
///     age: u32,
/// }
///
/// let name = AccessorDecl::param::<String>("name", 0).rename("full_name");
/// let age = AccessorDecl::field("age", |p: &Person| &p.age, |p: &mut Person| &mut p.age)
///     .alias("years")
///     .required(false);
/// # let _ = (name, age);
/// ```
#[derive(Clone)]
pub struct AccessorDecl {
    pub(crate) kind: AccessorKind,
    pub(crate) name: String,
    pub(crate) owner: Option<TypeRef>,
    pub(crate) ty: TypeRef,
    pub(crate) rename: Option<String>,
    pub(crate) aliases: Vec<String>,
    pub(crate) required: Option<bool>,
    pub(crate) nullable: Option<bool>,
    pub(crate) ignored: bool,
    pub(crate) default: Option<DefaultValue>,
    pub(crate) unwrapped: Option<(String, String)>,
    pub(crate) managed_ref: Option<String>,
    pub(crate) back_ref: Option<String>,
    pub(crate) views: Option<Vec<&'static str>>,
    pub(crate) external_discriminator: Option<String>,
    pub(crate) include: Option<Include>,
    pub(crate) dependency: fn(&mut TypeRegistry),
}

impl AccessorDecl {
    fn new<P: GetTypeMeta>(kind: AccessorKind, name: String, owner: Option<TypeRef>) -> Self {
        Self {
            kind,
            name,
            owner,
            ty: TypeRef::of::<P>(),
            rename: None,
            aliases: Vec::new(),
            required: None,
            nullable: None,
            ignored: false,
            default: None,
            unwrapped: None,
            managed_ref: None,
            back_ref: None,
            views: None,
            external_discriminator: None,
            include: None,
            dependency: TypeRegistry::register::<P>,
        }
    }

    /// A readable and writable field.
    pub fn field<T: 'static, P: GetTypeMeta>(
        name: impl Into<String>,
        get: fn(&T) -> &P,
        get_mut: fn(&mut T) -> &mut P,
    ) -> Self {
        let kind = AccessorKind::Field {
            get: Arc::new(FnGetter { f: get }),
            set: Arc::new(FieldSetter { f: get_mut }),
        };
        Self::new::<P>(kind, name.into(), Some(TypeRef::of::<T>()))
    }

    /// A read accessor. A property with only getters is written but never read.
    pub fn getter<T: 'static, P: GetTypeMeta>(name: impl Into<String>, get: fn(&T) -> &P) -> Self {
        let kind = AccessorKind::Getter(Arc::new(FnGetter { f: get }));
        Self::new::<P>(kind, name.into(), Some(TypeRef::of::<T>()))
    }

    /// A write accessor, applied after the instance is created.
    pub fn setter<T: 'static, P: GetTypeMeta>(name: impl Into<String>, set: fn(&mut T, P)) -> Self {
        let kind = AccessorKind::Setter(Arc::new(FnSetter { f: set }));
        Self::new::<P>(kind, name.into(), Some(TypeRef::of::<T>()))
    }

    /// The creator parameter at `index`.
    pub fn param<P: GetTypeMeta>(name: impl Into<String>, index: usize) -> Self {
        Self::new::<P>(AccessorKind::Param(index), name.into(), None)
    }

    /// Overrides the implicit name.
    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.rename = Some(name.into());
        self
    }

    /// Adds an alternative key accepted when decoding.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// Removes this accessor from consideration.
    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    /// Value used when the property is absent. Must be of the property's type.
    pub fn default_value<V: Clone + Send + Sync + 'static>(mut self, value: V) -> Self {
        self.default = Some(DefaultValue::of(value));
        self
    }

    /// Flattens the nested bean's properties into the parent.
    #[inline]
    pub fn unwrapped(self) -> Self {
        self.unwrapped_with("", "")
    }

    /// Flattens the nested bean, naming its keys `{prefix}{name}{suffix}`.
    pub fn unwrapped_with(mut self, prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        self.unwrapped = Some((prefix.into(), suffix.into()));
        self
    }

    /// Makes the owning bean the target of `back_ref(label)` properties
    /// nested in this property's value.
    pub fn managed_ref(mut self, label: impl Into<String>) -> Self {
        self.managed_ref = Some(label.into());
        self
    }

    /// Binds this property from the nearest enclosing `managed_ref(label)`.
    pub fn back_ref(mut self, label: impl Into<String>) -> Self {
        self.back_ref = Some(label.into());
        self
    }

    /// Only binds or writes the property while one of `views` is active.
    pub fn views(mut self, views: &[&'static str]) -> Self {
        self.views = Some(views.to_vec());
        self
    }

    /// Places the subtype discriminator of this property's value in a
    /// sibling property named `name`.
    pub fn external_discriminator(mut self, name: impl Into<String>) -> Self {
        self.external_discriminator = Some(name.into());
        self
    }

    /// Overrides the bean's [`Include`] policy for this property.
    pub fn include(mut self, include: Include) -> Self {
        self.include = Some(include);
        self
    }

    /// The declared name, before renaming.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn ty(&self) -> TypeRef {
        self.ty
    }
}

impl fmt::Debug for AccessorDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorDecl")
            .field("kind", &self.kind.label())
            .field("name", &self.name)
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}
