use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;

use super::{AccessorDecl, AnySetterDecl, Args, CreatorDecl, Include, NamingStrategy, SubtypesDecl};
use crate::error::CreateError;
use crate::registry::{GetTypeMeta, TypeMeta, TypeRef, TypeRegistry};

// -----------------------------------------------------------------------------
// BeanDecl

/// Everything declared about one bean type.
///
/// Turned into a [`BeanModel`](crate::model::BeanModel) the first time the
/// type is bound.
#[derive(Clone)]
pub struct BeanDecl {
    pub(crate) ty: TypeRef,
    pub(crate) accessors: Vec<AccessorDecl>,
    pub(crate) creators: Vec<CreatorDecl>,
    pub(crate) any_setters: Vec<AnySetterDecl>,
    pub(crate) ignore_unknown: bool,
    pub(crate) wrapper_property: Option<String>,
    pub(crate) naming: Option<NamingStrategy>,
    pub(crate) include: Option<Include>,
    pub(crate) subtypes: Option<SubtypesDecl>,
    dependencies: Vec<fn(&mut TypeRegistry)>,
}

impl BeanDecl {
    pub fn new(ty: TypeRef) -> Self {
        Self {
            ty,
            accessors: Vec::new(),
            creators: Vec::new(),
            any_setters: Vec::new(),
            ignore_unknown: false,
            wrapper_property: None,
            naming: None,
            include: None,
            subtypes: None,
            dependencies: Vec::new(),
        }
    }

    #[inline]
    pub fn ty(&self) -> TypeRef {
        self.ty
    }

    #[inline]
    pub fn accessors(&self) -> &[AccessorDecl] {
        &self.accessors
    }

    #[inline]
    pub fn subtypes(&self) -> Option<&SubtypesDecl> {
        self.subtypes.as_ref()
    }

    /// Registrations of every type the declaration refers to.
    #[inline]
    pub(crate) fn dependencies(&self) -> &[fn(&mut TypeRegistry)] {
        &self.dependencies
    }

    pub fn push_accessor(&mut self, accessor: AccessorDecl) {
        self.dependencies.push(accessor.dependency);
        self.accessors.push(accessor);
    }

    pub fn push_creator(&mut self, creator: CreatorDecl) {
        if let Some(delegate) = &creator.delegate {
            self.dependencies.push(delegate.dependency);
        }
        self.creators.push(creator);
    }

    pub fn push_any_setter(&mut self, any_setter: AnySetterDecl) {
        self.dependencies.extend_from_slice(&any_setter.dependencies);
        self.any_setters.push(any_setter);
    }

    pub fn set_subtypes(&mut self, subtypes: SubtypesDecl) {
        self.dependencies
            .extend(subtypes.subtypes.iter().map(|s| s.dependency));
        self.subtypes = Some(subtypes);
    }
}

impl fmt::Debug for BeanDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDecl")
            .field("ty", &self.ty)
            .field("accessors", &self.accessors)
            .field("creators", &self.creators)
            .field("any_setters", &self.any_setters)
            .field("ignore_unknown", &self.ignore_unknown)
            .field("wrapper_property", &self.wrapper_property)
            .field("naming", &self.naming)
            .field("include", &self.include)
            .field("subtypes", &self.subtypes)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// BeanBuilder

/// Builds the [`TypeMeta`] of a bean type `T`.
///
/// ```
/// use bindle_engine::decl::{AccessorDecl, BeanBuilder};
/// use bindle_engine::registry::{GetTypeMeta, TypeMeta};
///
/// struct Person {
///     name: String,
///     nick: Option<String>,
/// }
///
/// impl GetTypeMeta for Person {
///     fn get_type_meta() -> TypeMeta {
///         BeanBuilder::<Person>::new()
///             .creator(2, |args| {
///                 Ok(Person {
///                     name: args.take(0)?,
///                     nick: args.take_or_default(1)?,
///                 })
///             })
///             .accessor(AccessorDecl::param::<String>("name", 0))
///             .accessor(AccessorDecl::param::<Option<String>>("nick", 1))
///             .accessor(AccessorDecl::getter("name", |p: &Person| &p.name))
///             .accessor(AccessorDecl::getter("nick", |p: &Person| &p.nick))
///             .build()
///     }
/// }
/// ```
pub struct BeanBuilder<T> {
    decl: BeanDecl,
    marker: PhantomData<fn() -> T>,
}

impl<T: 'static> Default for BeanBuilder<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> BeanBuilder<T> {
    pub fn new() -> Self {
        Self {
            decl: BeanDecl::new(TypeRef::of::<T>()),
            marker: PhantomData,
        }
    }

    pub fn accessor(mut self, accessor: AccessorDecl) -> Self {
        debug_assert!(
            accessor.owner.is_none_or(|owner| owner.is::<T>()),
            "accessor `{}` belongs to another type",
            accessor.name,
        );
        self.decl.push_accessor(accessor);
        self
    }

    /// A creator taking `arity` positional arguments.
    pub fn creator(
        mut self,
        arity: usize,
        create: impl Fn(&mut Args) -> Result<T, CreateError> + Send + Sync + 'static,
    ) -> Self {
        self.decl.push_creator(CreatorDecl::new(arity, create));
        self
    }

    /// A creator without arguments; every property is bound through its
    /// setter or field.
    pub fn default_constructor(mut self, create: fn() -> T) -> Self {
        self.decl
            .push_creator(CreatorDecl::new(0, move |_: &mut Args| Ok(create())));
        self
    }

    /// Builds `T` from a single value of type `A` instead of named properties.
    pub fn delegating<A: GetTypeMeta>(mut self, create: fn(A) -> T, value_of: fn(&T) -> &A) -> Self {
        self.decl
            .push_creator(CreatorDecl::delegating(create, value_of));
        self
    }

    pub fn any_setter(mut self, any_setter: AnySetterDecl) -> Self {
        self.decl.push_any_setter(any_setter);
        self
    }

    /// Skips keys that match no property instead of failing.
    pub fn ignore_unknown(mut self, ignore: bool) -> Self {
        self.decl.ignore_unknown = ignore;
        self
    }

    /// Wraps every encoded value in a single-key object named `name`.
    pub fn wrapper_property(mut self, name: impl Into<String>) -> Self {
        self.decl.wrapper_property = Some(name.into());
        self
    }

    pub fn rename_all(mut self, naming: NamingStrategy) -> Self {
        self.decl.naming = Some(naming);
        self
    }

    /// The default [`Include`] policy of the bean's properties.
    pub fn include(mut self, include: Include) -> Self {
        self.decl.include = Some(include);
        self
    }

    pub fn subtypes(mut self, subtypes: SubtypesDecl) -> Self {
        self.decl.set_subtypes(subtypes);
        self
    }

    #[inline]
    pub fn into_decl(self) -> BeanDecl {
        self.decl
    }

    #[inline]
    pub fn build(self) -> TypeMeta {
        TypeMeta::bean::<T>(self.decl)
    }
}
