use alloc::string::String;
use core::any::TypeId;

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bindle_utils::TypeIdMap;

use super::{GetTypeMeta, TypeMeta, TypeRef};
use crate::error::BindError;

// -----------------------------------------------------------------------------
// TypeRegistry

/// The deserializer registry: every type the engine binds, by [`TypeId`].
///
/// [Registering] a type stores its [`TypeMeta`] and then registers the
/// types its properties refer to, so registering a root bean is usually
/// enough to make the whole graph bindable.
///
/// # Example
///
/// ```
/// use bindle_engine::registry::TypeRegistry;
///
/// let mut registry = TypeRegistry::new();
/// registry.register::<Vec<Option<String>>>();
///
/// assert!(registry.contains_type::<Option<String>>());
/// assert!(registry.contains_type::<String>());
/// ```
///
/// [Registering]: TypeRegistry::register
pub struct TypeRegistry {
    type_meta_table: TypeIdMap<TypeMeta>,
}

impl Default for TypeRegistry {
    /// See [`TypeRegistry::new`] .
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Create a empty [`TypeRegistry`].
    #[inline]
    pub const fn empty() -> Self {
        Self {
            type_meta_table: TypeIdMap::new(),
        }
    }

    /// Create a type registry with default registrations for primitive types.
    ///
    /// - `bool` `char`
    /// - `i8 - i128` `isize`
    /// - `u8 - u128` `usize`
    /// - `f32` `f64`
    /// - `String` [`Value`](crate::Value)
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register::<bool>();
        registry.register::<char>();
        registry.register::<u8>();
        registry.register::<u16>();
        registry.register::<u32>();
        registry.register::<u64>();
        registry.register::<u128>();
        registry.register::<usize>();
        registry.register::<i8>();
        registry.register::<i16>();
        registry.register::<i32>();
        registry.register::<i64>();
        registry.register::<i128>();
        registry.register::<isize>();
        registry.register::<f32>();
        registry.register::<f64>();
        registry.register::<String>();
        registry.register::<crate::Value>();
        registry
    }

    /// Attempts to register the type `T` if it has not yet been registered already.
    ///
    /// The meta is inserted before its dependencies are registered, so
    /// recursive types terminate. If `T` is already present neither it nor
    /// its dependencies are registered again.
    #[inline]
    pub fn register<T: GetTypeMeta>(&mut self) {
        if !self.contains(TypeId::of::<T>()) {
            self.register_meta(T::get_type_meta());
        }
    }

    /// Inserts `meta` if its type is absent, then registers its dependencies.
    ///
    /// Returns `false` and does nothing if the type is already registered.
    pub fn register_meta(&mut self, meta: TypeMeta) -> bool {
        let dependencies = meta.dependencies().to_vec();
        if !self.type_meta_table.try_insert(meta.ty().id(), || meta) {
            return false;
        }
        for register in dependencies {
            register(self);
        }
        true
    }

    /// Insert or **Overwrite** the meta of a type.
    ///
    /// This method will _not_ register type dependencies.
    #[inline]
    pub fn insert_type_meta(&mut self, meta: TypeMeta) {
        self.type_meta_table.insert(meta.ty().id(), meta);
    }

    /// Automatically registers all types declared via [`impl_auto_register!`].
    ///
    /// Repeated calls are cheap and will not insert duplicates.
    ///
    /// ## Return Value
    ///
    /// Returns `true` if automatic registration succeeded on the current platform; otherwise, `false`.
    ///
    /// ## Feature Dependency
    ///
    /// This method requires the `auto_register` feature. When disabled, it always do nothing and
    /// returns `false`.
    ///
    /// [`impl_auto_register!`]: crate::impl_auto_register
    #[cfg_attr(not(feature = "auto_register"), inline(always))]
    pub fn auto_register(&mut self) -> bool {
        #[cfg(feature = "auto_register")]
        {
            use crate::__macro_exports::auto_register;
            // Reduce the cost of duplicate registrations.
            if self.contains(TypeId::of::<auto_register::AvailFlag>()) {
                return true;
            }
            auto_register::register_types(self);
            self.contains(TypeId::of::<auto_register::AvailFlag>())
        }
        #[cfg(not(feature = "auto_register"))]
        {
            false
        }
    }

    /// Whether the type with given [`TypeId`] has been registered in this registry.
    #[inline]
    pub fn contains(&self, type_id: TypeId) -> bool {
        self.type_meta_table.contains(&type_id)
    }

    #[inline]
    pub fn contains_type<T: ?Sized + 'static>(&self) -> bool {
        self.contains(TypeId::of::<T>())
    }

    /// Returns the [`TypeMeta`] of the type with the given [`TypeId`].
    #[inline]
    pub fn get(&self, type_id: TypeId) -> Option<&TypeMeta> {
        self.type_meta_table.get(&type_id)
    }

    /// Like [`get`](Self::get), failing with [`BindError::UnregisteredType`].
    #[inline]
    pub fn get_ref(&self, ty: TypeRef) -> Result<&TypeMeta, BindError> {
        self.get(ty.id())
            .ok_or(BindError::UnregisteredType { type_name: ty.name() })
    }

    /// Returns an iterator over the [`TypeMeta`]s of the registered types.
    pub fn iter(&self) -> impl Iterator<Item = &TypeMeta> {
        self.type_meta_table.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.type_meta_table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.type_meta_table.is_empty()
    }
}

// -----------------------------------------------------------------------------
// TypeRegistryArc

/// A [`TypeRegistry`] shared between threads.
#[derive(Clone, Default)]
pub struct TypeRegistryArc {
    /// The wrapped [`TypeRegistry`].
    pub internal: Arc<RwLock<TypeRegistry>>,
}

impl TypeRegistryArc {
    /// Takes a read lock on the underlying [`TypeRegistry`].
    pub fn read(&self) -> RwLockReadGuard<'_, TypeRegistry> {
        self.internal.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes a write lock on the underlying [`TypeRegistry`].
    pub fn write(&self) -> RwLockWriteGuard<'_, TypeRegistry> {
        self.internal
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
