//! Items used by the exported macros. Not public API.

#[cfg(feature = "auto_register")]
pub mod auto_register {
    pub use inventory;

    use crate::registry::{GetTypeMeta, TypeKind, TypeMeta, TypeRegistry};

    /// One `impl_auto_register!` submission.
    pub struct AutoRegistration(pub fn(&mut TypeRegistry));

    impl AutoRegistration {
        #[inline]
        pub const fn of<T: GetTypeMeta>() -> Self {
            Self(TypeRegistry::register::<T>)
        }
    }

    inventory::collect!(AutoRegistration);

    /// Registered only if `inventory` works on this platform.
    pub(crate) struct AvailFlag;

    impl GetTypeMeta for AvailFlag {
        fn get_type_meta() -> TypeMeta {
            TypeMeta::new::<AvailFlag>(TypeKind::Value)
        }
    }

    inventory::submit! {
        AutoRegistration::of::<AvailFlag>()
    }

    pub(crate) fn register_types(registry: &mut TypeRegistry) {
        for registration in inventory::iter::<AutoRegistration> {
            (registration.0)(registry);
        }
    }
}

/// Submits a type for [`TypeRegistry::auto_register`].
///
/// Only non-generic types can be submitted. Without the `auto_register`
/// feature the macro expands to nothing.
///
/// ```
/// use bindle_engine::decl::BeanBuilder;
/// use bindle_engine::registry::{GetTypeMeta, TypeMeta};
///
/// #[derive(Default)]
/// struct Marker;
///
/// impl GetTypeMeta for Marker {
///     fn get_type_meta() -> TypeMeta {
///         BeanBuilder::<Marker>::new()
///             .default_constructor(Marker::default)
///             .build()
///     }
/// }
///
/// bindle_engine::impl_auto_register!(Marker);
/// ```
///
/// [`TypeRegistry::auto_register`]: crate::registry::TypeRegistry::auto_register
#[cfg(feature = "auto_register")]
#[macro_export]
macro_rules! impl_auto_register {
    ($ty:ty) => {
        $crate::__macro_exports::auto_register::inventory::submit! {
            $crate::__macro_exports::auto_register::AutoRegistration::of::<$ty>()
        }
    };
}

/// Submits a type for [`TypeRegistry::auto_register`].
///
/// Without the `auto_register` feature the macro expands to nothing.
///
/// [`TypeRegistry::auto_register`]: crate::registry::TypeRegistry::auto_register
#[cfg(not(feature = "auto_register"))]
#[macro_export]
macro_rules! impl_auto_register {
    ($ty:ty) => {};
}
