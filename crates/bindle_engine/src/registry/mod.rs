//! The deserializer registry.
//!
//! ## Menu
//!
//! - [`TypeRef`]: identity and name of a bindable type.
//! - [`TypeMeta`]: how a type binds, its [`TypeKind`] and natural default.
//! - [`GetTypeMeta`]: a trait provide a function to create a `TypeMeta` from a type.
//! - [`TypeRegistry`]: a container for storing and looking up `TypeMeta`s.
//! - Adapters: the type-erased function tables behind each kind,
//!   [`LeafAdapter`], [`OptionAdapter`], [`ListAdapter`], [`MapAdapter`],
//!   [`ManagedAdapter`] and [`BackRefAdapter`].
//!
//! ## auto_register
//!
//! See [`TypeRegistry::auto_register`] .
//!
//! We use [`inventory`] crate to implement static registration,
//! not all platforms support it (although major platforms do).
//! If it is not supported, the function returns `false` without causing any errors.
//!
//! [`inventory`]: https://docs.rs/inventory

// -----------------------------------------------------------------------------
// Modules

mod adapters;
mod impls;
mod type_meta;
mod type_ref;
mod type_registry;

// -----------------------------------------------------------------------------
// Exports

pub use adapters::{
    BackRefAdapter, BoxedValue, LeafAdapter, ListAdapter, ManagedAdapter, MapAdapter,
    OptionAdapter,
};
pub use type_meta::{GetTypeMeta, TypeKind, TypeMeta};
pub use type_ref::TypeRef;
pub use type_registry::{TypeRegistry, TypeRegistryArc};
