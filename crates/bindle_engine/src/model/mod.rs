//! Bean models: the introspected form of bean declarations.
//!
//! A [`BeanModel`] is built once per type by the introspector from the
//! type's [`BeanDecl`](crate::decl::BeanDecl), cached in the process-wide
//! [`BeanCache`], and never changes afterwards. Decoding reads properties
//! through [`PropertyIndex`]es, tracking progress per object with a
//! [`Consumer`].

// -----------------------------------------------------------------------------
// Modules

mod bean;
mod cache;
mod index;
mod introspect;
mod property;
mod subtype;

// -----------------------------------------------------------------------------
// Exports

pub use bean::{
    AnySetterModel, BeanModel, DelegatingModel, PropertyLocation, UnwrappedModel,
    UnwrappedTarget,
};
pub use cache::BeanCache;
pub use index::{Consumer, NotConsumed, PropertyIndex};
pub use property::{NamedProperty, PropertyBinding, PropertyFlags, PropertyModel, PropertyOrigin};
pub use subtype::{SubtypeEntry, SubtypeModel};

pub(crate) use bean::{AnySetterKind, EncodeSlot};
