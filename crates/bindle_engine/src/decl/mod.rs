//! Bean declarations: the metadata the introspector reads.
//!
//! A declaration lists the accessors of a type (fields, getters, setters,
//! creator parameters) with their annotations, its creators, any setters and
//! subtypes. Nothing is validated here; the
//! [introspector](crate::model::BeanModel) reports malformed declarations as
//! [`IntrospectionError`](crate::IntrospectionError)s.

// -----------------------------------------------------------------------------
// Modules

mod accessor;
mod any_setter;
mod bean;
mod creator;
pub(crate) mod erased;
mod include;
mod naming;
mod subtypes;

// -----------------------------------------------------------------------------
// Exports

pub use accessor::{AccessorDecl, DefaultValue};
pub use any_setter::AnySetterDecl;
pub use bean::{BeanBuilder, BeanDecl};
pub use creator::{Args, CreatorDecl};
pub use include::Include;
pub use naming::NamingStrategy;
pub use subtypes::{DEFAULT_DISCRIMINATOR, SubtypePlacement, SubtypesDecl};

pub(crate) use accessor::AccessorKind;
pub(crate) use any_setter::AnySetterForm;
pub(crate) use creator::ErasedCreate;
