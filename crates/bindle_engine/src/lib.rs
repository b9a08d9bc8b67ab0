#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// no_std support

extern crate alloc;
extern crate std;

// -----------------------------------------------------------------------------
// Modules

mod error;
mod refs;
mod value;

pub mod de;
pub mod decl;
pub mod model;
pub mod registry;
pub mod ser;

#[cfg(test)]
mod fixtures;

// -----------------------------------------------------------------------------
// Top-Level exports

pub mod __macro_exports;

pub use de::{DecodeOptions, DeserializeDriver, deserialize, deserialize_into};
pub use error::{BindError, CreateError, IntrospectionError};
pub use refs::{BackRef, Managed, OwnerHandle, PropertyReferenceResolver, ReferenceFrame};
pub use ser::{EncodeOptions, Encoded, SerializeDriver, serialize};
pub use value::{Value, ValueDeserializer};

/// The most common items, for glob import.
pub mod prelude {
    pub use crate::decl::{AccessorDecl, Args, BeanBuilder, Include, SubtypePlacement, SubtypesDecl};
    pub use crate::registry::{GetTypeMeta, TypeMeta, TypeRegistry};
    pub use crate::{BackRef, BindError, DeserializeDriver, Managed, SerializeDriver, Value};
}
