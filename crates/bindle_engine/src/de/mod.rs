//! Decoding: the binding state machine that drives serde deserializers.
//!
//! Every value is decoded through a [`TypedSeed`](typed::TypedSeed) that
//! dispatches on the registered [`TypeKind`](crate::registry::TypeKind).
//! Beans stream their object entries into a binder that tracks consumed
//! properties, collects creator arguments and instantiates once the object
//! ends. Typed failures are stashed in the per-call context and returned
//! by the driver in place of the format's own error.

// -----------------------------------------------------------------------------
// Modules

mod bean_visitor;
mod binder;
mod context;
mod driver;
mod input;
mod list_visitor;
mod map_visitor;
mod option_visitor;
mod subtype_visitor;
mod typed;

#[cfg(test)]
mod tests;

// -----------------------------------------------------------------------------
// Exports

pub use context::DecodeOptions;
pub use driver::{DeserializeDriver, deserialize, deserialize_into};
