//! Encoding: the mirror of [`de`](crate::de), driving serde serializers
//! from bean models.

// -----------------------------------------------------------------------------
// Modules

mod bean;
mod context;
mod driver;
mod typed;

#[cfg(test)]
mod tests;

// -----------------------------------------------------------------------------
// Exports

pub use context::EncodeOptions;
pub use driver::{Encoded, SerializeDriver, serialize};
