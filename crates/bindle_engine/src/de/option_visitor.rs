use core::fmt;

use serde_core::Deserializer;
use serde_core::de::{DeserializeSeed, Error, Visitor};

use super::context::DecodeContext;
use super::typed::TypedSeed;
use crate::error::BindError;
use crate::registry::{BoxedValue, OptionAdapter};

/// A [`Visitor`] for `Option<T>` values.
pub(super) struct OptionVisitor<'c, 'a> {
    pub ctx: &'c mut DecodeContext<'a>,
    pub adapter: OptionAdapter,
}

impl<'de> Visitor<'de> for OptionVisitor<'_, '_> {
    type Value = BoxedValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an optional ")?;
        formatter.write_str(self.adapter.inner().short_name())
    }

    #[inline]
    fn visit_none<E: Error>(self) -> Result<BoxedValue, E> {
        Ok(self.adapter.none())
    }

    #[inline]
    fn visit_unit<E: Error>(self) -> Result<BoxedValue, E> {
        Ok(self.adapter.none())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<BoxedValue, D::Error> {
        let inner = self.adapter.inner();
        let value = TypedSeed::new(&mut *self.ctx, inner).deserialize(deserializer)?;
        self.adapter.some(value).ok_or_else(|| {
            self.ctx.fail(BindError::Unsupported {
                type_name: inner.short_name(),
                operation: "wrapping a value of another type",
            })
        })
    }
}
