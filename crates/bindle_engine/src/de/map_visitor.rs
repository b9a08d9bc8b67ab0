use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use serde_core::de::{MapAccess, Visitor};

use super::context::DecodeContext;
use super::typed::TypedSeed;
use crate::error::BindError;
use crate::registry::{BoxedValue, MapAdapter, TypeRef};

/// A [`Visitor`] for string keyed maps.
///
/// A repeated key overwrites the earlier value.
pub(super) struct MapVisitor<'c, 'a> {
    pub ctx: &'c mut DecodeContext<'a>,
    pub adapter: MapAdapter,
    pub ty: TypeRef,
}

impl<'de> Visitor<'de> for MapVisitor<'_, '_> {
    type Value = BoxedValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of ")?;
        formatter.write_str(self.adapter.value().short_name())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<BoxedValue, A::Error> {
        let value_ty = self.adapter.value();
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or_default().min(1024));

        while let Some(key) = map.next_key::<String>()? {
            self.ctx.push_key(&key);
            let value = map.next_value_seed(TypedSeed::new(&mut *self.ctx, value_ty));
            self.ctx.pop();
            entries.push((key, value?));
        }

        self.adapter.from_entries(entries).ok_or_else(|| {
            self.ctx.fail(BindError::Unsupported {
                type_name: self.ty.short_name(),
                operation: "collecting values of another type",
            })
        })
    }
}
