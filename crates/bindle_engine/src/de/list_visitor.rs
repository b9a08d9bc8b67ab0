use alloc::vec::Vec;
use core::fmt;

use serde_core::de::{SeqAccess, Visitor};

use super::context::DecodeContext;
use super::typed::TypedSeed;
use crate::error::BindError;
use crate::registry::{BoxedValue, ListAdapter, TypeRef};

/// A [`Visitor`] for list values.
pub(super) struct ListVisitor<'c, 'a> {
    pub ctx: &'c mut DecodeContext<'a>,
    pub adapter: ListAdapter,
    pub ty: TypeRef,
}

impl<'de> Visitor<'de> for ListVisitor<'_, '_> {
    type Value = BoxedValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a list of ")?;
        formatter.write_str(self.adapter.item().short_name())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<BoxedValue, A::Error> {
        let item = self.adapter.item();
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or_default().min(1024));

        loop {
            self.ctx.push_index(items.len());
            let next = seq.next_element_seed(TypedSeed::new(&mut *self.ctx, item));
            self.ctx.pop();
            match next? {
                Some(value) => items.push(value),
                None => break,
            }
        }

        self.adapter.from_items(items).ok_or_else(|| {
            self.ctx.fail(BindError::Unsupported {
                type_name: self.ty.short_name(),
                operation: "collecting items of another type",
            })
        })
    }
}
