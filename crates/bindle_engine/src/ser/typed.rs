use core::any::Any;

use serde_core::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use super::bean::BeanValue;
use super::context::EncodeContext;
use crate::error::BindError;
use crate::registry::{TypeKind, TypeRef};
use crate::value::Value;

/// Encodes one value of a registered type, dispatching on its [`TypeKind`].
pub(super) struct TypedValue<'c, 'a, 'v> {
    ctx: &'c EncodeContext<'a>,
    ty: TypeRef,
    value: &'v dyn Any,
}

impl<'c, 'a, 'v> TypedValue<'c, 'a, 'v> {
    #[inline]
    pub fn new(ctx: &'c EncodeContext<'a>, ty: TypeRef, value: &'v dyn Any) -> Self {
        Self { ctx, ty, value }
    }

    fn mismatch<E: serde_core::ser::Error>(&self) -> E {
        self.ctx.fail(BindError::Unsupported {
            type_name: self.ty.short_name(),
            operation: "encoding a value of another type",
        })
    }
}

impl Serialize for TypedValue<'_, '_, '_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let ctx = self.ctx;
        let meta = ctx.meta(self.ty).map_err(|err| ctx.fail(err))?;
        match meta.kind() {
            TypeKind::Leaf(adapter) => adapter
                .serialize(self.value, serializer)
                .unwrap_or_else(|| Err(self.mismatch())),
            TypeKind::Value => match self.value.downcast_ref::<Value>() {
                Some(value) => value.serialize(serializer),
                None => Err(self.mismatch()),
            },
            TypeKind::Option(adapter) => match adapter.get(self.value) {
                Some(Some(inner)) => serializer.serialize_some(&TypedValue::new(ctx, adapter.inner(), inner)),
                Some(None) => serializer.serialize_none(),
                None => Err(self.mismatch()),
            },
            TypeKind::List(adapter) => {
                let Some(items) = adapter.items(self.value) else {
                    return Err(self.mismatch());
                };
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&TypedValue::new(ctx, adapter.item(), item))?;
                }
                seq.end()
            }
            TypeKind::Map(adapter) => {
                let Some(entries) = adapter.entries(self.value) else {
                    return Err(self.mismatch());
                };
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, &TypedValue::new(ctx, adapter.value(), value))?;
                }
                map.end()
            }
            TypeKind::Bean(_) => BeanValue::new(ctx, self.ty, self.value).serialize(serializer),
            TypeKind::Managed(adapter) => match adapter.get(self.value) {
                Some(inner) => TypedValue::new(ctx, adapter.inner(), inner).serialize(serializer),
                None => Err(ctx.fail(BindError::Unsupported {
                    type_name: self.ty.short_name(),
                    operation: "encoding an unfilled managed reference",
                })),
            },
            // The owner is encoded where it is managed.
            TypeKind::BackRef(_) => serializer.serialize_none(),
        }
    }
}
