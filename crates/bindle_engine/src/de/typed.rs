use alloc::boxed::Box;

use serde_core::{Deserialize, Deserializer};
use serde_core::de::{DeserializeSeed, IgnoredAny};

use super::bean_visitor::BeanSeed;
use super::context::DecodeContext;
use super::list_visitor::ListVisitor;
use super::map_visitor::MapVisitor;
use super::option_visitor::OptionVisitor;
use crate::error::BindError;
use crate::registry::{BoxedValue, TypeKind, TypeRef};
use crate::value::Value;

/// Decodes one value of a registered type, dispatching on its [`TypeKind`].
///
/// This is the deserializer-registry lookup every property value goes
/// through; nested values recurse into a fresh `TypedSeed`.
pub(super) struct TypedSeed<'c, 'a> {
    pub ctx: &'c mut DecodeContext<'a>,
    pub ty: TypeRef,
}

impl<'c, 'a> TypedSeed<'c, 'a> {
    #[inline]
    pub fn new(ctx: &'c mut DecodeContext<'a>, ty: TypeRef) -> Self {
        Self { ctx, ty }
    }
}

impl<'de> DeserializeSeed<'de> for TypedSeed<'_, '_> {
    type Value = BoxedValue;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<BoxedValue, D::Error> {
        let meta = self.ctx.meta(self.ty).map_err(|err| self.ctx.fail(err))?;
        match meta.kind() {
            TypeKind::Leaf(adapter) => adapter
                .deserialize(deserializer)
                .inspect_err(|_| self.ctx.capture_path()),
            TypeKind::Value => Value::deserialize(deserializer)
                .map(|value| Box::new(value) as BoxedValue)
                .inspect_err(|_| self.ctx.capture_path()),
            TypeKind::Option(adapter) => deserializer.deserialize_option(OptionVisitor {
                ctx: self.ctx,
                adapter: *adapter,
            }),
            TypeKind::List(adapter) => deserializer.deserialize_seq(ListVisitor {
                ctx: self.ctx,
                adapter: *adapter,
                ty: self.ty,
            }),
            TypeKind::Map(adapter) => deserializer.deserialize_map(MapVisitor {
                ctx: self.ctx,
                adapter: *adapter,
                ty: self.ty,
            }),
            TypeKind::Bean(_) => BeanSeed::new(self.ctx, self.ty).deserialize(deserializer),
            TypeKind::Managed(adapter) => {
                let (slot, owner) = adapter.begin();
                // Only a bean can own back references.
                let owns = self
                    .ctx
                    .meta(adapter.inner())
                    .is_ok_and(|inner| inner.bean_decl().is_some());
                if owns {
                    self.ctx.pending_owner = Some(owner);
                }
                let inner = TypedSeed::new(&mut *self.ctx, adapter.inner()).deserialize(deserializer);
                self.ctx.pending_owner = None;
                adapter.finish(slot, inner?).ok_or_else(|| {
                    self.ctx.fail(BindError::Unsupported {
                        type_name: self.ty.short_name(),
                        operation: "filling a managed slot with a value of another type",
                    })
                })
            }
            TypeKind::BackRef(_) => {
                IgnoredAny::deserialize(deserializer)?;
                log::trace!("skipped wire value of back reference `{}`", self.ty);
                meta.natural_default().ok_or_else(|| {
                    self.ctx.fail(BindError::Unsupported {
                        type_name: self.ty.short_name(),
                        operation: "decoding a back reference",
                    })
                })
            }
        }
    }
}
