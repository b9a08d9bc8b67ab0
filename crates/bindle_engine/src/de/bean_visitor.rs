use alloc::string::String;
use alloc::vec;
use core::any::Any;
use core::fmt;

use serde_core::Deserializer;
use serde_core::de::{DeserializeSeed, IgnoredAny, MapAccess, Visitor};

use super::binder::BeanBinder;
use super::context::DecodeContext;
use super::input::Live;
use super::subtype_visitor::{DeductionVisitor, EmbeddedVisitor, WrapperArrayVisitor, WrapperObjectVisitor};
use super::typed::TypedSeed;
use crate::decl::SubtypePlacement;
use crate::error::BindError;
use crate::model::BeanModel;
use crate::refs::OwnerHandle;
use crate::registry::{BoxedValue, TypeRef};

// -----------------------------------------------------------------------------
// BeanSeed

/// Decodes a bean, counting it against the nesting limit.
pub(super) struct BeanSeed<'c, 'a> {
    ctx: &'c mut DecodeContext<'a>,
    ty: TypeRef,
}

impl<'c, 'a> BeanSeed<'c, 'a> {
    #[inline]
    pub fn new(ctx: &'c mut DecodeContext<'a>, ty: TypeRef) -> Self {
        Self { ctx, ty }
    }
}

impl<'de> DeserializeSeed<'de> for BeanSeed<'_, '_> {
    type Value = BoxedValue;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<BoxedValue, D::Error> {
        let model = self.ctx.model(self.ty).map_err(|err| self.ctx.fail(err))?;
        self.ctx.enter(self.ty).map_err(|err| self.ctx.fail(err))?;
        let owner = self.ctx.pending_owner.take();

        let result = match &model.wrapper_property {
            Some(name) => deserializer.deserialize_map(WrapperVisitor {
                ctx: &mut *self.ctx,
                model: &model,
                name,
                owner,
            }),
            None => BodySeed::new(&mut *self.ctx, &model, owner).deserialize(deserializer),
        };

        self.ctx.leave();
        result
    }
}

// -----------------------------------------------------------------------------
// BodySeed

/// Decodes the body of a bean: its subtype envelope, its delegate value or
/// its properties.
pub(super) struct BodySeed<'c, 'a, 'm> {
    ctx: &'c mut DecodeContext<'a>,
    model: &'m BeanModel,
    owner: Option<OwnerHandle>,
}

impl<'c, 'a, 'm> BodySeed<'c, 'a, 'm> {
    #[inline]
    pub fn new(ctx: &'c mut DecodeContext<'a>, model: &'m BeanModel, owner: Option<OwnerHandle>) -> Self {
        Self { ctx, model, owner }
    }
}

impl<'de> DeserializeSeed<'de> for BodySeed<'_, '_, '_> {
    type Value = BoxedValue;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<BoxedValue, D::Error> {
        let Self { ctx, model, owner } = self;

        if let Some(subtypes) = &model.subtypes {
            return match subtypes.placement() {
                SubtypePlacement::WrapperObject => deserializer.deserialize_map(WrapperObjectVisitor {
                    ctx,
                    model,
                    subtypes,
                    owner,
                }),
                SubtypePlacement::WrapperArray => deserializer.deserialize_seq(WrapperArrayVisitor {
                    ctx,
                    model,
                    subtypes,
                    owner,
                }),
                // External placement is coerced when the model is built.
                SubtypePlacement::EmbeddedProperty | SubtypePlacement::ExternalProperty => {
                    deserializer.deserialize_map(EmbeddedVisitor {
                        ctx,
                        model,
                        subtypes,
                        owner,
                    })
                }
                SubtypePlacement::Deduction => deserializer.deserialize_map(DeductionVisitor {
                    ctx,
                    model,
                    subtypes,
                    owner,
                }),
            };
        }

        if let Some(delegating) = &model.delegating {
            let arg = TypedSeed::new(&mut *ctx, delegating.arg).deserialize(deserializer)?;
            return model
                .instantiate(vec![Some(arg)])
                .map_err(|err| ctx.fail(err));
        }

        deserializer.deserialize_map(BeanVisitor { ctx, model, owner })
    }
}

// -----------------------------------------------------------------------------
// BeanVisitor

struct BeanVisitor<'c, 'a, 'm> {
    ctx: &'c mut DecodeContext<'a>,
    model: &'m BeanModel,
    owner: Option<OwnerHandle>,
}

impl<'de> Visitor<'de> for BeanVisitor<'_, '_, '_> {
    type Value = BoxedValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "an object of type {}", self.model.ty)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut binder = BeanBinder::new::<A::Error>(self.ctx, self.model, self.owner)?;
        while let Some(key) = map.next_key::<String>()? {
            binder.bind_entry(&key, Live(&mut map))?;
        }
        binder.finish::<A::Error>()
    }
}

// -----------------------------------------------------------------------------
// PatchVisitor

/// Binds an object body onto an existing instance.
pub(super) struct PatchVisitor<'c, 'a, 'm> {
    pub ctx: &'c mut DecodeContext<'a>,
    pub model: &'m BeanModel,
    pub target: &'m mut dyn Any,
}

impl<'de> Visitor<'de> for PatchVisitor<'_, '_, '_> {
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "an object of type {}", self.model.ty)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        let mut binder = BeanBinder::patch(self.ctx, self.model, self.target);
        while let Some(key) = map.next_key::<String>()? {
            binder.bind_entry(&key, Live(&mut map))?;
        }
        binder.finish_patch::<A::Error>()
    }
}

// -----------------------------------------------------------------------------
// WrapperVisitor

/// Unwraps `{ name: body }` for beans declaring a root wrapper key.
struct WrapperVisitor<'c, 'a, 'm> {
    ctx: &'c mut DecodeContext<'a>,
    model: &'m BeanModel,
    name: &'m str,
    owner: Option<OwnerHandle>,
}

impl<'de> Visitor<'de> for WrapperVisitor<'_, '_, '_> {
    type Value = BoxedValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "an object wrapping {} under `{}`", self.model.ty, self.name)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let Self { ctx, model, name, owner } = self;
        let type_name = model.ty.short_name();

        let Some(key) = map.next_key::<String>()? else {
            return Err(ctx.fail(BindError::MissingRequiredProperty {
                type_name,
                property: String::from(name),
            }));
        };
        if key != name {
            return Err(ctx.fail(BindError::UnknownProperty { type_name, property: key }));
        }

        ctx.push_key(&key);
        let result = map.next_value_seed(BodySeed::new(&mut *ctx, model, owner));
        let value = ctx.leave_property(result, model.ty, name, model.ty)?;

        while let Some(key) = map.next_key::<String>()? {
            if !model.ignore_unknown {
                return Err(ctx.fail(BindError::UnknownProperty { type_name, property: key }));
            }
            map.next_value::<IgnoredAny>()?;
        }
        Ok(value)
    }
}
