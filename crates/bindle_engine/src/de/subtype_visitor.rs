use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use serde_core::de::{IgnoredAny, MapAccess, SeqAccess, Visitor};

use super::bean_visitor::BodySeed;
use super::binder::BeanBinder;
use super::context::DecodeContext;
use super::input::{Live, Replay};
use crate::error::BindError;
use crate::model::{BeanModel, SubtypeModel};
use crate::refs::OwnerHandle;
use crate::registry::{BoxedValue, TypeRef};
use crate::value::Value;

// -----------------------------------------------------------------------------
// EmbeddedVisitor

/// `{ "@type": "name", ...properties }`.
///
/// Entries before the discriminator are buffered and replayed once the
/// subtype is known; entries after it stream straight into the binder.
pub(super) struct EmbeddedVisitor<'c, 'a, 'm> {
    pub ctx: &'c mut DecodeContext<'a>,
    pub model: &'m BeanModel,
    pub subtypes: &'m SubtypeModel,
    pub owner: Option<OwnerHandle>,
}

impl<'de> Visitor<'de> for EmbeddedVisitor<'_, '_, '_> {
    type Value = BoxedValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(
            formatter,
            "an object of type {} with a `{}` key",
            self.model.ty, self.subtypes.discriminator
        )
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let Self {
            ctx,
            model,
            subtypes,
            owner,
        } = self;
        let sup = model.ty;
        let discriminator = subtypes.discriminator();

        let mut prelude: Vec<(String, Value)> = Vec::new();
        let mut tagged = false;
        let entry = loop {
            match map.next_key::<String>()? {
                Some(key) if key == discriminator => {
                    ctx.push_key(&key);
                    let result = map.next_value::<String>();
                    let tag = ctx.leave_property(result, sup, &key, TypeRef::of::<String>())?;
                    tagged = true;
                    break subtypes.resolve(&tag, sup.short_name());
                }
                Some(key) => {
                    ctx.push_key(&key);
                    let result = map.next_value::<Value>();
                    let value = ctx.leave_property(result, sup, &key, TypeRef::of::<Value>())?;
                    prelude.push((key, value));
                }
                None => break subtypes.resolve_missing(sup.short_name()),
            }
        }
        .map_err(|err| ctx.fail(err))?;

        let sub = entry.model();
        log::trace!("decoding `{}` as subtype `{}`", sup, sub.ty);
        ctx.enter(sub.ty).map_err(|err| ctx.fail(err))?;
        let result = bind_embedded(&mut *ctx, sub, owner, prelude, tagged.then_some(discriminator), sup, &mut map);
        ctx.leave();

        entry.upcast(result?, sup.short_name()).map_err(|err| ctx.fail(err))
    }
}

/// Binds the buffered prelude, then the rest of the object once tagged.
fn bind_embedded<'de, A: MapAccess<'de>>(
    ctx: &mut DecodeContext<'_>,
    model: &BeanModel,
    owner: Option<OwnerHandle>,
    prelude: Vec<(String, Value)>,
    discriminator: Option<&str>,
    sup: TypeRef,
    map: &mut A,
) -> Result<BoxedValue, A::Error> {
    let mut binder = BeanBinder::new::<A::Error>(ctx, model, owner)?;
    for (key, value) in prelude {
        binder.bind_entry(&key, Replay::<A::Error>::new(value))?;
    }
    if let Some(discriminator) = discriminator {
        while let Some(key) = map.next_key::<String>()? {
            if key == discriminator {
                return Err(binder.fail(BindError::DuplicateProperty {
                    type_name: sup.short_name(),
                    property: key,
                }));
            }
            binder.bind_entry(&key, Live(&mut *map))?;
        }
    }
    binder.finish::<A::Error>()
}

// -----------------------------------------------------------------------------
// DeductionVisitor

/// `{ ...properties }`, with the subtype deduced from the keys.
///
/// The whole object is buffered before any subtype is chosen.
pub(super) struct DeductionVisitor<'c, 'a, 'm> {
    pub ctx: &'c mut DecodeContext<'a>,
    pub model: &'m BeanModel,
    pub subtypes: &'m SubtypeModel,
    pub owner: Option<OwnerHandle>,
}

impl<'de> Visitor<'de> for DeductionVisitor<'_, '_, '_> {
    type Value = BoxedValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "an object of one of the subtypes of {}", self.model.ty)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let Self {
            ctx,
            model,
            subtypes,
            owner,
        } = self;
        let sup = model.ty;

        let mut body: Vec<(String, Value)> = Vec::new();
        while let Some(key) = map.next_key::<String>()? {
            ctx.push_key(&key);
            let result = map.next_value::<Value>();
            let value = ctx.leave_property(result, sup, &key, TypeRef::of::<Value>())?;
            body.push((key, value));
        }
        let entry = subtypes
            .deduce(body.iter().map(|(key, _)| key.as_str()), sup.short_name())
            .map_err(|err| ctx.fail(err))?;

        let sub = entry.model();
        log::trace!("deduced subtype `{}` of `{}`", sub.ty, sup);
        ctx.enter(sub.ty).map_err(|err| ctx.fail(err))?;
        let result = bind_embedded(&mut *ctx, sub, owner, body, None, sup, &mut map);
        ctx.leave();

        entry.upcast(result?, sup.short_name()).map_err(|err| ctx.fail(err))
    }
}

// -----------------------------------------------------------------------------
// WrapperObjectVisitor

/// `{ "name": { ...properties } }`.
pub(super) struct WrapperObjectVisitor<'c, 'a, 'm> {
    pub ctx: &'c mut DecodeContext<'a>,
    pub model: &'m BeanModel,
    pub subtypes: &'m SubtypeModel,
    pub owner: Option<OwnerHandle>,
}

impl<'de> Visitor<'de> for WrapperObjectVisitor<'_, '_, '_> {
    type Value = BoxedValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "an object of type {} keyed by its type name", self.model.ty)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let Self {
            ctx,
            model,
            subtypes,
            owner,
        } = self;
        let sup = model.ty;

        let Some(tag) = map.next_key::<String>()? else {
            return Err(ctx.fail(BindError::MalformedSubtype {
                type_name: sup.short_name(),
                reason: "expected an object with a type name key",
            }));
        };
        let entry = subtypes
            .resolve(&tag, sup.short_name())
            .map_err(|err| ctx.fail(err))?;
        let sub = entry.model();

        ctx.enter(sub.ty).map_err(|err| ctx.fail(err))?;
        ctx.push_key(&tag);
        let result = map.next_value_seed(BodySeed::new(&mut *ctx, sub, owner));
        let result = ctx.leave_property(result, sup, &tag, sub.ty);
        ctx.leave();
        let value = result?;

        while let Some(key) = map.next_key::<String>()? {
            if !model.ignore_unknown {
                return Err(ctx.fail(BindError::MalformedSubtype {
                    type_name: sup.short_name(),
                    reason: "expected a single type name key",
                }));
            }
            log::trace!("ignored key `{key}` after the subtype of `{sup}`");
            map.next_value::<IgnoredAny>()?;
        }

        entry.upcast(value, sup.short_name()).map_err(|err| ctx.fail(err))
    }
}

// -----------------------------------------------------------------------------
// WrapperArrayVisitor

/// `[ "name", { ...properties } ]`.
pub(super) struct WrapperArrayVisitor<'c, 'a, 'm> {
    pub ctx: &'c mut DecodeContext<'a>,
    pub model: &'m BeanModel,
    pub subtypes: &'m SubtypeModel,
    pub owner: Option<OwnerHandle>,
}

impl<'de> Visitor<'de> for WrapperArrayVisitor<'_, '_, '_> {
    type Value = BoxedValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a type name and a value of type {}", self.model.ty)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let Self {
            ctx,
            model,
            subtypes,
            owner,
        } = self;
        let sup = model.ty;
        let malformed = |reason| BindError::MalformedSubtype {
            type_name: sup.short_name(),
            reason,
        };

        let Some(tag) = seq.next_element::<String>()? else {
            return Err(ctx.fail(malformed("expected a type name")));
        };
        let entry = subtypes
            .resolve(&tag, sup.short_name())
            .map_err(|err| ctx.fail(err))?;
        let sub = entry.model();

        ctx.enter(sub.ty).map_err(|err| ctx.fail(err))?;
        ctx.push_index(1);
        let result = seq.next_element_seed(BodySeed::new(&mut *ctx, sub, owner));
        let result = ctx.leave_property(result, sup, &tag, sub.ty);
        ctx.leave();

        let Some(value) = result? else {
            return Err(ctx.fail(malformed("expected a value after the type name")));
        };
        if seq.next_element::<IgnoredAny>()?.is_some() {
            return Err(ctx.fail(malformed("expected nothing after the value")));
        }

        entry.upcast(value, sup.short_name()).map_err(|err| ctx.fail(err))
    }
}
