use alloc::format;
use alloc::string::String;
use core::any::Any;

use serde_core::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use super::context::EncodeContext;
use super::typed::TypedValue;
use crate::decl::{Include, SubtypePlacement};
use crate::error::BindError;
use crate::model::{BeanModel, EncodeSlot, PropertyModel};
use crate::registry::{TypeKind, TypeRef};
use crate::value::Value;

// -----------------------------------------------------------------------------
// BeanValue

/// A bean, inside its root wrapper key if it declares one.
pub(super) struct BeanValue<'c, 'a, 'v> {
    ctx: &'c EncodeContext<'a>,
    ty: TypeRef,
    value: &'v dyn Any,
}

impl<'c, 'a, 'v> BeanValue<'c, 'a, 'v> {
    #[inline]
    pub fn new(ctx: &'c EncodeContext<'a>, ty: TypeRef, value: &'v dyn Any) -> Self {
        Self { ctx, ty, value }
    }
}

impl Serialize for BeanValue<'_, '_, '_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let ctx = self.ctx;
        let model = ctx.model(self.ty).map_err(|err| ctx.fail(err))?;
        let body = BodyValue {
            ctx,
            model: &model,
            value: self.value,
        };
        match &model.wrapper_property {
            Some(name) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(name.as_str(), &body)?;
                map.end()
            }
            None => body.serialize(serializer),
        }
    }
}

// -----------------------------------------------------------------------------
// BodyValue

struct BodyValue<'c, 'a, 'm, 'v> {
    ctx: &'c EncodeContext<'a>,
    model: &'m BeanModel,
    value: &'v dyn Any,
}

impl Serialize for BodyValue<'_, '_, '_, '_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let Self { ctx, model, value } = *self;

        if let Some(subtypes) = &model.subtypes {
            let Some((entry, inner)) = subtypes.find_value(value) else {
                return Err(ctx.fail(BindError::Unsupported {
                    type_name: model.ty.short_name(),
                    operation: "encoding a value of no declared subtype",
                }));
            };
            let body = BodyValue {
                ctx,
                model: entry.model(),
                value: inner,
            };
            return match subtypes.placement() {
                SubtypePlacement::WrapperObject => {
                    let mut map = serializer.serialize_map(Some(1))?;
                    map.serialize_entry(entry.name(), &body)?;
                    map.end()
                }
                SubtypePlacement::WrapperArray => {
                    let mut seq = serializer.serialize_seq(Some(2))?;
                    seq.serialize_element(entry.name())?;
                    seq.serialize_element(&body)?;
                    seq.end()
                }
                SubtypePlacement::EmbeddedProperty | SubtypePlacement::ExternalProperty => {
                    let mut map = serializer.serialize_map(None)?;
                    map.serialize_entry(subtypes.discriminator(), entry.name())?;
                    write_members(ctx, entry.model(), inner, Affixes::NONE, &mut map)?;
                    map.end()
                }
                SubtypePlacement::Deduction => body.serialize(serializer),
            };
        }

        if let Some(delegating) = &model.delegating {
            let Some(arg) = delegating.value_of.get(value) else {
                return Err(ctx.fail(BindError::Unsupported {
                    type_name: model.ty.short_name(),
                    operation: "encoding a value of another type",
                }));
            };
            return TypedValue::new(ctx, delegating.arg, arg).serialize(serializer);
        }

        let mut map = serializer.serialize_map(None)?;
        write_members(ctx, model, value, Affixes::NONE, &mut map)?;
        map.end()
    }
}

// -----------------------------------------------------------------------------
// Members

/// Prefix and suffix of an unwrapped bean's keys.
#[derive(Clone, Copy)]
struct Affixes<'p> {
    prefix: &'p str,
    suffix: &'p str,
}

impl Affixes<'static> {
    const NONE: Self = Self {
        prefix: "",
        suffix: "",
    };
}

/// Writes the properties of `value` into an open map, in declaration order.
fn write_members<M: SerializeMap>(
    ctx: &EncodeContext<'_>,
    model: &BeanModel,
    value: &dyn Any,
    affixes: Affixes<'_>,
    map: &mut M,
) -> Result<(), M::Error> {
    let views = ctx.views();
    for slot in &model.encode {
        match *slot {
            EncodeSlot::Property(location) => {
                let Some(property) = model.property(location) else {
                    continue;
                };
                if !is_encoded(ctx, property, views) {
                    continue;
                }
                let Some(member) = property.reader.as_ref().and_then(|reader| reader.get(value)) else {
                    continue;
                };
                let key = affixed(affixes, &property.name);
                match &property.external_discriminator {
                    Some(discriminator) => {
                        let sup = ctx.model(property.ty).map_err(|err| ctx.fail(err))?;
                        let found = sup.subtypes().and_then(|subtypes| subtypes.find_value(member));
                        let Some((entry, inner)) = found else {
                            return Err(ctx.fail(BindError::Unsupported {
                                type_name: property.ty.short_name(),
                                operation: "encoding a value of no declared subtype",
                            }));
                        };
                        map.serialize_entry(&affixed(affixes, discriminator), entry.name())?;
                        map.serialize_entry(
                            &key,
                            &BodyValue {
                                ctx,
                                model: entry.model(),
                                value: inner,
                            },
                        )?;
                    }
                    None if is_suppressed(ctx, property.include, property.ty, member) => {}
                    None => map.serialize_entry(&key, &TypedValue::new(ctx, property.ty, member))?,
                }
            }
            EncodeSlot::Unwrapped(slot) => {
                let Some(unwrapped) = model.unwrapped.get(slot) else {
                    continue;
                };
                let active = match &unwrapped.views {
                    Some(own) if !views.is_empty() => own.iter().any(|view| views.contains(view)),
                    _ => true,
                };
                let nested = unwrapped.reader.as_ref().and_then(|reader| reader.get(value));
                let (true, Some(nested)) = (active, nested) else {
                    continue;
                };
                let prefix = format!("{}{}", affixes.prefix, unwrapped.prefix);
                let suffix = format!("{}{}", unwrapped.suffix, affixes.suffix);
                let inner = Affixes {
                    prefix: &prefix,
                    suffix: &suffix,
                };
                write_members(ctx, &unwrapped.model, nested, inner, map)?;
            }
        }
    }

    if let Some((adapter, getter)) = model.any_setter.as_ref().and_then(|any| any.getter.as_ref())
        && let Some(entries) = getter.get(value).and_then(|extra| adapter.entries(extra))
    {
        for (key, extra) in entries {
            map.serialize_entry(key, &TypedValue::new(ctx, adapter.value(), extra))?;
        }
    }
    Ok(())
}

/// Back references and ignored or view-inactive properties are left out.
fn is_encoded(ctx: &EncodeContext<'_>, property: &PropertyModel, views: &[&'static str]) -> bool {
    if property.is_ignored() || property.back_ref.is_some() || !property.in_views(views) {
        return false;
    }
    !ctx
        .meta(property.ty)
        .is_ok_and(|meta| matches!(meta.kind(), TypeKind::BackRef(_)))
}

/// Whether the [`Include`] policy leaves `value` out.
fn is_suppressed(ctx: &EncodeContext<'_>, include: Include, ty: TypeRef, value: &dyn Any) -> bool {
    if include == Include::Always {
        return false;
    }
    let Ok(meta) = ctx.meta(ty) else {
        return false;
    };
    match meta.kind() {
        TypeKind::Option(adapter) => match adapter.get(value) {
            Some(None) => true,
            Some(Some(inner)) => {
                include == Include::NonEmpty && is_suppressed(ctx, include, adapter.inner(), inner)
            }
            None => false,
        },
        // An unfilled managed slot encodes as null.
        TypeKind::Managed(adapter) => adapter.get(value).is_none(),
        TypeKind::Value => value.downcast_ref::<Value>().is_some_and(|value| match value {
            Value::Null => true,
            _ if include == Include::NonNull => false,
            Value::String(text) => text.is_empty(),
            Value::Bytes(bytes) => bytes.is_empty(),
            Value::Seq(items) => items.is_empty(),
            Value::Map(entries) => entries.is_empty(),
            _ => false,
        }),
        _ if include == Include::NonNull => false,
        TypeKind::Leaf(_) => value.downcast_ref::<String>().is_some_and(String::is_empty),
        TypeKind::List(adapter) => adapter.items(value).is_some_and(|items| items.is_empty()),
        TypeKind::Map(adapter) => adapter.entries(value).is_some_and(|entries| entries.is_empty()),
        TypeKind::Bean(_) | TypeKind::BackRef(_) => false,
    }
}

fn affixed(affixes: Affixes<'_>, name: &str) -> String {
    format!("{}{name}{}", affixes.prefix, affixes.suffix)
}
