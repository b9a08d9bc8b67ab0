use core::any::Any;

use serde_core::Deserializer;
use serde_core::de::DeserializeSeed;

use super::bean_visitor::PatchVisitor;
use super::context::{DecodeContext, DecodeOptions};
use super::typed::TypedSeed;
use crate::error::BindError;
use crate::model::BeanCache;
use crate::registry::{TypeRef, TypeRegistry};

/// Decodes registered types from any serde [`Deserializer`].
///
/// A driver borrows the registry and a model cache, the process-wide
/// [`BeanCache::global`] unless another one is supplied, and may be reused
/// for any number of calls.
///
/// # Example
///
/// ```ignore
/// let driver = DeserializeDriver::new(&registry)
///     .with_options(DecodeOptions::new().views(&["public"]));
/// let person: Person = driver.deserialize(&mut serde_json::Deserializer::from_str(json))?;
/// ```
pub struct DeserializeDriver<'a> {
    registry: &'a TypeRegistry,
    cache: &'a BeanCache,
    options: DecodeOptions,
}

impl<'a> DeserializeDriver<'a> {
    #[inline]
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self {
            registry,
            cache: BeanCache::global(),
            options: DecodeOptions::new(),
        }
    }

    #[inline]
    pub fn with_cache(mut self, cache: &'a BeanCache) -> Self {
        self.cache = cache;
        self
    }

    #[inline]
    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    #[inline]
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decodes a new `T` from the next value of `deserializer`.
    pub fn deserialize<'de, T: Any, D: Deserializer<'de>>(&self, deserializer: D) -> Result<T, BindError> {
        let ty = TypeRef::of::<T>();
        let mut ctx = DecodeContext::new(self.registry, self.cache, &self.options);
        let result = TypedSeed::new(&mut ctx, ty).deserialize(deserializer);
        let value = match result {
            Ok(value) => value,
            Err(err) => {
                let err = ctx.into_error(err);
                log::debug!("failed to decode `{ty}`: {err}");
                return Err(err);
            }
        };
        value
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| BindError::Unsupported {
                type_name: ty.short_name(),
                operation: "decoding a type registered with a foreign adapter",
            })
    }

    /// Binds the next object of `deserializer` onto `target`.
    ///
    /// Keys present on the wire overwrite the matching properties; absent
    /// properties keep their current values. Creator-bound properties are
    /// writable only if they declare a setter or field, and are otherwise
    /// treated as unknown keys.
    ///
    /// Subtyped, delegating and root-wrapped beans can not be patched.
    pub fn deserialize_into<'de, T: Any, D: Deserializer<'de>>(
        &self,
        deserializer: D,
        target: &mut T,
    ) -> Result<(), BindError> {
        let ty = TypeRef::of::<T>();
        let mut ctx = DecodeContext::new(self.registry, self.cache, &self.options);
        let model = ctx.model(ty)?;
        if model.subtypes.is_some() || model.delegating.is_some() || model.wrapper_property.is_some() {
            return Err(BindError::Unsupported {
                type_name: ty.short_name(),
                operation: "decoding into an existing instance",
            });
        }

        ctx.enter(ty)?;
        let result = deserializer.deserialize_map(PatchVisitor {
            ctx: &mut ctx,
            model: &model,
            target,
        });
        ctx.leave();
        result.map_err(|err| {
            let err = ctx.into_error(err);
            log::debug!("failed to decode into `{ty}`: {err}");
            err
        })
    }
}

/// Decodes a `T` with the global model cache and default options.
#[inline]
pub fn deserialize<'de, T: Any, D: Deserializer<'de>>(
    registry: &TypeRegistry,
    deserializer: D,
) -> Result<T, BindError> {
    DeserializeDriver::new(registry).deserialize(deserializer)
}

/// Binds onto `target` with the global model cache and default options.
///
/// See [`DeserializeDriver::deserialize_into`].
#[inline]
pub fn deserialize_into<'de, T: Any, D: Deserializer<'de>>(
    registry: &TypeRegistry,
    deserializer: D,
    target: &mut T,
) -> Result<(), BindError> {
    DeserializeDriver::new(registry).deserialize_into(deserializer, target)
}
