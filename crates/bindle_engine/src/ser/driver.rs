use core::any::Any;

use serde_core::ser::{Serialize, Serializer};

use super::context::{EncodeContext, EncodeOptions};
use super::typed::TypedValue;
use crate::error::BindError;
use crate::model::BeanCache;
use crate::registry::{TypeRef, TypeRegistry};

/// Encodes registered types into any serde [`Serializer`].
///
/// Output has the shape [`DeserializeDriver`](crate::DeserializeDriver)
/// reads back: declared property names, subtype envelopes, flattened
/// unwrapped properties and any-getter entries written inline.
pub struct SerializeDriver<'a> {
    registry: &'a TypeRegistry,
    cache: &'a BeanCache,
    options: EncodeOptions,
}

impl<'a> SerializeDriver<'a> {
    #[inline]
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self {
            registry,
            cache: BeanCache::global(),
            options: EncodeOptions::new(),
        }
    }

    #[inline]
    pub fn with_cache(mut self, cache: &'a BeanCache) -> Self {
        self.cache = cache;
        self
    }

    #[inline]
    pub fn with_options(mut self, options: EncodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Encodes `value` into `serializer`.
    pub fn serialize<T: Any, S: Serializer>(&self, value: &T, serializer: S) -> Result<S::Ok, BindError> {
        let ty = TypeRef::of::<T>();
        let ctx = EncodeContext::new(self.registry, self.cache, &self.options);
        let result = TypedValue::new(&ctx, ty, value).serialize(serializer);
        result.map_err(|err| {
            let err = ctx.into_error(err);
            log::debug!("failed to encode `{ty}`: {err}");
            err
        })
    }

    /// Wraps `value` in a [`Serialize`] adapter for APIs such as
    /// `serde_json::to_string`.
    ///
    /// Typed failures surface as the format's error; [`Encoded::take_error`]
    /// recovers the [`BindError`] afterwards.
    pub fn value<'v, T: Any>(&'v self, value: &'v T) -> Encoded<'v> {
        Encoded {
            ctx: EncodeContext::new(self.registry, self.cache, &self.options),
            ty: TypeRef::of::<T>(),
            value,
        }
    }
}

/// A value bound to an encode context; see [`SerializeDriver::value`].
pub struct Encoded<'v> {
    ctx: EncodeContext<'v>,
    ty: TypeRef,
    value: &'v dyn Any,
}

impl Encoded<'_> {
    /// The error of the last failed encode, if it was a typed one.
    #[inline]
    pub fn take_error(&self) -> Option<BindError> {
        self.ctx.take_error()
    }
}

impl Serialize for Encoded<'_> {
    #[inline]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TypedValue::new(&self.ctx, self.ty, self.value).serialize(serializer)
    }
}

/// Encodes `value` with the global model cache and default options.
#[inline]
pub fn serialize<T: Any, S: Serializer>(
    registry: &TypeRegistry,
    value: &T,
    serializer: S,
) -> Result<S::Ok, BindError> {
    SerializeDriver::new(registry).serialize(value, serializer)
}
