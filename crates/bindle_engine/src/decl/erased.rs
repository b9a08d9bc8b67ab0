use alloc::boxed::Box;
use alloc::string::String;
use core::any::Any;

use crate::registry::BoxedValue;

// -----------------------------------------------------------------------------
// Traits

/// Reads a part of a type-erased value.
///
/// Returns `None` if the target is not of the expected type.
pub(crate) trait ErasedGetter: Send + Sync {
    fn get<'a>(&self, target: &'a dyn Any) -> Option<&'a dyn Any>;
}

/// Writes a type-erased value into a type-erased target.
///
/// On a type mismatch the value is handed back untouched.
pub(crate) trait ErasedSetter: Send + Sync {
    fn set(&self, target: &mut dyn Any, value: BoxedValue) -> Result<(), BoxedValue>;
}

/// Writes one key/value pair through an entry-style any setter.
pub(crate) trait ErasedEntrySetter: Send + Sync {
    fn set(&self, target: &mut dyn Any, key: String, value: BoxedValue)
    -> Result<(), BoxedValue>;
}

/// Converts a value of one type into another, e.g. a subtype into its supertype.
pub(crate) trait ErasedConvert: Send + Sync {
    fn convert(&self, value: BoxedValue) -> Result<BoxedValue, BoxedValue>;
}

// -----------------------------------------------------------------------------
// Implementations

pub(crate) struct FnGetter<T, P> {
    pub f: fn(&T) -> &P,
}

impl<T: 'static, P: 'static> ErasedGetter for FnGetter<T, P> {
    #[inline]
    fn get<'a>(&self, target: &'a dyn Any) -> Option<&'a dyn Any> {
        target.downcast_ref::<T>().map(|t| (self.f)(t) as &dyn Any)
    }
}

/// A getter that may find nothing, used to test for a subtype.
pub(crate) struct FnProbe<T, P> {
    pub f: fn(&T) -> Option<&P>,
}

impl<T: 'static, P: 'static> ErasedGetter for FnProbe<T, P> {
    #[inline]
    fn get<'a>(&self, target: &'a dyn Any) -> Option<&'a dyn Any> {
        target
            .downcast_ref::<T>()
            .and_then(|t| (self.f)(t))
            .map(|p| p as &dyn Any)
    }
}

pub(crate) struct FnSetter<T, P> {
    pub f: fn(&mut T, P),
}

impl<T: 'static, P: 'static> ErasedSetter for FnSetter<T, P> {
    fn set(&self, target: &mut dyn Any, value: BoxedValue) -> Result<(), BoxedValue> {
        let Some(target) = target.downcast_mut::<T>() else {
            return Err(value);
        };
        let value = value.downcast::<P>()?;
        (self.f)(target, *value);
        Ok(())
    }
}

pub(crate) struct FieldSetter<T, P> {
    pub f: fn(&mut T) -> &mut P,
}

impl<T: 'static, P: 'static> ErasedSetter for FieldSetter<T, P> {
    fn set(&self, target: &mut dyn Any, value: BoxedValue) -> Result<(), BoxedValue> {
        let Some(target) = target.downcast_mut::<T>() else {
            return Err(value);
        };
        let value = value.downcast::<P>()?;
        *(self.f)(target) = *value;
        Ok(())
    }
}

pub(crate) struct FnEntrySetter<T, V> {
    pub f: fn(&mut T, String, V),
}

impl<T: 'static, V: 'static> ErasedEntrySetter for FnEntrySetter<T, V> {
    fn set(
        &self,
        target: &mut dyn Any,
        key: String,
        value: BoxedValue,
    ) -> Result<(), BoxedValue> {
        let Some(target) = target.downcast_mut::<T>() else {
            return Err(value);
        };
        let value = value.downcast::<V>()?;
        (self.f)(target, key, *value);
        Ok(())
    }
}

pub(crate) struct FnConvert<S, T> {
    pub f: fn(S) -> T,
}

impl<S: 'static, T: 'static> ErasedConvert for FnConvert<S, T> {
    #[inline]
    fn convert(&self, value: BoxedValue) -> Result<BoxedValue, BoxedValue> {
        let value = value.downcast::<S>()?;
        Ok(Box::new((self.f)(*value)))
    }
}
