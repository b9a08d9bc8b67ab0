use core::marker::PhantomData;

use serde_core::de::{self, DeserializeSeed, IgnoredAny, MapAccess};

use crate::value::{self, Value};

/// Where the value of one object entry is read from.
///
/// Entries normally stream from the live [`MapAccess`]; entries that arrived
/// before the code able to interpret them was known are buffered as a
/// [`Value`] and replayed with the live decoder's error type.
pub(super) trait EntrySource<'de> {
    type Error: de::Error;

    fn value<S: DeserializeSeed<'de>>(self, seed: S) -> Result<S::Value, Self::Error>;

    /// Consumes the value without binding it.
    fn skip(self) -> Result<(), Self::Error>;
}

/// The value of the entry whose key was just read from `A`.
pub(super) struct Live<'m, A>(pub &'m mut A);

impl<'de, A: MapAccess<'de>> EntrySource<'de> for Live<'_, A> {
    type Error = A::Error;

    #[inline]
    fn value<S: DeserializeSeed<'de>>(self, seed: S) -> Result<S::Value, A::Error> {
        self.0.next_value_seed(seed)
    }

    #[inline]
    fn skip(self) -> Result<(), A::Error> {
        self.0.next_value::<IgnoredAny>().map(|_| ())
    }
}

/// A buffered value.
pub(super) struct Replay<E> {
    value: Value,
    marker: PhantomData<E>,
}

impl<E> Replay<E> {
    #[inline]
    pub fn new(value: Value) -> Self {
        Self {
            value,
            marker: PhantomData,
        }
    }
}

impl<'de, E: de::Error> EntrySource<'de> for Replay<E> {
    type Error = E;

    #[inline]
    fn value<S: DeserializeSeed<'de>>(self, seed: S) -> Result<S::Value, E> {
        value::replay(seed, self.value)
    }

    #[inline]
    fn skip(self) -> Result<(), E> {
        Ok(())
    }
}
