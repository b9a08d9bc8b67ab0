//! Type-erased adapters stored in a [`TypeMeta`](super::TypeMeta).
//!
//! Every adapter is a handful of function pointers instantiated for one
//! concrete type, so the engine can build, take apart and (de)serialize
//! values it only sees as `Box<dyn Any>`.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;

use serde_core::de::DeserializeOwned;
use serde_core::{Deserializer, Serialize, Serializer};

use super::TypeRef;
use crate::refs::{Managed, OwnerHandle};

/// A value the engine moves around without knowing its type.
pub type BoxedValue = Box<dyn Any>;

// -----------------------------------------------------------------------------
// LeafAdapter

/// Serde bridge for scalar-like types that bind as a whole.
///
/// Built with [`LeafAdapter::of`], which requires `T` to implement serde's
/// traits; the engine then reaches them through `erased-serde`.
#[derive(Clone, Copy)]
pub struct LeafAdapter {
    deserialize: fn(&mut dyn erased_serde::Deserializer) -> Result<BoxedValue, erased_serde::Error>,
    serialize: fn(&dyn Any) -> Option<&dyn erased_serde::Serialize>,
}

fn deserialize_leaf<T: DeserializeOwned + 'static>(
    deserializer: &mut dyn erased_serde::Deserializer,
) -> Result<BoxedValue, erased_serde::Error> {
    Ok(Box::new(T::deserialize(deserializer)?))
}

fn serialize_leaf<T: Serialize + 'static>(value: &dyn Any) -> Option<&dyn erased_serde::Serialize> {
    value
        .downcast_ref::<T>()
        .map(|value| value as &dyn erased_serde::Serialize)
}

impl LeafAdapter {
    #[inline]
    pub fn of<T: DeserializeOwned + Serialize + 'static>() -> Self {
        Self {
            deserialize: deserialize_leaf::<T>,
            serialize: serialize_leaf::<T>,
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        &self,
        deserializer: D,
    ) -> Result<BoxedValue, D::Error> {
        let mut erased = <dyn erased_serde::Deserializer>::erase(deserializer);
        (self.deserialize)(&mut erased).map_err(<D::Error as serde_core::de::Error>::custom)
    }

    /// Returns `None` if `value` is not of the adapted type.
    pub fn serialize<S: Serializer>(
        &self,
        value: &dyn Any,
        serializer: S,
    ) -> Option<Result<S::Ok, S::Error>> {
        (self.serialize)(value).map(|value| value.serialize(serializer))
    }
}

// -----------------------------------------------------------------------------
// OptionAdapter

/// Builds and inspects `Option<T>` values.
#[derive(Clone, Copy)]
pub struct OptionAdapter {
    pub(crate) inner: TypeRef,
    some: fn(BoxedValue) -> Option<BoxedValue>,
    none: fn() -> BoxedValue,
    get: fn(&dyn Any) -> Option<Option<&dyn Any>>,
}

fn option_some<T: 'static>(value: BoxedValue) -> Option<BoxedValue> {
    let value = value.downcast::<T>().ok()?;
    Some(Box::new(Some(*value)))
}

fn option_none<T: 'static>() -> BoxedValue {
    Box::new(None::<T>)
}

fn option_get<T: 'static>(value: &dyn Any) -> Option<Option<&dyn Any>> {
    value
        .downcast_ref::<Option<T>>()
        .map(|value| value.as_ref().map(|inner| inner as &dyn Any))
}

impl OptionAdapter {
    pub fn of<T: 'static>() -> Self {
        Self {
            inner: TypeRef::of::<T>(),
            some: option_some::<T>,
            none: option_none::<T>,
            get: option_get::<T>,
        }
    }

    #[inline]
    pub fn inner(&self) -> TypeRef {
        self.inner
    }

    #[inline]
    pub fn some(&self, value: BoxedValue) -> Option<BoxedValue> {
        (self.some)(value)
    }

    #[inline]
    pub fn none(&self) -> BoxedValue {
        (self.none)()
    }

    /// Outer `None` on a type mismatch, inner `None` for an empty option.
    #[inline]
    pub fn get<'a>(&self, value: &'a dyn Any) -> Option<Option<&'a dyn Any>> {
        (self.get)(value)
    }
}

// -----------------------------------------------------------------------------
// ListAdapter

/// Builds and inspects sequence types.
#[derive(Clone, Copy)]
pub struct ListAdapter {
    pub(crate) item: TypeRef,
    from_items: fn(Vec<BoxedValue>) -> Option<BoxedValue>,
    items: fn(&dyn Any) -> Option<Vec<&dyn Any>>,
}

fn vec_from_items<T: 'static>(items: Vec<BoxedValue>) -> Option<BoxedValue> {
    let mut list: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        list.push(*item.downcast::<T>().ok()?);
    }
    Some(Box::new(list))
}

fn vec_items<T: 'static>(value: &dyn Any) -> Option<Vec<&dyn Any>> {
    value
        .downcast_ref::<Vec<T>>()
        .map(|list| list.iter().map(|item| item as &dyn Any).collect())
}

impl ListAdapter {
    pub fn vec<T: 'static>() -> Self {
        Self {
            item: TypeRef::of::<T>(),
            from_items: vec_from_items::<T>,
            items: vec_items::<T>,
        }
    }

    #[inline]
    pub fn item(&self) -> TypeRef {
        self.item
    }

    #[inline]
    pub fn from_items(&self, items: Vec<BoxedValue>) -> Option<BoxedValue> {
        (self.from_items)(items)
    }

    #[inline]
    pub fn items<'a>(&self, value: &'a dyn Any) -> Option<Vec<&'a dyn Any>> {
        (self.items)(value)
    }
}

// -----------------------------------------------------------------------------
// MapAdapter

/// Builds and inspects string-keyed map types.
#[derive(Clone, Copy)]
pub struct MapAdapter {
    pub(crate) value: TypeRef,
    from_entries: fn(Vec<(String, BoxedValue)>) -> Option<BoxedValue>,
    entries: fn(&dyn Any) -> Option<Vec<(&str, &dyn Any)>>,
}

fn btree_from_entries<V: 'static>(entries: Vec<(String, BoxedValue)>) -> Option<BoxedValue> {
    let mut map: BTreeMap<String, V> = BTreeMap::new();
    for (key, value) in entries {
        map.insert(key, *value.downcast::<V>().ok()?);
    }
    Some(Box::new(map))
}

fn btree_entries<V: 'static>(value: &dyn Any) -> Option<Vec<(&str, &dyn Any)>> {
    value.downcast_ref::<BTreeMap<String, V>>().map(|map| {
        map.iter()
            .map(|(k, v)| (k.as_str(), v as &dyn Any))
            .collect()
    })
}

fn hash_from_entries<V: 'static>(entries: Vec<(String, BoxedValue)>) -> Option<BoxedValue> {
    let mut map: std::collections::HashMap<String, V> =
        std::collections::HashMap::with_capacity(entries.len());
    for (key, value) in entries {
        map.insert(key, *value.downcast::<V>().ok()?);
    }
    Some(Box::new(map))
}

fn hash_entries<V: 'static>(value: &dyn Any) -> Option<Vec<(&str, &dyn Any)>> {
    value
        .downcast_ref::<std::collections::HashMap<String, V>>()
        .map(|map| {
            let mut entries: Vec<(&str, &dyn Any)> =
                map.iter().map(|(k, v)| (k.as_str(), v as &dyn Any)).collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
            entries
        })
}

impl MapAdapter {
    pub fn btree<V: 'static>() -> Self {
        Self {
            value: TypeRef::of::<V>(),
            from_entries: btree_from_entries::<V>,
            entries: btree_entries::<V>,
        }
    }

    pub fn hash<V: 'static>() -> Self {
        Self {
            value: TypeRef::of::<V>(),
            from_entries: hash_from_entries::<V>,
            entries: hash_entries::<V>,
        }
    }

    #[inline]
    pub fn value(&self) -> TypeRef {
        self.value
    }

    /// Later entries overwrite earlier ones with the same key.
    #[inline]
    pub fn from_entries(&self, entries: Vec<(String, BoxedValue)>) -> Option<BoxedValue> {
        (self.from_entries)(entries)
    }

    /// Entries in key order.
    #[inline]
    pub fn entries<'a>(&self, value: &'a dyn Any) -> Option<Vec<(&'a str, &'a dyn Any)>> {
        (self.entries)(value)
    }
}

// -----------------------------------------------------------------------------
// ManagedAdapter / BackRefAdapter

/// Allocates, fills and reads [`Managed<T>`] owner slots.
#[derive(Clone, Copy)]
pub struct ManagedAdapter {
    pub(crate) inner: TypeRef,
    begin: fn() -> (BoxedValue, OwnerHandle),
    finish: fn(BoxedValue, BoxedValue) -> Option<BoxedValue>,
    get: fn(&dyn Any) -> Option<&dyn Any>,
}

fn managed_begin<T: 'static>() -> (BoxedValue, OwnerHandle) {
    let slot: Managed<T> = Managed::empty();
    let handle = OwnerHandle::of(&slot);
    (Box::new(slot), handle)
}

fn managed_finish<T: 'static>(slot: BoxedValue, value: BoxedValue) -> Option<BoxedValue> {
    let slot = slot.downcast::<Managed<T>>().ok()?;
    let value = value.downcast::<T>().ok()?;
    slot.fill(*value).ok()?;
    Some(slot)
}

fn managed_get<T: 'static>(value: &dyn Any) -> Option<&dyn Any> {
    value
        .downcast_ref::<Managed<T>>()
        .and_then(Managed::get)
        .map(|value| value as &dyn Any)
}

impl ManagedAdapter {
    pub fn of<T: 'static>() -> Self {
        Self {
            inner: TypeRef::of::<T>(),
            begin: managed_begin::<T>,
            finish: managed_finish::<T>,
            get: managed_get::<T>,
        }
    }

    #[inline]
    pub fn inner(&self) -> TypeRef {
        self.inner
    }

    /// Allocates an empty slot and the handle back references bind to.
    #[inline]
    pub fn begin(&self) -> (BoxedValue, OwnerHandle) {
        (self.begin)()
    }

    /// Moves the decoded owner into its slot, returning the `Managed<T>`.
    #[inline]
    pub fn finish(&self, slot: BoxedValue, value: BoxedValue) -> Option<BoxedValue> {
        (self.finish)(slot, value)
    }

    #[inline]
    pub fn get<'a>(&self, value: &'a dyn Any) -> Option<&'a dyn Any> {
        (self.get)(value)
    }
}

/// Binds [`BackRef<T>`](crate::refs::BackRef) values from reference frames.
#[derive(Clone, Copy)]
pub struct BackRefAdapter {
    pub(crate) target: TypeRef,
    resolve: fn(&OwnerHandle) -> Option<BoxedValue>,
}

fn back_ref_resolve<T: 'static>(owner: &OwnerHandle) -> Option<BoxedValue> {
    owner
        .back_ref::<T>()
        .map(|back_ref| Box::new(back_ref) as BoxedValue)
}

impl BackRefAdapter {
    pub fn of<T: 'static>() -> Self {
        Self {
            target: TypeRef::of::<T>(),
            resolve: back_ref_resolve::<T>,
        }
    }

    #[inline]
    pub fn target(&self) -> TypeRef {
        self.target
    }

    /// Returns `None` if `owner` does not own a `T`.
    #[inline]
    pub fn resolve(&self, owner: &OwnerHandle) -> Option<BoxedValue> {
        (self.resolve)(owner)
    }
}
