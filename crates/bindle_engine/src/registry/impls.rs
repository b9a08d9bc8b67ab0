use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use super::adapters::{BackRefAdapter, ListAdapter, ManagedAdapter, MapAdapter, OptionAdapter};
use super::{GetTypeMeta, TypeKind, TypeMeta};
use crate::refs::{BackRef, Managed};
use crate::value::Value;

macro_rules! impl_leaf {
    ($($ty:ty),* $(,)?) => {
        $(
            impl GetTypeMeta for $ty {
                #[inline]
                fn get_type_meta() -> TypeMeta {
                    TypeMeta::leaf_default::<$ty>()
                }
            }
        )*
    };
}

impl_leaf!(
    bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, String,
);

impl GetTypeMeta for Value {
    #[inline]
    fn get_type_meta() -> TypeMeta {
        TypeMeta::new::<Value>(TypeKind::Value)
    }
}

impl<T: GetTypeMeta> GetTypeMeta for Option<T> {
    fn get_type_meta() -> TypeMeta {
        TypeMeta::new::<Option<T>>(TypeKind::Option(OptionAdapter::of::<T>())).with_dependency::<T>()
    }
}

impl<T: GetTypeMeta> GetTypeMeta for Vec<T> {
    fn get_type_meta() -> TypeMeta {
        TypeMeta::new::<Vec<T>>(TypeKind::List(ListAdapter::vec::<T>())).with_dependency::<T>()
    }
}

impl<V: GetTypeMeta> GetTypeMeta for BTreeMap<String, V> {
    fn get_type_meta() -> TypeMeta {
        TypeMeta::new::<BTreeMap<String, V>>(TypeKind::Map(MapAdapter::btree::<V>()))
            .with_dependency::<V>()
    }
}

impl<V: GetTypeMeta> GetTypeMeta for std::collections::HashMap<String, V> {
    fn get_type_meta() -> TypeMeta {
        TypeMeta::new::<std::collections::HashMap<String, V>>(TypeKind::Map(MapAdapter::hash::<V>()))
            .with_dependency::<V>()
    }
}

impl<T: GetTypeMeta> GetTypeMeta for Managed<T> {
    fn get_type_meta() -> TypeMeta {
        TypeMeta::new::<Managed<T>>(TypeKind::Managed(ManagedAdapter::of::<T>()))
            .with_dependency::<T>()
    }
}

// The owner type is registered through its `Managed` slot.
impl<T: 'static> GetTypeMeta for BackRef<T> {
    fn get_type_meta() -> TypeMeta {
        TypeMeta::new::<BackRef<T>>(TypeKind::BackRef(BackRefAdapter::of::<T>()))
            .with_default::<BackRef<T>>()
    }
}
