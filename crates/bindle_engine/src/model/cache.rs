use alloc::sync::Arc;
use core::any::TypeId;

use std::sync::{PoisonError, RwLock};

use bindle_utils::TypeIdMap;

use super::BeanModel;
use super::introspect::Introspector;
use crate::error::BindError;
use crate::registry::{TypeRef, TypeRegistry};

static GLOBAL: BeanCache = BeanCache::new();

/// Bean models by type, built lazily and never invalidated.
///
/// Models are built outside the lock. When two threads build the same model
/// concurrently the first to publish wins and both read back the published
/// entry, so only one model per type is ever observed. Introspection errors
/// are returned, not cached.
pub struct BeanCache {
    models: RwLock<TypeIdMap<Arc<BeanModel>>>,
}

impl Default for BeanCache {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl BeanCache {
    /// An empty cache, usable in `static` initialisers.
    #[inline]
    pub const fn new() -> Self {
        Self {
            models: RwLock::new(TypeIdMap::new()),
        }
    }

    /// The process-wide cache used by the drivers.
    #[inline]
    pub fn global() -> &'static BeanCache {
        &GLOBAL
    }

    /// Returns the published model of `type_id`, if any.
    pub fn get(&self, type_id: TypeId) -> Option<Arc<BeanModel>> {
        let models = self.models.read().unwrap_or_else(PoisonError::into_inner);
        models.get(&type_id).cloned()
    }

    /// Returns the model of `ty`, introspecting its declaration on first use.
    pub fn get_or_build(&self, registry: &TypeRegistry, ty: TypeRef) -> Result<Arc<BeanModel>, BindError> {
        if let Some(model) = self.get(ty.id()) {
            return Ok(model);
        }
        Introspector::new(registry, self).model(ty)
    }

    /// Publishes `model` unless another one won the race; returns the winner.
    pub(crate) fn publish(&self, model: BeanModel) -> Arc<BeanModel> {
        let built = Arc::new(model);
        let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);
        let published = models.get_or_insert(built.ty().id(), || built.clone()).clone();
        if Arc::ptr_eq(&published, &built) {
            log::debug!("published bean model of `{}`", built.ty());
        }
        published
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.models.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use alloc::vec::Vec;

    use super::BeanCache;
    use crate::decl::{AccessorDecl, BeanBuilder};
    use crate::registry::{GetTypeMeta, TypeMeta, TypeRef, TypeRegistry};

    #[derive(Default)]
    struct Point {
        x: i32,
    }

    impl GetTypeMeta for Point {
        fn get_type_meta() -> TypeMeta {
            BeanBuilder::<Point>::new()
                .default_constructor(Point::default)
                .accessor(AccessorDecl::field("x", |p: &Point| &p.x, |p: &mut Point| &mut p.x))
                .build()
        }
    }

    struct Broken;

    impl GetTypeMeta for Broken {
        fn get_type_meta() -> TypeMeta {
            BeanBuilder::<Broken>::new().build()
        }
    }

    #[test]
    fn concurrent_builds_publish_one_model() {
        let mut registry = TypeRegistry::new();
        registry.register::<Point>();
        let cache = BeanCache::new();

        let models: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| cache.get_or_build(&registry, TypeRef::of::<Point>()).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(models.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn late_publish_reads_back_the_winner() {
        let mut registry = TypeRegistry::new();
        registry.register::<Point>();
        let ty = TypeRef::of::<Point>();

        let scratch = BeanCache::new();
        let late = scratch.get_or_build(&registry, ty).unwrap();
        drop(scratch);
        let late = Arc::try_unwrap(late).ok().unwrap();

        let cache = BeanCache::new();
        let first = cache.get_or_build(&registry, ty).unwrap();
        let published = cache.publish(late);
        assert!(Arc::ptr_eq(&first, &published));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn errors_are_not_cached() {
        let mut registry = TypeRegistry::new();
        registry.register::<Broken>();
        let cache = BeanCache::new();
        assert!(cache.get_or_build(&registry, TypeRef::of::<Broken>()).is_err());
        assert!(cache.get_or_build(&registry, TypeRef::of::<Broken>()).is_err());
        assert!(cache.is_empty());

        let err = cache.get_or_build(&registry, TypeRef::of::<u8>()).unwrap_err();
        assert!(matches!(err, crate::BindError::Unsupported { .. }));
    }
}
