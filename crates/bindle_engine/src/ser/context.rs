use alloc::string::ToString;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cell::RefCell;

use bindle_utils::TypeIdMap;
use serde_core::ser;

use crate::error::BindError;
use crate::model::{BeanCache, BeanModel};
use crate::registry::{TypeMeta, TypeRef, TypeRegistry};

// -----------------------------------------------------------------------------
// EncodeOptions

/// Runtime options of an encode call.
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    pub(crate) views: Vec<&'static str>,
}

impl EncodeOptions {
    #[inline]
    pub const fn new() -> Self {
        Self { views: Vec::new() }
    }

    /// Activates `views`; properties tagged with other views are left out.
    pub fn views(mut self, views: &[&'static str]) -> Self {
        self.views = views.to_vec();
        self
    }
}

// -----------------------------------------------------------------------------
// EncodeContext

/// State of one encode call.
///
/// `Serialize` only hands out `&self`, so the stashed error and the model
/// memo live behind cells.
pub(crate) struct EncodeContext<'a> {
    registry: &'a TypeRegistry,
    cache: &'a BeanCache,
    options: &'a EncodeOptions,
    models: RefCell<TypeIdMap<Arc<BeanModel>>>,
    error: RefCell<Option<BindError>>,
}

impl<'a> EncodeContext<'a> {
    pub fn new(registry: &'a TypeRegistry, cache: &'a BeanCache, options: &'a EncodeOptions) -> Self {
        Self {
            registry,
            cache,
            options,
            models: RefCell::new(TypeIdMap::new()),
            error: RefCell::new(None),
        }
    }

    #[inline]
    pub fn meta(&self, ty: TypeRef) -> Result<&'a TypeMeta, BindError> {
        self.registry.get_ref(ty)
    }

    pub fn model(&self, ty: TypeRef) -> Result<Arc<BeanModel>, BindError> {
        if let Some(model) = self.models.borrow().get(&ty.id()) {
            return Ok(Arc::clone(model));
        }
        let model = self.cache.get_or_build(self.registry, ty)?;
        self.models.borrow_mut().insert(ty.id(), Arc::clone(&model));
        Ok(model)
    }

    #[inline]
    pub fn views(&self) -> &'a [&'static str] {
        &self.options.views
    }

    /// Stashes `err` unless an earlier error is stashed and returns its
    /// format-level counterpart.
    pub fn fail<E: ser::Error>(&self, err: BindError) -> E {
        let wire = E::custom(&err);
        let mut slot = self.error.borrow_mut();
        if slot.is_none() {
            *slot = Some(err);
        }
        wire
    }

    #[inline]
    pub fn take_error(&self) -> Option<BindError> {
        self.error.borrow_mut().take()
    }

    /// The stashed error, or the format's own error as [`BindError::Format`].
    pub fn into_error(self, wire: impl ToString) -> BindError {
        self.error
            .into_inner()
            .unwrap_or_else(|| BindError::Format(wire.to_string()))
    }
}
