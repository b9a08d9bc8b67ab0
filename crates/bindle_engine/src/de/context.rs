use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt::Write;

use bindle_utils::TypeIdMap;
use serde_core::de;

use crate::error::BindError;
use crate::model::{BeanCache, BeanModel};
use crate::refs::{OwnerHandle, PropertyReferenceResolver};
use crate::registry::{BoxedValue, TypeKind, TypeMeta, TypeRef, TypeRegistry};

// -----------------------------------------------------------------------------
// DecodeOptions

/// Runtime options of a decode call.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    pub(crate) max_depth: usize,
    pub(crate) views: Vec<&'static str>,
}

impl Default for DecodeOptions {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeOptions {
    /// Bean nesting deeper than this fails with [`BindError::Recursion`].
    pub const DEFAULT_MAX_DEPTH: usize = 64;

    #[inline]
    pub const fn new() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            views: Vec::new(),
        }
    }

    #[inline]
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Activates `views`; properties tagged with other views are skipped.
    pub fn views(mut self, views: &[&'static str]) -> Self {
        self.views = views.to_vec();
        self
    }
}

// -----------------------------------------------------------------------------
// DecodeContext

enum Segment {
    Key(String),
    Index(usize),
}

/// State of one top-level decode call, threaded through every seed.
///
/// Typed errors raised inside serde callbacks are stashed here and the
/// format only sees their message; the driver hands the stashed error back
/// to the caller.
pub(crate) struct DecodeContext<'a> {
    registry: &'a TypeRegistry,
    cache: &'a BeanCache,
    options: &'a DecodeOptions,
    models: TypeIdMap<Arc<BeanModel>>,
    error: Option<BindError>,
    failed_path: Option<String>,
    path: Vec<Segment>,
    depth: usize,
    pub resolver: PropertyReferenceResolver,
    /// Owner slot allocated by a `Managed` value for the bean decoded next.
    pub pending_owner: Option<OwnerHandle>,
}

impl<'a> DecodeContext<'a> {
    pub fn new(registry: &'a TypeRegistry, cache: &'a BeanCache, options: &'a DecodeOptions) -> Self {
        Self {
            registry,
            cache,
            options,
            models: TypeIdMap::new(),
            error: None,
            failed_path: None,
            path: Vec::new(),
            depth: 0,
            resolver: PropertyReferenceResolver::new(),
            pending_owner: None,
        }
    }

    #[inline]
    pub fn meta(&self, ty: TypeRef) -> Result<&'a TypeMeta, BindError> {
        self.registry.get_ref(ty)
    }

    /// The model of `ty`, looked up in the shared cache once per call.
    pub fn model(&mut self, ty: TypeRef) -> Result<Arc<BeanModel>, BindError> {
        if let Some(model) = self.models.get(&ty.id()) {
            return Ok(Arc::clone(model));
        }
        let model = self.cache.get_or_build(self.registry, ty)?;
        self.models.insert(ty.id(), Arc::clone(&model));
        Ok(model)
    }

    #[inline]
    pub fn views(&self) -> &'a [&'static str] {
        &self.options.views
    }

    // -------------------------------------------------------------------------
    // Errors

    /// Stashes `err` unless an earlier error is stashed and returns its
    /// format-level counterpart.
    pub fn fail<E: de::Error>(&mut self, err: BindError) -> E {
        let wire = E::custom(&err);
        if self.error.is_none() {
            self.error = Some(err);
        }
        wire
    }

    /// Attributes a format error to a property of `owner`.
    ///
    /// Errors that already carry a typed cause pass through untouched.
    pub fn wrap<E: de::Error>(&mut self, err: E, owner: TypeRef, property: &str, argument: TypeRef) -> E {
        if self.error.is_none() {
            let path = self.failed_path.take().unwrap_or_else(|| self.path_string());
            self.error = Some(BindError::InvalidFormat {
                type_name: owner.short_name(),
                property: String::from(property),
                path,
                argument: argument.name(),
                message: err.to_string(),
            });
        }
        err
    }

    /// Remembers where the innermost failure happened.
    pub fn capture_path(&mut self) {
        if self.failed_path.is_none() && self.error.is_none() {
            self.failed_path = Some(self.path_string());
        }
    }

    /// The stashed error, or the format's own error as [`BindError::Format`].
    pub fn into_error(self, wire: impl ToString) -> BindError {
        self.error
            .unwrap_or_else(|| BindError::Format(wire.to_string()))
    }

    // -------------------------------------------------------------------------
    // Path

    #[inline]
    pub fn push_key(&mut self, key: &str) {
        self.path.push(Segment::Key(String::from(key)));
    }

    #[inline]
    pub fn push_index(&mut self, index: usize) {
        self.path.push(Segment::Index(index));
    }

    #[inline]
    pub fn pop(&mut self) {
        self.path.pop();
    }

    /// Pops the segment of a property value, attributing a failure to it.
    pub fn leave_property<T, E: de::Error>(
        &mut self,
        result: Result<T, E>,
        owner: TypeRef,
        property: &str,
        argument: TypeRef,
    ) -> Result<T, E> {
        let result = result.map_err(|err| self.wrap(err, owner, property, argument));
        self.pop();
        result
    }

    fn path_string(&self) -> String {
        let mut out = String::new();
        for segment in &self.path {
            // Writing into a `String` can not fail.
            let _ = match segment {
                Segment::Key(key) if out.is_empty() => write!(out, "{key}"),
                Segment::Key(key) => write!(out, ".{key}"),
                Segment::Index(index) => write!(out, "[{index}]"),
            };
        }
        out
    }

    // -------------------------------------------------------------------------
    // Nesting

    /// Enters a bean, failing once the nesting limit is reached.
    pub fn enter(&mut self, ty: TypeRef) -> Result<(), BindError> {
        if self.depth >= self.options.max_depth {
            return Err(BindError::Recursion {
                type_name: ty.short_name(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    #[inline]
    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // -------------------------------------------------------------------------
    // References

    /// Binds a back reference from the nearest frame labelled `label`.
    pub fn resolve_back_ref(&self, label: &str, ty: TypeRef) -> Result<Option<BoxedValue>, BindError> {
        let Some(owner) = self.resolver.resolve(label).and_then(|frame| frame.owner.as_ref()) else {
            return Ok(None);
        };
        match self.meta(ty)?.kind() {
            TypeKind::BackRef(adapter) => Ok(adapter.resolve(owner)),
            _ => Ok(None),
        }
    }
}
