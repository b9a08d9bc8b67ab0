use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;

use super::erased::{ErasedEntrySetter, ErasedGetter, ErasedSetter, FnEntrySetter, FnGetter, FnSetter};
use crate::registry::{GetTypeMeta, TypeRef, TypeRegistry};

/// How collected unknown entries reach the instance.
#[derive(Clone)]
pub(crate) enum AnySetterForm {
    /// One call with the whole map.
    Map { map: TypeRef, set: Arc<dyn ErasedSetter> },
    /// One call per entry.
    Entry { value: TypeRef, set: Arc<dyn ErasedEntrySetter> },
    /// The map is a creator argument.
    Param { map: TypeRef, index: usize },
}

/// A catch-all for keys that match no declared property.
///
/// ```
/// use std::collections::BTreeMap;
/// use bindle_engine::decl::AnySetterDecl;
///
/// #[derive(Default)]
/// struct Tagged {
///     extra: BTreeMap<String, String>,
/// }
///
/// let any = AnySetterDecl::entry(|t: &mut Tagged, k: String, v: String| {
///     t.extra.insert(k, v);
/// })
/// .getter(|t: &Tagged| &t.extra);
/// # let _ = any;
/// ```
#[derive(Clone)]
pub struct AnySetterDecl {
    pub(crate) form: AnySetterForm,
    pub(crate) getter: Option<(TypeRef, Arc<dyn ErasedGetter>)>,
    pub(crate) dependencies: [fn(&mut TypeRegistry); 2],
}

fn register_nothing(_: &mut TypeRegistry) {}

impl AnySetterDecl {
    /// A setter taking all unknown entries as one map of type `M`.
    pub fn map<T: 'static, M: GetTypeMeta>(set: fn(&mut T, M)) -> Self {
        Self {
            form: AnySetterForm::Map {
                map: TypeRef::of::<M>(),
                set: Arc::new(FnSetter { f: set }),
            },
            getter: None,
            dependencies: [TypeRegistry::register::<M>, register_nothing],
        }
    }

    /// A setter called with each unknown key and its value.
    pub fn entry<T: 'static, V: GetTypeMeta>(set: fn(&mut T, String, V)) -> Self {
        Self {
            form: AnySetterForm::Entry {
                value: TypeRef::of::<V>(),
                set: Arc::new(FnEntrySetter { f: set }),
            },
            getter: None,
            dependencies: [TypeRegistry::register::<V>, register_nothing],
        }
    }

    /// Unknown entries collected into a map passed as creator argument `index`.
    pub fn param<M: GetTypeMeta>(index: usize) -> Self {
        Self {
            form: AnySetterForm::Param {
                map: TypeRef::of::<M>(),
                index,
            },
            getter: None,
            dependencies: [TypeRegistry::register::<M>, register_nothing],
        }
    }

    /// The map whose entries are written flat when encoding.
    pub fn getter<T: 'static, M: GetTypeMeta>(mut self, get: fn(&T) -> &M) -> Self {
        self.getter = Some((TypeRef::of::<M>(), Arc::new(FnGetter { f: get })));
        self.dependencies[1] = TypeRegistry::register::<M>;
        self
    }
}

impl fmt::Debug for AnySetterDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let form = match &self.form {
            AnySetterForm::Map { map, .. } => ("map", *map),
            AnySetterForm::Entry { value, .. } => ("entry", *value),
            AnySetterForm::Param { map, .. } => ("param", *map),
        };
        f.debug_struct("AnySetterDecl")
            .field("form", &form)
            .field("getter", &self.getter.as_ref().map(|g| g.0))
            .finish()
    }
}
