use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use bindle_utils::hash::{HashMap, HashSet};

use super::{PropertyIndex, PropertyModel, SubtypeModel};
use crate::decl::erased::{ErasedEntrySetter, ErasedGetter, ErasedSetter};
use crate::decl::{Args, ErasedCreate};
use crate::error::{BindError, CreateError};
use crate::registry::{BoxedValue, MapAdapter, TypeRef};

// -----------------------------------------------------------------------------
// Parts

/// Where a flattened nested bean is put once it is materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnwrappedTarget {
    Constructor(usize),
    Setter,
}

/// A property whose bean value is flattened into the parent's namespace.
///
/// The nested model's properties are merged into the parent's indexes with
/// the prefix and suffix applied; its creator arguments occupy
/// `arg_offset..arg_offset + model.arg_len()` of the parent's argument array.
#[derive(Clone)]
pub struct UnwrappedModel {
    pub(crate) name: String,
    pub(crate) model: Arc<BeanModel>,
    pub(crate) prefix: String,
    pub(crate) suffix: String,
    pub(crate) arg_offset: usize,
    pub(crate) target: UnwrappedTarget,
    pub(crate) reader: Option<Arc<dyn ErasedGetter>>,
    pub(crate) writer: Option<Arc<dyn ErasedSetter>>,
    pub(crate) views: Option<Vec<&'static str>>,
}

impl UnwrappedModel {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn model(&self) -> &Arc<BeanModel> {
        &self.model
    }

    #[inline]
    pub fn target(&self) -> UnwrappedTarget {
        self.target
    }

    #[inline]
    pub fn arg_range(&self) -> core::ops::Range<usize> {
        self.arg_offset..self.arg_offset + self.model.arg_len
    }
}

impl fmt::Debug for UnwrappedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnwrappedModel")
            .field("name", &self.name)
            .field("model", &self.model.ty)
            .field("prefix", &self.prefix)
            .field("suffix", &self.suffix)
            .field("arg_offset", &self.arg_offset)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub(crate) enum AnySetterKind {
    Map(Arc<dyn ErasedSetter>),
    Entry(Arc<dyn ErasedEntrySetter>),
    Constructor(usize),
}

/// The catch-all binding of unknown keys.
#[derive(Clone)]
pub struct AnySetterModel {
    /// Type of each collected value.
    pub(crate) value: TypeRef,
    /// Builds the map for the map and creator forms.
    pub(crate) map: Option<MapAdapter>,
    pub(crate) kind: AnySetterKind,
    /// Reads the entries back for encoding.
    pub(crate) getter: Option<(MapAdapter, Arc<dyn ErasedGetter>)>,
}

impl AnySetterModel {
    #[inline]
    pub fn value_type(&self) -> TypeRef {
        self.value
    }

    /// The creator argument the map is passed as, if any.
    #[inline]
    pub fn constructor_index(&self) -> Option<usize> {
        match self.kind {
            AnySetterKind::Constructor(index) => Some(index),
            _ => None,
        }
    }
}

impl fmt::Debug for AnySetterModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            AnySetterKind::Map(_) => "map",
            AnySetterKind::Entry(_) => "entry",
            AnySetterKind::Constructor(_) => "constructor",
        };
        f.debug_struct("AnySetterModel")
            .field("value", &self.value)
            .field("kind", &kind)
            .field("encodes", &self.getter.is_some())
            .finish()
    }
}

/// The single opaque argument of a delegating bean.
#[derive(Clone)]
pub struct DelegatingModel {
    pub(crate) arg: TypeRef,
    pub(crate) value_of: Arc<dyn ErasedGetter>,
}

impl DelegatingModel {
    #[inline]
    pub fn arg(&self) -> TypeRef {
        self.arg
    }
}

impl fmt::Debug for DelegatingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DelegatingModel({})", self.arg)
    }
}

/// A property whose subtype discriminator is a sibling key.
#[derive(Debug, Clone)]
pub(crate) struct ExternalModel {
    pub discriminator: String,
    pub location: PropertyLocation,
}

/// Which index of a bean model a property lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyLocation {
    Constructor(usize),
    Settable(usize),
    ReadOnly(usize),
}

/// One encoded member, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EncodeSlot {
    Property(PropertyLocation),
    Unwrapped(usize),
}

// -----------------------------------------------------------------------------
// BeanModel

/// The introspected description of one concrete bean type.
///
/// Built once per type and cached process-wide; see
/// [`BeanCache`](super::BeanCache). Immutable after construction.
pub struct BeanModel {
    pub(crate) ty: TypeRef,
    pub(crate) constructor: PropertyIndex<PropertyModel>,
    pub(crate) settable: PropertyIndex<PropertyModel>,
    pub(crate) read_only: PropertyIndex<PropertyModel>,
    pub(crate) unwrapped: Vec<UnwrappedModel>,
    pub(crate) any_setter: Option<AnySetterModel>,
    pub(crate) create: Option<ErasedCreate>,
    pub(crate) arity: usize,
    pub(crate) arg_len: usize,
    pub(crate) delegating: Option<DelegatingModel>,
    pub(crate) ignore_unknown: bool,
    pub(crate) wrapper_property: Option<String>,
    pub(crate) subtypes: Option<SubtypeModel>,
    pub(crate) externals: Vec<ExternalModel>,
    pub(crate) external_keys: HashMap<String, usize>,
    /// Keys of dropped, ignored properties; skipped on the wire.
    pub(crate) ignored_names: HashSet<String>,
    pub(crate) encode: Vec<EncodeSlot>,
}

impl BeanModel {
    #[inline]
    pub fn ty(&self) -> TypeRef {
        self.ty
    }

    /// Properties bound through creator arguments.
    #[inline]
    pub fn constructor_properties(&self) -> &PropertyIndex<PropertyModel> {
        &self.constructor
    }

    /// Properties written after construction.
    #[inline]
    pub fn settable_properties(&self) -> &PropertyIndex<PropertyModel> {
        &self.settable
    }

    /// Properties that are only encoded.
    #[inline]
    pub fn read_only_properties(&self) -> &PropertyIndex<PropertyModel> {
        &self.read_only
    }

    #[inline]
    pub fn unwrapped_properties(&self) -> &[UnwrappedModel] {
        &self.unwrapped
    }

    #[inline]
    pub fn any_setter(&self) -> Option<&AnySetterModel> {
        self.any_setter.as_ref()
    }

    #[inline]
    pub fn ignore_unknown(&self) -> bool {
        self.ignore_unknown
    }

    #[inline]
    pub fn is_delegating(&self) -> bool {
        self.delegating.is_some()
    }

    #[inline]
    pub fn delegating(&self) -> Option<&DelegatingModel> {
        self.delegating.as_ref()
    }

    #[inline]
    pub fn wrapper_property(&self) -> Option<&str> {
        self.wrapper_property.as_deref()
    }

    #[inline]
    pub fn subtypes(&self) -> Option<&SubtypeModel> {
        self.subtypes.as_ref()
    }

    /// Number of positional parameters of the creator.
    #[inline]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Size of the argument array, the creator's parameters plus the
    /// arguments of every flattened nested bean.
    #[inline]
    pub fn arg_len(&self) -> usize {
        self.arg_len
    }

    /// Finds a property by wire key in any index.
    pub fn find(&self, name: &str) -> Option<(PropertyLocation, &PropertyModel)> {
        if let Some(i) = self.constructor.lookup(name) {
            return self.constructor.get(i).map(|p| (PropertyLocation::Constructor(i), p));
        }
        if let Some(i) = self.settable.lookup(name) {
            return self.settable.get(i).map(|p| (PropertyLocation::Settable(i), p));
        }
        let i = self.read_only.lookup(name)?;
        self.read_only.get(i).map(|p| (PropertyLocation::ReadOnly(i), p))
    }

    /// Whether `key` names a property or an external discriminator.
    pub(crate) fn declares(&self, key: &str) -> bool {
        self.find(key).is_some() || self.external_keys.contains_key(key)
    }

    pub(crate) fn property(&self, location: PropertyLocation) -> Option<&PropertyModel> {
        match location {
            PropertyLocation::Constructor(i) => self.constructor.get(i),
            PropertyLocation::Settable(i) => self.settable.get(i),
            PropertyLocation::ReadOnly(i) => self.read_only.get(i),
        }
    }

    /// Runs the creator with its own leading `arity` arguments.
    pub(crate) fn instantiate(&self, args: Vec<Option<BoxedValue>>) -> Result<BoxedValue, BindError> {
        let Some(create) = &self.create else {
            return Err(BindError::Unsupported {
                type_name: self.ty.short_name(),
                operation: "instantiation",
            });
        };
        create(&mut Args::new(args)).map_err(|source| BindError::Instantiation {
            type_name: self.ty.short_name(),
            source,
        })
    }

    /// Writes `value` into `instance` through `setter`, reporting a mismatch.
    pub(crate) fn write(
        &self,
        setter: &dyn ErasedSetter,
        instance: &mut dyn Any,
        value: BoxedValue,
    ) -> Result<(), BindError> {
        setter
            .set(instance, value)
            .map_err(|_| BindError::Instantiation {
                type_name: self.ty.short_name(),
                source: CreateError::Custom(String::from("setter rejected a value of another type")),
            })
    }
}

impl fmt::Debug for BeanModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanModel")
            .field("ty", &self.ty)
            .field("constructor", &self.constructor)
            .field("settable", &self.settable)
            .field("read_only", &self.read_only)
            .field("unwrapped", &self.unwrapped)
            .field("any_setter", &self.any_setter)
            .field("arity", &self.arity)
            .field("arg_len", &self.arg_len)
            .field("delegating", &self.delegating)
            .field("ignore_unknown", &self.ignore_unknown)
            .field("wrapper_property", &self.wrapper_property)
            .field("subtypes", &self.subtypes)
            .finish()
    }
}
