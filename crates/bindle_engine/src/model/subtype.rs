use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use bindle_utils::hash::{HashMap, HashSet};

use super::BeanModel;
use crate::decl::SubtypePlacement;
use crate::decl::erased::{ErasedConvert, ErasedGetter};
use crate::error::BindError;
use crate::registry::BoxedValue;

/// One concrete subtype and the names it is known by.
#[derive(Clone)]
pub struct SubtypeEntry {
    pub(crate) names: Vec<String>,
    pub(crate) model: Arc<BeanModel>,
    pub(crate) upcast: Arc<dyn ErasedConvert>,
    pub(crate) downcast: Arc<dyn ErasedGetter>,
}

impl SubtypeEntry {
    /// The name written when encoding.
    #[inline]
    pub fn name(&self) -> &str {
        self.names.first().map_or("", String::as_str)
    }

    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[inline]
    pub fn model(&self) -> &Arc<BeanModel> {
        &self.model
    }

    /// Wraps a decoded subtype value into the supertype.
    pub(crate) fn upcast(&self, value: BoxedValue, sup: &'static str) -> Result<BoxedValue, BindError> {
        self.upcast.convert(value).map_err(|_| BindError::Unsupported {
            type_name: sup,
            operation: "upcasting a value of another subtype",
        })
    }
}

impl fmt::Debug for SubtypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubtypeEntry")
            .field("names", &self.names)
            .field("model", &self.model.ty())
            .finish()
    }
}

/// The subtypes of a polymorphic bean and how the discriminator is placed.
#[derive(Clone)]
pub struct SubtypeModel {
    pub(crate) discriminator: String,
    pub(crate) placement: SubtypePlacement,
    pub(crate) entries: Vec<SubtypeEntry>,
    pub(crate) by_name: HashMap<String, usize>,
    /// Names claimed by more than one subtype.
    pub(crate) ambiguous: HashSet<String>,
    pub(crate) default_subtype: Option<usize>,
}

impl SubtypeModel {
    pub(crate) fn new(
        discriminator: String,
        placement: SubtypePlacement,
        entries: Vec<SubtypeEntry>,
    ) -> Self {
        let mut by_name = HashMap::default();
        let mut ambiguous = HashSet::default();
        for (index, entry) in entries.iter().enumerate() {
            for name in &entry.names {
                match by_name.get(name.as_str()) {
                    None => {
                        by_name.insert(name.clone(), index);
                    }
                    Some(&other) if other == index => {}
                    Some(_) => {
                        ambiguous.insert(name.clone());
                    }
                }
            }
        }
        Self {
            discriminator,
            placement,
            entries,
            by_name,
            ambiguous,
            default_subtype: None,
        }
    }

    #[inline]
    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    #[inline]
    pub fn placement(&self) -> SubtypePlacement {
        self.placement
    }

    #[inline]
    pub fn entries(&self) -> &[SubtypeEntry] {
        &self.entries
    }

    #[inline]
    pub fn default_subtype(&self) -> Option<&SubtypeEntry> {
        self.default_subtype.and_then(|i| self.entries.get(i))
    }

    /// Looks up a discriminator value, falling back to the default subtype.
    pub fn resolve(&self, tag: &str, sup: &'static str) -> Result<&SubtypeEntry, BindError> {
        if self.ambiguous.contains(tag) {
            return Err(BindError::AmbiguousSubtype {
                type_name: sup,
                discriminator: String::from(tag),
            });
        }
        self.by_name
            .get(tag)
            .and_then(|&i| self.entries.get(i))
            .or_else(|| self.default_subtype())
            .ok_or_else(|| BindError::UnknownSubtype {
                type_name: sup,
                discriminator: String::from(tag),
            })
    }

    /// The subtype used when no discriminator arrived at all.
    pub fn resolve_missing(&self, sup: &'static str) -> Result<&SubtypeEntry, BindError> {
        self.default_subtype()
            .ok_or_else(|| BindError::MissingDiscriminator {
                type_name: sup,
                property: self.discriminator.clone(),
            })
    }

    /// Picks the only subtype declaring every one of `keys`.
    ///
    /// With no subtype fitting, the default subtype is used if declared.
    pub fn deduce<'k>(
        &self,
        keys: impl Iterator<Item = &'k str> + Clone,
        sup: &'static str,
    ) -> Result<&SubtypeEntry, BindError> {
        let mut fitting = self
            .entries
            .iter()
            .filter(|entry| keys.clone().all(|key| entry.model.declares(key)));
        match (fitting.next(), fitting.next()) {
            (Some(entry), None) => Ok(entry),
            (Some(_), Some(_)) => Err(BindError::AmbiguousSubtype {
                type_name: sup,
                discriminator: join_keys(keys.clone()),
            }),
            (None, _) => self.default_subtype().ok_or_else(|| BindError::UnknownSubtype {
                type_name: sup,
                discriminator: join_keys(keys),
            }),
        }
    }

    /// Finds the subtype `value` holds and the subtype value itself.
    pub(crate) fn find_value<'a>(&self, value: &'a dyn Any) -> Option<(&SubtypeEntry, &'a dyn Any)> {
        self.entries
            .iter()
            .find_map(|entry| entry.downcast.get(value).map(|inner| (entry, inner)))
    }
}

fn join_keys<'k>(keys: impl Iterator<Item = &'k str>) -> String {
    keys.collect::<Vec<_>>().join(", ")
}

impl fmt::Debug for SubtypeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubtypeModel")
            .field("discriminator", &self.discriminator)
            .field("placement", &self.placement)
            .field("entries", &self.entries)
            .field("default_subtype", &self.default_subtype)
            .finish()
    }
}
