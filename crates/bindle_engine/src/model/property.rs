use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use bitflags::bitflags;

use crate::decl::{DefaultValue, Include};
use crate::decl::erased::{ErasedGetter, ErasedSetter};
use crate::registry::TypeRef;

bitflags! {
    /// Boolean traits of a [`PropertyModel`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PropertyFlags: u8 {
        /// Absence is an error unless a default or back reference fills it.
        const REQUIRED = 1 << 0;
        /// An explicit null binds the type's null value.
        const NULLABLE = 1 << 1;
        /// A creator parameter that is never read from the wire.
        const IGNORED = 1 << 2;
        /// Written when encoding, skipped when decoding.
        const READ_ONLY = 1 << 3;
    }
}

/// How a decoded property value reaches the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyBinding {
    /// Positional creator argument.
    Constructor(usize),
    /// Written after construction.
    Setter,
}

/// Which bean a property value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyOrigin {
    /// Declared on the bean itself.
    Own,
    /// Merged from `unwrapped[slot]`, where it is property `inner` of the
    /// nested model's index of the same kind.
    Unwrapped { slot: usize, inner: usize },
}

/// Anything a [`PropertyIndex`](super::PropertyIndex) can look up by name.
pub trait NamedProperty {
    fn name(&self) -> &str;
    fn aliases(&self) -> &[String];
}

/// One bindable property of a bean.
#[derive(Clone)]
pub struct PropertyModel {
    pub(crate) name: String,
    pub(crate) aliases: Vec<String>,
    pub(crate) ty: TypeRef,
    pub(crate) flags: PropertyFlags,
    pub(crate) default: Option<DefaultValue>,
    pub(crate) binding: PropertyBinding,
    pub(crate) origin: PropertyOrigin,
    pub(crate) reader: Option<Arc<dyn ErasedGetter>>,
    /// Setter or field; for creator-bound properties only used by
    /// `deserialize_into`.
    pub(crate) writer: Option<Arc<dyn ErasedSetter>>,
    pub(crate) managed_ref: Option<String>,
    pub(crate) back_ref: Option<String>,
    pub(crate) views: Option<Vec<&'static str>>,
    pub(crate) external_discriminator: Option<String>,
    pub(crate) include: Include,
}

impl PropertyModel {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// The argument type, used to select the nested deserializer.
    #[inline]
    pub fn ty(&self) -> TypeRef {
        self.ty
    }

    #[inline]
    pub fn flags(&self) -> PropertyFlags {
        self.flags
    }

    #[inline]
    pub fn is_required(&self) -> bool {
        self.flags.contains(PropertyFlags::REQUIRED)
    }

    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.flags.contains(PropertyFlags::NULLABLE)
    }

    #[inline]
    pub fn is_ignored(&self) -> bool {
        self.flags.contains(PropertyFlags::IGNORED)
    }

    #[inline]
    pub fn binding(&self) -> PropertyBinding {
        self.binding
    }

    #[inline]
    pub fn origin(&self) -> PropertyOrigin {
        self.origin
    }

    #[inline]
    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    #[inline]
    pub fn managed_ref(&self) -> Option<&str> {
        self.managed_ref.as_deref()
    }

    #[inline]
    pub fn back_ref(&self) -> Option<&str> {
        self.back_ref.as_deref()
    }

    #[inline]
    pub fn views(&self) -> Option<&[&'static str]> {
        self.views.as_deref()
    }

    #[inline]
    pub fn external_discriminator(&self) -> Option<&str> {
        self.external_discriminator.as_deref()
    }

    #[inline]
    pub fn include(&self) -> Include {
        self.include
    }

    /// Returns `true` if the property takes part in a call with `active` views.
    ///
    /// Properties without view tags, and every property when no view is
    /// active, always take part.
    pub fn in_views(&self, active: &[&'static str]) -> bool {
        match &self.views {
            Some(views) if !active.is_empty() => views.iter().any(|v| active.contains(v)),
            _ => true,
        }
    }

    /// A copy renamed for a parent bean that flattens this property.
    pub(crate) fn flattened(&self, prefix: &str, suffix: &str) -> Self {
        let rename = |name: &String| {
            let mut out = String::with_capacity(prefix.len() + name.len() + suffix.len());
            out.push_str(prefix);
            out.push_str(name);
            out.push_str(suffix);
            out
        };
        Self {
            name: rename(&self.name),
            aliases: self.aliases.iter().map(rename).collect(),
            ..self.clone()
        }
    }
}

impl NamedProperty for PropertyModel {
    #[inline]
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn aliases(&self) -> &[String] {
        &self.aliases
    }
}

impl fmt::Debug for PropertyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyModel")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("ty", &self.ty)
            .field("flags", &self.flags)
            .field("binding", &self.binding)
            .field("origin", &self.origin)
            .field("default", &self.default)
            .field("managed_ref", &self.managed_ref)
            .field("back_ref", &self.back_ref)
            .finish_non_exhaustive()
    }
}
