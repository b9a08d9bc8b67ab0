//! Managed and back references.
//!
//! A graph that is cyclic in memory (a parent owning children that point back
//! at it) is written acyclically: the parent's managed property is encoded,
//! the children's back references are not. While decoding, every property
//! declared `managed_ref(label)` pushes a [`ReferenceFrame`] for the
//! duration of its value; a `back_ref(label)` property of a nested bean is
//! then bound to the owner of the nearest frame with the same label.
//!
//! Owners are [`Managed<T>`] slots. The slot is allocated before the owner is
//! constructed, children hold a [`BackRef<T>`] to it, and the slot is filled
//! once the owner exists, so after decoding every child points at the very
//! same owner instance.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use std::sync::OnceLock;

use crate::registry::TypeRef;

// -----------------------------------------------------------------------------
// Managed / BackRef

/// A shared, write-once owner slot that back references can point to.
///
/// Decode `Managed<Parent>` instead of `Parent` when children carry a
/// [`BackRef<Parent>`].
pub struct Managed<T>(Arc<OnceLock<T>>);

impl<T> Managed<T> {
    /// Wraps an already constructed value.
    pub fn new(value: T) -> Self {
        Self(Arc::new(OnceLock::from(value)))
    }

    /// Allocates an empty slot.
    pub(crate) fn empty() -> Self {
        Self(Arc::new(OnceLock::new()))
    }

    /// Fills an empty slot. Returns the value back if it was already set.
    pub(crate) fn fill(&self, value: T) -> Result<(), T> {
        self.0.set(value)
    }

    /// Returns the owned value, `None` only while the owner is being decoded.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.0.get()
    }

    /// Creates a back reference to this slot.
    #[inline]
    pub fn downgrade(&self) -> BackRef<T> {
        BackRef(Arc::downgrade(&self.0))
    }

    /// Returns `true` if both handles share one slot.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Clone for Managed<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: PartialEq> PartialEq for Managed<T> {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl<T: fmt::Debug> fmt::Debug for Managed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => f.debug_tuple("Managed").field(value).finish(),
            None => f.write_str("Managed(<pending>)"),
        }
    }
}

/// A non-owning pointer to a [`Managed<T>`] slot.
///
/// Never read from or written to the wire; bound from the enclosing managed
/// reference while decoding.
pub struct BackRef<T>(Weak<OnceLock<T>>);

impl<T> BackRef<T> {
    /// A reference that points nowhere.
    #[inline]
    pub fn dangling() -> Self {
        Self(Weak::new())
    }

    /// Upgrades to the owner, `None` if it is gone or never existed.
    #[inline]
    pub fn upgrade(&self) -> Option<Managed<T>> {
        self.0.upgrade().map(Managed)
    }

    /// Returns `true` if this reference points at `owner`'s slot.
    pub fn points_to(&self, owner: &Managed<T>) -> bool {
        core::ptr::eq(self.0.as_ptr(), Arc::as_ptr(&owner.0))
    }

    /// Returns `true` if there is no live owner behind this reference.
    #[inline]
    pub fn is_dangling(&self) -> bool {
        self.0.strong_count() == 0
    }
}

impl<T> Clone for BackRef<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self(Weak::clone(&self.0))
    }
}

impl<T> Default for BackRef<T> {
    #[inline]
    fn default() -> Self {
        Self::dangling()
    }
}

impl<T> fmt::Debug for BackRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dangling() {
            f.write_str("BackRef(<dangling>)")
        } else {
            f.write_str("BackRef(..)")
        }
    }
}

// -----------------------------------------------------------------------------
// OwnerHandle

/// The type-erased owner a reference frame points to.
///
/// Holds the `Weak` slot of a [`Managed<T>`] being decoded.
#[derive(Clone)]
pub struct OwnerHandle(Rc<dyn Any>);

impl OwnerHandle {
    pub(crate) fn of<T: 'static>(owner: &Managed<T>) -> Self {
        Self(Rc::new(Arc::downgrade(&owner.0)))
    }

    /// Binds a back reference to this owner if it owns a `T`.
    pub(crate) fn back_ref<T: 'static>(&self) -> Option<BackRef<T>> {
        self.0
            .downcast_ref::<Weak<OnceLock<T>>>()
            .map(|weak| BackRef(Weak::clone(weak)))
    }
}

impl fmt::Debug for OwnerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OwnerHandle(..)")
    }
}

// -----------------------------------------------------------------------------
// PropertyReferenceResolver

/// One active managed reference.
#[derive(Debug, Clone)]
pub struct ReferenceFrame {
    pub label: String,
    /// `None` when the owning bean was not decoded through a `Managed` slot.
    pub owner: Option<OwnerHandle>,
    /// Declared type of the managed property.
    pub argument: TypeRef,
}

/// The stack of managed references active in one decode call.
#[derive(Debug, Default)]
pub struct PropertyReferenceResolver {
    stack: Vec<ReferenceFrame>,
}

impl PropertyReferenceResolver {
    #[inline]
    pub const fn new() -> Self {
        Self { stack: Vec::new() }
    }

    #[inline]
    pub fn push(&mut self, frame: ReferenceFrame) {
        self.stack.push(frame);
    }

    #[inline]
    pub fn pop(&mut self) -> Option<ReferenceFrame> {
        self.stack.pop()
    }

    /// Finds the nearest frame labelled `label`, searching from the top.
    pub fn resolve(&self, label: &str) -> Option<&ReferenceFrame> {
        self.stack.iter().rev().find(|frame| frame.label == label)
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}
