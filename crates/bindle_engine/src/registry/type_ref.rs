use core::any::TypeId;
use core::fmt;
use core::hash::{Hash, Hasher};

/// Identity of a bindable type: its [`TypeId`] plus a readable name.
///
/// This is the argument type descriptor a property carries; the registry
/// resolves it to a [`TypeMeta`](super::TypeMeta) when a value of that type
/// has to be decoded or encoded.
#[derive(Clone, Copy)]
pub struct TypeRef {
    id: TypeId,
    name: &'static str,
}

impl TypeRef {
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: core::any::type_name::<T>(),
        }
    }

    #[inline(always)]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// The full type path, e.g. `alloc::vec::Vec<my_crate::Child>`.
    #[inline(always)]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The last path segment without generic arguments, e.g. `Vec`.
    pub fn short_name(&self) -> &'static str {
        let head = match self.name.find('<') {
            Some(end) => &self.name[..end],
            None => self.name,
        };
        head.rsplit("::").next().unwrap_or(head)
    }

    #[inline]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeRef {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec::Vec;

    use super::TypeRef;

    struct Circle;

    #[test]
    fn short_names() {
        assert_eq!(TypeRef::of::<Circle>().short_name(), "Circle");
        assert_eq!(TypeRef::of::<Vec<String>>().short_name(), "Vec");
        assert_eq!(TypeRef::of::<u32>().short_name(), "u32");
        assert!(TypeRef::of::<Circle>().is::<Circle>());
        assert_ne!(TypeRef::of::<Vec<u8>>(), TypeRef::of::<Vec<u16>>());
    }
}
