use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use super::erased::{ErasedGetter, FnGetter};
use crate::error::CreateError;
use crate::registry::{BoxedValue, GetTypeMeta, TypeRef, TypeRegistry};

// -----------------------------------------------------------------------------
// Args

/// Positional arguments handed to a creator.
///
/// A slot is empty when its property was absent and has no default.
pub struct Args {
    values: Vec<Option<BoxedValue>>,
}

impl Args {
    #[inline]
    pub(crate) fn new(values: Vec<Option<BoxedValue>>) -> Self {
        Self { values }
    }

    /// Takes the argument at `index`.
    pub fn take<P: 'static>(&mut self, index: usize) -> Result<P, CreateError> {
        match self.take_opt(index)? {
            Some(value) => Ok(value),
            None => Err(CreateError::MissingArgument { index }),
        }
    }

    /// Takes the argument at `index`, `None` if the slot is empty.
    pub fn take_opt<P: 'static>(&mut self, index: usize) -> Result<Option<P>, CreateError> {
        let Some(slot) = self.values.get_mut(index) else {
            return Err(CreateError::MissingArgument { index });
        };
        match slot.take() {
            None => Ok(None),
            Some(value) => match value.downcast::<P>() {
                Ok(value) => Ok(Some(*value)),
                Err(value) => {
                    *slot = Some(value);
                    Err(CreateError::TypeMismatch {
                        index,
                        expected: core::any::type_name::<P>(),
                    })
                }
            },
        }
    }

    /// Takes the argument at `index` or `P::default()` if the slot is empty.
    #[inline]
    pub fn take_or_default<P: Default + 'static>(&mut self, index: usize) -> Result<P, CreateError> {
        self.take_opt(index).map(Option::unwrap_or_default)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.values.iter().map(Option::is_some))
            .finish()
    }
}

// -----------------------------------------------------------------------------
// CreatorDecl

pub(crate) type ErasedCreate = Arc<dyn Fn(&mut Args) -> Result<BoxedValue, CreateError> + Send + Sync>;

/// A single opaque argument that becomes the whole instance.
#[derive(Clone)]
pub(crate) struct DelegateDecl {
    pub arg: TypeRef,
    pub value_of: Arc<dyn ErasedGetter>,
    pub dependency: fn(&mut TypeRegistry),
}

/// A constructor or factory of a bean.
#[derive(Clone)]
pub struct CreatorDecl {
    pub(crate) arity: usize,
    pub(crate) create: ErasedCreate,
    pub(crate) delegate: Option<DelegateDecl>,
}

impl CreatorDecl {
    /// A creator taking `arity` positional arguments.
    pub fn new<T: 'static>(
        arity: usize,
        create: impl Fn(&mut Args) -> Result<T, CreateError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            arity,
            create: Arc::new(move |args: &mut Args| {
                create(args).map(|value| Box::new(value) as BoxedValue)
            }),
            delegate: None,
        }
    }

    /// A creator building the instance from one value of type `A`.
    ///
    /// `value_of` gives the value back when encoding.
    pub fn delegating<T: 'static, A: GetTypeMeta>(create: fn(A) -> T, value_of: fn(&T) -> &A) -> Self {
        let mut creator = Self::new::<T>(1, move |args: &mut Args| args.take::<A>(0).map(create));
        creator.delegate = Some(DelegateDecl {
            arg: TypeRef::of::<A>(),
            value_of: Arc::new(FnGetter { f: value_of }),
            dependency: TypeRegistry::register::<A>,
        });
        creator
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl fmt::Debug for CreatorDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreatorDecl")
            .field("arity", &self.arity)
            .field("delegating", &self.delegate.as_ref().map(|d| d.arg))
            .finish()
    }
}
