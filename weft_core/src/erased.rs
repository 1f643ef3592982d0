//! Utilities around shared instances with erased type information.

use std::any::{Any, type_name};
use std::sync::Arc;

/// [`Erased`] is a shared handle to an instance of an arbitrary type.
///
/// The instance is held as an `Arc<T>`, where `T` may be unsized (e.g. `dyn Trait`). Cloning an
/// [`Erased`] never clones the instance itself, only the handle.
#[derive(Clone)]
pub struct Erased {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Erased {
    /// Creates a new `Erased` from a shared instance of type `T`.
    #[must_use]
    pub fn new<T>(instance: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(instance),
            type_name: type_name::<T>(),
        }
    }

    /// Returns the shared instance if it is of type `T`.
    pub fn downcast<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.inner.downcast_ref::<Arc<T>>().cloned()
    }

    /// Returns `true` if the instance is of type `T`.
    pub fn is<T>(&self) -> bool
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.inner.is::<Arc<T>>()
    }

    /// Returns the name of the type of the instance.
    #[inline]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if both handles were cloned from the same handle.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Erased {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Erased")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}
