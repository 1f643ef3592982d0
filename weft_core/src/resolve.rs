//! Typed access to the instances of a validated graph.
//!
//! Recipes declare what they consume as a tuple of [`Dependency`] values, e.g.
//! `(Arc<Config>, Annotated<Primary, Database>)`. The tuple gives both the keys of the
//! dependencies, which are known before anything is constructed, and the way to fetch them from a
//! [`Resolve`] once the graph is built.

use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use crate::binding::BindingEntry;
use crate::erased::Erased;
use crate::error::{Error, Result};
use crate::key::{DefaultRecipe, TypeInfo, TypeKey};

/// Something instances can be pulled from by key.
pub trait Resolve {
    /// Returns the instance bound to `key`, constructing it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoBindingFound`] if nothing is bound to `key`.
    fn resolve(&self, key: &TypeKey) -> Result<Erased>;
}

/// A single parameter of a recipe.
pub trait Dependency: Sized + 'static {
    /// Returns the key this parameter is resolved from.
    fn key() -> TypeKey;

    /// Pulls this parameter from a resolver.
    ///
    /// # Errors
    ///
    /// Propagates the resolver's error, or returns [`Error::TypeMismatch`] if the instance is not
    /// of the expected type.
    fn resolve(resolver: &dyn Resolve) -> Result<Self>;

    /// Returns the recipe used for [`key`](Self::key) when nothing else provides it.
    fn default_recipe() -> Option<DefaultRecipe> {
        None
    }
}

impl<T> Dependency for Arc<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn key() -> TypeKey {
        TypeKey::of::<T>()
    }

    fn resolve(resolver: &dyn Resolve) -> Result<Self> {
        let key = Self::key();
        downcast(&key, &resolver.resolve(&key)?)
    }
}

/// A shared instance of `T` bound under the annotation tag `A`.
pub struct Annotated<A, T>
where
    A: ?Sized,
    T: ?Sized,
{
    instance: Arc<T>,
    _marker: PhantomData<fn() -> A>,
}

impl<A, T> Annotated<A, T>
where
    A: ?Sized,
    T: ?Sized,
{
    pub const fn new(instance: Arc<T>) -> Self {
        Self {
            instance,
            _marker: PhantomData,
        }
    }

    /// Unwraps `self` and returns the shared instance.
    pub fn into_inner(self) -> Arc<T> {
        self.instance
    }
}

impl<A, T> Clone for Annotated<A, T>
where
    A: ?Sized,
    T: ?Sized,
{
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.instance))
    }
}

impl<A, T> Deref for Annotated<A, T>
where
    A: ?Sized,
    T: ?Sized,
{
    type Target = T;

    fn deref(&self) -> &T {
        &self.instance
    }
}

impl<A, T> fmt::Debug for Annotated<A, T>
where
    A: ?Sized,
    T: ?Sized + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Annotated").field(&&*self.instance).finish()
    }
}

impl<A, T> Dependency for Annotated<A, T>
where
    A: ?Sized + 'static,
    T: ?Sized + Send + Sync + 'static,
{
    fn key() -> TypeKey {
        TypeKey::annotated::<A, T>()
    }

    fn resolve(resolver: &dyn Resolve) -> Result<Self> {
        let key = Self::key();
        downcast(&key, &resolver.resolve(&key)?).map(Self::new)
    }
}

/// A shared instance of `T` that falls back to the [`Inject`] constructor of `T`.
///
/// Consuming `Injected<T>` instead of `Arc<T>` lets a component leave `T` unbound: when nothing
/// else provides `T`, its own constructor is bound in its place.
pub struct Injected<T> {
    instance: Arc<T>,
}

impl<T> Injected<T> {
    pub const fn new(instance: Arc<T>) -> Self {
        Self { instance }
    }

    /// Unwraps `self` and returns the shared instance.
    pub fn into_inner(self) -> Arc<T> {
        self.instance
    }
}

impl<T> Clone for Injected<T> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.instance))
    }
}

impl<T> Deref for Injected<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.instance
    }
}

impl<T> fmt::Debug for Injected<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Injected").field(&*self.instance).finish()
    }
}

impl<T> Dependency for Injected<T>
where
    T: Inject,
{
    fn key() -> TypeKey {
        TypeKey::of::<T>()
    }

    fn resolve(resolver: &dyn Resolve) -> Result<Self> {
        let key = Self::key();
        downcast(&key, &resolver.resolve(&key)?).map(Self::new)
    }

    fn default_recipe() -> Option<DefaultRecipe> {
        Some(BindingEntry::injected::<T>)
    }
}

/// The full parameter list of a recipe.
pub trait Dependencies: Sized + 'static {
    /// Returns the keys of the parameters, in order.
    fn keys() -> Vec<TypeKey>;

    /// Pulls every parameter from a resolver.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a parameter.
    fn resolve(resolver: &dyn Resolve) -> Result<Self>;

    /// Returns the default recipes of the parameters that have one.
    fn defaults() -> Vec<(TypeKey, DefaultRecipe)>;
}

impl Dependencies for () {
    fn keys() -> Vec<TypeKey> {
        Vec::new()
    }

    fn defaults() -> Vec<(TypeKey, DefaultRecipe)> {
        Vec::new()
    }

    fn resolve(_resolver: &dyn Resolve) -> Result<Self> {
        Ok(())
    }
}

macro_rules! impl_dependencies_tuple {
    ($($ty:ident),*) => {
        impl<$($ty,)*> Dependencies for ($($ty,)*)
        where
            $($ty: Dependency,)*
        {
            fn keys() -> Vec<TypeKey> {
                vec![$($ty::key(),)*]
            }

            fn resolve(resolver: &dyn Resolve) -> Result<Self> {
                Ok(($($ty::resolve(resolver)?,)*))
            }

            fn defaults() -> Vec<(TypeKey, DefaultRecipe)> {
                [$($ty::default_recipe().map(|recipe| ($ty::key(), recipe)),)*]
                    .into_iter()
                    .flatten()
                    .collect()
            }
        }
    };
}

apply_tuples!(impl_dependencies_tuple);

/// A type that declares its own constructor.
///
/// A type implementing [`Inject`] does not need an explicit binding: when a component declares
/// it through [`TypeExpr::injectable`](crate::key::TypeExpr::injectable), or a recipe consumes it
/// as [`Injected`], and nothing else provides it, this constructor is used.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use weft_core::{Dependencies, Inject, TypeKey};
///
/// struct Config;
///
/// struct Database {
///     config: Arc<Config>,
/// }
///
/// impl Inject for Database {
///     type Deps = (Arc<Config>,);
///
///     fn inject((config,): Self::Deps) -> Self {
///         Self { config }
///     }
/// }
///
/// assert_eq!(
///     <Database as Inject>::Deps::keys(),
///     vec![TypeKey::of::<Config>()]
/// );
/// ```
pub trait Inject: Sized + Send + Sync + 'static {
    type Deps: Dependencies;

    fn inject(deps: Self::Deps) -> Self;
}

/// Downcasts the instance resolved for `key` into an `Arc<T>`.
pub(crate) fn downcast<T>(key: &TypeKey, erased: &Erased) -> Result<Arc<T>>
where
    T: ?Sized + Send + Sync + 'static,
{
    erased.downcast::<T>().ok_or_else(|| Error::TypeMismatch {
        key: *key,
        expected: TypeInfo::of::<T>(),
    })
}
