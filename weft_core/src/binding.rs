//! Binding entries: how a single key gets its instances.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::erased::Erased;
use crate::error::{Error, Result};
use crate::key::{DefaultRecipe, TypeInfo, TypeKey};
use crate::resolve::{Dependencies, Inject, Resolve, downcast};

/// Builds an instance out of instances pulled from a [`Resolve`].
pub type ConstructFn = Arc<dyn Fn(&dyn Resolve) -> Result<Erased> + Send + Sync>;

/// Converts an instance of a redirect target into an instance of the redirected key.
pub type UpcastFn = Arc<dyn Fn(Erased) -> Result<Erased> + Send + Sync>;

/// The recipe of a [`BindingEntry`].
#[derive(Clone)]
pub enum Recipe {
    /// Constructs a single instance, shared by every consumer.
    Constructor(ConstructFn),
    /// Constructs a fresh instance on every request.
    Factory(ConstructFn),
    /// Forwards to the instance (or factory) of another key.
    Redirect { target: TypeKey, upcast: UpcastFn },
}

/// The tag of a [`Recipe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Constructor,
    Factory,
    Redirect,
}

impl Recipe {
    pub const fn kind(&self) -> BindingKind {
        match self {
            Self::Constructor(_) => BindingKind::Constructor,
            Self::Factory(_) => BindingKind::Factory,
            Self::Redirect { .. } => BindingKind::Redirect,
        }
    }
}

/// One declared provider of a [`TypeKey`].
///
/// Instances are exchanged as [`Erased`] values wrapping an `Arc<T>`, where `T` is the base type
/// of the key.
#[derive(Clone)]
pub struct BindingEntry {
    key: TypeKey,
    recipe: Recipe,
    dependencies: Arc<[TypeKey]>,
    defaults: Arc<[(TypeKey, DefaultRecipe)]>,
}

impl BindingEntry {
    /// Creates a constructor entry from a type-erased recipe.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoBindingFoundForAbstractClass`] if `key` is abstract.
    pub fn constructor<F>(key: TypeKey, dependencies: Vec<TypeKey>, construct: F) -> Result<Self>
    where
        F: Fn(&dyn Resolve) -> Result<Erased> + Send + Sync + 'static,
    {
        ensure_constructible(key)?;
        Ok(Self {
            key,
            recipe: Recipe::Constructor(Arc::new(construct)),
            dependencies: dependencies.into(),
            defaults: Arc::from([]),
        })
    }

    /// Creates a factory entry from a type-erased recipe.
    ///
    /// Unlike a constructor, a factory may provide an abstract key, e.g. by returning an
    /// `Arc<dyn Trait>`.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the other constructors.
    pub fn factory<F>(key: TypeKey, dependencies: Vec<TypeKey>, construct: F) -> Result<Self>
    where
        F: Fn(&dyn Resolve) -> Result<Erased> + Send + Sync + 'static,
    {
        Ok(Self {
            key,
            recipe: Recipe::Factory(Arc::new(construct)),
            dependencies: dependencies.into(),
            defaults: Arc::from([]),
        })
    }

    /// Creates a redirect entry, binding the abstract `key` to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRedirect`] if `key` is not abstract or if `target` is `key`
    /// itself.
    pub fn redirect<F>(key: TypeKey, target: TypeKey, upcast: F) -> Result<Self>
    where
        F: Fn(Erased) -> Result<Erased> + Send + Sync + 'static,
    {
        if !key.is_abstract() || key == target {
            debug!(%key, %target, "invalid redirect");
            return Err(Error::InvalidRedirect { key, target });
        }

        Ok(Self {
            key,
            recipe: Recipe::Redirect {
                target,
                upcast: Arc::new(upcast),
            },
            dependencies: Arc::from([target]),
            defaults: Arc::from([]),
        })
    }

    /// Creates a constructor entry from a function taking its dependencies.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the base type of `key` is not `T`.
    pub fn typed_constructor<T, D, F>(key: TypeKey, constructor: F) -> Result<Self>
    where
        T: Send + Sync + 'static,
        D: Dependencies,
        F: Fn(D) -> T + Send + Sync + 'static,
    {
        ensure_base::<T>(key)?;
        let entry = Self::constructor(key, D::keys(), move |resolver| {
            let deps = D::resolve(resolver)?;
            Ok(Erased::new(Arc::new(constructor(deps))))
        })?;
        Ok(entry.with_defaults::<D>())
    }

    /// Creates a factory entry from a function taking its dependencies.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the base type of `key` is not `T`.
    pub fn typed_factory<T, D, F>(key: TypeKey, factory: F) -> Result<Self>
    where
        T: Send + Sync + 'static,
        D: Dependencies,
        F: Fn(D) -> T + Send + Sync + 'static,
    {
        ensure_base::<T>(key)?;
        let entry = Self::factory(key, D::keys(), move |resolver| {
            let deps = D::resolve(resolver)?;
            Ok(Erased::new(Arc::new(factory(deps))))
        })?;
        Ok(entry.with_defaults::<D>())
    }

    /// Creates a constructor entry always yielding `instance`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the base type of `key` is not `T`.
    pub fn instance<T>(key: TypeKey, instance: T) -> Result<Self>
    where
        T: Send + Sync + 'static,
    {
        ensure_base::<T>(key)?;
        let instance = Erased::new(Arc::new(instance));
        Self::constructor(key, Vec::new(), move |_| Ok(instance.clone()))
    }

    /// Creates a redirect entry converting instances of `C` into instances of the abstract `I`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the base types of the keys are not `I` and `C`, or
    /// [`Error::InvalidRedirect`] under the conditions of [`redirect`](Self::redirect).
    pub fn typed_redirect<I, C, F>(key: TypeKey, target: TypeKey, upcast: F) -> Result<Self>
    where
        I: ?Sized + Send + Sync + 'static,
        C: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static,
    {
        ensure_base::<I>(key)?;
        ensure_base::<C>(target)?;
        Self::redirect(key, target, move |erased| {
            let concrete = downcast::<C>(&target, &erased)?;
            Ok(Erased::new(upcast(concrete)))
        })
    }

    /// Creates the constructor entry described by the [`Inject`] implementation of `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the base type of `key` is not `T`.
    pub fn injected<T>(key: TypeKey) -> Result<Self>
    where
        T: Inject,
    {
        Self::typed_constructor::<T, T::Deps, _>(key, T::inject)
    }

    fn with_defaults<D>(mut self) -> Self
    where
        D: Dependencies,
    {
        self.defaults = D::defaults().into();
        self
    }

    #[inline]
    pub const fn key(&self) -> &TypeKey {
        &self.key
    }

    #[inline]
    pub const fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    #[inline]
    pub const fn kind(&self) -> BindingKind {
        self.recipe.kind()
    }

    /// Returns the keys consumed by the recipe, in declaration order.
    #[inline]
    pub fn dependencies(&self) -> &[TypeKey] {
        &self.dependencies
    }

    /// Returns the default recipes of the dependencies that have one.
    #[inline]
    pub fn defaults(&self) -> &[(TypeKey, DefaultRecipe)] {
        &self.defaults
    }
}

fn ensure_constructible(key: TypeKey) -> Result<()> {
    if key.is_abstract() {
        return Err(Error::NoBindingFoundForAbstractClass {
            key,
            class: key.unannotated(),
        });
    }
    Ok(())
}

fn ensure_base<T>(key: TypeKey) -> Result<()>
where
    T: ?Sized + 'static,
{
    if key.base().id() != TypeId::of::<T>() {
        debug!(%key, expected = std::any::type_name::<T>(), "binding type mismatch");
        return Err(Error::TypeMismatch {
            key,
            expected: TypeInfo::of::<T>(),
        });
    }
    Ok(())
}

impl fmt::Debug for BindingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("BindingEntry");
        debug
            .field("key", &self.key)
            .field("kind", &self.kind())
            .field("dependencies", &self.dependencies);
        if let Recipe::Redirect { target, .. } = &self.recipe {
            debug.field("target", target);
        }
        debug.finish()
    }
}
