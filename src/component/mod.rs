//! Component declaration and composition.
//!
//! A [`PartialComponent`] is a builder accumulating bindings; every step is checked as soon as it
//! happens. [`Component::new`] freezes it against a declared [`Signature`], after which the
//! component is an immutable snapshot that can be cloned, installed into other components, or
//! turned into an [`Injector`](crate::injector::Injector).

use std::sync::Arc;

use weft_core::{BindingEntry, Dependencies, Error, Inject, Result, TypeKey};

mod bindings;
pub use bindings::Bindings;

mod signature;
pub use signature::{Signature, Slot};

/// A component under construction.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use weft::{Component, PartialComponent, Signature, Slot, TypeExpr, TypeKey};
///
/// struct Config(&'static str);
/// struct Database(Arc<Config>);
///
/// // Component<Required<Config>, Database>
/// let database = Component::new(
///     Signature::new([
///         Slot::required([TypeExpr::of::<Config>()]),
///         Slot::provided(TypeExpr::of::<Database>()),
///     ])?,
///     PartialComponent::new()
///         .register_constructor(|(config,): (Arc<Config>,)| Database(config))?,
/// )?;
/// assert!(database.requires(&TypeKey::of::<Config>()));
///
/// // Component<Database>
/// let app = Component::new(
///     Signature::new([Slot::provided(TypeExpr::of::<Database>())])?,
///     PartialComponent::new()
///         .install(&database)?
///         .register_instance(Config("localhost"))?,
/// )?;
/// assert!(app.is_complete());
/// # Ok::<(), weft::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct PartialComponent {
    bindings: Bindings,
}

impl PartialComponent {
    /// Creates an empty partial component.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a binding entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RepeatedTypes`] if the key of `entry` is already provided.
    pub fn register_entry(mut self, entry: BindingEntry) -> Result<Self> {
        trace!(key = %entry.key(), kind = ?entry.kind(), "register");
        self.bindings.insert(entry)?;
        Ok(self)
    }

    /// Registers the constructor of `T`. The constructed instance is shared by every consumer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RepeatedTypes`] if `T` is already provided.
    pub fn register_constructor<T, D, F>(self, constructor: F) -> Result<Self>
    where
        T: Send + Sync + 'static,
        D: Dependencies,
        F: Fn(D) -> T + Send + Sync + 'static,
    {
        self.register_entry(BindingEntry::typed_constructor(
            TypeKey::of::<T>(),
            constructor,
        )?)
    }

    /// Registers the constructor of `T` annotated with `A`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RepeatedTypes`] if `Annotated<A, T>` is already provided.
    pub fn register_annotated_constructor<A, T, D, F>(self, constructor: F) -> Result<Self>
    where
        A: ?Sized + 'static,
        T: Send + Sync + 'static,
        D: Dependencies,
        F: Fn(D) -> T + Send + Sync + 'static,
    {
        self.register_entry(BindingEntry::typed_constructor(
            TypeKey::annotated::<A, T>(),
            constructor,
        )?)
    }

    /// Registers the [`Inject`] constructor of `T` explicitly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RepeatedTypes`] if `T` is already provided.
    pub fn register_injectable<T>(self) -> Result<Self>
    where
        T: Inject,
    {
        self.register_entry(BindingEntry::injected::<T>(TypeKey::of::<T>())?)
    }

    /// Registers a factory of `T`. Every request gets a fresh instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RepeatedTypes`] if `T` is already provided.
    pub fn register_factory<T, D, F>(self, factory: F) -> Result<Self>
    where
        T: Send + Sync + 'static,
        D: Dependencies,
        F: Fn(D) -> T + Send + Sync + 'static,
    {
        self.register_entry(BindingEntry::typed_factory(TypeKey::of::<T>(), factory)?)
    }

    /// Registers a factory of `T` annotated with `A`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RepeatedTypes`] if `Annotated<A, T>` is already provided.
    pub fn register_annotated_factory<A, T, D, F>(self, factory: F) -> Result<Self>
    where
        A: ?Sized + 'static,
        T: Send + Sync + 'static,
        D: Dependencies,
        F: Fn(D) -> T + Send + Sync + 'static,
    {
        self.register_entry(BindingEntry::typed_factory(
            TypeKey::annotated::<A, T>(),
            factory,
        )?)
    }

    /// Registers an existing instance of `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RepeatedTypes`] if `T` is already provided.
    pub fn register_instance<T>(self, instance: T) -> Result<Self>
    where
        T: Send + Sync + 'static,
    {
        self.register_entry(BindingEntry::instance(TypeKey::of::<T>(), instance)?)
    }

    /// Registers an existing instance of `T` annotated with `A`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RepeatedTypes`] if `Annotated<A, T>` is already provided.
    pub fn register_annotated_instance<A, T>(self, instance: T) -> Result<Self>
    where
        A: ?Sized + 'static,
        T: Send + Sync + 'static,
    {
        self.register_entry(BindingEntry::instance(
            TypeKey::annotated::<A, T>(),
            instance,
        )?)
    }

    /// Binds the abstract type `I` to its implementation `C`.
    ///
    /// Requests for `I` are forwarded to `C`, whose instances are converted with `upcast`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRedirect`] if `I` is not abstract, or [`Error::RepeatedTypes`] if
    /// `I` is already provided.
    pub fn bind<I, C, F>(self, upcast: F) -> Result<Self>
    where
        I: ?Sized + Send + Sync + 'static,
        C: Send + Sync + 'static,
        F: Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static,
    {
        self.register_entry(BindingEntry::typed_redirect(
            TypeKey::of::<I>(),
            TypeKey::of::<C>(),
            upcast,
        )?)
    }

    /// Binds the abstract type `I` annotated with `A` to its implementation `C` annotated with
    /// `B`.
    ///
    /// # Errors
    ///
    /// See [`bind`](Self::bind).
    pub fn bind_annotated<A, I, B, C, F>(self, upcast: F) -> Result<Self>
    where
        A: ?Sized + 'static,
        B: ?Sized + 'static,
        I: ?Sized + Send + Sync + 'static,
        C: Send + Sync + 'static,
        F: Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static,
    {
        self.register_entry(BindingEntry::typed_redirect(
            TypeKey::annotated::<A, I>(),
            TypeKey::annotated::<B, C>(),
            upcast,
        )?)
    }

    /// Installs every binding of `component` into this one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RepeatedTypes`] if a key is provided by both sides.
    pub fn install(mut self, component: &Component) -> Result<Self> {
        trace!(
            provided = component.bindings().provided().len(),
            required = component.bindings().required().len(),
            "install"
        );
        self.bindings = self.bindings.merge(component.bindings())?;
        Ok(self)
    }

    #[inline]
    pub const fn bindings(&self) -> &Bindings {
        &self.bindings
    }
}

impl From<Component> for PartialComponent {
    fn from(component: Component) -> Self {
        let inner = Arc::unwrap_or_clone(component.inner);
        Self {
            bindings: inner.bindings,
        }
    }
}

/// A finalized component.
///
/// Cloning a component is cheap: clones share the same bindings, which are never mutated.
#[derive(Debug, Clone)]
pub struct Component {
    inner: Arc<ComponentInner>,
}

#[derive(Debug, Clone)]
struct ComponentInner {
    signature: Signature,
    bindings: Bindings,
}

impl Component {
    /// Finalizes `partial` against the declared `signature`.
    ///
    /// Every key the signature provides must be bound, either explicitly or through the default
    /// recipe of its type. Keys required by `partial` and not declared as required by the
    /// signature are bound to their default recipes, one after another, until nothing undeclared
    /// is left; a key without a default recipe is an error.
    ///
    /// # Errors
    ///
    /// - [`Error::NoBindingFoundForAbstractClass`] if a provided abstract key has no binding.
    /// - [`Error::NoBindingFound`] if a provided key has no binding, or if a key is required
    ///   without being declared as such.
    /// - [`Error::RepeatedTypes`] if a synthesized default binding collides.
    pub fn new(signature: Signature, partial: PartialComponent) -> Result<Self> {
        let mut bindings = partial.bindings;

        for (key, expr) in signature.provided_exprs() {
            if bindings.is_provided(key) {
                continue;
            }

            let default = expr
                .default_entry(*key)
                .or_else(|| bindings.default_recipe(key).map(|recipe| recipe(*key)));
            match default {
                Some(entry) => {
                    trace!(%key, "default binding");
                    bindings.insert(entry?)?;
                }
                None if key.is_abstract() => {
                    debug!(%key, "abstract type without binding");
                    return Err(Error::NoBindingFoundForAbstractClass {
                        key: *key,
                        class: key.unannotated(),
                    });
                }
                None => {
                    debug!(%key, "no binding");
                    return Err(Error::NoBindingFound { key: *key });
                }
            }
        }

        loop {
            let pending = bindings
                .required()
                .find(|key| !signature.requires(key))
                .copied();
            let Some(key) = pending else {
                break;
            };
            let Some(recipe) = bindings.default_recipe(&key) else {
                debug!(%key, "undeclared requirement");
                return Err(Error::NoBindingFound { key });
            };
            trace!(%key, "default binding");
            bindings.insert(recipe(key)?)?;
        }

        for key in signature.required() {
            bindings.require(*key);
        }

        Ok(Self {
            inner: Arc::new(ComponentInner {
                signature,
                bindings,
            }),
        })
    }

    /// Returns a component that neither requires nor provides anything.
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(ComponentInner {
                signature: Signature::empty(),
                bindings: Bindings::new(),
            }),
        }
    }

    /// Declares the bindings of this component under another signature.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn convert(&self, signature: Signature) -> Result<Self> {
        Self::new(signature, PartialComponent::from(self.clone()))
    }

    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.inner.signature
    }

    #[inline]
    pub fn bindings(&self) -> &Bindings {
        &self.inner.bindings
    }

    #[inline]
    pub fn provides(&self, key: &TypeKey) -> bool {
        self.inner.bindings.is_provided(key)
    }

    #[inline]
    pub fn requires(&self, key: &TypeKey) -> bool {
        self.inner.bindings.is_required(key)
    }

    /// Returns `true` if nothing is required anymore, i.e. an injector can be built from it.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.inner.bindings.is_complete()
    }

    /// Returns `true` if both components share the same bindings.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Component {
    fn default() -> Self {
        Self::empty()
    }
}
