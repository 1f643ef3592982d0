//! [`Injector`] and its configuration.

use std::sync::Arc;

use weft_core::binding::ConstructFn;
use weft_core::{
    Annotated, BindingEntry, Dependency, Erased, Error, Recipe, Resolve, Result, TypeExpr, TypeKey,
};

use crate::component::Component;

mod plan;
pub use plan::ConstructionPlan;

mod state;
use state::InstanceState;

/// When the instances of constructor keys are built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Instantiation {
    /// On first request.
    #[default]
    Lazy,
    /// All at once, in construction order, when the injector is built.
    Eager,
}

/// A finalized object graph, serving instances by key.
///
/// Every constructor key is constructed at most once and shared afterwards, even under
/// concurrent access. Factory keys produce a fresh instance on every request.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use weft::{Component, Injector, PartialComponent, Signature, Slot, TypeExpr};
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
///
/// impl Greeter for English {
///     fn greet(&self) -> String {
///         "Hello".to_string()
///     }
/// }
///
/// let component = Component::new(
///     Signature::new([Slot::provided(TypeExpr::of::<dyn Greeter>())])?,
///     PartialComponent::new()
///         .bind::<dyn Greeter, English, _>(|english| english as Arc<dyn Greeter>)?
///         .register_constructor(|(): ()| English)?,
/// )?;
///
/// let injector = Injector::new(&component)?;
/// let greeter = injector.get::<dyn Greeter>()?;
/// assert_eq!(greeter.greet(), "Hello");
/// # Ok::<(), weft::Error>(())
/// ```
#[derive(Debug)]
pub struct Injector {
    plan: ConstructionPlan,
    states: Box<[InstanceState]>,
    instantiation: Instantiation,
}

/// Configures and builds an [`Injector`].
#[derive(Debug, Clone)]
pub struct InjectorBuilder {
    component: Component,
    instantiation: Instantiation,
}

impl InjectorBuilder {
    #[must_use]
    pub fn instantiation(mut self, instantiation: Instantiation) -> Self {
        self.instantiation = instantiation;
        self
    }

    /// Builds the injector.
    ///
    /// # Errors
    ///
    /// - [`Error::NoBindingFound`] if the component still requires a key.
    /// - [`Error::DependencyCycle`] if its bindings depend on each other in a cycle.
    /// - With [`Instantiation::Eager`], the first error raised while constructing an instance.
    pub fn build(self) -> Result<Injector> {
        let plan = ConstructionPlan::new(self.component.bindings())?;
        let states = plan.entries().map(|_| InstanceState::new()).collect();

        let injector = Injector {
            plan,
            states,
            instantiation: self.instantiation,
        };
        if injector.instantiation == Instantiation::Eager {
            injector.eagerly_inject_all()?;
        }

        Ok(injector)
    }
}

impl Injector {
    /// Builds a lazy injector for `component`.
    ///
    /// # Errors
    ///
    /// See [`InjectorBuilder::build`].
    pub fn new(component: &Component) -> Result<Self> {
        Self::builder(component).build()
    }

    pub fn builder(component: &Component) -> InjectorBuilder {
        InjectorBuilder {
            component: component.clone(),
            instantiation: Instantiation::default(),
        }
    }

    /// Returns the instance of `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoBindingFound`] if `T` is not provided, or the error raised while
    /// constructing it.
    pub fn get<T>(&self) -> Result<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        <Arc<T> as Dependency>::resolve(self)
    }

    /// Returns the instance of `T` annotated with `A`.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn get_annotated<A, T>(&self) -> Result<Arc<T>>
    where
        A: ?Sized + 'static,
        T: ?Sized + Send + Sync + 'static,
    {
        <Annotated<A, T> as Dependency>::resolve(self).map(Annotated::into_inner)
    }

    /// Returns the instance bound to `key`.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn get_by_key(&self, key: &TypeKey) -> Result<Erased> {
        let (index, entry) = self
            .plan
            .get_full(key)
            .ok_or(Error::NoBindingFound { key: *key })?;

        match entry.recipe() {
            Recipe::Constructor(construct) => {
                self.states[index].get_or_construct(|| self.construct(entry, construct))
            }
            Recipe::Factory(construct) => self.construct(entry, construct),
            Recipe::Redirect { target, upcast } => upcast(self.get_by_key(target)?),
        }
    }

    fn construct(&self, entry: &BindingEntry, construct: &ConstructFn) -> Result<Erased> {
        trace!(key = %entry.key(), kind = ?entry.kind(), "construct");
        construct(&Scoped {
            injector: self,
            entry,
        })
    }

    /// Returns the instance of a type as it would be spelled in a declaration.
    ///
    /// Pointers are looked through, so `X*` yields the instance of `X`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NonClassType`] if `expr` does not name a class type, otherwise see
    /// [`get`](Self::get).
    pub fn get_expr(&self, expr: &TypeExpr) -> Result<Erased> {
        self.get_by_key(&TypeKey::from_lookup(expr)?)
    }

    /// Constructs every constructor key that has not been constructed yet, in construction order.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while constructing an instance.
    pub fn eagerly_inject_all(&self) -> Result<()> {
        for (index, entry) in self.plan.entries().enumerate() {
            if let Recipe::Constructor(construct) = entry.recipe() {
                self.states[index].get_or_construct(|| self.construct(entry, construct))?;
            }
        }
        Ok(())
    }

    #[inline]
    pub const fn plan(&self) -> &ConstructionPlan {
        &self.plan
    }

    #[inline]
    pub const fn instantiation(&self) -> Instantiation {
        self.instantiation
    }

    #[inline]
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.plan.contains(key)
    }

    /// Returns every key served by this injector, in construction order.
    pub fn keys(&self) -> impl ExactSizeIterator<Item = &TypeKey> {
        self.plan.order()
    }

    /// Returns `true` if `key` is a constructor key whose instance has been constructed.
    pub fn is_constructed(&self, key: &TypeKey) -> bool {
        self.plan
            .position(key)
            .is_some_and(|index| self.states[index].is_constructed())
    }
}

impl Resolve for Injector {
    fn resolve(&self, key: &TypeKey) -> Result<Erased> {
        self.get_by_key(key)
    }
}

/// What a recipe sees of the injector: only the keys its entry depends on.
struct Scoped<'a> {
    injector: &'a Injector,
    entry: &'a BindingEntry,
}

impl Resolve for Scoped<'_> {
    fn resolve(&self, key: &TypeKey) -> Result<Erased> {
        if !self.entry.dependencies().contains(key) {
            debug!(key = %self.entry.key(), dependency = %key, "undeclared dependency");
            return Err(Error::UndeclaredDependency {
                key: *self.entry.key(),
                dependency: *key,
            });
        }
        self.injector.get_by_key(key)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use weft_core::{Inject, Injected};

    use super::*;
    use crate::component::{PartialComponent, Signature, Slot};

    #[derive(Debug)]
    struct X;
    #[derive(Debug)]
    struct Y;
    struct Annotation1;

    #[derive(Debug, PartialEq)]
    struct Counter(usize);

    trait Shape: Send + Sync {
        fn sides(&self) -> usize;
    }

    struct Square;

    impl Shape for Square {
        fn sides(&self) -> usize {
            4
        }
    }

    impl Shape for Counter {
        fn sides(&self) -> usize {
            self.0
        }
    }

    struct Service {
        x: Arc<X>,
    }

    impl Inject for Service {
        type Deps = (Arc<X>,);

        fn inject((x,): Self::Deps) -> Self {
            Self { x }
        }
    }

    fn provides(exprs: Vec<TypeExpr>) -> Signature {
        Signature::new(exprs.into_iter().map(Slot::provided)).unwrap()
    }

    #[test]
    fn test_default_recipe_single_instance() {
        let component = Component::new(
            provides(vec![TypeExpr::injectable::<Service>()]),
            PartialComponent::new().register_constructor(|(): ()| X).unwrap(),
        )
        .unwrap();
        let injector = Injector::new(&component).unwrap();

        let first = injector.get::<Service>().unwrap();
        let second = injector.get::<Service>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first.x, &injector.get::<X>().unwrap()));
    }

    #[test]
    fn test_missing_binding_at_build() {
        let signature = Signature::new([Slot::required([TypeExpr::of::<X>()])]).unwrap();
        let component = Component::new(signature, PartialComponent::new()).unwrap();
        let err = Injector::new(&component).unwrap_err();
        assert!(err.is_no_binding_found_for::<X>());
    }

    #[test]
    fn test_multiple_required_types_error_names_first() {
        let signature = Signature::new([Slot::required([
            TypeExpr::of::<X>(),
            TypeExpr::of::<Y>(),
        ])])
        .unwrap();
        let component = Component::new(signature, PartialComponent::new()).unwrap();
        let err = Injector::new(&component).unwrap_err();
        assert!(err.is_no_binding_found_for::<X>());
    }

    #[test]
    fn test_install_satisfies_required() {
        let required = Component::new(
            Signature::new([Slot::required([TypeExpr::of::<X>(), TypeExpr::of::<Y>()])]).unwrap(),
            PartialComponent::new(),
        )
        .unwrap();
        let provided = Component::new(
            provides(vec![TypeExpr::of::<X>(), TypeExpr::of::<Y>()]),
            PartialComponent::new()
                .register_instance(X)
                .unwrap()
                .register_instance(Y)
                .unwrap(),
        )
        .unwrap();

        let component = Component::new(
            provides(vec![TypeExpr::of::<X>()]),
            PartialComponent::new()
                .install(&required)
                .unwrap()
                .install(&provided)
                .unwrap(),
        )
        .unwrap();
        assert!(component.is_complete());

        let injector = Injector::new(&component).unwrap();
        assert!(injector.get::<X>().is_ok());
        assert!(injector.get::<Y>().is_ok());
    }

    #[test]
    fn test_cloned_components_build_the_same_graph() {
        let component = Component::new(
            provides(vec![TypeExpr::injectable::<Service>()]),
            PartialComponent::new().register_instance(X).unwrap(),
        )
        .unwrap();
        let copy = component.clone();

        let first = Injector::new(&component).unwrap();
        let second = Injector::new(&copy).unwrap();
        assert!(first.keys().eq(second.keys()));

        // Instances are per injector.
        assert!(!Arc::ptr_eq(
            &first.get::<Service>().unwrap(),
            &second.get::<Service>().unwrap()
        ));
    }

    #[test]
    fn test_factory_yields_fresh_values() {
        let counter = Arc::new(AtomicUsize::new(0));
        let component = Component::new(
            provides(vec![TypeExpr::of::<Counter>()]),
            PartialComponent::new()
                .register_factory({
                    let counter = Arc::clone(&counter);
                    move |(): ()| Counter(counter.fetch_add(1, Ordering::SeqCst))
                })
                .unwrap(),
        )
        .unwrap();
        let injector = Injector::new(&component).unwrap();

        assert_eq!(*injector.get::<Counter>().unwrap(), Counter(0));
        assert_eq!(*injector.get::<Counter>().unwrap(), Counter(1));
        assert!(!injector.is_constructed(&TypeKey::of::<Counter>()));
    }

    #[test]
    fn test_redirect_yields_implementation() {
        let component = Component::new(
            provides(vec![TypeExpr::of::<dyn Shape>()]),
            PartialComponent::new()
                .bind::<dyn Shape, Square, _>(|square| square as Arc<dyn Shape>)
                .unwrap()
                .register_constructor(|(): ()| Square)
                .unwrap(),
        )
        .unwrap();
        let injector = Injector::new(&component).unwrap();

        let shape = injector.get::<dyn Shape>().unwrap();
        assert_eq!(shape.sides(), 4);

        let again = injector.get::<dyn Shape>().unwrap();
        assert!(Arc::ptr_eq(&shape, &again));
        assert!(injector.is_constructed(&TypeKey::of::<Square>()));
    }

    #[test]
    fn test_redirect_to_factory_yields_fresh_values() {
        let counter = Arc::new(AtomicUsize::new(0));
        let component = Component::new(
            provides(vec![TypeExpr::of::<dyn Shape>()]),
            PartialComponent::new()
                .bind::<dyn Shape, Counter, _>(|counter| counter as Arc<dyn Shape>)
                .unwrap()
                .register_factory({
                    let counter = Arc::clone(&counter);
                    move |(): ()| Counter(counter.fetch_add(1, Ordering::SeqCst))
                })
                .unwrap(),
        )
        .unwrap();
        let injector = Injector::new(&component).unwrap();

        let first = injector.get::<dyn Shape>().unwrap();
        let second = injector.get::<dyn Shape>().unwrap();
        assert_eq!(first.sides(), 0);
        assert_eq!(second.sides(), 1);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_factory_for_abstract_type() {
        let entry = BindingEntry::factory(TypeKey::of::<dyn Shape>(), Vec::new(), |_| {
            Ok(Erased::new(Arc::new(Square) as Arc<dyn Shape>))
        })
        .unwrap();
        let component = Component::new(
            provides(vec![TypeExpr::of::<dyn Shape>()]),
            PartialComponent::new().register_entry(entry).unwrap(),
        )
        .unwrap();
        let injector = Injector::new(&component).unwrap();

        let first = injector.get::<dyn Shape>().unwrap();
        let second = injector.get::<dyn Shape>().unwrap();
        assert_eq!(first.sides(), 4);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_undeclared_dependency_is_rejected() {
        let entry = BindingEntry::constructor(TypeKey::of::<X>(), Vec::new(), |resolver| {
            resolver.resolve(&TypeKey::of::<Y>())?;
            Ok(Erased::new(Arc::new(X)))
        })
        .unwrap();
        let component = Component::new(
            provides(vec![TypeExpr::of::<X>(), TypeExpr::of::<Y>()]),
            PartialComponent::new()
                .register_entry(entry)
                .unwrap()
                .register_instance(Y)
                .unwrap(),
        )
        .unwrap();

        let injector = Injector::new(&component).unwrap();
        let err = injector.get::<X>().unwrap_err();
        assert!(err.is_undeclared_dependency(&TypeKey::of::<Y>()));
        assert_eq!(err.key(), Some(&TypeKey::of::<X>()));

        let err = Injector::builder(&component)
            .instantiation(Instantiation::Eager)
            .build()
            .unwrap_err();
        assert!(err.is_undeclared_dependency(&TypeKey::of::<Y>()));
    }

    #[test]
    fn test_recipe_requesting_its_own_key() {
        let entry = BindingEntry::constructor(TypeKey::of::<X>(), Vec::new(), |resolver| {
            resolver.resolve(&TypeKey::of::<X>())
        })
        .unwrap();
        let component = Component::new(
            provides(vec![TypeExpr::of::<X>()]),
            PartialComponent::new().register_entry(entry).unwrap(),
        )
        .unwrap();
        let injector = Injector::new(&component).unwrap();

        let err = injector.get::<X>().unwrap_err();
        assert!(err.is_undeclared_dependency(&TypeKey::of::<X>()));
    }

    #[test]
    fn test_injected_dependencies_are_shared() {
        struct Leaf;

        impl Inject for Leaf {
            type Deps = ();

            fn inject((): ()) -> Self {
                Self
            }
        }

        struct Root {
            leaf: Injected<Leaf>,
        }

        impl Inject for Root {
            type Deps = (Injected<Leaf>,);

            fn inject((leaf,): Self::Deps) -> Self {
                Self { leaf }
            }
        }

        let component = Component::new(
            provides(vec![TypeExpr::injectable::<Root>()]),
            PartialComponent::new(),
        )
        .unwrap();
        let injector = Injector::new(&component).unwrap();

        let root = injector.get::<Root>().unwrap();
        let leaf = injector.get::<Leaf>().unwrap();
        assert!(Arc::ptr_eq(&root.leaf.clone().into_inner(), &leaf));
    }

    #[test]
    fn test_annotated() {
        let component = Component::new(
            provides(vec![
                TypeExpr::of::<Counter>(),
                TypeExpr::annotated::<Annotation1>(TypeExpr::of::<Counter>()),
            ]),
            PartialComponent::new()
                .register_instance(Counter(1))
                .unwrap()
                .register_annotated_instance::<Annotation1, _>(Counter(2))
                .unwrap(),
        )
        .unwrap();
        let injector = Injector::new(&component).unwrap();

        assert_eq!(*injector.get::<Counter>().unwrap(), Counter(1));
        assert_eq!(
            *injector.get_annotated::<Annotation1, Counter>().unwrap(),
            Counter(2)
        );
    }

    #[test]
    fn test_get_expr_looks_through_pointers() {
        let component = Component::new(
            provides(vec![TypeExpr::annotated::<Annotation1>(TypeExpr::of::<X>())]),
            PartialComponent::new()
                .register_annotated_instance::<Annotation1, _>(X)
                .unwrap(),
        )
        .unwrap();
        let injector = Injector::new(&component).unwrap();

        let expr = TypeExpr::annotated::<Annotation1>(TypeExpr::pointer(TypeExpr::of::<X>()));
        let erased = injector.get_expr(&expr).unwrap();
        assert!(erased.is::<X>());

        let err = injector.get_expr(&TypeExpr::of::<X>()).unwrap_err();
        assert!(err.is_no_binding_found_for::<X>());

        let err = injector
            .get_expr(&TypeExpr::function("fn() -> X"))
            .unwrap_err();
        assert!(err.is_non_class_type());
    }

    #[test]
    fn test_lazy_and_eager() {
        let component = Component::new(
            provides(vec![TypeExpr::injectable::<Service>()]),
            PartialComponent::new().register_constructor(|(): ()| X).unwrap(),
        )
        .unwrap();

        let lazy = Injector::new(&component).unwrap();
        assert_eq!(lazy.instantiation(), Instantiation::Lazy);
        assert!(!lazy.is_constructed(&TypeKey::of::<Service>()));
        lazy.get::<Service>().unwrap();
        assert!(lazy.is_constructed(&TypeKey::of::<X>()));

        let eager = Injector::builder(&component)
            .instantiation(Instantiation::Eager)
            .build()
            .unwrap();
        assert!(eager.is_constructed(&TypeKey::of::<Service>()));
        assert!(eager.is_constructed(&TypeKey::of::<X>()));
    }

    #[test]
    fn test_dependency_cycle() {
        let component = Component::new(
            provides(vec![TypeExpr::of::<X>()]),
            PartialComponent::new()
                .register_constructor(|(_y,): (Arc<Y>,)| X)
                .unwrap()
                .register_constructor(|(_x,): (Arc<X>,)| Y)
                .unwrap(),
        )
        .unwrap();
        let err = Injector::new(&component).unwrap_err();
        match err {
            Error::DependencyCycle { cycle } => assert_eq!(
                cycle,
                vec![TypeKey::of::<X>(), TypeKey::of::<Y>(), TypeKey::of::<X>()]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_concurrent_first_access_constructs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let component = Component::new(
            provides(vec![TypeExpr::of::<X>()]),
            PartialComponent::new()
                .register_constructor({
                    let calls = Arc::clone(&calls);
                    move |(): ()| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        X
                    }
                })
                .unwrap(),
        )
        .unwrap();
        let injector = Injector::new(&component).unwrap();

        let instances: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| injector.get::<X>().unwrap()))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(instances.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_unknown_key() {
        let injector = Injector::new(&Component::empty()).unwrap();
        assert!(injector.plan().is_empty());
        assert!(!injector.contains(&TypeKey::of::<X>()));
        assert!(injector.get::<X>().unwrap_err().is_no_binding_found_for::<X>());
    }
}
