//! Error types.

use std::error::Error as StdError;
use std::sync::Arc;

use crate::key::{TypeInfo, TypeKey};

/// [`Error`] is an error that can be raised while declaring, composing or resolving an object
/// graph.
///
/// Every variant carries the [`TypeKey`]s involved, so the error can be rendered as a precise
/// diagnostic instead of a generic failure.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A declared type is not an injectable class type, e.g. a pointer or a bare function
    /// signature.
    #[error("a non-class type `{given}` was specified{hint}", hint = use_instead(.class))]
    NonClassType {
        given: String,
        class: Option<TypeKey>,
    },

    /// The same key was provided (or required and provided) more than once.
    #[error("type `{key}` was specified more than once")]
    RepeatedTypes { key: TypeKey },

    /// A `Required<...>` marker was declared anywhere but in the first slot of a signature.
    #[error(
        "a `Required<{}>` marker was passed as a non-first argument of a component signature",
        join_keys(.keys, ", ")
    )]
    RequiredTypesInComponentArguments { keys: Vec<TypeKey> },

    /// A key is required but nothing provides it.
    #[error("no explicit binding nor `Inject` recipe was found for `{key}`")]
    NoBindingFound { key: TypeKey },

    /// A key naming an abstract type is required but has no explicit binding.
    #[error("no explicit binding was found for `{key}`, and note that `{class}` is abstract")]
    NoBindingFoundForAbstractClass { key: TypeKey, class: TypeKey },

    /// The dependencies of the provided keys form a cycle. The first key is repeated at the end.
    #[error("dependency cycle detected: {}", join_keys(.cycle, " -> "))]
    DependencyCycle { cycle: Vec<TypeKey> },

    /// A redirect was declared from a concrete type, or onto itself.
    #[error("cannot bind `{key}` to `{target}`: only an abstract type can be bound to another type")]
    InvalidRedirect { key: TypeKey, target: TypeKey },

    /// A recipe asked for a key it did not declare as a dependency.
    #[error("the recipe of `{key}` requested `{dependency}`, which it does not depend on")]
    UndeclaredDependency { key: TypeKey, dependency: TypeKey },

    /// The instance stored for a key is not of the requested Rust type.
    #[error("the instance bound to `{key}` is not of type `{expected}`")]
    TypeMismatch { key: TypeKey, expected: TypeInfo },

    #[error(transparent)]
    Other(Arc<dyn StdError + Send + Sync + 'static>),
}

fn use_instead(class: &Option<TypeKey>) -> String {
    class
        .as_ref()
        .map_or_else(String::new, |class| format!(", use `{class}` instead"))
}

fn join_keys(keys: &[TypeKey], separator: &str) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

impl Error {
    pub fn other<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self::Other(Arc::from(err.into()))
    }

    /// Returns the key this error is primarily about, if any.
    ///
    /// For [`DependencyCycle`](Self::DependencyCycle) this is the first key of the cycle, and for
    /// [`RequiredTypesInComponentArguments`](Self::RequiredTypesInComponentArguments) the first
    /// key of the misplaced marker.
    pub fn key(&self) -> Option<&TypeKey> {
        match self {
            Self::NonClassType { class, .. } => class.as_ref(),
            Self::RepeatedTypes { key }
            | Self::NoBindingFound { key }
            | Self::NoBindingFoundForAbstractClass { key, .. }
            | Self::InvalidRedirect { key, .. }
            | Self::UndeclaredDependency { key, .. }
            | Self::TypeMismatch { key, .. } => Some(key),
            Self::RequiredTypesInComponentArguments { keys } => keys.first(),
            Self::DependencyCycle { cycle } => cycle.first(),
            Self::Other(_) => None,
        }
    }

    pub const fn is_non_class_type(&self) -> bool {
        matches!(self, Self::NonClassType { .. })
    }

    pub fn is_repeated_type(&self, key: &TypeKey) -> bool {
        matches!(self, Self::RepeatedTypes { key: repeated } if repeated == key)
    }

    pub fn is_required_in_arguments(&self, key: &TypeKey) -> bool {
        matches!(self, Self::RequiredTypesInComponentArguments { keys } if keys.contains(key))
    }

    pub fn is_no_binding_found(&self, key: &TypeKey) -> bool {
        matches!(self, Self::NoBindingFound { key: missing } if missing == key)
    }

    pub fn is_no_binding_found_for<T>(&self) -> bool
    where
        T: ?Sized + 'static,
    {
        self.is_no_binding_found(&TypeKey::of::<T>())
    }

    pub fn is_abstract_without_binding(&self, key: &TypeKey) -> bool {
        matches!(self, Self::NoBindingFoundForAbstractClass { key: missing, .. } if missing == key)
    }

    pub const fn is_dependency_cycle(&self) -> bool {
        matches!(self, Self::DependencyCycle { .. })
    }

    pub fn is_undeclared_dependency(&self, dependency: &TypeKey) -> bool {
        matches!(
            self,
            Self::UndeclaredDependency { dependency: requested, .. } if requested == dependency
        )
    }

    pub const fn is_other(&self) -> bool {
        matches!(self, Self::Other(_))
    }
}

/// [`Result`] is an alias to [`core::result::Result`] with [`Error`] as the
/// default error type.
pub type Result<T, E = Error> = core::result::Result<T, E>;
