//! Type identities.
//!
//! A [`TypeKey`] is the unit of identity in an object graph: a Rust type, optionally qualified by
//! an annotation tag. A bare `X` and `X` annotated with `Tag` are two different keys, which is
//! how a graph can hold several instances of the same underlying type.
//!
//! [`TypeExpr`] describes a type as it was declared, before it is turned into a key. It is what a
//! front-end hands over; [`TypeKey::from_declaration`] and [`TypeKey::from_lookup`] canonicalize
//! it.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem::size_of;

use crate::binding::BindingEntry;
use crate::error::{Error, Result};
use crate::resolve::Inject;

/// Identity and name of a single Rust type.
///
/// Two [`TypeInfo`] are equal if and only if they describe the same [`TypeId`].
///
/// A type is *abstract* when it is unsized, e.g. `dyn Trait` or `[T]`. Such a type can only be
/// handed out behind a pointer, so it cannot be constructed directly and has to be bound to a
/// sized implementation.
#[derive(Clone, Copy)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
    is_abstract: bool,
}

impl TypeInfo {
    /// Describes the type `T`.
    pub fn of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            // Pointers to unsized types are fat.
            is_abstract: size_of::<*const T>() != size_of::<*const ()>(),
        }
    }

    #[inline]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub const fn is_abstract(&self) -> bool {
        self.is_abstract
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Canonical identity of a type in an object graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    base: TypeInfo,
    annotation: Option<TypeInfo>,
}

impl TypeKey {
    pub const fn new(base: TypeInfo, annotation: Option<TypeInfo>) -> Self {
        Self { base, annotation }
    }

    /// Returns the key of a bare `T`.
    pub fn of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self::new(TypeInfo::of::<T>(), None)
    }

    /// Returns the key of `T` annotated with the tag `A`.
    pub fn annotated<A, T>() -> Self
    where
        A: ?Sized + 'static,
        T: ?Sized + 'static,
    {
        Self::new(TypeInfo::of::<T>(), Some(TypeInfo::of::<A>()))
    }

    #[inline]
    pub const fn base(&self) -> TypeInfo {
        self.base
    }

    #[inline]
    pub const fn annotation(&self) -> Option<TypeInfo> {
        self.annotation
    }

    #[inline]
    pub const fn is_annotated(&self) -> bool {
        self.annotation.is_some()
    }

    #[inline]
    pub const fn is_abstract(&self) -> bool {
        self.base.is_abstract
    }

    /// Returns the key of the base type with the annotation dropped.
    pub const fn unannotated(&self) -> Self {
        Self::new(self.base, None)
    }

    /// Canonicalizes a type as declared in a component signature.
    ///
    /// Pointers are rejected here: a signature names the type itself, not a way to hold it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NonClassType`] if the expression is a pointer, a function signature or a
    /// nested annotation.
    pub fn from_declaration(expr: &TypeExpr) -> Result<Self> {
        match expr {
            TypeExpr::Type { info, .. } => Ok(Self::new(*info, None)),
            TypeExpr::Annotated { tag, inner } => {
                let inner = Self::from_declaration(inner)?;
                annotate(expr, *tag, inner)
            }
            TypeExpr::Pointer(inner) => Err(Error::NonClassType {
                given: expr.to_string(),
                class: TypeKey::from_lookup(inner).ok(),
            }),
            TypeExpr::Function(_) => Err(Error::NonClassType {
                given: expr.to_string(),
                class: None,
            }),
        }
    }

    /// Canonicalizes a type as requested from an injector.
    ///
    /// Unlike [`from_declaration`](Self::from_declaration), pointers are transparent: `X*` and `X`
    /// resolve to the same key, and so do `Annotated<A, X*>` and `Annotated<A, X>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NonClassType`] if the expression is a function signature or a nested
    /// annotation.
    pub fn from_lookup(expr: &TypeExpr) -> Result<Self> {
        match expr {
            TypeExpr::Type { info, .. } => Ok(Self::new(*info, None)),
            TypeExpr::Annotated { tag, inner } => {
                let inner = Self::from_lookup(inner)?;
                annotate(expr, *tag, inner)
            }
            TypeExpr::Pointer(inner) => Self::from_lookup(inner),
            TypeExpr::Function(_) => Err(Error::NonClassType {
                given: expr.to_string(),
                class: None,
            }),
        }
    }
}

fn annotate(expr: &TypeExpr, tag: TypeInfo, inner: TypeKey) -> Result<TypeKey> {
    if inner.is_annotated() {
        return Err(Error::NonClassType {
            given: expr.to_string(),
            class: None,
        });
    }
    Ok(TypeKey::new(inner.base, Some(tag)))
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.annotation {
            Some(tag) => write!(f, "Annotated<{tag}, {}>", self.base),
            None => write!(f, "{}", self.base),
        }
    }
}

/// Builds the default binding of a type for a given key.
pub type DefaultRecipe = fn(TypeKey) -> Result<BindingEntry>;

/// A type as it was declared.
#[derive(Debug, Clone)]
pub enum TypeExpr {
    /// A plain type, with the recipe to construct it when nothing else is bound.
    Type {
        info: TypeInfo,
        default: Option<DefaultRecipe>,
    },
    /// `Annotated<tag, inner>`.
    Annotated { tag: TypeInfo, inner: Box<TypeExpr> },
    /// A pointer to `inner`.
    Pointer(Box<TypeExpr>),
    /// A bare function signature.
    Function(&'static str),
}

impl TypeExpr {
    /// Declares the plain type `T`.
    pub fn of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self::Type {
            info: TypeInfo::of::<T>(),
            default: None,
        }
    }

    /// Declares the plain type `T`, which can construct itself through [`Inject`].
    pub fn injectable<T>() -> Self
    where
        T: Inject,
    {
        Self::Type {
            info: TypeInfo::of::<T>(),
            default: Some(BindingEntry::injected::<T>),
        }
    }

    /// Declares `inner` annotated with the tag `A`.
    pub fn annotated<A>(inner: Self) -> Self
    where
        A: ?Sized + 'static,
    {
        Self::Annotated {
            tag: TypeInfo::of::<A>(),
            inner: Box::new(inner),
        }
    }

    /// Declares a pointer to `inner`.
    pub fn pointer(inner: Self) -> Self {
        Self::Pointer(Box::new(inner))
    }

    pub const fn function(signature: &'static str) -> Self {
        Self::Function(signature)
    }

    /// Returns the default binding declared for `key`, if the underlying type has one.
    ///
    /// # Errors
    ///
    /// Propagates the error of the default recipe.
    pub fn default_entry(&self, key: TypeKey) -> Option<Result<BindingEntry>> {
        match self {
            Self::Type { default, .. } => default.map(|recipe| recipe(key)),
            Self::Annotated { inner, .. } => inner.default_entry(key),
            Self::Pointer(_) | Self::Function(_) => None,
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type { info, .. } => write!(f, "{info}"),
            Self::Annotated { tag, inner } => write!(f, "Annotated<{tag}, {inner}>"),
            Self::Pointer(inner) => write!(f, "{inner}*"),
            Self::Function(signature) => f.write_str(signature),
        }
    }
}
