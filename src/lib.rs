//! Statically validated dependency injection.
//!
//! An object graph is declared as a set of components. Each component lists the keys it requires
//! and the keys it provides, and every provided key is backed by a single binding: a
//! constructor, a factory, or a redirect from an abstract type to its implementation. Components
//! are composed by installing one into another, and every composition step is validated
//! immediately, so a graph that reaches an [`Injector`] is known to be complete and acyclic.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use weft::{Component, Inject, Injector, PartialComponent, Signature, Slot, TypeExpr};
//!
//! struct Config {
//!     url: &'static str,
//! }
//!
//! struct Database {
//!     config: Arc<Config>,
//! }
//!
//! impl Inject for Database {
//!     type Deps = (Arc<Config>,);
//!
//!     fn inject((config,): Self::Deps) -> Self {
//!         Self { config }
//!     }
//! }
//!
//! // Component<Required<Config>, Database>
//! let database = Component::new(
//!     Signature::new([
//!         Slot::required([TypeExpr::of::<Config>()]),
//!         Slot::provided(TypeExpr::injectable::<Database>()),
//!     ])?,
//!     PartialComponent::new(),
//! )?;
//!
//! // Component<Database>
//! let app = Component::new(
//!     Signature::new([Slot::provided(TypeExpr::of::<Database>())])?,
//!     PartialComponent::new()
//!         .install(&database)?
//!         .register_instance(Config { url: "postgres://localhost" })?,
//! )?;
//!
//! let injector = Injector::new(&app)?;
//! let db = injector.get::<Database>()?;
//! assert_eq!(db.config.url, "postgres://localhost");
//! # Ok::<(), weft::Error>(())
//! ```
#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::must_use_candidate)]

pub use weft_core::{
    Annotated, BindingEntry, BindingKind, Dependencies, Dependency, Erased, Error, Inject, Injected,
    Recipe, Resolve, Result, TypeExpr, TypeInfo, TypeKey,
};

#[macro_use]
pub(crate) mod macros;

pub mod component;
pub use component::{Bindings, Component, PartialComponent, Signature, Slot};

pub mod injector;
pub use injector::{ConstructionPlan, Injector, InjectorBuilder, Instantiation};
