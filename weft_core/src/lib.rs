//! Core types and traits for `weft` library.
#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::must_use_candidate)]

#[macro_use]
pub(crate) mod macros;

pub mod binding;
pub mod erased;
pub mod error;
pub mod key;
pub mod resolve;

pub use binding::{BindingEntry, BindingKind, Recipe};
pub use erased::Erased;
pub use error::{Error, Result};
pub use key::{TypeExpr, TypeInfo, TypeKey};
pub use resolve::{Annotated, Dependencies, Dependency, Inject, Injected, Resolve};
