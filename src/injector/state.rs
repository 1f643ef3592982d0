//! Instance states.

use std::sync::OnceLock;

use weft_core::{Erased, Result};

/// The memoized instance of a single constructor key.
///
/// The first access constructs the instance; concurrent first accesses block until it is ready,
/// so the recipe runs at most once. A failed construction is memoized as well.
#[derive(Debug, Default)]
pub(crate) struct InstanceState {
    cell: OnceLock<Result<Erased>>,
}

impl InstanceState {
    pub(crate) const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Returns the instance, constructing it with `construct` if this is the first access.
    pub(crate) fn get_or_construct<F>(&self, construct: F) -> Result<Erased>
    where
        F: FnOnce() -> Result<Erased>,
    {
        self.cell.get_or_init(construct).clone()
    }

    /// Returns `true` once construction has run, successfully or not.
    #[inline]
    pub(crate) fn is_constructed(&self) -> bool {
        self.cell.get().is_some()
    }
}
