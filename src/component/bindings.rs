//! The provided and required sets of a component, and how two of them are merged.

use indexmap::{IndexMap, IndexSet};
use weft_core::key::DefaultRecipe;
use weft_core::{BindingEntry, Error, Result, TypeKey};

/// A set of provided keys, each with exactly one [`BindingEntry`], and a set of required keys that
/// nothing in the set provides.
///
/// Both sets keep declaration order, so the first missing or repeated key reported in an error
/// is always the first one declared.
///
/// Along with the sets, the default recipes declared by the dependencies of the entries are kept,
/// so a required key can later be bound to its own constructor.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    provided: IndexMap<TypeKey, BindingEntry>,
    required: IndexSet<TypeKey>,
    defaults: IndexMap<TypeKey, DefaultRecipe>,
}

impl Bindings {
    /// Creates an empty set of bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a provider.
    ///
    /// The key of `entry` stops being required, and its dependencies that are not provided yet
    /// become required.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RepeatedTypes`] if the key is already provided.
    pub fn insert(&mut self, entry: BindingEntry) -> Result<()> {
        let key = *entry.key();
        if self.provided.contains_key(&key) {
            return Err(Error::RepeatedTypes { key });
        }

        self.required.shift_remove(&key);
        for (dependency, recipe) in entry.defaults() {
            self.defaults.entry(*dependency).or_insert(*recipe);
        }
        let dependencies = entry.dependencies().to_vec();
        self.provided.insert(key, entry);
        for dependency in dependencies {
            self.require(dependency);
        }

        Ok(())
    }

    /// Marks `key` as required, unless it is already provided.
    pub fn require(&mut self, key: TypeKey) {
        if !self.provided.contains_key(&key) {
            self.required.insert(key);
        }
    }

    /// Merges two sets of bindings.
    ///
    /// The provided sets must be disjoint. The required set of the result is the union of both
    /// required sets, minus everything provided by either side.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RepeatedTypes`] naming the first key of `other` that `self` also provides.
    pub fn merge(mut self, other: &Self) -> Result<Self> {
        if let Some(key) = other
            .provided
            .keys()
            .find(|key| self.provided.contains_key(*key))
        {
            return Err(Error::RepeatedTypes { key: *key });
        }

        self.provided.extend(
            other
                .provided
                .iter()
                .map(|(key, entry)| (*key, entry.clone())),
        );
        self.required.extend(other.required.iter().copied());
        for (key, recipe) in &other.defaults {
            self.defaults.entry(*key).or_insert(*recipe);
        }

        let provided = &self.provided;
        self.required.retain(|key| !provided.contains_key(key));

        Ok(self)
    }

    /// Returns the default recipe declared for `key` by a dependent entry.
    #[inline]
    pub fn default_recipe(&self, key: &TypeKey) -> Option<DefaultRecipe> {
        self.defaults.get(key).copied()
    }

    /// Returns the entry providing `key`.
    #[inline]
    pub fn entry(&self, key: &TypeKey) -> Option<&BindingEntry> {
        self.provided.get(key)
    }

    /// Returns all entries, in declaration order.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = &BindingEntry> {
        self.provided.values()
    }

    /// Returns the provided keys, in declaration order.
    pub fn provided(&self) -> impl ExactSizeIterator<Item = &TypeKey> {
        self.provided.keys()
    }

    /// Returns the required keys, in declaration order.
    pub fn required(&self) -> impl ExactSizeIterator<Item = &TypeKey> {
        self.required.iter()
    }

    #[inline]
    pub fn is_provided(&self, key: &TypeKey) -> bool {
        self.provided.contains_key(key)
    }

    #[inline]
    pub fn is_required(&self, key: &TypeKey) -> bool {
        self.required.contains(key)
    }

    /// Returns `true` if nothing is required anymore.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.required.is_empty()
    }
}
