//! Construction order of a complete component.

use indexmap::{IndexMap, IndexSet};
use weft_core::{BindingEntry, Error, Result, TypeKey};

use crate::component::Bindings;

/// The entries of a complete component, ordered so that every entry comes after everything it
/// depends on.
///
/// The plan is what an [`Injector`](super::Injector) walks, and it is exposed as-is for anyone
/// who needs to drive instantiation or teardown in dependency order.
#[derive(Debug, Clone)]
pub struct ConstructionPlan {
    entries: IndexMap<TypeKey, BindingEntry>,
}

impl ConstructionPlan {
    /// Orders the entries of `bindings`.
    ///
    /// Entries are visited depth-first in declaration order, so independent entries keep the
    /// order they were registered in.
    ///
    /// # Errors
    ///
    /// - [`Error::NoBindingFound`] naming the first key that is still required.
    /// - [`Error::DependencyCycle`] if the dependencies of the entries form a cycle.
    pub fn new(bindings: &Bindings) -> Result<Self> {
        if let Some(key) = bindings.required().next() {
            debug!(%key, "incomplete bindings");
            return Err(Error::NoBindingFound { key: *key });
        }

        let mut sorter = Sorter {
            bindings,
            path: IndexSet::new(),
            order: IndexMap::with_capacity(bindings.provided().len()),
        };
        for entry in bindings.entries() {
            sorter.visit(entry)?;
        }

        debug!(keys = sorter.order.len(), "construction plan");
        Ok(Self {
            entries: sorter.order,
        })
    }

    /// Returns the keys in construction order.
    pub fn order(&self) -> impl ExactSizeIterator<Item = &TypeKey> {
        self.entries.keys()
    }

    /// Returns the entries in construction order.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = &BindingEntry> {
        self.entries.values()
    }

    #[inline]
    pub fn entry(&self, key: &TypeKey) -> Option<&BindingEntry> {
        self.entries.get(key)
    }

    /// Returns the position of `key` in construction order.
    #[inline]
    pub fn position(&self, key: &TypeKey) -> Option<usize> {
        self.entries.get_index_of(key)
    }

    pub(crate) fn get_full(&self, key: &TypeKey) -> Option<(usize, &BindingEntry)> {
        self.entries
            .get_full(key)
            .map(|(index, _, entry)| (index, entry))
    }

    #[inline]
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.entries.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct Sorter<'a> {
    bindings: &'a Bindings,
    // Keys being visited, outermost first.
    path: IndexSet<TypeKey>,
    order: IndexMap<TypeKey, BindingEntry>,
}

impl<'a> Sorter<'a> {
    fn visit(&mut self, entry: &'a BindingEntry) -> Result<()> {
        let key = *entry.key();
        if self.order.contains_key(&key) {
            return Ok(());
        }

        if let Some(start) = self.path.get_index_of(&key) {
            let mut cycle: Vec<_> = self.path.iter().skip(start).copied().collect();
            cycle.push(key);
            debug!(?cycle, "dependency cycle");
            return Err(Error::DependencyCycle { cycle });
        }

        self.path.insert(key);
        let bindings = self.bindings;
        for dependency in entry.dependencies() {
            let dependency = bindings
                .entry(dependency)
                .ok_or(Error::NoBindingFound { key: *dependency })?;
            self.visit(dependency)?;
        }
        self.path.pop();

        self.order.insert(key, entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use weft_core::Erased;

    use super::*;

    struct X;
    struct Y;
    struct Z;
    struct W;

    fn needs<T: Send + Sync + 'static>(value: T, deps: Vec<TypeKey>) -> BindingEntry {
        let value = Erased::new(Arc::new(value));
        BindingEntry::constructor(TypeKey::of::<T>(), deps, move |_| Ok(value.clone())).unwrap()
    }

    fn bindings(entries: Vec<BindingEntry>) -> Bindings {
        let mut bindings = Bindings::new();
        for entry in entries {
            bindings.insert(entry).unwrap();
        }
        bindings
    }

    #[test]
    fn test_dependencies_come_first() {
        let bindings = bindings(vec![
            needs(X, vec![TypeKey::of::<Y>(), TypeKey::of::<Z>()]),
            needs(Y, vec![TypeKey::of::<Z>()]),
            needs(W, vec![]),
            needs(Z, vec![]),
        ]);
        let plan = ConstructionPlan::new(&bindings).unwrap();

        let order: Vec<_> = plan.order().copied().collect();
        assert_eq!(
            order,
            vec![
                TypeKey::of::<Z>(),
                TypeKey::of::<Y>(),
                TypeKey::of::<X>(),
                TypeKey::of::<W>(),
            ]
        );
        assert_eq!(plan.position(&TypeKey::of::<W>()), Some(3));
        assert_eq!(plan.len(), 4);
    }

    #[test]
    fn test_incomplete() {
        let bindings = bindings(vec![needs(X, vec![TypeKey::of::<Y>(), TypeKey::of::<Z>()])]);
        let err = ConstructionPlan::new(&bindings).unwrap_err();
        assert!(err.is_no_binding_found_for::<Y>());
    }

    #[test]
    fn test_cycle() {
        let bindings = bindings(vec![
            needs(W, vec![]),
            needs(X, vec![TypeKey::of::<Y>()]),
            needs(Y, vec![TypeKey::of::<Z>()]),
            needs(Z, vec![TypeKey::of::<X>()]),
        ]);
        let err = ConstructionPlan::new(&bindings).unwrap_err();
        match err {
            Error::DependencyCycle { cycle } => assert_eq!(
                cycle,
                vec![
                    TypeKey::of::<X>(),
                    TypeKey::of::<Y>(),
                    TypeKey::of::<Z>(),
                    TypeKey::of::<X>(),
                ]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_self_cycle() {
        let bindings = bindings(vec![needs(X, vec![TypeKey::of::<X>()])]);
        let err = ConstructionPlan::new(&bindings).unwrap_err();
        assert!(err.is_dependency_cycle());
        assert_eq!(err.key(), Some(&TypeKey::of::<X>()));
    }

    #[test]
    fn test_empty() {
        let plan = ConstructionPlan::new(&Bindings::new()).unwrap();
        assert!(plan.is_empty());
    }
}
