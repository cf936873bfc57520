//! Container Registry
//!
//! A deduplicated, ordered set of drop-target containers. Independently
//! mounted container components register into the same set; merging by
//! container id means a component that re-registers after a remount replaces
//! its old entry instead of adding a second drop target.
//!
//! # Ordering
//!
//! Entries keep their first-insertion position. Replacing an entry keeps its
//! position; new entries are appended in input order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::trace;

use crate::dom::{Container, ContainerId};

/// Registry key of a container entry.
///
/// Containers without an id can never be matched, so each one gets a
/// unique anonymous slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum EntryKey {
    Id(ContainerId),
    Anonymous(u64),
}

impl EntryKey {
    fn for_container(container: &Container) -> Self {
        static ANONYMOUS: AtomicU64 = AtomicU64::new(0);

        match container.id() {
            Some(id) => Self::Id(id.clone()),
            None => Self::Anonymous(ANONYMOUS.fetch_add(1, Ordering::Relaxed)),
        }
    }
}

/// Whether a registration added a new entry or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    Added,
    Replaced,
}

/// Ordered, id-keyed set of containers.
#[derive(Debug, Default)]
pub struct ContainerRegistry {
    entries: IndexMap<EntryKey, Arc<Container>>,
}

impl ContainerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a container, or replace the entry with the same id in place.
    pub fn register(&mut self, container: Arc<Container>) -> Merge {
        let key = EntryKey::for_container(&container);
        trace!(id = ?container.id(), "registering container");

        match self.entries.insert(key, container) {
            Some(_) => Merge::Replaced,
            None => Merge::Added,
        }
    }

    /// Register every container in order.
    ///
    /// Returns the number of entries that were newly added.
    pub fn register_all<I>(&mut self, containers: I) -> usize
    where
        I: IntoIterator<Item = Arc<Container>>,
    {
        containers
            .into_iter()
            .filter(|container| self.register(Arc::clone(container)) == Merge::Added)
            .count()
    }

    /// Remove the container with the given id.
    pub fn unregister(&mut self, id: &ContainerId) -> Option<Arc<Container>> {
        self.entries.shift_remove(&EntryKey::Id(id.clone()))
    }

    /// Remove a specific container element, anonymous ones included.
    pub fn unregister_element(&mut self, container: &Arc<Container>) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|_, registered| !Arc::ptr_eq(registered, container));
        self.entries.len() != before
    }

    /// Look up a container by id.
    pub fn get(&self, id: &ContainerId) -> Option<&Arc<Container>> {
        self.entries.get(&EntryKey::Id(id.clone()))
    }

    pub fn contains(&self, id: &ContainerId) -> bool {
        self.get(id).is_some()
    }

    /// Whether this exact element is registered.
    pub fn contains_element(&self, container: &Arc<Container>) -> bool {
        self.entries
            .values()
            .any(|registered| Arc::ptr_eq(registered, container))
    }

    /// The registered containers in order.
    pub fn snapshot(&self) -> Vec<Arc<Container>> {
        self.entries.values().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Container>> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
