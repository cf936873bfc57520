//! Registries
//!
//! The drag engine is shared by every container of an application, but each
//! container configures it independently. The registries are where those
//! independent contributions accumulate:
//!
//! - [`ContainerRegistry`]: the deduplicated set of drop targets.
//! - [`PredicateRegistry`]: exclusive decision slots with default policies.
//! - [`EventRegistry`]: multi-subscriber listener lists, replayable onto a
//!   freshly created engine instance.
//!
//! Every registration may carry an [`OwnerId`], so that everything a
//! container contributed can be withdrawn when it unmounts.

mod containers;
mod events;
mod predicates;

use std::sync::atomic::{AtomicU64, Ordering};

pub use containers::{ContainerRegistry, Merge};
pub use events::{EventListener, EventRegistry};
pub use predicates::{
    default_accepts, default_copy, AcceptsPredicate, CopyPredicate, InvalidPredicate,
    IsContainerPredicate, MovesPredicate, PredicateKind, PredicateRegistry, SlotRegistration,
};

/// Identity of a registering party, usually one mounted container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(u64);

impl OwnerId {
    /// Generate a new unique owner ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle of one registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Generate a new unique listener ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}
