//! Event Broadcast Registry
//!
//! Lifecycle events are multi-subscriber: every container that cares about
//! drops gets its own listener, and none of them may displace another.
//!
//! # Replay
//!
//! The registry is the durable record of every subscription. Engine
//! instances come and go (see [`crate::engine::EngineLease`]); each new
//! instance is handed the full subscription list through [`EventRegistry::replay`]
//! before anyone else can reach it, so listeners survive reconfiguration.

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::trace;

use super::{ListenerId, OwnerId};
use crate::engine::{DragEngine, DragEvent, EventKind};

/// A lifecycle event callback.
pub type EventListener = Arc<dyn Fn(&DragEvent) + Send + Sync>;

#[derive(Clone)]
struct Subscription {
    id: ListenerId,
    owner: Option<OwnerId>,
    listener: EventListener,
}

/// Per-event-kind listener lists.
#[derive(Default)]
pub struct EventRegistry {
    lists: [SmallVec<[Subscription; 4]>; 9],
}

impl EventRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener to the list of `kind`.
    pub fn subscribe(
        &mut self,
        kind: EventKind,
        owner: Option<OwnerId>,
        listener: EventListener,
    ) -> ListenerId {
        let id = ListenerId::new();
        trace!(event = kind.as_str(), ?id, ?owner, "listener subscribed");
        self.lists[kind.index()].push(Subscription { id, owner, listener });
        id
    }

    /// Remove one listener, returning the kind it was subscribed to.
    pub fn unsubscribe(&mut self, id: ListenerId) -> Option<EventKind> {
        for kind in EventKind::ALL {
            let list = &mut self.lists[kind.index()];
            if let Some(position) = list.iter().position(|sub| sub.id == id) {
                list.remove(position);
                return Some(kind);
            }
        }
        None
    }

    /// Remove every listener registered by `owner`.
    pub fn release_owner(&mut self, owner: OwnerId) -> Vec<(EventKind, ListenerId)> {
        let mut released = Vec::new();
        for kind in EventKind::ALL {
            self.lists[kind.index()].retain(|sub| {
                if sub.owner == Some(owner) {
                    released.push((kind, sub.id));
                    false
                } else {
                    true
                }
            });
        }
        released
    }

    /// The listeners of `kind`, in registration order.
    pub fn listeners(&self, kind: EventKind) -> Vec<(ListenerId, EventListener)> {
        self.lists[kind.index()]
            .iter()
            .map(|sub| (sub.id, Arc::clone(&sub.listener)))
            .collect()
    }

    /// Attach every listener to `engine`.
    ///
    /// Kinds are replayed in [`EventKind::ALL`] order; within a kind,
    /// listeners keep their registration order.
    pub fn replay(&self, engine: &mut dyn DragEngine) -> usize {
        let mut attached = 0;
        for kind in EventKind::ALL {
            for sub in &self.lists[kind.index()] {
                engine.on(kind, sub.id, Arc::clone(&sub.listener));
                attached += 1;
            }
        }
        trace!(attached, "listeners replayed");
        attached
    }

    /// Number of listeners subscribed to `kind`.
    pub fn count(&self, kind: EventKind) -> usize {
        self.lists[kind.index()].len()
    }

    /// Total number of listeners across all kinds.
    pub fn len(&self) -> usize {
        self.lists.iter().map(|list| list.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for kind in EventKind::ALL {
            map.entry(&kind.as_str(), &self.count(kind));
        }
        map.finish()
    }
}
