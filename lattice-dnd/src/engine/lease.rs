//! Engine lease.
//!
//! An [`EngineLease`] is the sole owner of a live engine instance. Acquiring
//! one creates the instance and replays every registered listener onto it;
//! dropping one destroys the instance. [`EngineState`] holds at most one
//! lease, so at most one instance is ever live.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use super::{DragEngine, EngineFactory, EngineOptions};
use crate::dom::Container;
use crate::registry::{EventRegistry, PredicateRegistry};

/// Counter for numbering engine instances.
static GENERATION: AtomicU64 = AtomicU64::new(1);

/// Scoped ownership of one engine instance.
pub struct EngineLease {
    engine: Box<dyn DragEngine>,
    generation: u64,
}

impl EngineLease {
    /// Create an instance and attach every registered listener to it.
    ///
    /// The lease is returned only once replay has finished.
    pub fn acquire(
        factory: &dyn EngineFactory,
        containers: Vec<Arc<Container>>,
        options: &EngineOptions,
        predicates: Arc<PredicateRegistry>,
        events: &EventRegistry,
    ) -> Self {
        let generation = GENERATION.fetch_add(1, Ordering::Relaxed);
        let container_count = containers.len();

        let mut engine = factory.create(containers, options, predicates);
        let attached = events.replay(engine.as_mut());

        debug!(generation, containers = container_count, listeners = attached, "engine instance created");
        Self { engine, generation }
    }

    pub fn engine(&self) -> &dyn DragEngine {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> &mut dyn DragEngine {
        self.engine.as_mut()
    }

    /// Number identifying this instance among all instances ever created.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for EngineLease {
    fn drop(&mut self) {
        if !self.engine.is_destroyed() {
            self.engine.destroy();
        }
        debug!(generation = self.generation, "engine instance destroyed");
    }
}

impl std::fmt::Debug for EngineLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineLease")
            .field("generation", &self.generation)
            .field("dragging", &self.engine.is_dragging())
            .finish()
    }
}

/// Lifecycle of the engine owned by a context.
#[derive(Debug, Default)]
pub enum EngineState {
    #[default]
    Uninitialized,
    Active(EngineLease),
}

impl EngineState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    pub fn lease(&self) -> Option<&EngineLease> {
        match self {
            Self::Active(lease) => Some(lease),
            Self::Uninitialized => None,
        }
    }

    pub fn lease_mut(&mut self) -> Option<&mut EngineLease> {
        match self {
            Self::Active(lease) => Some(lease),
            Self::Uninitialized => None,
        }
    }

    /// Destroy the current instance, if any.
    pub fn release(&mut self) -> bool {
        match std::mem::take(self) {
            Self::Active(lease) => {
                drop(lease);
                true
            }
            Self::Uninitialized => false,
        }
    }

    /// Destroy the current instance, then install the one `acquire` creates.
    ///
    /// The old instance is gone before the new one exists. Returns the
    /// generation of the new instance.
    pub fn transition<F>(&mut self, acquire: F) -> u64
    where
        F: FnOnce() -> EngineLease,
    {
        self.release();
        let lease = acquire();
        let generation = lease.generation();
        *self = Self::Active(lease);
        generation
    }
}
