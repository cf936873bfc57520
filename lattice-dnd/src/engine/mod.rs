//! Drag Engine
//!
//! The low-level drag engine (pointer tracking, mirror rendering, drop
//! detection) is an external collaborator. This module defines the contract
//! the core needs from it and the lifecycle wrapper the core puts around it.
//!
//! # Contract
//!
//! An engine is created from a container list, an option set and the shared
//! predicate registry. After creation it accepts listener attachments and
//! container list updates. It cannot change options in place: a new option
//! set means destroying the instance and creating another one.
//!
//! # Lifecycle
//!
//! 1. [`EngineState::Uninitialized`] until the first container asks for an
//!    engine.
//!
//! 2. [`EngineState::Active`] holds an [`EngineLease`]. The lease is only
//!    constructed after every registered listener has been replayed onto
//!    the new instance, so nobody can observe a half-configured engine.
//!
//! 3. Dropping a lease destroys its instance. Reconfiguring is therefore
//!    "release the old lease, acquire a new one" under a single lock.
//!
//! [`headless::HeadlessEngine`] is an in-process implementation of the
//! contract for tests and hosts without pointer input.

mod event;
pub mod headless;
mod lease;
mod options;
#[cfg(test)]
mod recording;

use std::sync::Arc;

pub use event::{CloneKind, DragEvent, EventKind, PlacementEvent};
pub use lease::{EngineLease, EngineState};
pub use options::{EngineOptions, OptionsPatch};
#[cfg(test)]
pub(crate) use recording::{RecordingEngine, RecordingFactory};

use crate::dom::Container;
use crate::registry::{EventListener, ListenerId, PredicateRegistry};

/// A live low-level drag engine instance.
pub trait DragEngine: Send {
    /// The containers the instance currently treats as drop targets.
    fn containers(&self) -> Vec<Arc<Container>>;

    /// Replace the live container list.
    fn set_containers(&mut self, containers: Vec<Arc<Container>>);

    /// Attach a listener for one event kind.
    fn on(&mut self, kind: EventKind, id: ListenerId, listener: EventListener);

    /// Detach a listener. Returns false if it was not attached.
    fn off(&mut self, kind: EventKind, id: ListenerId) -> bool;

    /// Tear the instance down. Any drag in progress is abandoned.
    fn destroy(&mut self);

    fn is_destroyed(&self) -> bool;

    /// Whether a drag is currently in progress.
    fn is_dragging(&self) -> bool {
        false
    }
}

/// Creates engine instances.
pub trait EngineFactory: Send + Sync {
    fn create(
        &self,
        containers: Vec<Arc<Container>>,
        options: &EngineOptions,
        predicates: Arc<PredicateRegistry>,
    ) -> Box<dyn DragEngine>;
}

impl<F> EngineFactory for F
where
    F: Fn(Vec<Arc<Container>>, &EngineOptions, Arc<PredicateRegistry>) -> Box<dyn DragEngine>
        + Send
        + Sync,
{
    fn create(
        &self,
        containers: Vec<Arc<Container>>,
        options: &EngineOptions,
        predicates: Arc<PredicateRegistry>,
    ) -> Box<dyn DragEngine> {
        self(containers, options, predicates)
    }
}
