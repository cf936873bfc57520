//! Test double for the engine contract.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{DragEngine, DragEvent, EngineFactory, EngineOptions, EventKind};
use crate::dom::Container;
use crate::registry::{EventListener, ListenerId, PredicateRegistry};

#[derive(Default)]
struct RecordingState {
    containers: Vec<Arc<Container>>,
    listeners: HashMap<EventKind, Vec<(ListenerId, EventListener)>>,
    options: EngineOptions,
    destroyed: bool,
}

/// Engine that records what was attached and dispatches on demand.
#[derive(Clone)]
pub(crate) struct RecordingEngine {
    state: Arc<Mutex<RecordingState>>,
    live: Arc<AtomicUsize>,
}

impl RecordingEngine {
    pub(crate) fn new(containers: Vec<Arc<Container>>) -> Self {
        let live = Arc::new(AtomicUsize::new(1));
        Self {
            state: Arc::new(Mutex::new(RecordingState {
                containers,
                ..RecordingState::default()
            })),
            live,
        }
    }

    pub(crate) fn attached(&self, kind: EventKind) -> Vec<ListenerId> {
        self.state
            .lock()
            .listeners
            .get(&kind)
            .map(|list| list.iter().map(|(id, _)| *id).collect())
            .unwrap_or_default()
    }

    pub(crate) fn attached_total(&self) -> usize {
        self.state.lock().listeners.values().map(Vec::len).sum()
    }

    pub(crate) fn options(&self) -> EngineOptions {
        self.state.lock().options.clone()
    }

    /// Deliver an event to the attached listeners, outside the lock.
    pub(crate) fn emit(&self, event: &DragEvent) {
        let listeners: Vec<EventListener> = {
            let state = self.state.lock();
            if state.destroyed {
                return;
            }
            state
                .listeners
                .get(&event.kind())
                .map(|list| list.iter().map(|(_, l)| Arc::clone(l)).collect())
                .unwrap_or_default()
        };
        for listener in listeners {
            listener(event);
        }
    }
}

impl DragEngine for RecordingEngine {
    fn containers(&self) -> Vec<Arc<Container>> {
        self.state.lock().containers.clone()
    }

    fn set_containers(&mut self, containers: Vec<Arc<Container>>) {
        self.state.lock().containers = containers;
    }

    fn on(&mut self, kind: EventKind, id: ListenerId, listener: EventListener) {
        self.state
            .lock()
            .listeners
            .entry(kind)
            .or_default()
            .push((id, listener));
    }

    fn off(&mut self, kind: EventKind, id: ListenerId) -> bool {
        let mut state = self.state.lock();
        let Some(list) = state.listeners.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(attached, _)| *attached != id);
        list.len() != before
    }

    fn destroy(&mut self) {
        let mut state = self.state.lock();
        if !state.destroyed {
            state.destroyed = true;
            state.listeners.clear();
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }
}

/// Factory producing [`RecordingEngine`]s and keeping count of them.
#[derive(Default)]
pub(crate) struct RecordingFactory {
    engines: Mutex<Vec<RecordingEngine>>,
    live: Arc<AtomicUsize>,
}

impl RecordingFactory {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn created(&self) -> usize {
        self.engines.lock().len()
    }

    pub(crate) fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub(crate) fn latest(&self) -> Option<RecordingEngine> {
        self.engines.lock().last().cloned()
    }

    pub(crate) fn attached_total(&self) -> usize {
        self.latest().map(|engine| engine.attached_total()).unwrap_or(0)
    }

    pub(crate) fn emit(&self, event: &DragEvent) {
        if let Some(engine) = self.latest() {
            engine.emit(event);
        }
    }
}

impl EngineFactory for RecordingFactory {
    fn create(
        &self,
        containers: Vec<Arc<Container>>,
        options: &EngineOptions,
        _predicates: Arc<PredicateRegistry>,
    ) -> Box<dyn DragEngine> {
        let engine = RecordingEngine {
            state: Arc::new(Mutex::new(RecordingState {
                containers,
                options: options.clone(),
                ..RecordingState::default()
            })),
            live: Arc::clone(&self.live),
        };
        self.live.fetch_add(1, Ordering::SeqCst);
        self.engines.lock().push(engine.clone());
        Box::new(engine)
    }
}
