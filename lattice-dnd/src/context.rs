//! Drag Context
//!
//! A [`DndContext`] is the one place an application keeps its drag engine.
//! It is constructed once per application root and handed to every container
//! binding; clones share the same state.
//!
//! # How It Works
//!
//! 1. Bindings contribute containers, predicates and event listeners. Each
//!    kind of contribution accumulates in its registry, independent of
//!    whether an engine exists yet.
//!
//! 2. The first call to [`DndContext::instance`] creates the engine through
//!    the [`EngineFactory`], with the full container set and every
//!    registered listener attached.
//!
//! 3. Later calls merge containers into the live instance. An option change
//!    cannot be applied in place, so [`DndContext::reconfigure`] destroys the
//!    instance and acquires a fresh one. Both steps happen while the engine
//!    lock is held; nobody can reach an instance that has not had its
//!    listeners replayed.
//!
//! 4. The context keeps the payload cargo of dragged nodes in step with
//!    the gesture: a copy inherits its original's record, and a node that
//!    ends the drag outside every registered container loses its entry.
//!
//! # Locking
//!
//! The engine lock is always taken before any registry lock. Listeners are
//! never invoked while a context lock is held, so they may call back into
//! the context, except from inside [`DndContext::with_engine`].

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::dom::{Container, ContainerId, ItemNode, NodeId};
use crate::engine::{
    CloneKind, DragEngine, DragEvent, EngineFactory, EngineLease, EngineOptions, EngineState,
    EventKind, OptionsPatch, PlacementEvent,
};
use crate::error::{DndError, Result};
use crate::items::NodeCargo;
use crate::registry::{
    ContainerRegistry, EventListener, EventRegistry, ListenerId, OwnerId, PredicateRegistry,
};

struct ContextInner {
    factory: Arc<dyn EngineFactory>,
    engine: Mutex<EngineState>,
    containers: RwLock<ContainerRegistry>,
    events: RwLock<EventRegistry>,
    options: RwLock<EngineOptions>,
    predicates: Arc<PredicateRegistry>,
    cargo: Arc<NodeCargo>,

    /// Original of every clone whose drag has not ended yet.
    origins: DashMap<NodeId, NodeId>,
}

impl ContextInner {
    /// Copies carry the record of the node they were cloned from.
    fn track_clone(&self, original: &ItemNode, clone: &ItemNode) {
        self.cargo.propagate(original.id(), clone.id());
        self.origins.insert(clone.id(), original.id());
    }

    /// Forget the cargo of the dragged node, and of its original for a copy,
    /// once it sits in no registered container. Cancelled copies, spilled
    /// nodes and originals replaced by their sorted copy end up there.
    fn settle(&self, el: &ItemNode) {
        let original = self.origins.remove(&el.id()).map(|(_, original)| original);
        let containers = self.containers.read();
        for node in std::iter::once(el.id()).chain(original) {
            let placed = containers
                .iter()
                .any(|container| container.position_of(node).is_some());
            if !placed && self.cargo.forget(node).is_some() {
                trace!(node = node.raw(), "cargo of detached node forgotten");
            }
        }
    }
}

/// Shared drag state of one application root.
#[derive(Clone)]
pub struct DndContext {
    inner: Arc<ContextInner>,
}

impl DndContext {
    /// Create a context with default engine options.
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        Self::with_options(factory, EngineOptions::default())
    }

    /// Create a context whose first engine uses `options`.
    pub fn with_options(factory: Arc<dyn EngineFactory>, options: EngineOptions) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<ContextInner>| {
            let mut events = EventRegistry::new();

            let cloned = weak.clone();
            events.subscribe(
                EventKind::Cloned,
                None,
                Arc::new(move |event: &DragEvent| {
                    if let (DragEvent::Cloned { clone, original, .. }, Some(inner)) =
                        (event, cloned.upgrade())
                    {
                        inner.track_clone(original, clone);
                    }
                }),
            );

            let ended = weak.clone();
            events.subscribe(
                EventKind::DragEnd,
                None,
                Arc::new(move |event: &DragEvent| {
                    if let (DragEvent::DragEnd { el }, Some(inner)) = (event, ended.upgrade()) {
                        inner.settle(el);
                    }
                }),
            );

            ContextInner {
                factory,
                engine: Mutex::new(EngineState::Uninitialized),
                containers: RwLock::new(ContainerRegistry::new()),
                events: RwLock::new(events),
                options: RwLock::new(options),
                predicates: Arc::new(PredicateRegistry::new()),
                cargo: Arc::new(NodeCargo::new()),
                origins: DashMap::new(),
            }
        });

        Self { inner }
    }

    // ------------------------------------------------------------------------
    // Engine lifecycle
    // ------------------------------------------------------------------------

    /// Get the engine, creating it on first use.
    ///
    /// `containers` are merged into the registry either way. When `patch`
    /// changes the current options the engine is recreated. Returns the
    /// generation of the live instance.
    pub fn instance<I>(&self, containers: I, patch: Option<&OptionsPatch>) -> u64
    where
        I: IntoIterator<Item = Arc<Container>>,
    {
        let mut state = self.inner.engine.lock();

        let snapshot = {
            let mut registry = self.inner.containers.write();
            let added = registry.register_all(containers);
            debug!(added, total = registry.len(), "containers merged");
            registry.snapshot()
        };

        let options_changed = patch.is_some_and(|patch| {
            let mut options = self.inner.options.write();
            let merged = options.merged(patch);
            if merged == *options {
                false
            } else {
                *options = merged;
                true
            }
        });

        if !options_changed {
            if let Some(lease) = state.lease_mut() {
                lease.engine_mut().set_containers(snapshot);
                return lease.generation();
            }
        }
        self.rebuild(&mut state, snapshot)
    }

    /// Apply `patch` to the options and recreate the engine.
    ///
    /// Creates the engine if none exists yet.
    pub fn reconfigure(&self, patch: &OptionsPatch) -> u64 {
        let mut state = self.inner.engine.lock();
        self.inner.options.write().merge(patch);
        let snapshot = self.inner.containers.read().snapshot();
        debug!(?patch, "reconfiguring engine");
        self.rebuild(&mut state, snapshot)
    }

    /// Destroy the engine. Registrations are kept for the next instance.
    pub fn shutdown(&self) -> bool {
        self.inner.engine.lock().release()
    }

    fn rebuild(&self, state: &mut EngineState, containers: Vec<Arc<Container>>) -> u64 {
        let options = self.inner.options.read().clone();
        let events = self.inner.events.read();
        let factory = self.inner.factory.as_ref();
        let predicates = Arc::clone(&self.inner.predicates);

        state.transition(|| EngineLease::acquire(factory, containers, &options, predicates, &events))
    }

    pub fn is_active(&self) -> bool {
        self.inner.engine.lock().is_active()
    }

    /// Generation of the live instance, if any.
    pub fn generation(&self) -> Option<u64> {
        self.inner.engine.lock().lease().map(EngineLease::generation)
    }

    /// Run `f` against the live instance.
    ///
    /// The engine lock is held for the duration of `f`.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut dyn DragEngine) -> R) -> Option<R> {
        let mut state = self.inner.engine.lock();
        state.lease_mut().map(|lease| f(lease.engine_mut()))
    }

    // ------------------------------------------------------------------------
    // Containers
    // ------------------------------------------------------------------------

    /// Merge containers into the registry and the live instance.
    pub fn add_containers<I>(&self, containers: I) -> usize
    where
        I: IntoIterator<Item = Arc<Container>>,
    {
        let mut state = self.inner.engine.lock();
        let (added, snapshot) = {
            let mut registry = self.inner.containers.write();
            (registry.register_all(containers), registry.snapshot())
        };
        if let Some(lease) = state.lease_mut() {
            lease.engine_mut().set_containers(snapshot);
        }
        added
    }

    /// Remove a container by id.
    pub fn remove_container(&self, id: &ContainerId) -> Result<Arc<Container>> {
        let mut state = self.inner.engine.lock();
        let (removed, snapshot) = {
            let mut registry = self.inner.containers.write();
            let removed = registry
                .unregister(id)
                .ok_or_else(|| DndError::UnknownContainer(id.clone()))?;
            (removed, registry.snapshot())
        };
        if let Some(lease) = state.lease_mut() {
            lease.engine_mut().set_containers(snapshot);
        }
        debug!(container = %id, "container removed");
        Ok(removed)
    }

    /// Remove a specific container element, with or without an id.
    pub fn remove_element(&self, container: &Arc<Container>) -> bool {
        let mut state = self.inner.engine.lock();
        let snapshot = {
            let mut registry = self.inner.containers.write();
            if !registry.unregister_element(container) {
                return false;
            }
            registry.snapshot()
        };
        if let Some(lease) = state.lease_mut() {
            lease.engine_mut().set_containers(snapshot);
        }
        true
    }

    pub fn containers(&self) -> Vec<Arc<Container>> {
        self.inner.containers.read().snapshot()
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    /// Register a listener, attaching it to the live instance if there is one.
    pub fn subscribe(
        &self,
        kind: EventKind,
        owner: Option<OwnerId>,
        listener: EventListener,
    ) -> ListenerId {
        let mut state = self.inner.engine.lock();
        let id = self
            .inner
            .events
            .write()
            .subscribe(kind, owner, Arc::clone(&listener));
        if let Some(lease) = state.lease_mut() {
            lease.engine_mut().on(kind, id, listener);
        }
        id
    }

    pub fn on_drag<F>(&self, owner: Option<OwnerId>, f: F) -> ListenerId
    where
        F: Fn(&ItemNode, &Arc<Container>) + Send + Sync + 'static,
    {
        self.subscribe(
            EventKind::Drag,
            owner,
            Arc::new(move |event: &DragEvent| {
                if let DragEvent::Drag { el, source } = event {
                    f(el, source);
                }
            }),
        )
    }

    pub fn on_drag_end<F>(&self, owner: Option<OwnerId>, f: F) -> ListenerId
    where
        F: Fn(&ItemNode) + Send + Sync + 'static,
    {
        self.subscribe(
            EventKind::DragEnd,
            owner,
            Arc::new(move |event: &DragEvent| {
                if let DragEvent::DragEnd { el } = event {
                    f(el);
                }
            }),
        )
    }

    /// Listen for drops: `(el, target, source, sibling)`.
    pub fn on_drop<F>(&self, owner: Option<OwnerId>, f: F) -> ListenerId
    where
        F: Fn(&ItemNode, &Arc<Container>, &Arc<Container>, Option<&ItemNode>) + Send + Sync + 'static,
    {
        self.subscribe(
            EventKind::Drop,
            owner,
            Arc::new(move |event: &DragEvent| {
                if let DragEvent::Drop { el, target, source, sibling } = event {
                    f(el, target, source, sibling.as_ref());
                }
            }),
        )
    }

    /// Listen for clones: `(clone, original, kind)`.
    pub fn on_cloned<F>(&self, owner: Option<OwnerId>, f: F) -> ListenerId
    where
        F: Fn(&ItemNode, &ItemNode, CloneKind) + Send + Sync + 'static,
    {
        self.subscribe(
            EventKind::Cloned,
            owner,
            Arc::new(move |event: &DragEvent| {
                if let DragEvent::Cloned { clone, original, kind } = event {
                    f(clone, original, *kind);
                }
            }),
        )
    }

    /// Listen for one of the `(el, container, source)` events.
    pub fn on<F>(&self, event: PlacementEvent, owner: Option<OwnerId>, f: F) -> ListenerId
    where
        F: Fn(&ItemNode, &Arc<Container>, &Arc<Container>) + Send + Sync + 'static,
    {
        self.subscribe(
            event.kind(),
            owner,
            Arc::new(move |event: &DragEvent| {
                if let Some((el, container, source)) = event.as_placement() {
                    f(el, container, source);
                }
            }),
        )
    }

    /// Remove a listener from the registry and the live instance.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut state = self.inner.engine.lock();
        let Some(kind) = self.inner.events.write().unsubscribe(id) else {
            return false;
        };
        if let Some(lease) = state.lease_mut() {
            lease.engine_mut().off(kind, id);
        }
        true
    }

    /// Withdraw every listener and predicate registered by `owner`.
    ///
    /// Returns the number of registrations removed.
    pub fn release_owner(&self, owner: OwnerId) -> usize {
        let mut state = self.inner.engine.lock();
        let listeners = self.inner.events.write().release_owner(owner);
        if let Some(lease) = state.lease_mut() {
            for (kind, id) in &listeners {
                lease.engine_mut().off(*kind, *id);
            }
        }
        let slots = self.inner.predicates.release_owner(owner);
        debug!(?owner, listeners = listeners.len(), slots, "owner released");
        listeners.len() + slots
    }

    /// Number of listeners registered for `kind`, including internal ones.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner.events.read().count(kind)
    }

    // ------------------------------------------------------------------------
    // Shared state
    // ------------------------------------------------------------------------

    /// The options the next instance will be created with.
    pub fn options(&self) -> EngineOptions {
        self.inner.options.read().clone()
    }

    /// The predicate registry consulted by every instance.
    pub fn predicates(&self) -> &Arc<PredicateRegistry> {
        &self.inner.predicates
    }

    /// The node payload side channel.
    pub fn cargo(&self) -> &Arc<NodeCargo> {
        &self.inner.cargo
    }
}

impl std::fmt::Debug for DndContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DndContext")
            .field("engine", &*self.inner.engine.lock())
            .field("containers", &self.inner.containers.read().len())
            .field("events", &*self.inner.events.read())
            .field("options", &*self.inner.options.read())
            .finish()
    }
}
