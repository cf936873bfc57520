//! Headless Engine
//!
//! An in-process implementation of the [`DragEngine`] contract. It has no
//! notion of pointers or pixels; a gesture is expressed as discrete steps:
//!
//! 1. [`grab`](HeadlessEngine::grab) a node out of a container. The
//!    `invalid`, `moves` and `copy` predicates decide whether and how the
//!    drag starts; `cloned` (for copies) and `drag` are emitted.
//!
//! 2. [`hover`](HeadlessEngine::hover) over a container at a child index.
//!    The `accepts` predicate decides whether the position is a valid drop
//!    target; `out`, `over` and `shadow` are emitted as the target changes.
//!
//! 3. [`release`](HeadlessEngine::release) the node. Over an accepted
//!    target the node (or its copy) is moved into the target's children and
//!    `drop` is emitted. Elsewhere the drag spills: a moved node lands at its
//!    last shadow position, unless `revert_on_spill` sends it back
//!    (`cancel`) or `remove_on_spill` takes it out (`remove`). `dragend`
//!    closes every gesture.
//!
//! Listeners are always invoked with no engine lock held, so they may call
//! back into the engine or the owning context.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::{CloneKind, DragEngine, DragEvent, EngineFactory, EngineOptions, EventKind};
use crate::dom::{same_container, Container, ItemNode};
use crate::error::{DndError, Result};
use crate::registry::{EventListener, ListenerId, PredicateRegistry};

/// How a released drag ended.
#[derive(Debug, Clone)]
pub enum DropOutcome {
    /// The node landed in `target` at `index`.
    Dropped {
        target: Arc<Container>,
        index: usize,
    },
    /// Nothing changed.
    Cancelled,
    /// The node was taken out of its source.
    Removed,
}

impl DropOutcome {
    pub fn is_dropped(&self) -> bool {
        matches!(self, Self::Dropped { .. })
    }
}

#[derive(Debug, Clone)]
struct Session {
    /// The node that travels: the original, or its copy.
    item: ItemNode,
    original: ItemNode,
    source: Arc<Container>,
    initial_index: usize,
    copy: bool,
    /// Where the node lands on release.
    target: Option<(Arc<Container>, usize)>,
    /// The accepting container currently hovered.
    over: Option<Arc<Container>>,
}

impl Session {
    fn is_initial_placement(&self, target: &Arc<Container>, index: usize) -> bool {
        !self.copy && same_container(target, &self.source) && index == self.initial_index
    }
}

#[derive(Default)]
struct State {
    containers: Vec<Arc<Container>>,
    listeners: HashMap<EventKind, Vec<(ListenerId, EventListener)>>,
    session: Option<Session>,
    destroyed: bool,
}

struct Shared {
    predicates: Arc<PredicateRegistry>,
    options: EngineOptions,
    state: Mutex<State>,
}

/// Pointer-free drag engine.
///
/// Cloning the handle does not create a new engine; all clones drive the
/// same instance.
#[derive(Clone)]
pub struct HeadlessEngine {
    shared: Arc<Shared>,
}

impl HeadlessEngine {
    pub fn new(
        containers: Vec<Arc<Container>>,
        options: EngineOptions,
        predicates: Arc<PredicateRegistry>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                predicates,
                options,
                state: Mutex::new(State {
                    containers,
                    ..State::default()
                }),
            }),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.shared.options
    }

    /// Start dragging `node` out of `source`.
    ///
    /// A drag already in progress is cancelled first.
    pub fn grab(&self, source: &Arc<Container>, node: &ItemNode) -> Result<()> {
        let (containers, busy) = {
            let state = self.shared.state.lock();
            if state.destroyed {
                return Err(DndError::EngineDestroyed);
            }
            (state.containers.clone(), state.session.is_some())
        };
        if busy {
            self.cancel()?;
        }

        if !self.is_drop_target(&containers, source) {
            return Err(DndError::Rejected("isContainer"));
        }
        let initial_index = source
            .position_of(node.id())
            .ok_or(DndError::Rejected("moves"))?;
        let sibling = source.next_sibling(node.id());

        let predicates = &self.shared.predicates;
        if predicates.invalid(node, node) {
            return Err(DndError::Rejected("invalid"));
        }
        if !predicates.moves(node, source, node, sibling.as_ref()) {
            return Err(DndError::Rejected("moves"));
        }

        let copy = predicates.copy(node, source);
        let item = if copy { node.clone_node() } else { node.clone() };

        {
            let mut state = self.shared.state.lock();
            if state.destroyed {
                return Err(DndError::EngineDestroyed);
            }
            state.session = Some(Session {
                item: item.clone(),
                original: node.clone(),
                source: Arc::clone(source),
                initial_index,
                copy,
                target: None,
                over: None,
            });
        }
        trace!(node = node.id().raw(), copy, "drag started");

        if copy {
            self.emit(&DragEvent::Cloned {
                clone: item,
                original: node.clone(),
                kind: CloneKind::Copy,
            });
        }
        self.emit(&DragEvent::Drag {
            el: node.clone(),
            source: Arc::clone(source),
        });
        Ok(())
    }

    /// Move the dragged node over `target` at child position `index`.
    ///
    /// The index counts the target's children without the dragged node.
    /// Returns whether the position accepts the drop.
    pub fn hover(&self, target: &Arc<Container>, index: usize) -> Result<bool> {
        let (session, containers) = {
            let state = self.shared.state.lock();
            if state.destroyed {
                return Err(DndError::EngineDestroyed);
            }
            let session = state.session.clone().ok_or(DndError::NoActiveDrag)?;
            (session, state.containers.clone())
        };

        let accepted = self.accepts_drop(&session, &containers, target, index);
        let keeps_shadow = !self.shared.options.revert_on_spill && !session.copy;
        {
            let mut state = self.shared.state.lock();
            if let Some(current) = state.session.as_mut() {
                if accepted {
                    current.target = Some((Arc::clone(target), index));
                    current.over = Some(Arc::clone(target));
                } else {
                    current.over = None;
                    if !keeps_shadow {
                        current.target = None;
                    }
                }
            }
        }

        let entered_new = match &session.over {
            Some(previous) => {
                let moved_away = !accepted || !same_container(previous, target);
                if moved_away {
                    self.emit(&DragEvent::Out {
                        el: session.item.clone(),
                        container: Arc::clone(previous),
                        source: Arc::clone(&session.source),
                    });
                }
                moved_away
            }
            None => true,
        };

        if accepted {
            if entered_new {
                self.emit(&DragEvent::Over {
                    el: session.item.clone(),
                    container: Arc::clone(target),
                    source: Arc::clone(&session.source),
                });
            }
            self.emit(&DragEvent::Shadow {
                el: session.item.clone(),
                container: Arc::clone(target),
                source: Arc::clone(&session.source),
            });
        }
        Ok(accepted)
    }

    /// Let go of the dragged node.
    ///
    /// Released outside any accepting container, the node stays at its last
    /// shadow position unless `revert_on_spill` is set or `remove_on_spill`
    /// takes it out.
    pub fn release(&self) -> Result<DropOutcome> {
        let session = self.take_session()?;

        let spilled = session.over.is_none();
        let landing = if spilled && self.removes_on_spill(&session) {
            None
        } else {
            session.target.clone()
        };
        let Some((target, index)) = landing else {
            return Ok(self.spill(session));
        };

        if session.is_initial_placement(&target, index) {
            self.finish(&session, EventKind::Cancel);
            return Ok(DropOutcome::Cancelled);
        }

        // A copy dropped back into its own source is a reorder.
        if !session.copy || same_container(&target, &session.source) {
            session.source.remove_child(session.original.id());
        }
        target.insert_child(index, session.item.clone());
        let sibling = target.next_sibling(session.item.id());
        debug!(
            node = session.item.id().raw(),
            target = ?target.id(),
            index,
            copy = session.copy,
            "drop"
        );

        self.emit(&DragEvent::Drop {
            el: session.item.clone(),
            target: Arc::clone(&target),
            source: Arc::clone(&session.source),
            sibling,
        });
        self.emit(&DragEvent::DragEnd {
            el: session.item.clone(),
        });
        Ok(DropOutcome::Dropped { target, index })
    }

    /// Abort the drag, leaving everything in place.
    pub fn cancel(&self) -> Result<()> {
        let session = self.take_session()?;
        self.finish(&session, EventKind::Cancel);
        Ok(())
    }

    /// Abort the drag and take the node out of its source.
    ///
    /// Copies were never placed, so removing one is a cancel.
    pub fn remove(&self) -> Result<()> {
        let session = self.take_session()?;
        if session.copy {
            self.finish(&session, EventKind::Cancel);
        } else {
            session.source.remove_child(session.original.id());
            self.finish(&session, EventKind::Remove);
        }
        Ok(())
    }

    /// Run a whole gesture: grab, hover, release.
    ///
    /// A rejected hover cancels the drag.
    pub fn drag_and_drop(
        &self,
        source: &Arc<Container>,
        node: &ItemNode,
        target: &Arc<Container>,
        index: usize,
    ) -> Result<DropOutcome> {
        self.grab(source, node)?;
        if !self.hover(target, index)? {
            self.cancel()?;
            return Ok(DropOutcome::Cancelled);
        }
        self.release()
    }

    /// Deliver an event to the listeners attached for its kind.
    pub fn emit(&self, event: &DragEvent) {
        let listeners: Vec<EventListener> = {
            let state = self.shared.state.lock();
            if state.destroyed {
                return;
            }
            state
                .listeners
                .get(&event.kind())
                .map(|list| list.iter().map(|(_, listener)| Arc::clone(listener)).collect())
                .unwrap_or_default()
        };

        trace!(event = event.kind().as_str(), listeners = listeners.len(), "emit");
        for listener in listeners {
            listener(event);
        }
    }

    fn take_session(&self) -> Result<Session> {
        let mut state = self.shared.state.lock();
        if state.destroyed {
            return Err(DndError::EngineDestroyed);
        }
        state.session.take().ok_or(DndError::NoActiveDrag)
    }

    fn removes_on_spill(&self, session: &Session) -> bool {
        self.shared.options.remove_on_spill && !session.copy
    }

    fn spill(&self, session: Session) -> DropOutcome {
        if self.removes_on_spill(&session) {
            session.source.remove_child(session.original.id());
            self.finish(&session, EventKind::Remove);
            DropOutcome::Removed
        } else {
            self.finish(&session, EventKind::Cancel);
            DropOutcome::Cancelled
        }
    }

    /// Emit the closing placement event followed by `dragend`.
    fn finish(&self, session: &Session, kind: EventKind) {
        let el = session.item.clone();
        let container = Arc::clone(&session.source);
        let source = Arc::clone(&session.source);

        let event = match kind {
            EventKind::Remove => DragEvent::Remove { el, container, source },
            _ => DragEvent::Cancel { el, container, source },
        };
        self.emit(&event);
        self.emit(&DragEvent::DragEnd {
            el: session.item.clone(),
        });
    }

    fn is_drop_target(&self, containers: &[Arc<Container>], candidate: &Arc<Container>) -> bool {
        containers
            .iter()
            .any(|container| same_container(container, candidate))
            || self.shared.predicates.is_container(candidate)
    }

    fn accepts_drop(
        &self,
        session: &Session,
        containers: &[Arc<Container>],
        target: &Arc<Container>,
        index: usize,
    ) -> bool {
        if !self.is_drop_target(containers, target) {
            return false;
        }

        let same = same_container(target, &session.source);
        let sortable_copy = self.shared.options.copy_sort_source || session.source.copy_sort_source();
        if session.copy && same && !sortable_copy {
            return false;
        }

        if session.is_initial_placement(target, index) {
            return true;
        }

        let sibling = target
            .children()
            .into_iter()
            .filter(|child| child.id() != session.original.id())
            .nth(index);
        self.shared
            .predicates
            .accepts(&session.item, target, &session.source, sibling.as_ref())
    }
}

impl DragEngine for HeadlessEngine {
    fn containers(&self) -> Vec<Arc<Container>> {
        self.shared.state.lock().containers.clone()
    }

    fn set_containers(&mut self, containers: Vec<Arc<Container>>) {
        self.shared.state.lock().containers = containers;
    }

    fn on(&mut self, kind: EventKind, id: ListenerId, listener: EventListener) {
        self.shared
            .state
            .lock()
            .listeners
            .entry(kind)
            .or_default()
            .push((id, listener));
    }

    fn off(&mut self, kind: EventKind, id: ListenerId) -> bool {
        let mut state = self.shared.state.lock();
        let Some(list) = state.listeners.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(attached, _)| *attached != id);
        list.len() != before
    }

    fn destroy(&mut self) {
        let mut state = self.shared.state.lock();
        if state.session.take().is_some() {
            debug!("drag in progress abandoned by destroy");
        }
        state.listeners.clear();
        state.destroyed = true;
    }

    fn is_destroyed(&self) -> bool {
        self.shared.state.lock().destroyed
    }

    fn is_dragging(&self) -> bool {
        self.shared.state.lock().session.is_some()
    }
}

/// Factory for [`HeadlessEngine`]s that keeps a handle to the latest one.
#[derive(Default)]
pub struct HeadlessFactory {
    current: Mutex<Option<HeadlessEngine>>,
    created: AtomicUsize,
}

impl HeadlessFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The most recently created engine.
    pub fn current(&self) -> Option<HeadlessEngine> {
        self.current.lock().clone()
    }

    /// Number of engines created so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl EngineFactory for HeadlessFactory {
    fn create(
        &self,
        containers: Vec<Arc<Container>>,
        options: &EngineOptions,
        predicates: Arc<PredicateRegistry>,
    ) -> Box<dyn DragEngine> {
        let engine = HeadlessEngine::new(containers, options.clone(), predicates);
        *self.current.lock() = Some(engine.clone());
        self.created.fetch_add(1, Ordering::SeqCst);
        Box::new(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineOptions;
    use std::sync::atomic::AtomicUsize;

    struct Fixture {
        engine: HeadlessEngine,
        left: Arc<Container>,
        right: Arc<Container>,
        nodes: Vec<ItemNode>,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    fn fixture(options: EngineOptions, left: Container, right: Container) -> Fixture {
        let nodes: Vec<ItemNode> = (0..3).map(|_| ItemNode::new()).collect();
        let left = left.with_children(nodes.clone()).shared();
        let right = right.shared();
        let mut engine = HeadlessEngine::new(
            vec![left.clone(), right.clone()],
            options,
            Arc::new(PredicateRegistry::new()),
        );

        let log = Arc::new(Mutex::new(Vec::new()));
        for kind in EventKind::ALL {
            let log = Arc::clone(&log);
            engine.on(
                kind,
                ListenerId::new(),
                Arc::new(move |event: &DragEvent| log.lock().push(event.kind().as_str())),
            );
        }

        Fixture {
            engine,
            left,
            right,
            nodes,
            log,
        }
    }

    fn board() -> Fixture {
        fixture(
            EngineOptions::default(),
            Container::new("left").with_group("board"),
            Container::new("right").with_group("board"),
        )
    }

    #[test]
    fn move_between_containers() {
        let f = board();

        let outcome = f
            .engine
            .drag_and_drop(&f.left, &f.nodes[1], &f.right, 0)
            .unwrap();

        assert!(outcome.is_dropped());
        assert_eq!(f.left.children(), vec![f.nodes[0].clone(), f.nodes[2].clone()]);
        assert_eq!(f.right.children(), vec![f.nodes[1].clone()]);
        assert_eq!(
            *f.log.lock(),
            vec!["drag", "over", "shadow", "drop", "dragend"]
        );
    }

    #[test]
    fn reorder_within_container() {
        let f = board();

        f.engine.drag_and_drop(&f.left, &f.nodes[0], &f.left, 2).unwrap();

        assert_eq!(
            f.left.children(),
            vec![f.nodes[1].clone(), f.nodes[2].clone(), f.nodes[0].clone()]
        );
    }

    #[test]
    fn dropping_back_in_place_cancels() {
        let f = board();

        let outcome = f.engine.drag_and_drop(&f.left, &f.nodes[1], &f.left, 1).unwrap();

        assert!(matches!(outcome, DropOutcome::Cancelled));
        assert_eq!(f.left.children(), f.nodes);
        assert!(f.log.lock().contains(&"cancel"));
        assert!(!f.log.lock().contains(&"drop"));
    }

    #[test]
    fn mismatched_groups_reject_hover() {
        let f = fixture(
            EngineOptions::default(),
            Container::new("left").with_group("g1"),
            Container::new("right").with_group("g2"),
        );

        f.engine.grab(&f.left, &f.nodes[0]).unwrap();
        assert!(!f.engine.hover(&f.right, 0).unwrap());

        let outcome = f.engine.release().unwrap();
        assert!(matches!(outcome, DropOutcome::Cancelled));
        assert_eq!(f.left.children().len(), 3);
        assert!(f.right.children().is_empty());
    }

    #[test]
    fn copy_leaves_source_untouched() {
        let f = fixture(
            EngineOptions::default(),
            Container::new("palette").with_group("board").with_copy(true),
            Container::new("canvas").with_group("board"),
        );

        f.engine.drag_and_drop(&f.left, &f.nodes[0], &f.right, 0).unwrap();

        assert_eq!(f.left.children(), f.nodes);
        let placed = f.right.children();
        assert_eq!(placed.len(), 1);
        assert_ne!(placed[0].id(), f.nodes[0].id());
        assert_eq!(f.log.lock()[0], "cloned");
    }

    #[test]
    fn copy_source_is_not_sortable_by_default() {
        let f = fixture(
            EngineOptions::default(),
            Container::new("palette").with_group("board").with_copy(true),
            Container::new("canvas").with_group("board"),
        );

        f.engine.grab(&f.left, &f.nodes[0]).unwrap();
        assert!(!f.engine.hover(&f.left, 2).unwrap());
        f.engine.cancel().unwrap();

        let sortable = fixture(
            EngineOptions {
                copy_sort_source: true,
                ..EngineOptions::default()
            },
            Container::new("palette").with_group("board").with_copy(true),
            Container::new("canvas").with_group("board"),
        );
        sortable.engine.grab(&sortable.left, &sortable.nodes[0]).unwrap();
        assert!(sortable.engine.hover(&sortable.left, 2).unwrap());
    }

    #[test]
    fn copy_sort_source_reorders_instead_of_duplicating() {
        let f = fixture(
            EngineOptions::default(),
            Container::new("palette")
                .with_group("board")
                .with_copy(true)
                .with_copy_sort_source(true),
            Container::new("canvas").with_group("board"),
        );

        let outcome = f.engine.drag_and_drop(&f.left, &f.nodes[0], &f.left, 2).unwrap();

        assert!(outcome.is_dropped());
        let children = f.left.children();
        assert_eq!(children.len(), 3);
        assert_eq!(children[0], f.nodes[1]);
        assert_eq!(children[1], f.nodes[2]);
        assert_ne!(children[2].id(), f.nodes[0].id());
        assert_eq!(children[2].key(), f.nodes[0].key());
    }

    #[test]
    fn spill_lands_at_last_shadow_unless_reverting() {
        let stray = Container::new("stray").shared();

        let f = board();
        f.engine.grab(&f.left, &f.nodes[0]).unwrap();
        assert!(f.engine.hover(&f.right, 0).unwrap());
        assert!(!f.engine.hover(&stray, 0).unwrap());
        let outcome = f.engine.release().unwrap();

        assert!(matches!(outcome, DropOutcome::Dropped { index: 0, .. }));
        assert_eq!(f.right.children(), vec![f.nodes[0].clone()]);
        assert_eq!(
            *f.log.lock(),
            vec!["drag", "over", "shadow", "out", "drop", "dragend"]
        );

        let r = fixture(
            EngineOptions {
                revert_on_spill: true,
                ..EngineOptions::default()
            },
            Container::new("left").with_group("board"),
            Container::new("right").with_group("board"),
        );
        r.engine.grab(&r.left, &r.nodes[0]).unwrap();
        assert!(r.engine.hover(&r.right, 0).unwrap());
        assert!(!r.engine.hover(&stray, 0).unwrap());
        let outcome = r.engine.release().unwrap();

        assert!(matches!(outcome, DropOutcome::Cancelled));
        assert_eq!(r.left.children(), r.nodes);
        assert!(r.right.children().is_empty());
    }

    #[test]
    fn spill_removes_when_configured() {
        let f = fixture(
            EngineOptions {
                remove_on_spill: true,
                ..EngineOptions::default()
            },
            Container::new("left").with_group("board"),
            Container::new("right").with_group("board"),
        );

        f.engine.grab(&f.left, &f.nodes[2]).unwrap();
        let outcome = f.engine.release().unwrap();

        assert!(matches!(outcome, DropOutcome::Removed));
        assert_eq!(f.left.children().len(), 2);
        assert!(f.log.lock().contains(&"remove"));
    }

    #[test]
    fn moving_between_targets_emits_out() {
        let f = board();

        f.engine.grab(&f.left, &f.nodes[0]).unwrap();
        f.engine.hover(&f.right, 0).unwrap();
        f.engine.hover(&f.left, 2).unwrap();

        let log = f.log.lock().clone();
        assert_eq!(log, vec!["drag", "over", "shadow", "out", "over", "shadow"]);
    }

    #[test]
    fn predicates_gate_the_gesture() {
        let f = board();
        f.engine
            .shared
            .predicates
            .add_invalid(None, |_, _| true);

        let err = f.engine.grab(&f.left, &f.nodes[0]).unwrap_err();
        assert!(matches!(err, DndError::Rejected("invalid")));
        assert!(!f.engine.is_dragging());
    }

    #[test]
    fn unregistered_container_needs_is_container() {
        let f = board();
        let stray = Container::new("stray").with_group("board").shared();

        f.engine.grab(&f.left, &f.nodes[0]).unwrap();
        assert!(!f.engine.hover(&stray, 0).unwrap());

        f.engine.shared.predicates.add_is_container(None, |_| true);
        assert!(f.engine.hover(&stray, 0).unwrap());
    }

    #[test]
    fn destroy_abandons_drag() {
        let mut f = board();

        f.engine.grab(&f.left, &f.nodes[0]).unwrap();
        f.engine.destroy();

        assert!(f.engine.is_destroyed());
        assert!(!f.engine.is_dragging());
        assert!(matches!(f.engine.release(), Err(DndError::EngineDestroyed)));
        assert_eq!(f.left.children(), f.nodes);
    }

    #[test]
    fn off_detaches_listener() {
        let mut f = board();
        let hits = Arc::new(AtomicUsize::new(0));
        let id = ListenerId::new();
        let counter = Arc::clone(&hits);
        f.engine.on(
            EventKind::Drop,
            id,
            Arc::new(move |_: &DragEvent| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert!(f.engine.off(EventKind::Drop, id));
        assert!(!f.engine.off(EventKind::Drop, id));

        f.engine.drag_and_drop(&f.left, &f.nodes[0], &f.right, 0).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn factory_tracks_latest_engine() {
        let factory = HeadlessFactory::new();
        assert!(factory.current().is_none());

        let _first = factory.create(Vec::new(), &EngineOptions::default(), Arc::new(PredicateRegistry::new()));
        let _second = factory.create(Vec::new(), &EngineOptions::default(), Arc::new(PredicateRegistry::new()));

        assert_eq!(factory.created(), 2);
        assert!(factory.current().is_some());
    }
}
