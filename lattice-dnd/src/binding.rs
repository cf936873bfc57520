//! Container Binding
//!
//! The glue between one rendered container and the shared [`DndContext`].
//! A rendering component creates a binding when it mounts and drops it when
//! it unmounts.
//!
//! # How It Works
//!
//! 1. [`ContainerBinding::mount`] installs the configured predicates under a
//!    fresh [`OwnerId`], keys the initial items, renders them into the
//!    container's children and registers the container with the context.
//!
//! 2. A `drop` listener owned by the binding watches for drops that touch
//!    its container, as target, as source, or both. The container's physical
//!    children are reconciled into a new logical collection exactly once per
//!    drop and reported through `on_change`. A changed collection is
//!    rendered back.
//!
//! 3. [`ContainerBinding::set_items`] feeds a new collection in from the
//!    application. Value-equal collections are ignored.
//!
//! 4. Dropping the binding withdraws everything it contributed: listeners,
//!    predicate slots, the container itself and its nodes' cargo.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, trace};

use crate::context::DndContext;
use crate::dom::{same_container, Container, ItemNode};
use crate::engine::{DragEvent, EventKind, OptionsPatch};
use crate::error::Result;
use crate::items::{reconcile_drop, records_from_value, Item, ItemKey, KeyedItems, NodeCargo, Record};
use crate::registry::{OwnerId, PredicateKind, PredicateRegistry, SlotRegistration};

/// Callback receiving a container's logical collection.
pub type ItemsCallback = Arc<dyn Fn(&[Item]) + Send + Sync>;

type Installer = Box<dyn FnOnce(&PredicateRegistry, OwnerId) -> SlotRegistration + Send>;

/// How a container binds to the context.
#[derive(Default)]
pub struct BindingConfig {
    identity: Option<String>,
    items: Vec<Record>,
    options: Option<OptionsPatch>,
    on_change: Option<ItemsCallback>,
    on_render: Option<ItemsCallback>,
    installers: Vec<(PredicateKind, Installer)>,
}

impl BindingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match inbound records by this field instead of full value equality.
    pub fn identity_field(mut self, field: impl Into<String>) -> Self {
        self.identity = Some(field.into());
        self
    }

    /// The initial collection.
    pub fn items(mut self, records: Vec<Record>) -> Self {
        self.items = records;
        self
    }

    /// Engine options this container asks for.
    pub fn options(mut self, patch: OptionsPatch) -> Self {
        self.options = Some(patch);
        self
    }

    /// Called with the reconciled collection after a drop.
    pub fn on_change<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Item]) + Send + Sync + 'static,
    {
        self.on_change = Some(Arc::new(f));
        self
    }

    /// Called whenever the children were rendered from a new collection.
    pub fn on_render<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Item]) + Send + Sync + 'static,
    {
        self.on_render = Some(Arc::new(f));
        self
    }

    pub fn accepts<F>(self, predicate: F) -> Self
    where
        F: Fn(&ItemNode, &Container, &Container, Option<&ItemNode>) -> bool + Send + Sync + 'static,
    {
        self.install(PredicateKind::Accepts, move |registry, owner| {
            registry.add_accepts(Some(owner), predicate)
        })
    }

    pub fn moves<F>(self, predicate: F) -> Self
    where
        F: Fn(&ItemNode, &Container, &ItemNode, Option<&ItemNode>) -> bool + Send + Sync + 'static,
    {
        self.install(PredicateKind::Moves, move |registry, owner| {
            registry.add_moves(Some(owner), predicate)
        })
    }

    pub fn invalid<F>(self, predicate: F) -> Self
    where
        F: Fn(&ItemNode, &ItemNode) -> bool + Send + Sync + 'static,
    {
        self.install(PredicateKind::Invalid, move |registry, owner| {
            registry.add_invalid(Some(owner), predicate)
        })
    }

    pub fn copy<F>(self, predicate: F) -> Self
    where
        F: Fn(&ItemNode, &Container) -> bool + Send + Sync + 'static,
    {
        self.install(PredicateKind::Copy, move |registry, owner| {
            registry.add_copy(Some(owner), predicate)
        })
    }

    pub fn is_container<F>(self, predicate: F) -> Self
    where
        F: Fn(&Container) -> bool + Send + Sync + 'static,
    {
        self.install(PredicateKind::IsContainer, move |registry, owner| {
            registry.add_is_container(Some(owner), predicate)
        })
    }

    fn install<F>(mut self, kind: PredicateKind, installer: F) -> Self
    where
        F: FnOnce(&PredicateRegistry, OwnerId) -> SlotRegistration + Send + 'static,
    {
        self.installers.push((kind, Box::new(installer)));
        self
    }
}

struct BindingInner {
    container: Arc<Container>,
    cargo: Arc<NodeCargo>,
    items: Mutex<KeyedItems>,
    on_change: Option<ItemsCallback>,
    on_render: Option<ItemsCallback>,
}

impl BindingInner {
    /// Rebuild the logical collection from the physical children.
    ///
    /// `on_change` hears about every drop that touches the container, even
    /// one that leaves the collection as it was. Only a changed collection
    /// is rendered back.
    fn absorb(&self) {
        let physical = self.container.children();
        let (items, changed) = {
            let mut state = self.items.lock();
            let reconciled = reconcile_drop(&physical, state.items(), &self.cargo);
            if same_items(state.items(), &reconciled.items) {
                trace!(container = ?self.container.id(), "drop left collection unchanged");
                if !reconciled.excluded.is_empty() {
                    self.write_children(state.items());
                }
                (state.items().to_vec(), false)
            } else {
                debug!(
                    container = ?self.container.id(),
                    items = reconciled.items.len(),
                    recovered = reconciled.recovered,
                    excluded = reconciled.excluded.len(),
                    "container reconciled"
                );
                state.replace(reconciled.items);
                (state.items().to_vec(), true)
            }
        };

        if let Some(on_change) = &self.on_change {
            on_change(&items);
        }
        if changed {
            self.render(&items);
        }
    }

    fn render(&self, items: &[Item]) {
        self.write_children(items);
        if let Some(on_render) = &self.on_render {
            on_render(items);
        }
    }

    /// Write the children from the logical collection.
    ///
    /// Nodes are reused by key; every rendered node gets its record stamped
    /// into the cargo so it can travel to another container.
    fn write_children(&self, items: &[Item]) {
        let mut by_key: HashMap<ItemKey, ItemNode> = HashMap::new();
        let mut stale = Vec::new();
        for node in self.container.children() {
            match node.key() {
                Some(key) if !by_key.contains_key(&key) => {
                    by_key.insert(key, node);
                }
                _ => stale.push(node),
            }
        }

        let nodes: Vec<ItemNode> = items
            .iter()
            .map(|item| {
                let node = by_key
                    .remove(&item.key())
                    .unwrap_or_else(|| ItemNode::keyed(item.key()));
                self.cargo.stamp(node.id(), Arc::clone(item.record()));
                node
            })
            .collect();

        for node in stale.iter().chain(by_key.values()) {
            self.cargo.forget(node.id());
        }
        self.container.set_children(nodes);
    }

    fn touches(&self, container: &Arc<Container>) -> bool {
        same_container(container, &self.container)
    }
}

fn same_items(current: &[Item], next: &[Item]) -> bool {
    current.len() == next.len()
        && current
            .iter()
            .zip(next)
            .all(|(a, b)| a.key() == b.key() && a.same_record(b))
}

/// A mounted container.
pub struct ContainerBinding {
    ctx: DndContext,
    owner: OwnerId,
    inner: Arc<BindingInner>,
    registrations: Vec<(PredicateKind, SlotRegistration)>,
}

impl ContainerBinding {
    /// Mount `container` into `ctx`.
    pub fn mount(ctx: &DndContext, container: Arc<Container>, config: BindingConfig) -> Self {
        let owner = OwnerId::new();
        let BindingConfig {
            identity,
            items,
            options,
            on_change,
            on_render,
            installers,
        } = config;

        let registrations = installers
            .into_iter()
            .map(|(kind, install)| (kind, install(ctx.predicates(), owner)))
            .collect();

        let mut keyed = match identity {
            Some(field) => KeyedItems::with_identity(field),
            None => KeyedItems::new(),
        };
        keyed.sync(items);
        let initial = keyed.items().to_vec();

        let inner = Arc::new(BindingInner {
            container: Arc::clone(&container),
            cargo: Arc::clone(ctx.cargo()),
            items: Mutex::new(keyed),
            on_change,
            on_render,
        });
        inner.render(&initial);

        let weak = Arc::downgrade(&inner);
        ctx.subscribe(EventKind::Drop, Some(owner), Arc::new(move |event: &DragEvent| {
            if let DragEvent::Drop { target, source, .. } = event {
                absorb_if(&weak, |inner| inner.touches(target) || inner.touches(source));
            }
        }));

        let weak = Arc::downgrade(&inner);
        ctx.subscribe(EventKind::Remove, Some(owner), Arc::new(move |event: &DragEvent| {
            if let DragEvent::Remove { source, .. } = event {
                absorb_if(&weak, |inner| inner.touches(source));
            }
        }));

        ctx.instance([container], options.as_ref());
        debug!(?owner, container = ?inner.container.id(), "container mounted");

        Self {
            ctx: ctx.clone(),
            owner,
            inner,
            registrations,
        }
    }

    /// Feed in a new collection from the application.
    ///
    /// Returns false, without rendering, when the collection is value-equal
    /// to the current one.
    pub fn set_items(&self, records: Vec<Record>) -> bool {
        let items = {
            let mut state = self.inner.items.lock();
            if !state.sync(records) {
                return false;
            }
            state.items().to_vec()
        };
        self.inner.render(&items);
        true
    }

    /// Feed in a collection of untyped external data.
    ///
    /// Fails unless `value` is an array of objects.
    pub fn set_items_json(&self, value: Value) -> Result<bool> {
        let records = records_from_value(value)?;
        Ok(self.set_items(records))
    }

    /// Re-render the children from the current collection.
    pub fn commit(&self) {
        let items = self.items();
        self.inner.render(&items);
    }

    pub fn items(&self) -> Vec<Item> {
        self.inner.items.lock().items().to_vec()
    }

    pub fn records(&self) -> Vec<Arc<Record>> {
        self.inner.items.lock().records()
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.inner.container
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// How each configured predicate fared against the shared slots.
    pub fn registrations(&self) -> &[(PredicateKind, SlotRegistration)] {
        &self.registrations
    }
}

fn absorb_if(weak: &Weak<BindingInner>, applies: impl FnOnce(&BindingInner) -> bool) {
    if let Some(inner) = weak.upgrade() {
        if applies(&inner) {
            inner.absorb();
        }
    }
}

impl Drop for ContainerBinding {
    fn drop(&mut self) {
        let released = self.ctx.release_owner(self.owner);
        self.ctx.remove_element(&self.inner.container);
        for node in self.inner.container.children() {
            self.inner.cargo.forget(node.id());
        }
        debug!(owner = ?self.owner, released, "container unmounted");
    }
}

impl std::fmt::Debug for ContainerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerBinding")
            .field("owner", &self.owner)
            .field("container", &self.inner.container.id())
            .field("items", &self.inner.items.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RecordingFactory;
    use crate::items::record_from_value;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record(value: Value) -> Record {
        record_from_value(value).unwrap()
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&[Item]) + Send + Sync + 'static) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        (hits, move |_: &[Item]| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn mount_renders_initial_items() {
        let factory = RecordingFactory::new();
        let ctx = DndContext::new(factory.clone());
        let container = Container::new("list").shared();

        let binding = ContainerBinding::mount(
            &ctx,
            container.clone(),
            BindingConfig::new().items(vec![record(json!({"v": 1})), record(json!({"v": 2}))]),
        );

        let children = container.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].key(), Some(binding.items()[0].key()));
        assert_eq!(ctx.cargo().len(), 2);
        assert_eq!(factory.created(), 1);
    }

    #[test]
    fn value_equal_items_do_not_render() {
        let ctx = DndContext::new(RecordingFactory::new());
        let (renders, on_render) = counter();
        let binding = ContainerBinding::mount(
            &ctx,
            Container::new("list").shared(),
            BindingConfig::new()
                .items(vec![record(json!({"v": 1}))])
                .on_render(on_render),
        );
        let before = renders.load(Ordering::SeqCst);

        assert!(!binding.set_items(vec![record(json!({"v": 1}))]));
        assert_eq!(renders.load(Ordering::SeqCst), before);

        assert!(binding.set_items(vec![record(json!({"v": 1})), record(json!({"v": 3}))]));
        assert_eq!(renders.load(Ordering::SeqCst), before + 1);
        assert_eq!(binding.container().child_count(), 2);
    }

    #[test]
    fn set_items_json_guards_ingestion() {
        let ctx = DndContext::new(RecordingFactory::new());
        let binding = ContainerBinding::mount(&ctx, Container::new("list").shared(), BindingConfig::new());

        assert!(binding.set_items_json(json!([{"v": 1}])).unwrap());
        assert!(binding.set_items_json(json!([1, 2])).is_err());
        assert!(binding.set_items_json(json!({"v": 1})).is_err());
        assert_eq!(binding.items().len(), 1);
    }

    #[test]
    fn drop_reconciles_once_for_source_and_target() {
        let factory = RecordingFactory::new();
        let ctx = DndContext::new(factory.clone());
        let container = Container::new("list").shared();
        let (changes, on_change) = counter();
        let binding = ContainerBinding::mount(
            &ctx,
            container.clone(),
            BindingConfig::new()
                .items(vec![record(json!({"v": "x"})), record(json!({"v": "y"}))])
                .on_change(on_change),
        );
        let before = binding.items();

        let mut children = container.children();
        children.reverse();
        container.set_children(children.clone());
        factory.emit(&DragEvent::Drop {
            el: children[0].clone(),
            target: container.clone(),
            source: container.clone(),
            sibling: Some(children[1].clone()),
        });

        assert_eq!(changes.load(Ordering::SeqCst), 1);
        let after = binding.items();
        assert_eq!(after[0].key(), before[1].key());
        assert!(after[0].same_record(&before[1]));
        assert_eq!(after[1].key(), before[0].key());
    }

    #[test]
    fn copy_source_hears_every_drop_out_of_it() {
        let factory = RecordingFactory::new();
        let ctx = DndContext::new(factory.clone());
        let palette = Container::new("palette").with_copy(true).shared();
        let canvas = Container::new("canvas").shared();
        let (changes, on_change) = counter();
        let (renders, on_render) = counter();
        let binding = ContainerBinding::mount(
            &ctx,
            palette.clone(),
            BindingConfig::new()
                .items(vec![record(json!({"shape": "circle"}))])
                .on_change(on_change)
                .on_render(on_render),
        );
        let before = binding.items();
        let rendered = renders.load(Ordering::SeqCst);

        let original = palette.children()[0].clone();
        for _ in 0..2 {
            let copy = original.clone_node();
            canvas.insert_child(0, copy.clone());
            factory.emit(&DragEvent::Drop {
                el: copy,
                target: canvas.clone(),
                source: palette.clone(),
                sibling: None,
            });
        }

        assert_eq!(changes.load(Ordering::SeqCst), 2);
        assert_eq!(renders.load(Ordering::SeqCst), rendered);
        assert_eq!(binding.items(), before);
        assert_eq!(palette.children(), vec![original]);
    }

    #[test]
    fn unrelated_drops_are_ignored() {
        let factory = RecordingFactory::new();
        let ctx = DndContext::new(factory.clone());
        let (changes, on_change) = counter();
        let _binding = ContainerBinding::mount(
            &ctx,
            Container::new("mine").shared(),
            BindingConfig::new().on_change(on_change),
        );

        let other = Container::new("other").shared();
        factory.emit(&DragEvent::Drop {
            el: ItemNode::new(),
            target: other.clone(),
            source: other,
            sibling: None,
        });
        assert_eq!(changes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn first_predicate_wins_and_unmount_frees_slot() {
        let ctx = DndContext::new(RecordingFactory::new());

        let first = ContainerBinding::mount(
            &ctx,
            Container::new("a").shared(),
            BindingConfig::new().accepts(|_, _, _, _| true),
        );
        let second = ContainerBinding::mount(
            &ctx,
            Container::new("b").shared(),
            BindingConfig::new().accepts(|_, _, _, _| false),
        );

        assert_eq!(first.registrations(), &[(PredicateKind::Accepts, SlotRegistration::Installed)]);
        assert_eq!(second.registrations(), &[(PredicateKind::Accepts, SlotRegistration::Ignored)]);

        drop(first);
        assert!(!ctx.predicates().is_custom(PredicateKind::Accepts));
        assert_eq!(ctx.containers().len(), 1);
    }

    #[test]
    fn unmount_releases_listeners() {
        let ctx = DndContext::new(RecordingFactory::new());
        let baseline = ctx.listener_count(EventKind::Drop);

        let binding = ContainerBinding::mount(&ctx, Container::new("a").shared(), BindingConfig::new());
        assert_eq!(ctx.listener_count(EventKind::Drop), baseline + 1);

        drop(binding);
        assert_eq!(ctx.listener_count(EventKind::Drop), baseline);
        assert!(ctx.containers().is_empty());
        assert!(ctx.cargo().is_empty());
    }
}
