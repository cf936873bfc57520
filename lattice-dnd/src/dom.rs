//! Element Model
//!
//! The drag engine works on rendered elements, not on application data.
//! This module defines the minimal element model the core needs to reason
//! about those elements:
//!
//! - [`Container`]: a drop-target surface. Shared as `Arc<Container>`, which
//!   plays the role of the element reference. Its configuration (id, group,
//!   copy flags, axis) is immutable; its physical children are not.
//! - [`ItemNode`]: a rendered item. It carries its own identity plus the
//!   attributes that travel with it when it is moved into another container:
//!   the surrogate key and, for nodes produced outside the core, a
//!   serialized payload.
//!
//! # Identity
//!
//! Two `Arc<Container>` values are the same element only if they point to
//! the same allocation. Two `ItemNode` values are the same node if their
//! [`NodeId`]s are equal; cloning the Rust value does not create a new node,
//! [`ItemNode::clone_node`] does.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::items::ItemKey;

/// Stable, opaque identifier of a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    /// Create a container id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContainerId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ContainerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Axis along which a container's items are sorted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    #[default]
    Vertical,
    Horizontal,
}

/// Process-unique identity of a rendered node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// A rendered item node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemNode {
    id: NodeId,

    /// Carried surrogate key attribute.
    key: Option<ItemKey>,

    /// Carried serialized payload attribute (JSON text).
    serialized: Option<Arc<str>>,
}

impl ItemNode {
    /// Create a bare node with no carried attributes.
    pub fn new() -> Self {
        Self {
            id: NodeId::new(),
            key: None,
            serialized: None,
        }
    }

    /// Create a node carrying the given surrogate key.
    pub fn keyed(key: ItemKey) -> Self {
        Self {
            id: NodeId::new(),
            key: Some(key),
            serialized: None,
        }
    }

    /// Attach a serialized JSON payload attribute.
    ///
    /// Used for nodes rendered outside the core (server-side markup, foreign
    /// widgets) that still need to be reconstructable after a drop.
    pub fn with_serialized(mut self, json: impl Into<Arc<str>>) -> Self {
        self.serialized = Some(json.into());
        self
    }

    /// Create a new node with a fresh identity carrying the same attributes.
    ///
    /// This is what the engine does when an item is copied rather than moved.
    pub fn clone_node(&self) -> Self {
        Self {
            id: NodeId::new(),
            key: self.key,
            serialized: self.serialized.clone(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn key(&self) -> Option<ItemKey> {
        self.key
    }

    pub fn serialized(&self) -> Option<&str> {
        self.serialized.as_deref()
    }
}

impl Default for ItemNode {
    fn default() -> Self {
        Self::new()
    }
}

/// A drop-target surface.
///
/// # Example
///
/// ```rust,ignore
/// let todo = Container::new("todo").with_group("board").shared();
/// let done = Container::new("done").with_group("board").shared();
/// ```
#[derive(Debug)]
pub struct Container {
    id: Option<ContainerId>,
    group: Option<String>,
    copy: bool,
    copy_sort_source: bool,
    axis: Axis,

    /// Physical child order, as the engine leaves it.
    children: RwLock<Vec<ItemNode>>,
}

impl Container {
    /// Create a container with the given id and default configuration.
    pub fn new(id: impl Into<ContainerId>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::anonymous()
        }
    }

    /// Create a container without an id.
    ///
    /// Anonymous containers are never deduplicated by the registry.
    pub fn anonymous() -> Self {
        Self {
            id: None,
            group: None,
            copy: false,
            copy_sort_source: false,
            axis: Axis::default(),
            children: RwLock::new(Vec::new()),
        }
    }

    /// Set the group name. Containers sharing a group exchange items.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Items dragged out of this container are copied instead of moved.
    pub fn with_copy(mut self, copy: bool) -> Self {
        self.copy = copy;
        self
    }

    /// Allow reordering within this container while it is in copy mode.
    pub fn with_copy_sort_source(mut self, enabled: bool) -> Self {
        self.copy_sort_source = enabled;
        self
    }

    pub fn with_axis(mut self, axis: Axis) -> Self {
        self.axis = axis;
        self
    }

    /// Seed the physical children.
    pub fn with_children(self, children: Vec<ItemNode>) -> Self {
        *self.children.write() = children;
        self
    }

    /// Wrap the container into a shared element reference.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn id(&self) -> Option<&ContainerId> {
        self.id.as_ref()
    }

    /// The group name, if one is set and non-empty.
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref().filter(|group| !group.is_empty())
    }

    pub fn is_copy(&self) -> bool {
        self.copy
    }

    pub fn copy_sort_source(&self) -> bool {
        self.copy_sort_source
    }

    /// Sorting axis, read by pointer-driven engines only.
    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Snapshot of the physical children in order.
    pub fn children(&self) -> Vec<ItemNode> {
        self.children.read().clone()
    }

    /// Replace the physical children.
    pub fn set_children(&self, children: Vec<ItemNode>) {
        *self.children.write() = children;
    }

    /// Number of physical children.
    pub fn child_count(&self) -> usize {
        self.children.read().len()
    }

    /// Position of a node among the physical children.
    pub fn position_of(&self, node: NodeId) -> Option<usize> {
        self.children.read().iter().position(|child| child.id() == node)
    }

    /// Insert a node at `index`, clamped to the end of the list.
    pub fn insert_child(&self, index: usize, node: ItemNode) {
        let mut children = self.children.write();
        let index = index.min(children.len());
        children.insert(index, node);
    }

    /// Remove a node, returning its former position.
    pub fn remove_child(&self, node: NodeId) -> Option<(usize, ItemNode)> {
        let mut children = self.children.write();
        let index = children.iter().position(|child| child.id() == node)?;
        Some((index, children.remove(index)))
    }

    /// The node immediately following `node`, if any.
    pub fn next_sibling(&self, node: NodeId) -> Option<ItemNode> {
        let children = self.children.read();
        let index = children.iter().position(|child| child.id() == node)?;
        children.get(index + 1).cloned()
    }
}

/// Whether two element references point to the same container.
pub fn same_container(a: &Arc<Container>, b: &Arc<Container>) -> bool {
    Arc::ptr_eq(a, b)
}
