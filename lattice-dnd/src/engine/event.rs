//! Drag lifecycle events.

use std::sync::Arc;

use crate::dom::{Container, ItemNode};

/// The lifecycle events a drag engine emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Drag,
    DragEnd,
    Drop,
    Cloned,
    Cancel,
    Remove,
    Shadow,
    Over,
    Out,
}

impl EventKind {
    /// Every event kind, in replay order.
    pub const ALL: [EventKind; 9] = [
        EventKind::Drag,
        EventKind::DragEnd,
        EventKind::Drop,
        EventKind::Cloned,
        EventKind::Cancel,
        EventKind::Remove,
        EventKind::Shadow,
        EventKind::Over,
        EventKind::Out,
    ];

    /// Position in [`EventKind::ALL`].
    pub fn index(&self) -> usize {
        match self {
            Self::Drag => 0,
            Self::DragEnd => 1,
            Self::Drop => 2,
            Self::Cloned => 3,
            Self::Cancel => 4,
            Self::Remove => 5,
            Self::Shadow => 6,
            Self::Over => 7,
            Self::Out => 8,
        }
    }

    /// The event name as the engine knows it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drag => "drag",
            Self::DragEnd => "dragend",
            Self::Drop => "drop",
            Self::Cloned => "cloned",
            Self::Cancel => "cancel",
            Self::Remove => "remove",
            Self::Shadow => "shadow",
            Self::Over => "over",
            Self::Out => "out",
        }
    }
}

/// The events that share the `(el, container, source)` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlacementEvent {
    Cancel,
    Remove,
    Shadow,
    Over,
    Out,
}

impl PlacementEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Cancel => EventKind::Cancel,
            Self::Remove => EventKind::Remove,
            Self::Shadow => EventKind::Shadow,
            Self::Over => EventKind::Over,
            Self::Out => EventKind::Out,
        }
    }
}

/// Why a node was cloned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloneKind {
    /// The floating image that follows the pointer.
    Mirror,
    /// A copy that will be dropped in place of a move.
    Copy,
}

/// An emitted drag lifecycle event.
#[derive(Debug, Clone)]
pub enum DragEvent {
    Drag {
        el: ItemNode,
        source: Arc<Container>,
    },
    DragEnd {
        el: ItemNode,
    },
    Drop {
        el: ItemNode,
        target: Arc<Container>,
        source: Arc<Container>,
        sibling: Option<ItemNode>,
    },
    Cloned {
        clone: ItemNode,
        original: ItemNode,
        kind: CloneKind,
    },
    Cancel {
        el: ItemNode,
        container: Arc<Container>,
        source: Arc<Container>,
    },
    Remove {
        el: ItemNode,
        container: Arc<Container>,
        source: Arc<Container>,
    },
    Shadow {
        el: ItemNode,
        container: Arc<Container>,
        source: Arc<Container>,
    },
    Over {
        el: ItemNode,
        container: Arc<Container>,
        source: Arc<Container>,
    },
    Out {
        el: ItemNode,
        container: Arc<Container>,
        source: Arc<Container>,
    },
}

impl DragEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Drag { .. } => EventKind::Drag,
            Self::DragEnd { .. } => EventKind::DragEnd,
            Self::Drop { .. } => EventKind::Drop,
            Self::Cloned { .. } => EventKind::Cloned,
            Self::Cancel { .. } => EventKind::Cancel,
            Self::Remove { .. } => EventKind::Remove,
            Self::Shadow { .. } => EventKind::Shadow,
            Self::Over { .. } => EventKind::Over,
            Self::Out { .. } => EventKind::Out,
        }
    }

    /// Build one of the `(el, container, source)` events.
    pub fn placement(
        event: PlacementEvent,
        el: ItemNode,
        container: Arc<Container>,
        source: Arc<Container>,
    ) -> Self {
        match event {
            PlacementEvent::Cancel => Self::Cancel { el, container, source },
            PlacementEvent::Remove => Self::Remove { el, container, source },
            PlacementEvent::Shadow => Self::Shadow { el, container, source },
            PlacementEvent::Over => Self::Over { el, container, source },
            PlacementEvent::Out => Self::Out { el, container, source },
        }
    }

    /// Destructure one of the `(el, container, source)` events.
    pub fn as_placement(&self) -> Option<(&ItemNode, &Arc<Container>, &Arc<Container>)> {
        match self {
            Self::Cancel { el, container, source }
            | Self::Remove { el, container, source }
            | Self::Shadow { el, container, source }
            | Self::Over { el, container, source }
            | Self::Out { el, container, source } => Some((el, container, source)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_indices_match_all() {
        for (position, kind) in EventKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), position);
        }
    }

    #[test]
    fn placement_round_trip() {
        let el = ItemNode::new();
        let a = Container::new("a").shared();
        let b = Container::new("b").shared();

        let event = DragEvent::placement(PlacementEvent::Over, el.clone(), a.clone(), b.clone());
        assert_eq!(event.kind(), EventKind::Over);

        let (node, container, source) = event.as_placement().unwrap();
        assert_eq!(node, &el);
        assert!(Arc::ptr_eq(container, &a));
        assert!(Arc::ptr_eq(source, &b));

        assert!(DragEvent::DragEnd { el }.as_placement().is_none());
    }
}
