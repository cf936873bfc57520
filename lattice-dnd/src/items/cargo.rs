//! Node payload cargo.
//!
//! When a node is dragged into another container, the destination has never
//! seen its record. The record therefore has to travel with the node. Rather
//! than serializing it into a string attribute on every render, the core
//! keeps a side-channel map from node identity to record, shared by every
//! container of one context.
//!
//! Nodes created outside the core may still carry a serialized JSON payload
//! attribute; [`NodeCargo::payload_for`] falls back to parsing it.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::warn;

use super::record::{parse_record, Record};
use crate::dom::{ItemNode, NodeId};

/// Side-channel map from rendered node to its application record.
#[derive(Debug, Default)]
pub struct NodeCargo {
    payloads: DashMap<NodeId, Arc<Record>>,
}

impl NodeCargo {
    /// Create an empty cargo map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a record to a node, replacing any previous one.
    pub fn stamp(&self, node: NodeId, record: Arc<Record>) {
        self.payloads.insert(node, record);
    }

    /// The record attached to a node, if any.
    pub fn get(&self, node: NodeId) -> Option<Arc<Record>> {
        self.payloads.get(&node).map(|entry| Arc::clone(entry.value()))
    }

    /// Copy the record of `original` onto `clone`.
    ///
    /// Returns false if the original carries nothing.
    pub fn propagate(&self, original: NodeId, clone: NodeId) -> bool {
        match self.get(original) {
            Some(record) => {
                self.payloads.insert(clone, record);
                true
            }
            None => false,
        }
    }

    /// Drop the record attached to a node.
    pub fn forget(&self, node: NodeId) -> Option<Arc<Record>> {
        self.payloads.remove(&node).map(|(_, record)| record)
    }

    /// Recover the record for a node.
    ///
    /// Looks in the side channel first and falls back to the node's
    /// serialized payload attribute. Payloads that do not parse into an
    /// object are treated as absent.
    pub fn payload_for(&self, node: &ItemNode) -> Option<Arc<Record>> {
        if let Some(record) = self.get(node.id()) {
            return Some(record);
        }

        let serialized = node.serialized()?;
        match parse_record(serialized) {
            Ok(record) => Some(Arc::new(record)),
            Err(err) => {
                warn!(node = node.id().raw(), error = %err, "discarding unreadable node payload");
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Arc<Record> {
        Arc::new(value.as_object().cloned().unwrap())
    }

    #[test]
    fn stamp_and_get() {
        let cargo = NodeCargo::new();
        let node = ItemNode::new();
        let payload = record(json!({"v": "x"}));

        cargo.stamp(node.id(), payload.clone());
        assert!(Arc::ptr_eq(&cargo.get(node.id()).unwrap(), &payload));
        assert_eq!(cargo.len(), 1);

        cargo.forget(node.id());
        assert!(cargo.is_empty());
    }

    #[test]
    fn propagate_to_clone() {
        let cargo = NodeCargo::new();
        let original = ItemNode::new();
        let clone = original.clone_node();

        assert!(!cargo.propagate(original.id(), clone.id()));

        cargo.stamp(original.id(), record(json!({"v": 1})));
        assert!(cargo.propagate(original.id(), clone.id()));
        assert_eq!(cargo.get(clone.id()).unwrap()["v"], 1);
    }

    #[test]
    fn payload_falls_back_to_serialized_attribute() {
        let cargo = NodeCargo::new();

        let node = ItemNode::new().with_serialized(r#"{"v":"z"}"#);
        assert_eq!(cargo.payload_for(&node).unwrap()["v"], "z");

        let broken = ItemNode::new().with_serialized("not json");
        assert!(cargo.payload_for(&broken).is_none());

        let scalar = ItemNode::new().with_serialized("42");
        assert!(cargo.payload_for(&scalar).is_none());

        assert!(cargo.payload_for(&ItemNode::new()).is_none());
    }

    #[test]
    fn side_channel_wins_over_attribute() {
        let cargo = NodeCargo::new();
        let node = ItemNode::new().with_serialized(r#"{"v":"stale"}"#);
        cargo.stamp(node.id(), record(json!({"v": "fresh"})));

        assert_eq!(cargo.payload_for(&node).unwrap()["v"], "fresh");
    }
}
