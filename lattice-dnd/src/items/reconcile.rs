//! Drop reconciliation.
//!
//! # Algorithm
//!
//! Walk the container's physical children in order:
//!
//! 1. If the node's key names an item in the last known collection, and no
//!    earlier node in this pass claimed it, carry that item forward
//!    unchanged (same key, same record allocation).
//! 2. Otherwise the node arrived from elsewhere. Recover its record from the
//!    payload cargo. If there is none, the node cannot be reconstructed and
//!    is left out of the result.
//! 3. A recovered node keeps its carried key unless that key was already
//!    claimed in this pass (a second copy of the same item), in which case a
//!    fresh key is minted.
//!
//! The output follows physical order exactly.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use super::cargo::NodeCargo;
use super::key::ItemKey;
use super::Item;
use crate::dom::{ItemNode, NodeId};

/// Result of reconciling a container after a drop.
#[derive(Debug, Clone, Default)]
pub struct Reconciled {
    /// The new logical collection in physical order.
    pub items: Vec<Item>,

    /// Nodes that could not be reconstructed.
    pub excluded: Vec<NodeId>,

    /// Number of items recovered from carried payloads.
    pub recovered: usize,
}

/// Derive a container's new logical collection from its physical children.
pub fn reconcile_drop(physical: &[ItemNode], last_known: &[Item], cargo: &NodeCargo) -> Reconciled {
    let known: HashMap<ItemKey, &Item> = last_known.iter().map(|item| (item.key(), item)).collect();
    let mut claimed: HashSet<ItemKey> = HashSet::with_capacity(physical.len());
    let mut result = Reconciled {
        items: Vec::with_capacity(physical.len()),
        ..Reconciled::default()
    };

    for node in physical {
        if let Some(key) = node.key() {
            if !claimed.contains(&key) {
                if let Some(item) = known.get(&key) {
                    trace!(node = node.id().raw(), %key, "carried forward");
                    claimed.insert(key);
                    result.items.push((*item).clone());
                    continue;
                }
            }
        }

        let Some(record) = cargo.payload_for(node) else {
            debug!(node = node.id().raw(), "node has no payload, excluded from reconciliation");
            result.excluded.push(node.id());
            continue;
        };

        let key = match node.key() {
            Some(key) if !claimed.contains(&key) => key,
            _ => ItemKey::mint(),
        };
        claimed.insert(key);

        trace!(node = node.id().raw(), %key, "recovered from payload");
        result.recovered += 1;
        result.items.push(Item::with_key(key, record));
    }

    result
}
