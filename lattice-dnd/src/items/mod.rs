//! Items and Reconciliation
//!
//! An item is an application record paired with a surrogate key. This
//! module owns everything needed to keep a container's logical, ordered
//! collection of items consistent with what is on screen.
//!
//! # Two Directions
//!
//! ## Drop path (physical → logical)
//!
//! After a drop, the engine has already rearranged the rendered nodes. The
//! container reads its physical children and [`reconcile_drop`] derives the
//! new logical order from them, reusing known items by key and recovering
//! foreign items from their carried payload.
//!
//! ## Inbound path (application → logical)
//!
//! When the application hands a container a new items collection,
//! [`KeyedItems::sync`] assigns surrogate keys, reusing existing keys for
//! records judged to be the same, and skips the update entirely when the
//! collection is value-equal to what the container already has.

mod cargo;
mod inbound;
mod key;
mod reconcile;
mod record;

use std::sync::Arc;

pub use cargo::NodeCargo;
pub use inbound::KeyedItems;
pub use key::ItemKey;
pub use reconcile::{reconcile_drop, Reconciled};
pub use record::{
    parse_record, record_from_value, record_into, records_from_serializable, records_from_value,
    serialize_record, Record,
};

/// An application record plus the surrogate key correlating it to a node.
#[derive(Debug, Clone)]
pub struct Item {
    key: ItemKey,
    record: Arc<Record>,
}

impl Item {
    /// Wrap a record under a freshly minted key.
    pub fn new(record: impl Into<Arc<Record>>) -> Self {
        Self::with_key(ItemKey::mint(), record)
    }

    /// Wrap a record under an existing key.
    pub fn with_key(key: ItemKey, record: impl Into<Arc<Record>>) -> Self {
        Self {
            key,
            record: record.into(),
        }
    }

    pub fn key(&self) -> ItemKey {
        self.key
    }

    pub fn record(&self) -> &Arc<Record> {
        &self.record
    }

    /// Whether two items share the same record allocation.
    pub fn same_record(&self, other: &Item) -> bool {
        Arc::ptr_eq(&self.record, &other.record)
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.record == other.record
    }
}

impl Eq for Item {}

/// Strip surrogate keys, leaving the records in order.
pub fn records_of(items: &[Item]) -> Vec<Arc<Record>> {
    items.iter().map(|item| Arc::clone(item.record())).collect()
}
