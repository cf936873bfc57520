//! Inbound items reconciliation.
//!
//! A container receives a fresh items collection every time its parent
//! renders. Most of the time that collection is structurally identical to
//! what the container already shows, so the first check is a value
//! comparison that ignores surrogate keys. Only when something actually
//! changed are keys reassigned.
//!
//! # Matching
//!
//! - With an identity field declared, records are matched by the value of
//!   that field through a hash index. Records missing the field fall back to
//!   value equality.
//! - Without one, records are matched by full value equality.
//!
//! Every existing item can be matched at most once, so duplicated records
//! never end up sharing a key.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tracing::trace;

use super::key::ItemKey;
use super::record::Record;
use super::Item;

/// A container's logical, keyed collection of items.
#[derive(Debug, Clone, Default)]
pub struct KeyedItems {
    items: Vec<Item>,

    /// Application-declared identity field used for matching.
    identity: Option<String>,
}

impl KeyedItems {
    /// Create an empty collection matching by value equality.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty collection matching by the given identity field.
    pub fn with_identity(field: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            identity: Some(field.into()),
        }
    }

    pub fn identity_field(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Records in order, without keys.
    pub fn records(&self) -> Vec<Arc<Record>> {
        super::records_of(&self.items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the records equal the current collection, ignoring keys.
    pub fn is_value_equal(&self, records: &[Record]) -> bool {
        self.items.len() == records.len()
            && self
                .items
                .iter()
                .zip(records)
                .all(|(item, record)| item.record().as_ref() == record)
    }

    /// Replace the collection with an already-keyed one (drop results).
    pub fn replace(&mut self, items: Vec<Item>) {
        self.items = items;
    }

    /// Take in a new items collection from the application.
    ///
    /// Returns false, leaving the state untouched, when the collection is
    /// value-equal to the current one.
    pub fn sync(&mut self, incoming: Vec<Record>) -> bool {
        if self.is_value_equal(&incoming) {
            trace!(len = incoming.len(), "inbound items unchanged");
            return false;
        }

        let mut consumed = vec![false; self.items.len()];
        let mut by_identity = self.identity_index();
        let mut next = Vec::with_capacity(incoming.len());

        for record in incoming {
            let by_id = match self.identity_value(&record) {
                Some(id) => by_identity
                    .get_mut(&id)
                    .and_then(|slots| next_unconsumed(slots, &consumed)),
                None => None,
            };
            let matched = by_id.or_else(|| self.find_equal(&record, &consumed));

            let item = match matched {
                Some(index) => {
                    consumed[index] = true;
                    let existing = &self.items[index];
                    if existing.record().as_ref() == &record {
                        existing.clone()
                    } else {
                        Item::with_key(existing.key(), record)
                    }
                }
                None => Item::with_key(ItemKey::mint(), record),
            };
            next.push(item);
        }

        self.items = next;
        true
    }

    /// Index existing items by identity value, in order.
    fn identity_index(&self) -> HashMap<String, VecDeque<usize>> {
        let mut index: HashMap<String, VecDeque<usize>> = HashMap::new();
        if self.identity.is_none() {
            return index;
        }

        for (position, item) in self.items.iter().enumerate() {
            if let Some(id) = self.identity_value(item.record()) {
                index.entry(id).or_default().push_back(position);
            }
        }
        index
    }

    /// Canonical form of a record's identity field.
    fn identity_value(&self, record: &Record) -> Option<String> {
        let field = self.identity.as_deref()?;
        record.get(field).map(|value| value.to_string())
    }

    fn find_equal(&self, record: &Record, consumed: &[bool]) -> Option<usize> {
        // Identity-keyed records are matched through the index only.
        if self.identity_value(record).is_some() {
            return None;
        }

        self.items
            .iter()
            .enumerate()
            .find(|(index, item)| !consumed[*index] && item.record().as_ref() == record)
            .map(|(index, _)| index)
    }
}

fn next_unconsumed(slots: &mut VecDeque<usize>, consumed: &[bool]) -> Option<usize> {
    while let Some(index) = slots.pop_front() {
        if !consumed[index] {
            return Some(index);
        }
    }
    None
}

impl From<Vec<Item>> for KeyedItems {
    fn from(items: Vec<Item>) -> Self {
        Self {
            items,
            identity: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(value: serde_json::Value) -> Vec<Record> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn first_sync_mints_keys() {
        let mut items = KeyedItems::new();
        assert!(items.sync(records(json!([{"v": "x"}, {"v": "y"}]))));
        assert_eq!(items.len(), 2);
        assert_ne!(items.items()[0].key(), items.items()[1].key());
    }

    #[test]
    fn value_equal_input_is_a_no_op() {
        let mut items = KeyedItems::new();
        items.sync(records(json!([{"v": "x"}, {"v": "y"}])));
        let before = items.items().to_vec();

        assert!(!items.sync(records(json!([{"v": "x"}, {"v": "y"}]))));
        for (a, b) in before.iter().zip(items.items()) {
            assert_eq!(a.key(), b.key());
            assert!(a.same_record(b));
        }
    }

    #[test]
    fn value_matching_reuses_keys_across_reorder() {
        let mut items = KeyedItems::new();
        items.sync(records(json!([{"v": "x"}, {"v": "y"}])));
        let x = items.items()[0].clone();
        let y = items.items()[1].clone();

        assert!(items.sync(records(json!([{"v": "y"}, {"v": "new"}, {"v": "x"}]))));

        assert_eq!(items.items()[0].key(), y.key());
        assert!(items.items()[0].same_record(&y));
        assert_eq!(items.items()[2].key(), x.key());
        assert_ne!(items.items()[1].key(), x.key());
        assert_ne!(items.items()[1].key(), y.key());
    }

    #[test]
    fn identity_matching_survives_field_edits() {
        let mut items = KeyedItems::with_identity("id");
        items.sync(records(json!([{"id": 1, "title": "a"}, {"id": 2, "title": "b"}])));
        let first = items.items()[0].key();
        let second = items.items()[1].key();

        items.sync(records(json!([{"id": 2, "title": "b!"}, {"id": 1, "title": "a"}])));

        assert_eq!(items.items()[0].key(), second);
        assert_eq!(items.items()[0].record()["title"], "b!");
        assert_eq!(items.items()[1].key(), first);
    }

    #[test]
    fn duplicate_records_get_distinct_keys() {
        let mut items = KeyedItems::new();
        items.sync(records(json!([{"v": "x"}])));
        let original = items.items()[0].key();

        items.sync(records(json!([{"v": "x"}, {"v": "x"}])));

        assert_eq!(items.items()[0].key(), original);
        assert_ne!(items.items()[1].key(), original);
    }

    #[test]
    fn records_without_identity_field_fall_back_to_equality() {
        let mut items = KeyedItems::with_identity("id");
        items.sync(records(json!([{"id": 1}, {"note": "loose"}])));
        let loose = items.items()[1].key();

        items.sync(records(json!([{"note": "loose"}, {"id": 1}, {"id": 3}])));
        assert_eq!(items.items()[0].key(), loose);
    }
}
