use std::collections::BTreeMap;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::document::Document;

/// Point-in-time copy of a collection, documents in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Collection {
    pub name: String,
    pub documents: Vec<Document>,
}

#[derive(Debug, Clone)]
struct Slot {
    seq: u64,
    doc: Document,
}

/// Live storage of one collection.
///
/// Each document holds an insertion sequence number; `order` maps sequence
/// numbers back to ids so iteration follows insertion order and a removed
/// document can be put back exactly where it was.
#[derive(Debug, Clone, Default)]
pub(crate) struct CollectionData {
    slots: AHashMap<String, Slot>,
    order: BTreeMap<u64, String>,
    next_seq: u64,
}

impl CollectionData {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: AHashMap::with_capacity(capacity),
            order: BTreeMap::new(),
            next_seq: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn get(&self, id: &str) -> Option<&Document> {
        self.slots.get(id).map(|slot| &slot.doc)
    }

    pub(crate) fn seq_of(&self, id: &str) -> Option<u64> {
        self.slots.get(id).map(|slot| slot.seq)
    }

    /// Stores `doc`, keeping the existing position when the id is present.
    /// Returns the replaced document and its sequence number.
    pub(crate) fn put(&mut self, doc: Document) -> Option<(u64, Document)> {
        if let Some(slot) = self.slots.get_mut(&doc.id) {
            let prior = std::mem::replace(&mut slot.doc, doc);
            return Some((slot.seq, prior));
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, doc.id.clone());
        self.slots.insert(doc.id.clone(), Slot { seq, doc });
        None
    }

    /// Re-inserts a document at a previously held position.
    pub(crate) fn restore(&mut self, seq: u64, doc: Document) {
        if let Some(old) = self.slots.get(&doc.id) {
            self.order.remove(&old.seq);
        }
        self.order.insert(seq, doc.id.clone());
        self.next_seq = self.next_seq.max(seq + 1);
        self.slots.insert(doc.id.clone(), Slot { seq, doc });
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<(u64, Document)> {
        let slot = self.slots.remove(id)?;
        self.order.remove(&slot.seq);
        Some((slot.seq, slot.doc))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Document> + '_ {
        self.order
            .values()
            .filter_map(move |id| self.slots.get(id).map(|slot| &slot.doc))
    }

    pub(crate) fn ids(&self) -> Vec<String> {
        self.order.values().cloned().collect()
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    pub(crate) fn to_collection(&self, name: &str) -> Collection {
        Collection {
            name: name.to_string(),
            documents: self.iter().cloned().collect(),
        }
    }
}
