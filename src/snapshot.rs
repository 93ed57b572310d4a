//! Comparable point-in-time copies of a store.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{document::Document, relationship::EdgeSetKey, store::StoreState};

/// Deep copy of everything observable in a store: documents per collection
/// in insertion order, indexed field paths, and relationship edge sets
/// (sources sorted by id, targets in link order).
///
/// Unaffected by writes made after it was taken.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreSnapshot {
    pub collections: BTreeMap<String, Vec<Document>>,
    pub indexes: BTreeMap<String, Vec<String>>,
    pub relationships: Vec<(EdgeSetKey, Vec<(String, Vec<String>)>)>,
}

impl StoreSnapshot {
    pub(crate) fn capture(state: &StoreState) -> Self {
        let collections = state
            .collections
            .iter()
            .map(|(name, data)| (name.clone(), data.iter().cloned().collect()))
            .collect();
        let mut indexes = BTreeMap::new();
        for name in state.indexes.indexed_collections() {
            let paths = state.indexes.paths(&name);
            indexes.insert(name, paths);
        }
        Self {
            collections,
            indexes,
            relationships: state.relationships.export(),
        }
    }

    pub fn document_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    pub fn edge_count(&self) -> usize {
        self.relationships
            .iter()
            .flat_map(|(_, entries)| entries.iter())
            .map(|(_, targets)| targets.len())
            .sum()
    }

    pub fn documents(&self, collection: &str) -> &[Document] {
        self.collections
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
