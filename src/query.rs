use ahash::AHashSet;
use serde_json::Value;

use crate::{document::Document, relationship::EdgeSetKey, store::DocumentStore};

/// One hop of a relationship chain: follow `relation` into `target_collection`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationStep {
    pub relation: String,
    pub target_collection: String,
}

impl RelationStep {
    pub fn new(relation: &str, target_collection: &str) -> Self {
        Self {
            relation: relation.to_string(),
            target_collection: target_collection.to_string(),
        }
    }
}

/// Read-side view over a store. Holds no state of its own.
pub struct DocumentQuery<'a> {
    store: &'a DocumentStore,
}

impl<'a> DocumentQuery<'a> {
    pub fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    pub fn all(&self, collection: &str) -> Vec<Document> {
        self.store.get_all_documents(collection)
    }

    pub fn scan<F>(&self, collection: &str, predicate: F) -> Vec<Document>
    where
        F: Fn(&Document) -> bool,
    {
        self.store.query_documents(collection, predicate)
    }

    pub fn by_index(&self, collection: &str, field_path: &str, value: &Value) -> Vec<Document> {
        self.store.query_by_index(collection, field_path, value)
    }

    pub fn related(
        &self,
        source_collection: &str,
        source_id: &str,
        target_collection: &str,
        relation: &str,
    ) -> Vec<Document> {
        self.store
            .get_related_documents(source_collection, source_id, target_collection, relation)
    }

    pub fn referencing(
        &self,
        source_collection: &str,
        target_collection: &str,
        target_id: &str,
        relation: &str,
    ) -> Vec<Document> {
        self.store
            .get_referencing_documents(source_collection, target_collection, target_id, relation)
    }

    /// Follows `chain` hop by hop from one document.
    ///
    /// Each hop keeps the first occurrence of every id, in link order of the
    /// frontier. An empty chain yields the start document itself.
    pub fn chain(&self, collection: &str, start_id: &str, chain: &[RelationStep]) -> Vec<Document> {
        let state = self.store.read_state();
        let Some(start) = state
            .collections
            .get(collection)
            .and_then(|data| data.get(start_id))
        else {
            return Vec::new();
        };
        let mut current_collection = collection.to_string();
        let mut frontier = vec![start.clone()];
        for step in chain {
            let key = EdgeSetKey::new(&current_collection, &step.relation, &step.target_collection);
            let mut seen = AHashSet::new();
            let mut next = Vec::new();
            for doc in &frontier {
                for target in state.related(&key, &doc.id) {
                    if seen.insert(target.id.clone()) {
                        next.push(target);
                    }
                }
            }
            if next.is_empty() {
                return Vec::new();
            }
            frontier = next;
            current_collection = step.target_collection.clone();
        }
        frontier
    }
}

impl DocumentStore {
    pub fn query(&self) -> DocumentQuery<'_> {
        DocumentQuery::new(self)
    }
}
