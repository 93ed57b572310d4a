use ahash::{AHashMap, AHashSet};

use crate::{
    collection::CollectionData,
    document::{Document, IndexKey},
};

#[derive(Debug, Clone, Default)]
struct FieldIndex {
    buckets: AHashMap<IndexKey, AHashSet<String>>,
}

impl FieldIndex {
    fn insert(&mut self, key: IndexKey, id: &str) {
        self.buckets.entry(key).or_default().insert(id.to_string());
    }

    fn remove(&mut self, key: &IndexKey, id: &str) {
        if let Some(bucket) = self.buckets.get_mut(key) {
            bucket.remove(id);
            if bucket.is_empty() {
                self.buckets.remove(key);
            }
        }
    }
}

/// Secondary indices keyed by `(collection, field path)`.
#[derive(Debug, Clone, Default)]
pub(crate) struct IndexManager {
    indexes: AHashMap<String, AHashMap<String, FieldIndex>>,
}

impl IndexManager {
    /// Builds an index over the current contents of `data`.
    /// Returns `false` when the index already existed.
    pub(crate) fn create(&mut self, collection: &str, path: &str, data: Option<&CollectionData>) -> bool {
        let per_collection = self.indexes.entry(collection.to_string()).or_default();
        if per_collection.contains_key(path) {
            return false;
        }
        let mut index = FieldIndex::default();
        if let Some(data) = data {
            for doc in data.iter() {
                if let Some(key) = doc.field_key(path) {
                    index.insert(key, &doc.id);
                }
            }
        }
        per_collection.insert(path.to_string(), index);
        true
    }

    pub(crate) fn drop_index(&mut self, collection: &str, path: &str) {
        if let Some(per_collection) = self.indexes.get_mut(collection) {
            per_collection.remove(path);
            if per_collection.is_empty() {
                self.indexes.remove(collection);
            }
        }
    }

    pub(crate) fn has_index(&self, collection: &str, path: &str) -> bool {
        self.indexes
            .get(collection)
            .is_some_and(|per_collection| per_collection.contains_key(path))
    }

    pub(crate) fn paths(&self, collection: &str) -> Vec<String> {
        let mut paths: Vec<String> = self
            .indexes
            .get(collection)
            .map(|per_collection| per_collection.keys().cloned().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }

    pub(crate) fn indexed_collections(&self) -> Vec<String> {
        self.indexes.keys().cloned().collect()
    }

    /// Moves `id` between buckets of every index on `collection` so they
    /// reflect `after`. `None` means the document is absent on that side.
    pub(crate) fn on_write(
        &mut self,
        collection: &str,
        id: &str,
        before: Option<&Document>,
        after: Option<&Document>,
    ) {
        let Some(per_collection) = self.indexes.get_mut(collection) else {
            return;
        };
        for (path, index) in per_collection.iter_mut() {
            let old = before.and_then(|doc| doc.field_key(path));
            let new = after.and_then(|doc| doc.field_key(path));
            if old == new {
                continue;
            }
            if let Some(old) = old {
                index.remove(&old, id);
            }
            if let Some(new) = new {
                index.insert(new, id);
            }
        }
    }

    /// Ids indexed under `key`, or `None` when no such index exists.
    pub(crate) fn lookup(
        &self,
        collection: &str,
        path: &str,
        key: &IndexKey,
    ) -> Option<Vec<&str>> {
        let index = self.indexes.get(collection)?.get(path)?;
        Some(
            index
                .buckets
                .get(key)
                .map(|bucket| bucket.iter().map(String::as_str).collect())
                .unwrap_or_default(),
        )
    }

    /// Counts entries that disagree with the stored documents: ids indexed
    /// under a value they no longer hold, and documents missing from the
    /// bucket of their current value.
    pub(crate) fn stale_entries(&self, collections: &AHashMap<String, CollectionData>) -> usize {
        let mut stale = 0;
        for (collection, per_collection) in &self.indexes {
            let data = collections.get(collection);
            for (path, index) in per_collection {
                for (key, bucket) in &index.buckets {
                    for id in bucket {
                        let current = data.and_then(|d| d.get(id)).and_then(|d| d.field_key(path));
                        if current.as_ref() != Some(key) {
                            stale += 1;
                        }
                    }
                }
                if let Some(data) = data {
                    for doc in data.iter() {
                        if let Some(key) = doc.field_key(path) {
                            let indexed = index
                                .buckets
                                .get(&key)
                                .is_some_and(|bucket| bucket.contains(&doc.id));
                            if !indexed {
                                stale += 1;
                            }
                        }
                    }
                }
            }
        }
        stale
    }

    pub(crate) fn clear(&mut self) {
        self.indexes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::{Value, json};

    use crate::document::payload_fields;

    fn doc(id: &str, data: Value) -> Document {
        Document::new(id, payload_fields(data), Utc::now())
    }

    fn key(value: Value) -> IndexKey {
        IndexKey::from_value(&value)
    }

    #[test]
    fn test_create_indexes_existing_documents() {
        let mut data = CollectionData::default();
        data.put(doc("i1", json!({ "category": 2 })));
        data.put(doc("i2", json!({ "category": 3 })));
        let mut manager = IndexManager::default();
        assert!(manager.create("items", "category", Some(&data)));
        assert!(!manager.create("items", "category", Some(&data)));
        assert_eq!(manager.lookup("items", "category", &key(json!(2))), Some(vec!["i1"]));
        assert_eq!(manager.stale_entries(&AHashMap::from_iter([("items".to_string(), data)])), 0);
    }

    #[test]
    fn test_on_write_moves_between_buckets() {
        let mut manager = IndexManager::default();
        manager.create("items", "category", None);
        let before = doc("i1", json!({ "category": "a" }));
        let after = doc("i1", json!({ "category": "b" }));
        manager.on_write("items", "i1", None, Some(&before));
        manager.on_write("items", "i1", Some(&before), Some(&after));
        assert_eq!(manager.lookup("items", "category", &key(json!("a"))), Some(vec![]));
        assert_eq!(manager.lookup("items", "category", &key(json!("b"))), Some(vec!["i1"]));
        manager.on_write("items", "i1", Some(&after), None);
        assert_eq!(manager.lookup("items", "category", &key(json!("b"))), Some(vec![]));
    }

    #[test]
    fn test_lookup_without_index_is_none() {
        let manager = IndexManager::default();
        assert!(manager.lookup("items", "category", &key(json!(1))).is_none());
    }
}
