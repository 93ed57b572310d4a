use ahash::AHashMap;
use parking_lot::{RwLock, RwLockReadGuard};
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::{
    collection::{Collection, CollectionData},
    config::StoreConfig,
    document::{Document, IndexKey, next_timestamp, payload_fields},
    errors::DocStoreError,
    index::IndexManager,
    relationship::{EdgeSetKey, RelationshipGraph},
    snapshot::StoreSnapshot,
    transaction::{MutationAction, PriorState, TransactionLog, TransactionState, UndoEntry},
};

/// In-memory document store: collections, secondary indices, relationships
/// and single-level transactions behind one reader/writer lock.
///
/// Reads against missing collections or documents return `None` or an empty
/// list. `update_document` and `delete_document` report a missing document
/// with `false`.
pub struct DocumentStore {
    config: StoreConfig,
    inner: RwLock<StoreState>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(StoreState::default()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Creates an empty collection. Existing collections are left untouched.
    pub fn add_collection(&self, name: &str) {
        let mut state = self.inner.write();
        state.ensure_collection(name, self.config.reserve_collection_capacity);
    }

    pub fn get_collection(&self, name: &str) -> Option<Collection> {
        let state = self.inner.read();
        state.collections.get(name).map(|data| data.to_collection(name))
    }

    /// Collection names in lexical order.
    pub fn collection_names(&self) -> Vec<String> {
        let state = self.inner.read();
        let mut names: Vec<String> = state.collections.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn document_count(&self, collection: &str) -> usize {
        let state = self.inner.read();
        state.collections.get(collection).map(CollectionData::len).unwrap_or(0)
    }

    /// Stores `data` under `id`, replacing any previous content.
    ///
    /// A replaced document keeps its `createdAt` and its position in the
    /// collection. Non-object payloads store no fields.
    pub fn add_document(&self, collection: &str, id: &str, data: Value) -> Document {
        let mut state = self.inner.write();
        state.put_document(
            collection,
            id,
            payload_fields(data),
            self.config.reserve_collection_capacity,
        )
    }

    pub fn get_document(&self, collection: &str, id: &str) -> Option<Document> {
        let state = self.inner.read();
        state.collections.get(collection)?.get(id).cloned()
    }

    /// Merges the top-level fields of `partial` into an existing document.
    pub fn update_document(&self, collection: &str, id: &str, partial: Value) -> bool {
        let mut state = self.inner.write();
        state.merge_document(collection, id, payload_fields(partial))
    }

    /// Removes a document along with its index entries and every
    /// relationship edge that names it.
    pub fn delete_document(&self, collection: &str, id: &str) -> bool {
        let mut state = self.inner.write();
        state.remove_document(collection, id)
    }

    /// Documents matching `predicate`, in insertion order.
    ///
    /// The predicate runs under the shared lock and must not write to this
    /// store.
    pub fn query_documents<F>(&self, collection: &str, predicate: F) -> Vec<Document>
    where
        F: Fn(&Document) -> bool,
    {
        let state = self.inner.read();
        state.scan(collection, predicate)
    }

    pub fn get_all_documents(&self, collection: &str) -> Vec<Document> {
        let state = self.inner.read();
        state.scan(collection, |_| true)
    }

    /// Deletes every document of the collection. The collection itself,
    /// its indices and its relationship edge sets stay registered.
    pub fn clear_collection(&self, collection: &str) {
        let mut state = self.inner.write();
        let ids = match state.collections.get(collection) {
            Some(data) => data.ids(),
            None => return,
        };
        debug!(collection, documents = ids.len(), "clearing collection");
        for id in ids {
            state.remove_document(collection, &id);
        }
    }

    /// Builds an index over `field_path` and keeps it current on every write.
    pub fn create_index(&self, collection: &str, field_path: &str) {
        let mut state = self.inner.write();
        state.create_index(collection, field_path);
    }

    pub fn has_index(&self, collection: &str, field_path: &str) -> bool {
        self.inner.read().indexes.has_index(collection, field_path)
    }

    /// Indexed field paths of a collection, sorted.
    pub fn indexes(&self, collection: &str) -> Vec<String> {
        self.inner.read().indexes.paths(collection)
    }

    /// Documents whose field at `field_path` equals `value`, in insertion
    /// order. Uses the index when one exists, otherwise scans.
    pub fn query_by_index(&self, collection: &str, field_path: &str, value: &Value) -> Vec<Document> {
        let state = self.inner.read();
        state.by_index(collection, field_path, value)
    }

    /// Registers the directed edge `source --relation--> target`.
    ///
    /// Returns `true` when the edge exists after the call. With
    /// [`StoreConfig::require_endpoints`] set, an edge naming a missing
    /// document is rejected.
    pub fn create_relationship(
        &self,
        source_collection: &str,
        source_id: &str,
        target_collection: &str,
        target_id: &str,
        relation: &str,
    ) -> bool {
        let mut state = self.inner.write();
        if self.config.require_endpoints
            && !(state.contains(source_collection, source_id)
                && state.contains(target_collection, target_id))
        {
            warn!(
                source_collection,
                source_id,
                target_collection,
                target_id,
                relation,
                "relationship endpoint missing"
            );
            return false;
        }
        let key = EdgeSetKey::new(source_collection, relation, target_collection);
        state.link(key, source_id, target_id);
        true
    }

    /// Removes a single edge. Returns `false` when it was not present.
    pub fn remove_relationship(
        &self,
        source_collection: &str,
        source_id: &str,
        target_collection: &str,
        target_id: &str,
        relation: &str,
    ) -> bool {
        let mut state = self.inner.write();
        let key = EdgeSetKey::new(source_collection, relation, target_collection);
        state.unlink(key, source_id, target_id)
    }

    /// Existing targets of `source_id` through `relation`, in link order.
    pub fn get_related_documents(
        &self,
        source_collection: &str,
        source_id: &str,
        target_collection: &str,
        relation: &str,
    ) -> Vec<Document> {
        let state = self.inner.read();
        let key = EdgeSetKey::new(source_collection, relation, target_collection);
        state.related(&key, source_id)
    }

    /// Existing sources that link to `target_id` through `relation`, in
    /// insertion order of the source collection.
    pub fn get_referencing_documents(
        &self,
        source_collection: &str,
        target_collection: &str,
        target_id: &str,
        relation: &str,
    ) -> Vec<Document> {
        let state = self.inner.read();
        let key = EdgeSetKey::new(source_collection, relation, target_collection);
        state.referencing(&key, target_id)
    }

    pub fn begin_transaction(&self) -> Result<(), DocStoreError> {
        let mut state = self.inner.write();
        state.log.begin().inspect_err(|err| warn!(%err, "begin rejected"))?;
        debug!("transaction opened");
        Ok(())
    }

    /// Keeps every change made since `begin_transaction`.
    pub fn commit_transaction(&self) -> Result<(), DocStoreError> {
        let mut state = self.inner.write();
        let entries = state
            .log
            .finish("commit")
            .inspect_err(|err| warn!(%err, "commit rejected"))?;
        debug!(entries = entries.len(), "transaction committed");
        Ok(())
    }

    /// Undoes every change made since `begin_transaction`, newest first.
    pub fn rollback_transaction(&self) -> Result<(), DocStoreError> {
        let mut state = self.inner.write();
        let entries = state
            .log
            .finish("rollback")
            .inspect_err(|err| warn!(%err, "rollback rejected"))?;
        debug!(entries = entries.len(), "rolling back transaction");
        for entry in entries.into_iter().rev() {
            state.undo(entry);
        }
        Ok(())
    }

    pub fn transaction_state(&self) -> TransactionState {
        self.inner.read().log.state()
    }

    pub fn in_transaction(&self) -> bool {
        self.inner.read().log.is_open()
    }

    /// Number of undo entries recorded by the open transaction.
    pub fn pending_changes(&self) -> usize {
        self.inner.read().log.len()
    }

    /// Drops all collections, indices and relationships.
    pub fn reset(&self) -> Result<(), DocStoreError> {
        let mut state = self.inner.write();
        if state.log.is_open() {
            return Err(DocStoreError::transaction_state(
                "reset called while a transaction is open",
            ));
        }
        state.collections.clear();
        state.indexes.clear();
        state.relationships.clear();
        debug!("store reset");
        Ok(())
    }

    /// Comparable deep copy of documents, indices and relationships.
    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.inner.read();
        StoreSnapshot::capture(&state)
    }

    pub(crate) fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.inner.read()
    }
}

#[derive(Debug, Default)]
pub(crate) struct StoreState {
    pub(crate) collections: AHashMap<String, CollectionData>,
    pub(crate) indexes: IndexManager,
    pub(crate) relationships: RelationshipGraph,
    pub(crate) log: TransactionLog,
}

impl StoreState {
    pub(crate) fn contains(&self, collection: &str, id: &str) -> bool {
        self.collections
            .get(collection)
            .is_some_and(|data| data.contains(id))
    }

    fn ensure_collection(&mut self, name: &str, capacity: Option<usize>) {
        if self.collections.contains_key(name) {
            return;
        }
        debug!(collection = name, "collection created");
        self.collections.insert(
            name.to_string(),
            CollectionData::with_capacity(capacity.unwrap_or(0)),
        );
        self.log.record(UndoEntry::CollectionCreated {
            collection: name.to_string(),
        });
    }

    fn put_document(
        &mut self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
        capacity: Option<usize>,
    ) -> Document {
        self.ensure_collection(collection, capacity);
        let data = self
            .collections
            .entry(collection.to_string())
            .or_default();
        let existing = data.get(id);
        let updated_at = next_timestamp(existing.map(|doc| doc.updated_at));
        let created_at = existing.map(|doc| doc.created_at).unwrap_or(updated_at);
        let mut doc = Document::new(id, fields, created_at);
        doc.updated_at = updated_at;
        let replaced = data.put(doc.clone());
        self.indexes
            .on_write(collection, id, replaced.as_ref().map(|(_, prior)| prior), Some(&doc));
        debug!(collection, id, replaced = replaced.is_some(), "document stored");
        let prior = match replaced {
            Some((seq, document)) => PriorState::Present { seq, document },
            None => PriorState::Absent,
        };
        self.log.record(UndoEntry::Document {
            action: MutationAction::Add,
            collection: collection.to_string(),
            id: id.to_string(),
            prior,
            detached: Vec::new(),
        });
        doc
    }

    fn merge_document(&mut self, collection: &str, id: &str, partial: Map<String, Value>) -> bool {
        let Some(data) = self.collections.get_mut(collection) else {
            return false;
        };
        let Some(existing) = data.get(id) else {
            return false;
        };
        let mut merged = existing.clone();
        merged.data.extend(partial);
        merged.updated_at = next_timestamp(Some(existing.updated_at));
        let Some((seq, prior)) = data.put(merged.clone()) else {
            return false;
        };
        self.indexes.on_write(collection, id, Some(&prior), Some(&merged));
        debug!(collection, id, "document updated");
        self.log.record(UndoEntry::Document {
            action: MutationAction::Update,
            collection: collection.to_string(),
            id: id.to_string(),
            prior: PriorState::Present {
                seq,
                document: prior,
            },
            detached: Vec::new(),
        });
        true
    }

    fn remove_document(&mut self, collection: &str, id: &str) -> bool {
        let Some(data) = self.collections.get_mut(collection) else {
            return false;
        };
        let Some((seq, removed)) = data.remove(id) else {
            return false;
        };
        self.indexes.on_write(collection, id, Some(&removed), None);
        let detached = self.relationships.detach(collection, id);
        debug!(collection, id, edges = detached.len(), "document deleted");
        self.log.record(UndoEntry::Document {
            action: MutationAction::Delete,
            collection: collection.to_string(),
            id: id.to_string(),
            prior: PriorState::Present {
                seq,
                document: removed,
            },
            detached,
        });
        true
    }

    fn create_index(&mut self, collection: &str, field_path: &str) {
        if self
            .indexes
            .create(collection, field_path, self.collections.get(collection))
        {
            debug!(collection, field_path, "index created");
            self.log.record(UndoEntry::IndexCreated {
                collection: collection.to_string(),
                field_path: field_path.to_string(),
            });
        }
    }

    fn link(&mut self, key: EdgeSetKey, source_id: &str, target_id: &str) {
        if self.relationships.link(&key, source_id, target_id) {
            debug!(
                relation = key.relation.as_str(),
                source_id, target_id, "relationship created"
            );
            self.log.record(UndoEntry::Linked {
                key,
                source_id: source_id.to_string(),
                target_id: target_id.to_string(),
            });
        }
    }

    fn unlink(&mut self, key: EdgeSetKey, source_id: &str, target_id: &str) -> bool {
        let Some(position) = self.relationships.unlink(&key, source_id, target_id) else {
            return false;
        };
        debug!(
            relation = key.relation.as_str(),
            source_id, target_id, "relationship removed"
        );
        self.log.record(UndoEntry::Unlinked {
            key,
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            position,
        });
        true
    }

    /// Reverses one logged mutation without logging anything itself.
    fn undo(&mut self, entry: UndoEntry) {
        match entry {
            UndoEntry::CollectionCreated { collection } => {
                self.collections.remove(&collection);
            }
            UndoEntry::Document {
                action,
                collection,
                id,
                prior,
                detached,
            } => {
                trace!(?action, collection = collection.as_str(), id = id.as_str(), "undo");
                match prior {
                    PriorState::Absent => {
                        let removed = self
                            .collections
                            .get_mut(&collection)
                            .and_then(|data| data.remove(&id));
                        if let Some((_, current)) = removed {
                            self.indexes.on_write(&collection, &id, Some(&current), None);
                        }
                    }
                    PriorState::Present { seq, document } => {
                        let data = self.collections.entry(collection.clone()).or_default();
                        let current = data.get(&id).cloned();
                        data.restore(seq, document.clone());
                        self.indexes
                            .on_write(&collection, &id, current.as_ref(), Some(&document));
                    }
                }
                self.relationships.reattach(detached);
            }
            UndoEntry::Linked {
                key,
                source_id,
                target_id,
            } => {
                self.relationships.unlink(&key, &source_id, &target_id);
            }
            UndoEntry::Unlinked {
                key,
                source_id,
                target_id,
                position,
            } => self
                .relationships
                .relink_at(&key, &source_id, &target_id, position),
            UndoEntry::IndexCreated {
                collection,
                field_path,
            } => self.indexes.drop_index(&collection, &field_path),
        }
    }

    pub(crate) fn scan<F>(&self, collection: &str, predicate: F) -> Vec<Document>
    where
        F: Fn(&Document) -> bool,
    {
        match self.collections.get(collection) {
            Some(data) => data.iter().filter(|doc| predicate(doc)).cloned().collect(),
            None => Vec::new(),
        }
    }

    pub(crate) fn by_index(&self, collection: &str, field_path: &str, value: &Value) -> Vec<Document> {
        let key = IndexKey::from_value(value);
        match self.indexes.lookup(collection, field_path, &key) {
            Some(ids) => {
                trace!(collection, field_path, hits = ids.len(), "index lookup");
                self.in_collection_order(collection, ids)
            }
            None => {
                trace!(collection, field_path, "no index, scanning");
                self.scan(collection, |doc| {
                    doc.field_key(field_path).as_ref() == Some(&key)
                })
            }
        }
    }

    pub(crate) fn related(&self, key: &EdgeSetKey, source_id: &str) -> Vec<Document> {
        let Some(data) = self.collections.get(&key.target_collection) else {
            return Vec::new();
        };
        self.relationships
            .targets(key, source_id)
            .iter()
            .filter_map(|target| data.get(target).cloned())
            .collect()
    }

    pub(crate) fn referencing(&self, key: &EdgeSetKey, target_id: &str) -> Vec<Document> {
        let sources = self.relationships.sources_of(key, target_id);
        self.in_collection_order(&key.source_collection, sources)
    }

    /// Existing documents among `ids`, ordered by collection insertion order.
    fn in_collection_order(&self, collection: &str, ids: Vec<&str>) -> Vec<Document> {
        let Some(data) = self.collections.get(collection) else {
            return Vec::new();
        };
        let mut slots: Vec<(u64, &Document)> = ids
            .into_iter()
            .filter_map(|id| Some((data.seq_of(id)?, data.get(id)?)))
            .collect();
        slots.sort_by_key(|(seq, _)| *seq);
        slots.into_iter().map(|(_, doc)| doc.clone()).collect()
    }
}
