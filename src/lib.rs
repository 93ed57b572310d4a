//! In-memory document store with secondary indices, relationships and rollback.
//!
//! docstore keeps named collections of schema-less JSON documents in memory.
//! It is meant to be constructed per test run (or per test) and passed to
//! the code under test by reference; nothing is global.
//!
//! # Quick Start
//!
//! ```rust
//! use docstore::DocumentStore;
//! use serde_json::json;
//!
//! let store = DocumentStore::new();
//! store.add_document("users", "u1", json!({ "name": "A" }));
//! store.update_document("users", "u1", json!({ "name": "B" }));
//! assert_eq!(store.get_document("users", "u1").unwrap().data["name"], "B");
//!
//! store.create_index("items", "category");
//! store.add_document("items", "i1", json!({ "category": 2 }));
//! assert_eq!(store.query_by_index("items", "category", &json!(2)).len(), 1);
//!
//! store.begin_transaction()?;
//! store.add_document("a", "x", json!({}));
//! store.rollback_transaction()?;
//! assert!(store.get_all_documents("a").is_empty());
//! # Ok::<(), docstore::DocStoreError>(())
//! ```
//!
//! # Public API Organization
//!
//! - [`DocumentStore`] - collections, documents, indices, relationships, transactions
//! - [`Document`] / [`Collection`] - stored records and collection copies
//! - [`DocumentQuery`] - read-side composition, including relationship chains
//! - [`StoreSnapshot`] - comparable deep copy of a store
//! - [`StoreConfig`] - construction options
//! - [`integrity`] - consistency checks over indices and relationships
//! - [`DocStoreError`] - transaction state errors

pub mod bench_utils;
pub mod collection;
pub mod config;
pub mod document;
pub mod errors;
mod index;
pub mod integrity;
pub mod query;
pub mod relationship;
pub mod snapshot;
pub mod store;
pub mod transaction;

pub use crate::collection::Collection;
pub use crate::config::StoreConfig;
pub use crate::document::{Document, IndexKey, field_matches, values_equal};
pub use crate::errors::DocStoreError;
pub use crate::integrity::{IntegrityError, IntegrityReport};
pub use crate::query::{DocumentQuery, RelationStep};
pub use crate::relationship::EdgeSetKey;
pub use crate::snapshot::StoreSnapshot;
pub use crate::store::DocumentStore;
pub use crate::transaction::{MutationAction, TransactionState};
