use serde::Serialize;

use crate::{document::Document, errors::DocStoreError, relationship::{DetachedEdge, EdgeSetKey}};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TransactionState {
    Idle,
    Open,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MutationAction {
    Add,
    Update,
    Delete,
}

/// What a document looked like before a logged mutation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PriorState {
    Absent,
    Present { seq: u64, document: Document },
}

/// One reversible step recorded while a transaction is open.
#[derive(Debug, Clone)]
pub(crate) enum UndoEntry {
    CollectionCreated {
        collection: String,
    },
    Document {
        action: MutationAction,
        collection: String,
        id: String,
        prior: PriorState,
        detached: Vec<DetachedEdge>,
    },
    Linked {
        key: EdgeSetKey,
        source_id: String,
        target_id: String,
    },
    Unlinked {
        key: EdgeSetKey,
        source_id: String,
        target_id: String,
        position: usize,
    },
    IndexCreated {
        collection: String,
        field_path: String,
    },
}

/// `Idle`/`Open` state machine holding the undo entries of the open
/// transaction in chronological order.
#[derive(Debug, Default)]
pub(crate) struct TransactionLog {
    entries: Option<Vec<UndoEntry>>,
}

impl TransactionLog {
    pub(crate) fn state(&self) -> TransactionState {
        if self.entries.is_some() {
            TransactionState::Open
        } else {
            TransactionState::Idle
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.entries.is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.as_ref().map(Vec::len).unwrap_or(0)
    }

    pub(crate) fn begin(&mut self) -> Result<(), DocStoreError> {
        if self.entries.is_some() {
            return Err(DocStoreError::transaction_state(
                "a transaction is already open",
            ));
        }
        self.entries = Some(Vec::new());
        Ok(())
    }

    /// Closes the transaction and returns its entries, oldest first.
    pub(crate) fn finish(&mut self, operation: &str) -> Result<Vec<UndoEntry>, DocStoreError> {
        self.entries.take().ok_or_else(|| {
            DocStoreError::transaction_state(format!("{operation} called with no open transaction"))
        })
    }

    /// Appends an entry; a no-op while idle.
    pub(crate) fn record(&mut self, entry: UndoEntry) {
        if let Some(entries) = self.entries.as_mut() {
            entries.push(entry);
        }
    }
}
