use std::fmt;

use serde::Serialize;

use crate::store::{DocumentStore, StoreState};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub total_documents: usize,
    pub total_edges: usize,
    pub dangling_edges: usize,
    pub stale_index_entries: usize,
}

impl IntegrityReport {
    pub fn merge(&mut self, other: &IntegrityReport) {
        self.total_documents = self.total_documents.max(other.total_documents);
        self.total_edges = self.total_edges.max(other.total_edges);
        self.dangling_edges += other.dangling_edges;
        self.stale_index_entries += other.stale_index_entries;
    }

    pub fn has_issues(&self) -> bool {
        self.dangling_edges > 0 || self.stale_index_entries > 0
    }
}

#[derive(Debug)]
pub struct IntegrityError {
    pub report: IntegrityReport,
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "integrity violations detected: {} dangling edges, {} stale index entries",
            self.report.dangling_edges, self.report.stale_index_entries
        )
    }
}

impl std::error::Error for IntegrityError {}

/// Counts edges whose source or target document does not exist.
///
/// Only stores built with `require_endpoints` disabled can hold such edges
/// legitimately; deletes always remove the edges of the deleted document.
pub fn validate_relationships(store: &DocumentStore) -> IntegrityReport {
    let state = store.read_state();
    let mut report = base_report(&state);
    report.dangling_edges = state
        .relationships
        .edges()
        .into_iter()
        .filter(|(key, source, target)| {
            !state.contains(&key.source_collection, source)
                || !state.contains(&key.target_collection, target)
        })
        .count();
    report
}

/// Counts index entries that disagree with the current documents.
pub fn validate_indexes(store: &DocumentStore) -> IntegrityReport {
    let state = store.read_state();
    let mut report = base_report(&state);
    report.stale_index_entries = state.indexes.stale_entries(&state.collections);
    report
}

pub fn run_integrity_checks(store: &DocumentStore) -> IntegrityReport {
    let mut report = IntegrityReport::default();
    report.merge(&validate_relationships(store));
    report.merge(&validate_indexes(store));
    report
}

pub fn run_strict_integrity_checks(store: &DocumentStore) -> Result<(), IntegrityError> {
    let report = run_integrity_checks(store);
    if report.has_issues() {
        Err(IntegrityError { report })
    } else {
        Ok(())
    }
}

fn base_report(state: &StoreState) -> IntegrityReport {
    IntegrityReport {
        total_documents: state.collections.values().map(|data| data.len()).sum(),
        total_edges: state.relationships.edge_count(),
        ..IntegrityReport::default()
    }
}
