use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Identifies one directed edge set: `source_collection --relation--> target_collection`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeSetKey {
    pub source_collection: String,
    pub relation: String,
    pub target_collection: String,
}

impl EdgeSetKey {
    pub fn new(source_collection: &str, relation: &str, target_collection: &str) -> Self {
        Self {
            source_collection: source_collection.to_string(),
            relation: relation.to_string(),
            target_collection: target_collection.to_string(),
        }
    }
}

/// An edge taken out of the graph while cascading a document delete,
/// with enough context to put it back where it was.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DetachedEdge {
    Source {
        key: EdgeSetKey,
        source_id: String,
        targets: Vec<String>,
    },
    Target {
        key: EdgeSetKey,
        source_id: String,
        target_id: String,
        position: usize,
    },
}

/// Directed, named, many-to-many edges between documents.
///
/// Target lists keep link order and hold no duplicates. A source entry whose
/// list becomes empty is dropped.
#[derive(Debug, Clone, Default)]
pub(crate) struct RelationshipGraph {
    edge_sets: AHashMap<EdgeSetKey, AHashMap<String, Vec<String>>>,
}

impl RelationshipGraph {
    /// Returns `true` when the edge was not present before.
    pub(crate) fn link(&mut self, key: &EdgeSetKey, source_id: &str, target_id: &str) -> bool {
        let targets = self
            .edge_sets
            .entry(key.clone())
            .or_default()
            .entry(source_id.to_string())
            .or_default();
        if targets.iter().any(|t| t == target_id) {
            return false;
        }
        targets.push(target_id.to_string());
        true
    }

    /// Removes one edge, returning the position it held.
    pub(crate) fn unlink(&mut self, key: &EdgeSetKey, source_id: &str, target_id: &str) -> Option<usize> {
        let set = self.edge_sets.get_mut(key)?;
        let targets = set.get_mut(source_id)?;
        let position = targets.iter().position(|t| t == target_id)?;
        targets.remove(position);
        if targets.is_empty() {
            set.remove(source_id);
        }
        Some(position)
    }

    /// Puts an edge back at `position` (clamped to the list length).
    pub(crate) fn relink_at(&mut self, key: &EdgeSetKey, source_id: &str, target_id: &str, position: usize) {
        let targets = self
            .edge_sets
            .entry(key.clone())
            .or_default()
            .entry(source_id.to_string())
            .or_default();
        let position = position.min(targets.len());
        targets.insert(position, target_id.to_string());
    }

    pub(crate) fn targets(&self, key: &EdgeSetKey, source_id: &str) -> &[String] {
        self.edge_sets
            .get(key)
            .and_then(|set| set.get(source_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Sources linking to `target_id` through `key`, unordered.
    pub(crate) fn sources_of(&self, key: &EdgeSetKey, target_id: &str) -> Vec<&str> {
        self.edge_sets
            .get(key)
            .map(|set| {
                set.iter()
                    .filter(|(_, targets)| targets.iter().any(|t| t == target_id))
                    .map(|(source, _)| source.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Removes every edge that names `id` in `collection`, as source or as
    /// target. Keys are snapshotted before anything is removed.
    pub(crate) fn detach(&mut self, collection: &str, id: &str) -> Vec<DetachedEdge> {
        let mut detached = Vec::new();

        let source_keys: Vec<EdgeSetKey> = self
            .edge_sets
            .keys()
            .filter(|key| key.source_collection == collection)
            .cloned()
            .collect();
        for key in source_keys {
            if let Some(set) = self.edge_sets.get_mut(&key) {
                if let Some(targets) = set.remove(id) {
                    detached.push(DetachedEdge::Source {
                        key,
                        source_id: id.to_string(),
                        targets,
                    });
                }
            }
        }

        let target_keys: Vec<EdgeSetKey> = self
            .edge_sets
            .keys()
            .filter(|key| key.target_collection == collection)
            .cloned()
            .collect();
        for key in target_keys {
            let sources: Vec<String> = match self.edge_sets.get(&key) {
                Some(set) => set.keys().cloned().collect(),
                None => continue,
            };
            for source_id in sources {
                if let Some(position) = self.unlink(&key, &source_id, id) {
                    detached.push(DetachedEdge::Target {
                        key: key.clone(),
                        source_id,
                        target_id: id.to_string(),
                        position,
                    });
                }
            }
        }
        detached
    }

    /// Undoes a `detach`, most recent removal first.
    pub(crate) fn reattach(&mut self, detached: Vec<DetachedEdge>) {
        for edge in detached.into_iter().rev() {
            match edge {
                DetachedEdge::Source {
                    key,
                    source_id,
                    targets,
                } => {
                    self.edge_sets
                        .entry(key)
                        .or_default()
                        .insert(source_id, targets);
                }
                DetachedEdge::Target {
                    key,
                    source_id,
                    target_id,
                    position,
                } => self.relink_at(&key, &source_id, &target_id, position),
            }
        }
    }

    /// Every stored edge as `(key, source, target)`, sorted.
    pub(crate) fn edges(&self) -> Vec<(&EdgeSetKey, &str, &str)> {
        let mut edges: Vec<(&EdgeSetKey, &str, &str)> = self
            .edge_sets
            .iter()
            .flat_map(|(key, set)| {
                set.iter().flat_map(move |(source, targets)| {
                    targets.iter().map(move |target| (key, source.as_str(), target.as_str()))
                })
            })
            .collect();
        edges.sort();
        edges
    }

    /// Non-empty edge sets with their source entries sorted by id and
    /// target lists in link order.
    pub(crate) fn export(&self) -> Vec<(EdgeSetKey, Vec<(String, Vec<String>)>)> {
        let mut sets: Vec<(EdgeSetKey, Vec<(String, Vec<String>)>)> = self
            .edge_sets
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .map(|(key, set)| {
                let mut entries: Vec<(String, Vec<String>)> = set
                    .iter()
                    .map(|(source, targets)| (source.clone(), targets.clone()))
                    .collect();
                entries.sort_by(|a, b| a.0.cmp(&b.0));
                (key.clone(), entries)
            })
            .collect();
        sets.sort_by(|a, b| a.0.cmp(&b.0));
        sets
    }

    pub(crate) fn edge_count(&self) -> usize {
        self.edge_sets
            .values()
            .flat_map(|set| set.values())
            .map(Vec::len)
            .sum()
    }

    pub(crate) fn clear(&mut self) {
        self.edge_sets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn follows() -> EdgeSetKey {
        EdgeSetKey::new("users", "follows", "users")
    }

    #[test]
    fn test_link_is_idempotent() {
        let mut graph = RelationshipGraph::default();
        assert!(graph.link(&follows(), "u1", "u2"));
        assert!(!graph.link(&follows(), "u1", "u2"));
        assert_eq!(graph.targets(&follows(), "u1"), ["u2".to_string()]);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_detach_removes_source_and_target_entries() {
        let mut graph = RelationshipGraph::default();
        graph.link(&follows(), "u1", "u2");
        graph.link(&follows(), "u1", "u3");
        graph.link(&follows(), "u2", "u1");
        graph.link(&follows(), "u3", "u2");
        let detached = graph.detach("users", "u2");
        assert_eq!(detached.len(), 3);
        assert!(graph.targets(&follows(), "u2").is_empty());
        assert_eq!(graph.targets(&follows(), "u1"), ["u3".to_string()]);
        assert!(graph.targets(&follows(), "u3").is_empty());
        assert!(graph.edges().iter().all(|(_, s, t)| *s != "u2" && *t != "u2"));
    }

    #[test]
    fn test_reattach_restores_positions() {
        let mut graph = RelationshipGraph::default();
        graph.link(&follows(), "u1", "u2");
        graph.link(&follows(), "u1", "u3");
        graph.link(&follows(), "u1", "u4");
        graph.link(&follows(), "u3", "u3");
        let before = graph.export();
        let detached = graph.detach("users", "u3");
        graph.reattach(detached);
        assert_eq!(graph.export(), before);
    }
}
