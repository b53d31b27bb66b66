//! In-memory storage backend

use super::batch::{MergeBatch, MergeOp};
use super::traits::{ApplyStats, GraphStore, MergeOutcome, StorageError, StorageResult};
use crate::graph::{Edge, EdgeId, EdgeKind, Node, NodeId, NodeKey, NodeKind, Properties};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;

/// In-memory graph store backed by concurrent maps.
///
/// The natural-key index is the merge authority: compare-and-create goes
/// through its entry API, so two merges with the same key can never produce
/// two nodes. Lock order is always index map before entity map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    nodes: DashMap<NodeId, Node>,
    node_index: DashMap<NodeKey, NodeId>,
    edges: DashMap<EdgeId, Edge>,
    edge_index: DashMap<(EdgeKind, NodeId, NodeId), EdgeId>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Total node count across all kinds
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total edge count across all kinds
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

impl GraphStore for MemoryStore {
    fn merge_node(
        &self,
        key: &NodeKey,
        on_create: &Properties,
        on_match: &Properties,
    ) -> StorageResult<MergeOutcome<NodeId>> {
        match self.node_index.entry(key.clone()) {
            Entry::Occupied(entry) => {
                let id = *entry.get();
                drop(entry);
                if !on_match.is_empty() {
                    if let Some(mut node) = self.nodes.get_mut(&id) {
                        node.properties.extend(on_match.clone());
                    }
                }
                Ok(MergeOutcome { id, created: false })
            }
            Entry::Vacant(entry) => {
                let node = Node::new(key.clone(), on_create.clone());
                let id = node.id;
                self.nodes.insert(id, node);
                entry.insert(id);
                Ok(MergeOutcome { id, created: true })
            }
        }
    }

    fn merge_edge(
        &self,
        kind: EdgeKind,
        source: NodeId,
        target: NodeId,
        on_create: &Properties,
        on_match: &Properties,
    ) -> StorageResult<MergeOutcome<EdgeId>> {
        for endpoint in [source, target] {
            if !self.nodes.contains_key(&endpoint) {
                return Err(StorageError::NodeNotFound(endpoint.to_string()));
            }
        }

        match self.edge_index.entry((kind, source, target)) {
            Entry::Occupied(entry) => {
                let id = *entry.get();
                drop(entry);
                if !on_match.is_empty() {
                    if let Some(mut edge) = self.edges.get_mut(&id) {
                        edge.properties.extend(on_match.clone());
                    }
                }
                Ok(MergeOutcome { id, created: false })
            }
            Entry::Vacant(entry) => {
                let edge = Edge::new(kind, source, target, on_create.clone());
                let id = edge.id;
                self.edges.insert(id, edge);
                entry.insert(id);
                Ok(MergeOutcome { id, created: true })
            }
        }
    }

    fn apply(&self, batch: &MergeBatch) -> StorageResult<ApplyStats> {
        let external = batch.validate().map_err(StorageError::Rejected)?;
        for key in external {
            if self.resolve(key)?.is_none() {
                return Err(StorageError::Rejected(format!(
                    "edge endpoint not found: {:?}",
                    key
                )));
            }
        }

        let mut stats = ApplyStats::default();
        for op in batch.ops() {
            match op {
                MergeOp::Node { key, on_create, on_match } => {
                    let outcome = self.merge_node(key, on_create, on_match)?;
                    stats.node(&outcome);
                }
                MergeOp::Edge { kind, source, target, on_create, on_match } => {
                    let source_id = self
                        .resolve(source)?
                        .ok_or_else(|| StorageError::NodeNotFound(format!("{:?}", source)))?;
                    let target_id = self
                        .resolve(target)?
                        .ok_or_else(|| StorageError::NodeNotFound(format!("{:?}", target)))?;
                    let outcome =
                        self.merge_edge(*kind, source_id, target_id, on_create, on_match)?;
                    stats.edge(&outcome);
                }
            }
        }
        Ok(stats)
    }

    fn resolve(&self, key: &NodeKey) -> StorageResult<Option<NodeId>> {
        Ok(self.node_index.get(key).map(|entry| *entry.value()))
    }

    fn node(&self, id: NodeId) -> StorageResult<Option<Node>> {
        Ok(self.nodes.get(&id).map(|entry| entry.value().clone()))
    }

    fn nodes_of(&self, kind: NodeKind) -> StorageResult<Vec<Node>> {
        Ok(self
            .nodes
            .iter()
            .filter(|entry| entry.value().kind() == kind)
            .map(|entry| entry.value().clone())
            .collect())
    }

    fn edges_of(&self, kind: EdgeKind) -> StorageResult<Vec<Edge>> {
        Ok(self
            .edges
            .iter()
            .filter(|entry| entry.value().kind == kind)
            .map(|entry| entry.value().clone())
            .collect())
    }

    fn count_nodes(&self, kind: NodeKind) -> StorageResult<u64> {
        Ok(self
            .nodes
            .iter()
            .filter(|entry| entry.value().kind() == kind)
            .count() as u64)
    }

    fn delete_batch(&self, limit: usize) -> StorageResult<u64> {
        let ids: Vec<NodeId> = self
            .nodes
            .iter()
            .take(limit)
            .map(|entry| *entry.key())
            .collect();

        let mut removed: HashSet<NodeId> = HashSet::with_capacity(ids.len());
        for id in &ids {
            if let Some((_, node)) = self.nodes.remove(id) {
                self.node_index.remove(&node.key);
                removed.insert(*id);
            }
        }

        if !removed.is_empty() {
            let incident: Vec<EdgeId> = self
                .edges
                .iter()
                .filter(|entry| {
                    removed.contains(&entry.value().source)
                        || removed.contains(&entry.value().target)
                })
                .map(|entry| *entry.key())
                .collect();
            for edge_id in incident {
                if let Some((_, edge)) = self.edges.remove(&edge_id) {
                    self.edge_index.remove(&(edge.kind, edge.source, edge.target));
                }
            }
        }

        Ok(removed.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::props;
    use std::collections::HashMap;

    fn image(url: &str) -> NodeKey {
        NodeKey::Image { url: url.into() }
    }

    fn single(key: &str, value: impl Into<crate::graph::PropertyValue>) -> Properties {
        HashMap::from([(key.to_string(), value.into())])
    }

    #[test]
    fn merge_twice_yields_single_node() {
        let store = MemoryStore::new();
        let first = store
            .merge_node(&image("a"), &single(props::IS_DOCUMENT, true), &Properties::new())
            .unwrap();
        let second = store
            .merge_node(&image("a"), &single(props::IS_DOCUMENT, true), &Properties::new())
            .unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.id, second.id);
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn on_create_props_not_applied_on_match() {
        let store = MemoryStore::new();
        store
            .merge_node(&image("a"), &single(props::IS_DOCUMENT, false), &Properties::new())
            .unwrap();
        let outcome = store
            .merge_node(&image("a"), &single(props::IS_DOCUMENT, true), &Properties::new())
            .unwrap();

        let node = store.node(outcome.id).unwrap().unwrap();
        assert_eq!(node.bool_prop(props::IS_DOCUMENT), Some(false));
    }

    #[test]
    fn on_match_props_overwrite_existing() {
        let store = MemoryStore::new();
        store
            .merge_node(&image("a"), &single(props::IS_DOCUMENT, false), &Properties::new())
            .unwrap();
        let outcome = store
            .merge_node(
                &image("a"),
                &single(props::IS_DOCUMENT, false),
                &single(props::IS_DOCUMENT, true),
            )
            .unwrap();

        let node = store.node(outcome.id).unwrap().unwrap();
        assert_eq!(node.bool_prop(props::IS_DOCUMENT), Some(true));
    }

    #[test]
    fn edge_identity_is_kind_plus_endpoints() {
        let store = MemoryStore::new();
        let a = store.merge_node(&image("a"), &Properties::new(), &Properties::new()).unwrap().id;
        let b = store.merge_node(&image("b"), &Properties::new(), &Properties::new()).unwrap().id;

        let first = store
            .merge_edge(EdgeKind::Matches, a, b, &single(props::MATCH_TYPE, "full"), &Properties::new())
            .unwrap();
        let second = store
            .merge_edge(EdgeKind::Matches, a, b, &single(props::MATCH_TYPE, "full"), &Properties::new())
            .unwrap();
        // Reversed endpoints are a distinct edge
        let reversed = store
            .merge_edge(EdgeKind::Matches, b, a, &Properties::new(), &Properties::new())
            .unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.id, second.id);
        assert!(reversed.created);
        assert_eq!(store.edge_count(), 2);
    }

    #[test]
    fn edge_score_fixed_at_creation() {
        let store = MemoryStore::new();
        let a = store.merge_node(&image("a"), &Properties::new(), &Properties::new()).unwrap().id;
        let b = store
            .merge_node(&NodeKey::Label { mid: "/m/1".into() }, &Properties::new(), &Properties::new())
            .unwrap()
            .id;

        store
            .merge_edge(EdgeKind::Contains, a, b, &single(props::SCORE, 0.9), &Properties::new())
            .unwrap();
        let outcome = store
            .merge_edge(EdgeKind::Contains, a, b, &single(props::SCORE, 0.1), &Properties::new())
            .unwrap();

        let edges = store.edges_of(EdgeKind::Contains).unwrap();
        assert_eq!(edges.len(), 1);
        assert!(!outcome.created);
        assert_eq!(edges[0].float_prop(props::SCORE), Some(0.9));
    }

    #[test]
    fn merge_edge_requires_existing_endpoints() {
        let store = MemoryStore::new();
        let a = store.merge_node(&image("a"), &Properties::new(), &Properties::new()).unwrap().id;
        let result = store.merge_edge(
            EdgeKind::Matches,
            a,
            NodeId::new(),
            &Properties::new(),
            &Properties::new(),
        );
        assert!(matches!(result, Err(StorageError::NodeNotFound(_))));
    }

    #[test]
    fn rejected_batch_leaves_no_state() {
        let store = MemoryStore::new();
        let mut batch = MergeBatch::new();
        batch.merge_node(image("a"), Properties::new(), Properties::new());
        batch.merge_edge(
            EdgeKind::Matches,
            image("a"),
            image("never-merged"),
            Properties::new(),
            Properties::new(),
        );

        let result = store.apply(&batch);
        assert!(matches!(result, Err(StorageError::Rejected(_))));
        assert_eq!(store.node_count(), 0);
        assert_eq!(store.edge_count(), 0);
    }

    #[test]
    fn delete_batch_is_bounded_and_loops_to_empty() {
        let store = MemoryStore::new();
        for i in 0..25 {
            store
                .merge_node(&image(&format!("img-{}", i)), &Properties::new(), &Properties::new())
                .unwrap();
        }

        let first = store.delete_batch(10).unwrap();
        assert_eq!(first, 10);
        assert_eq!(store.node_count(), 15);

        let mut total = first;
        loop {
            let deleted = store.delete_batch(10).unwrap();
            if deleted == 0 {
                break;
            }
            total += deleted;
        }
        assert_eq!(total, 25);
        assert_eq!(store.node_count(), 0);
    }

    #[test]
    fn delete_batch_removes_incident_edges() {
        let store = MemoryStore::new();
        let a = store.merge_node(&image("a"), &Properties::new(), &Properties::new()).unwrap().id;
        let b = store.merge_node(&image("b"), &Properties::new(), &Properties::new()).unwrap().id;
        store
            .merge_edge(EdgeKind::Matches, a, b, &Properties::new(), &Properties::new())
            .unwrap();

        while store.delete_batch(1).unwrap() > 0 {}
        assert_eq!(store.node_count(), 0);
        assert_eq!(store.edge_count(), 0);
    }
}
