//! Storage trait definitions

use crate::graph::{Edge, EdgeId, EdgeKind, Node, NodeId, NodeKey, NodeKind, Properties};
use std::path::Path;
use thiserror::Error;

use super::batch::MergeBatch;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Batch rejected: {0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),

    #[error("Corrupted record: {0}")]
    Corrupted(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of a merge: the entity's identity plus whether it was created
/// by this call or matched an existing entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome<T> {
    pub id: T,
    pub created: bool,
}

/// Counters returned by a batch apply.
///
/// Re-applying an identical batch reports zero creations, which is how the
/// idempotence tests observe that a second ingestion was a no-op.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub nodes_created: usize,
    pub nodes_matched: usize,
    pub edges_created: usize,
    pub edges_matched: usize,
}

impl ApplyStats {
    /// True when the batch created nothing new
    pub fn created_nothing(&self) -> bool {
        self.nodes_created == 0 && self.edges_created == 0
    }

    pub(crate) fn node(&mut self, outcome: &MergeOutcome<NodeId>) {
        if outcome.created {
            self.nodes_created += 1;
        } else {
            self.nodes_matched += 1;
        }
    }

    pub(crate) fn edge(&mut self, outcome: &MergeOutcome<EdgeId>) {
        if outcome.created {
            self.edges_created += 1;
        } else {
            self.edges_matched += 1;
        }
    }
}

/// Trait for property-graph storage backends.
///
/// Merge semantics, which every implementation must uphold:
/// if no node/edge with the given key (or kind + endpoint pair) exists,
/// create it and apply the on-create property assignments; if one exists,
/// leave its identity unchanged and apply only the on-match assignments.
/// Performing the identical merge any number of times yields the same
/// resulting state as performing it once.
///
/// Implementations must be thread-safe (Send + Sync) and must serialize
/// merges with the same key so that two concurrent merges never produce
/// two nodes.
pub trait GraphStore: Send + Sync {
    // === Merge Operations ===

    /// Merge a node by natural key
    fn merge_node(
        &self,
        key: &NodeKey,
        on_create: &Properties,
        on_match: &Properties,
    ) -> StorageResult<MergeOutcome<NodeId>>;

    /// Merge an edge by (kind, source, target). Both endpoints must exist.
    fn merge_edge(
        &self,
        kind: EdgeKind,
        source: NodeId,
        target: NodeId,
        on_create: &Properties,
        on_match: &Properties,
    ) -> StorageResult<MergeOutcome<EdgeId>>;

    /// Apply a whole batch of merges as one atomic unit of work.
    ///
    /// The batch is validated first; a validation failure returns
    /// `StorageError::Rejected` and leaves no partial state behind.
    fn apply(&self, batch: &MergeBatch) -> StorageResult<ApplyStats>;

    // === Read Operations ===

    /// Look up a node's identity by natural key
    fn resolve(&self, key: &NodeKey) -> StorageResult<Option<NodeId>>;

    /// Load a node by ID
    fn node(&self, id: NodeId) -> StorageResult<Option<Node>>;

    /// Snapshot of all nodes of one kind
    fn nodes_of(&self, kind: NodeKind) -> StorageResult<Vec<Node>>;

    /// Snapshot of all edges of one kind
    fn edges_of(&self, kind: EdgeKind) -> StorageResult<Vec<Edge>>;

    /// Count nodes of one kind
    fn count_nodes(&self, kind: NodeKind) -> StorageResult<u64>;

    // === Bulk Delete ===

    /// Remove up to `limit` nodes plus all their incident edges, returning
    /// the number of nodes removed. A single call is bounded; callers that
    /// need a fully cleared graph must loop until this returns 0.
    fn delete_batch(&self, limit: usize) -> StorageResult<u64>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: GraphStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
