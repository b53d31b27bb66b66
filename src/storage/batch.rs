//! Merge batches: one document's writes as a single unit of work

use crate::graph::{EdgeKind, NodeKey, Properties, PropertyValue};
use std::collections::HashSet;

/// One merge operation within a batch.
///
/// Edge operations name their endpoints by natural key; in a well-formed
/// batch each endpoint is either merged earlier in the same batch or
/// already present in the store.
#[derive(Debug, Clone)]
pub enum MergeOp {
    Node {
        key: NodeKey,
        on_create: Properties,
        on_match: Properties,
    },
    Edge {
        kind: EdgeKind,
        source: NodeKey,
        target: NodeKey,
        on_create: Properties,
        on_match: Properties,
    },
}

/// An ordered sequence of merge operations applied atomically.
#[derive(Debug, Clone, Default)]
pub struct MergeBatch {
    ops: Vec<MergeOp>,
}

impl MergeBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[MergeOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Queue a node merge
    pub fn merge_node(&mut self, key: NodeKey, on_create: Properties, on_match: Properties) {
        self.ops.push(MergeOp::Node { key, on_create, on_match });
    }

    /// Queue an edge merge
    pub fn merge_edge(
        &mut self,
        kind: EdgeKind,
        source: NodeKey,
        target: NodeKey,
        on_create: Properties,
        on_match: Properties,
    ) {
        self.ops.push(MergeOp::Edge { kind, source, target, on_create, on_match });
    }

    /// Client-level validation, run by backends before any write.
    ///
    /// Rejects blank key identifiers and non-finite floats (in keys or
    /// property values). Returns the edge endpoint keys that are not merged
    /// earlier in this batch; the backend must confirm those already exist
    /// in the store before applying.
    pub fn validate(&self) -> Result<Vec<&NodeKey>, String> {
        let mut declared: HashSet<&NodeKey> = HashSet::new();
        let mut external: Vec<&NodeKey> = Vec::new();

        for op in &self.ops {
            match op {
                MergeOp::Node { key, on_create, on_match } => {
                    check_key(key)?;
                    check_props(on_create)?;
                    check_props(on_match)?;
                    declared.insert(key);
                }
                MergeOp::Edge { source, target, on_create, on_match, .. } => {
                    check_props(on_create)?;
                    check_props(on_match)?;
                    for endpoint in [source, target] {
                        if !declared.contains(endpoint) {
                            external.push(endpoint);
                        }
                    }
                }
            }
        }

        Ok(external)
    }
}

fn check_key(key: &NodeKey) -> Result<(), String> {
    for part in key.string_parts() {
        if part.trim().is_empty() {
            return Err(format!("blank identifier in {} key", key.kind()));
        }
    }
    if let NodeKey::Location(point) = key {
        if !point.latitude.is_finite() || !point.longitude.is_finite() {
            return Err("non-finite coordinate in Location key".to_string());
        }
    }
    Ok(())
}

fn check_props(properties: &Properties) -> Result<(), String> {
    for (name, value) in properties {
        if let PropertyValue::Float(f) = value {
            if !f.is_finite() {
                return Err(format!("non-finite value for property '{}'", name));
            }
        }
    }
    Ok(())
}
