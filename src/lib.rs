//! Retina: property-graph analytics for image annotation corpora
//!
//! Retina ingests per-image annotation documents (labels, landmarks,
//! web-entity tags, matching images, containing pages, geo-locations) into a
//! property graph, deduplicating entities by natural key, and answers a
//! fixed battery of analytical queries over that graph.
//!
//! # Core Concepts
//!
//! - **Merge**: create-if-absent, match-if-present upsert keyed by natural
//!   identity, with separate on-create and on-match property assignments
//! - **Batch**: one document's merges, applied as a single atomic unit
//! - **Battery**: nine read-only queries with fixed ordering and tie-breaks
//!
//! # Example
//!
//! ```
//! use retina::query::QueryEngine;
//! use retina::storage::MemoryStore;
//!
//! let store = MemoryStore::new();
//! let reports = QueryEngine::new(&store).run_battery().unwrap();
//! assert_eq!(reports.len(), 9);
//! ```

mod graph;
pub mod ingest;
pub mod query;
pub mod storage;

pub use graph::{
    props, Edge, EdgeId, EdgeKind, GeoPoint, Node, NodeId, NodeKey, NodeKind, Properties,
    PropertyValue,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
