//! Graph data model: nodes keyed by natural identity, directed typed edges

mod edge;
mod node;

pub use edge::{Edge, EdgeId, EdgeKind};
pub use node::{props, GeoPoint, Node, NodeId, NodeKey, NodeKind, Properties, PropertyValue};
