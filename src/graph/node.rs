//! Node representation in the annotation graph

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Create a new random NodeId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a NodeId from an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Typed property values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// Properties collection
pub type Properties = HashMap<String, PropertyValue>;

/// Well-known property names used by the annotation schema
pub mod props {
    /// Set on Image nodes: true once the image was the subject of a document
    pub const IS_DOCUMENT: &str = "is_document";
    /// Set on Label and WebEntity nodes
    pub const DESCRIPTION: &str = "description";
    /// Set on Contains, ImageTaggedWebEntity, and ImageContainsLandmark edges
    pub const SCORE: &str = "score";
    /// Set on Matches edges: "full" or "partial"
    pub const MATCH_TYPE: &str = "type";

    pub const MATCH_FULL: &str = "full";
    pub const MATCH_PARTIAL: &str = "partial";
}

/// A latitude/longitude pair used as the natural key of a Location node.
///
/// Equality and hashing are bitwise so that the pair is usable as a merge
/// key. Non-finite coordinates are rejected at batch validation, before
/// they can reach a store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl PartialEq for GeoPoint {
    fn eq(&self, other: &Self) -> bool {
        self.latitude.to_bits() == other.latitude.to_bits()
            && self.longitude.to_bits() == other.longitude.to_bits()
    }
}

impl Eq for GeoPoint {}

impl std::hash::Hash for GeoPoint {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.latitude.to_bits().hash(state);
        self.longitude.to_bits().hash(state);
    }
}

/// Node kind classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Image,
    Label,
    Landmark,
    Location,
    Page,
    WebEntity,
}

impl NodeKind {
    /// Stable string form, used as the `kind` column in persistent stores
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Label => "Label",
            Self::Landmark => "Landmark",
            Self::Location => "Location",
            Self::Page => "Page",
            Self::WebEntity => "WebEntity",
        }
    }

    /// Plural display label, used by the per-kind count report
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Image => "Images",
            Self::Label => "Labels",
            Self::Landmark => "Landmarks",
            Self::Location => "Locations",
            Self::Page => "Pages",
            Self::WebEntity => "Web Entities",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Natural merge key of a node.
///
/// Two merges with the same key always address the same node, regardless of
/// order or which document introduced it. The Landmark key is composite: a
/// landmark annotation without a description keys on (mid, mid).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKey {
    Image { url: String },
    Label { mid: String },
    Landmark { mid: String, description: String },
    Location(GeoPoint),
    Page { url: String },
    WebEntity { entity_id: String },
}

impl NodeKey {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Image { .. } => NodeKind::Image,
            Self::Label { .. } => NodeKind::Label,
            Self::Landmark { .. } => NodeKind::Landmark,
            Self::Location(_) => NodeKind::Location,
            Self::Page { .. } => NodeKind::Page,
            Self::WebEntity { .. } => NodeKind::WebEntity,
        }
    }

    /// String components of the key, empty for Location keys.
    /// Used by batch validation to reject blank identifiers.
    pub fn string_parts(&self) -> Vec<&str> {
        match self {
            Self::Image { url } | Self::Page { url } => vec![url],
            Self::Label { mid } => vec![mid],
            Self::Landmark { mid, description } => vec![mid, description],
            Self::Location(_) => Vec::new(),
            Self::WebEntity { entity_id } => vec![entity_id],
        }
    }
}

/// A node in the annotation graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier, assigned at creation and stable across merges
    pub id: NodeId,
    /// Natural merge key
    pub key: NodeKey,
    /// Properties beyond the key
    pub properties: Properties,
    /// When the node was created; untouched by later merges
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Node {
    /// Create a new node with the given key and on-create properties
    pub fn new(key: NodeKey, properties: Properties) -> Self {
        Self {
            id: NodeId::new(),
            key,
            properties,
            created_at: chrono::Utc::now(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.key.kind()
    }

    /// Read a string property
    pub fn string_prop(&self, key: &str) -> Option<&str> {
        match self.properties.get(key) {
            Some(PropertyValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Read a boolean property
    pub fn bool_prop(&self, key: &str) -> Option<bool> {
        match self.properties.get(key) {
            Some(PropertyValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Read a float property
    pub fn float_prop(&self, key: &str) -> Option<f64> {
        match self.properties.get(key) {
            Some(PropertyValue::Float(f)) => Some(*f),
            Some(PropertyValue::Int(i)) => Some(*i as f64),
            _ => None,
        }
    }
}
