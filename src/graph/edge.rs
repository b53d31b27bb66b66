//! Edge representation in the annotation graph

use super::node::{NodeId, Properties};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId(Uuid);

impl EdgeId {
    /// Create a new random EdgeId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an EdgeId from an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Relationship kind classification.
///
/// Image is the source of every kind except LocatedAtLocation, whose source
/// is a Landmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Image → Label, carries `score`
    Contains,
    /// Image → Image, carries `type` ("full" or "partial")
    Matches,
    /// Image → Page
    ImageOnPage,
    /// Image → WebEntity, carries `score`
    ImageTaggedWebEntity,
    /// Image → Landmark, carries `score`
    ImageContainsLandmark,
    /// Landmark → Location
    LocatedAtLocation,
}

impl EdgeKind {
    /// Stable string form, used as the `kind` column in persistent stores
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Matches => "matches",
            Self::ImageOnPage => "image_on_page",
            Self::ImageTaggedWebEntity => "image_tagged_web_entity",
            Self::ImageContainsLandmark => "image_contains_landmark",
            Self::LocatedAtLocation => "located_at_location",
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed edge.
///
/// Edge identity is the (kind, source, target) triple; merging the same
/// triple again matches the existing edge instead of creating a second one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier, assigned at creation and stable across merges
    pub id: EdgeId,
    /// Relationship kind
    pub kind: EdgeKind,
    /// Source node
    pub source: NodeId,
    /// Target node
    pub target: NodeId,
    /// Relationship properties
    pub properties: Properties,
    /// When the edge was created; untouched by later merges
    pub created_at: DateTime<Utc>,
}

impl Edge {
    /// Create a new edge with the given on-create properties
    pub fn new(kind: EdgeKind, source: NodeId, target: NodeId, properties: Properties) -> Self {
        Self {
            id: EdgeId::new(),
            kind,
            source,
            target,
            properties,
            created_at: Utc::now(),
        }
    }

    /// Read a string property
    pub fn string_prop(&self, key: &str) -> Option<&str> {
        match self.properties.get(key) {
            Some(super::node::PropertyValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Read a float property
    pub fn float_prop(&self, key: &str) -> Option<f64> {
        match self.properties.get(key) {
            Some(super::node::PropertyValue::Float(f)) => Some(*f),
            Some(super::node::PropertyValue::Int(i)) => Some(*i as f64),
            _ => None,
        }
    }
}
