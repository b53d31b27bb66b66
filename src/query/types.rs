//! Query result row types

use crate::graph::NodeKind;
use serde::Serialize;

/// One labeled node count (Q2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KindCount {
    pub kind: NodeKind,
    pub count: u64,
}

/// One Contains association into a label (Q3)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelImageRow {
    pub score: f64,
    pub url: String,
    pub is_document: bool,
}

/// One web entity grouped over co-tagged images (Q4)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityTagCount {
    pub count: u64,
    pub entity_id: String,
    pub description: String,
}

/// One image-landmark association (Q5)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LandmarkImageRow {
    pub url: String,
    pub landmark: String,
}

/// One label ranked by how many images it was applied to (Q6)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelUsage {
    pub mid: String,
    pub description: String,
    pub count: u64,
}

/// One page ranked by how many images link to it (Q7)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageUsage {
    pub url: String,
    pub count: u64,
}

/// One canonicalized pair of document images sharing pages (Q8)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedPagePair {
    pub shared_pages: u64,
    pub first: String,
    pub second: String,
}

/// A rendered query result, ready for the reporting layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryReport {
    /// Position in the fixed battery (0..=8)
    pub number: usize,
    pub title: String,
    pub description: String,
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}
