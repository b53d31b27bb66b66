//! The fixed analytical battery
//!
//! Nine read-only queries over the annotation graph. Each returns an ordered
//! row sequence; where the battery's ordering leaves a tie, a deterministic
//! secondary key breaks it so repeated runs give identical output.

use super::types::{
    EntityTagCount, KindCount, LabelImageRow, LabelUsage, LandmarkImageRow, PageUsage,
    QueryReport, SharedPagePair,
};
use crate::graph::{props, EdgeKind, Node, NodeId, NodeKey, NodeKind};
use crate::storage::{GraphStore, StorageResult};
use std::collections::{HashMap, HashSet};

/// The label every bridge-centric query pivots on
pub const BRIDGE_LABEL_MID: &str = "/m/015kr";
pub const BRIDGE_LABEL_DESCRIPTION: &str = "bridge";

/// Landmarks excluded from the landmark listing: New York and New York City
pub const EXCLUDED_LANDMARK_MIDS: [&str; 2] = ["/m/059rby", "/m/02nd_"];

/// Row cap for the top-k rankings
pub const TOP_K: usize = 10;

/// Executes the analytical battery against a store handle.
pub struct QueryEngine<'a, S: GraphStore> {
    store: &'a S,
}

impl<'a, S: GraphStore> QueryEngine<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Q0: total Image node count
    pub fn image_count(&self) -> StorageResult<u64> {
        self.store.count_nodes(NodeKind::Image)
    }

    /// Q1: Images that were the subject of an ingested document
    pub fn document_count(&self) -> StorageResult<u64> {
        Ok(self
            .store
            .nodes_of(NodeKind::Image)?
            .iter()
            .filter(|node| node.bool_prop(props::IS_DOCUMENT) == Some(true))
            .count() as u64)
    }

    /// Q2: node counts per kind, one labeled row each
    pub fn kind_counts(&self) -> StorageResult<Vec<KindCount>> {
        let mut rows = Vec::with_capacity(6);
        for kind in [
            NodeKind::Image,
            NodeKind::Label,
            NodeKind::Page,
            NodeKind::Landmark,
            NodeKind::Location,
            NodeKind::WebEntity,
        ] {
            rows.push(KindCount { kind, count: self.store.count_nodes(kind)? });
        }
        Ok(rows)
    }

    /// Q3: all Contains associations into the given label, highest score
    /// first
    pub fn label_images(&self, mid: &str, description: &str) -> StorageResult<Vec<LabelImageRow>> {
        let Some(label_id) = self.resolve_label(mid, description)? else {
            return Ok(Vec::new());
        };
        let images = self.nodes_by_id(NodeKind::Image)?;

        let mut rows = Vec::new();
        for edge in self.store.edges_of(EdgeKind::Contains)? {
            if edge.target != label_id {
                continue;
            }
            let Some(image) = images.get(&edge.source) else { continue };
            let NodeKey::Image { url } = &image.key else { continue };
            rows.push(LabelImageRow {
                score: edge.float_prop(props::SCORE).unwrap_or(0.0),
                url: url.clone(),
                is_document: image.bool_prop(props::IS_DOCUMENT).unwrap_or(false),
            });
        }

        rows.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.url.cmp(&b.url)));
        Ok(rows)
    }

    /// Q4: web entities grouped over the images carrying the given label,
    /// most frequent first
    pub fn co_tagged_entities(
        &self,
        mid: &str,
        description: &str,
        limit: usize,
    ) -> StorageResult<Vec<EntityTagCount>> {
        let Some(label_id) = self.resolve_label(mid, description)? else {
            return Ok(Vec::new());
        };

        let labeled_images: HashSet<NodeId> = self
            .store
            .edges_of(EdgeKind::Contains)?
            .iter()
            .filter(|edge| edge.target == label_id)
            .map(|edge| edge.source)
            .collect();

        let mut counts: HashMap<NodeId, u64> = HashMap::new();
        for edge in self.store.edges_of(EdgeKind::ImageTaggedWebEntity)? {
            if labeled_images.contains(&edge.source) {
                *counts.entry(edge.target).or_insert(0) += 1;
            }
        }

        let entities = self.nodes_by_id(NodeKind::WebEntity)?;
        let mut rows = Vec::with_capacity(counts.len());
        for (entity_id, count) in counts {
            let Some(entity) = entities.get(&entity_id) else { continue };
            let NodeKey::WebEntity { entity_id } = &entity.key else { continue };
            rows.push(EntityTagCount {
                count,
                entity_id: entity_id.clone(),
                description: entity
                    .string_prop(props::DESCRIPTION)
                    .unwrap_or_default()
                    .to_string(),
            });
        }

        rows.sort_by(|a, b| {
            b.count.cmp(&a.count).then_with(|| a.entity_id.cmp(&b.entity_id))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    /// Q5: image-landmark associations outside the excluded mids,
    /// alphabetical by landmark then image url
    pub fn landmark_images(&self, excluded_mids: &[&str]) -> StorageResult<Vec<LandmarkImageRow>> {
        let landmarks = self.nodes_by_id(NodeKind::Landmark)?;
        let images = self.nodes_by_id(NodeKind::Image)?;

        let mut rows = Vec::new();
        for edge in self.store.edges_of(EdgeKind::ImageContainsLandmark)? {
            let Some(landmark) = landmarks.get(&edge.target) else { continue };
            let NodeKey::Landmark { mid, description } = &landmark.key else { continue };
            if excluded_mids.contains(&mid.as_str()) {
                continue;
            }
            let Some(image) = images.get(&edge.source) else { continue };
            let NodeKey::Image { url } = &image.key else { continue };
            rows.push(LandmarkImageRow { url: url.clone(), landmark: description.clone() });
        }

        rows.sort_by(|a, b| a.landmark.cmp(&b.landmark).then_with(|| a.url.cmp(&b.url)));
        Ok(rows)
    }

    /// Q6: labels ranked by how many images they were applied to
    pub fn top_labels(&self, limit: usize) -> StorageResult<Vec<LabelUsage>> {
        let mut counts: HashMap<NodeId, u64> = HashMap::new();
        for edge in self.store.edges_of(EdgeKind::Contains)? {
            *counts.entry(edge.target).or_insert(0) += 1;
        }

        let labels = self.nodes_by_id(NodeKind::Label)?;
        let mut rows = Vec::with_capacity(counts.len());
        for (label_id, count) in counts {
            let Some(label) = labels.get(&label_id) else { continue };
            let NodeKey::Label { mid } = &label.key else { continue };
            rows.push(LabelUsage {
                mid: mid.clone(),
                description: label
                    .string_prop(props::DESCRIPTION)
                    .unwrap_or_default()
                    .to_string(),
                count,
            });
        }

        rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.mid.cmp(&b.mid)));
        rows.truncate(limit);
        Ok(rows)
    }

    /// Q7: pages ranked by how many images link to them
    pub fn top_pages(&self, limit: usize) -> StorageResult<Vec<PageUsage>> {
        let mut counts: HashMap<NodeId, u64> = HashMap::new();
        for edge in self.store.edges_of(EdgeKind::ImageOnPage)? {
            *counts.entry(edge.target).or_insert(0) += 1;
        }

        let pages = self.nodes_by_id(NodeKind::Page)?;
        let mut rows = Vec::with_capacity(counts.len());
        for (page_id, count) in counts {
            let Some(page) = pages.get(&page_id) else { continue };
            let NodeKey::Page { url } = &page.key else { continue };
            rows.push(PageUsage { url: url.clone(), count });
        }

        rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.url.cmp(&b.url)));
        rows.truncate(limit);
        Ok(rows)
    }

    /// Q8: unordered pairs of document images sharing pages, counted by
    /// shared page and canonicalized so first < second; each pair appears
    /// exactly once
    pub fn shared_page_pairs(&self, limit: usize) -> StorageResult<Vec<SharedPagePair>> {
        let images = self.nodes_by_id(NodeKind::Image)?;

        // Document-image urls per page
        let mut by_page: HashMap<NodeId, Vec<&str>> = HashMap::new();
        for edge in self.store.edges_of(EdgeKind::ImageOnPage)? {
            let Some(image) = images.get(&edge.source) else { continue };
            if image.bool_prop(props::IS_DOCUMENT) != Some(true) {
                continue;
            }
            let NodeKey::Image { url } = &image.key else { continue };
            by_page.entry(edge.target).or_default().push(url);
        }

        let mut pairs: HashMap<(String, String), u64> = HashMap::new();
        for urls in by_page.values_mut() {
            urls.sort_unstable();
            for (i, first) in urls.iter().enumerate() {
                for second in &urls[i + 1..] {
                    let key = (first.to_string(), second.to_string());
                    *pairs.entry(key).or_insert(0) += 1;
                }
            }
        }

        let mut rows: Vec<SharedPagePair> = pairs
            .into_iter()
            .map(|((first, second), shared_pages)| SharedPagePair { shared_pages, first, second })
            .collect();
        rows.sort_by(|a, b| {
            b.shared_pages
                .cmp(&a.shared_pages)
                .then_with(|| a.first.cmp(&b.first))
                .then_with(|| a.second.cmp(&b.second))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    /// Run all nine queries with the battery's canonical parameters and
    /// render them for the reporting layer.
    pub fn run_battery(&self) -> StorageResult<Vec<QueryReport>> {
        let mut reports = Vec::with_capacity(9);

        reports.push(QueryReport {
            number: 0,
            title: "Query 0".into(),
            description: "Total number of images in the graph".into(),
            columns: vec!["count"],
            rows: vec![vec![self.image_count()?.to_string()]],
        });

        reports.push(QueryReport {
            number: 1,
            title: "Query 1".into(),
            description: "Number of ingested documents".into(),
            columns: vec!["count"],
            rows: vec![vec![self.document_count()?.to_string()]],
        });

        reports.push(QueryReport {
            number: 2,
            title: "Query 2".into(),
            description: "Node counts per kind".into(),
            columns: vec!["kind", "count"],
            rows: self
                .kind_counts()?
                .into_iter()
                .map(|row| vec![row.kind.plural().to_string(), row.count.to_string()])
                .collect(),
        });

        reports.push(QueryReport {
            number: 3,
            title: "Query 3".into(),
            description: "Images containing the bridge label, by score".into(),
            columns: vec!["score", "url", "is_document"],
            rows: self
                .label_images(BRIDGE_LABEL_MID, BRIDGE_LABEL_DESCRIPTION)?
                .into_iter()
                .map(|row| vec![row.score.to_string(), row.url, row.is_document.to_string()])
                .collect(),
        });

        reports.push(QueryReport {
            number: 4,
            title: "Query 4".into(),
            description: "Most frequent web entities on bridge-labeled images".into(),
            columns: vec!["count", "entity_id", "description"],
            rows: self
                .co_tagged_entities(BRIDGE_LABEL_MID, BRIDGE_LABEL_DESCRIPTION, TOP_K)?
                .into_iter()
                .map(|row| vec![row.count.to_string(), row.entity_id, row.description])
                .collect(),
        });

        reports.push(QueryReport {
            number: 5,
            title: "Query 5".into(),
            description: "Images with landmarks outside New York".into(),
            columns: vec!["url", "landmark"],
            rows: self
                .landmark_images(&EXCLUDED_LANDMARK_MIDS)?
                .into_iter()
                .map(|row| vec![row.url, row.landmark])
                .collect(),
        });

        reports.push(QueryReport {
            number: 6,
            title: "Query 6".into(),
            description: "Labels applied to the most images".into(),
            columns: vec!["mid", "description", "count"],
            rows: self
                .top_labels(TOP_K)?
                .into_iter()
                .map(|row| vec![row.mid, row.description, row.count.to_string()])
                .collect(),
        });

        reports.push(QueryReport {
            number: 7,
            title: "Query 7".into(),
            description: "Pages linked to the most images".into(),
            columns: vec!["url", "count"],
            rows: self
                .top_pages(TOP_K)?
                .into_iter()
                .map(|row| vec![row.url, row.count.to_string()])
                .collect(),
        });

        reports.push(QueryReport {
            number: 8,
            title: "Query 8".into(),
            description: "Image pairs appearing on the most pages together".into(),
            columns: vec!["shared_pages", "first", "second"],
            rows: self
                .shared_page_pairs(TOP_K)?
                .into_iter()
                .map(|row| vec![row.shared_pages.to_string(), row.first, row.second])
                .collect(),
        });

        Ok(reports)
    }

    /// The label node for (mid, description), if both match
    fn resolve_label(&self, mid: &str, description: &str) -> StorageResult<Option<NodeId>> {
        let Some(label_id) = self.store.resolve(&NodeKey::Label { mid: mid.to_string() })? else {
            return Ok(None);
        };
        let Some(label) = self.store.node(label_id)? else {
            return Ok(None);
        };
        if label.string_prop(props::DESCRIPTION) != Some(description) {
            return Ok(None);
        }
        Ok(Some(label_id))
    }

    fn nodes_by_id(&self, kind: NodeKind) -> StorageResult<HashMap<NodeId, Node>> {
        Ok(self
            .store
            .nodes_of(kind)?
            .into_iter()
            .map(|node| (node.id, node))
            .collect())
    }
}
