//! Document-to-graph mapping

use super::document::AnnotationDocument;
use crate::graph::{props, EdgeKind, GeoPoint, NodeKey, Properties, PropertyValue};
use crate::storage::{ApplyStats, GraphStore, MergeBatch, StorageResult};
use std::collections::HashMap;

fn single(key: &str, value: impl Into<PropertyValue>) -> Properties {
    HashMap::from([(key.to_string(), value.into())])
}

/// Map one annotation document to its merge batch.
///
/// The subject image is merged first; every edge operation follows the
/// merges of both its endpoints, so the batch is self-contained.
pub fn plan_document(doc: &AnnotationDocument) -> MergeBatch {
    let mut batch = MergeBatch::new();
    let subject = NodeKey::Image { url: doc.url.clone() };

    // The subject is a document even if it already exists as a matching
    // image of an earlier document; once true the flag never reverts.
    batch.merge_node(
        subject.clone(),
        single(props::IS_DOCUMENT, true),
        single(props::IS_DOCUMENT, true),
    );

    for annotation in &doc.response.label_annotations {
        let label = NodeKey::Label { mid: annotation.mid.clone() };
        batch.merge_node(
            label.clone(),
            single(props::DESCRIPTION, annotation.description.clone()),
            Properties::new(),
        );
        batch.merge_edge(
            EdgeKind::Contains,
            subject.clone(),
            label,
            single(props::SCORE, annotation.score),
            Properties::new(),
        );
    }

    for matching in &doc.response.web_detection.full_matching_images {
        let image = NodeKey::Image { url: matching.url.clone() };
        batch.merge_node(image.clone(), single(props::IS_DOCUMENT, false), Properties::new());
        // Full matches reaffirm the type on every merge
        batch.merge_edge(
            EdgeKind::Matches,
            subject.clone(),
            image,
            single(props::MATCH_TYPE, props::MATCH_FULL),
            single(props::MATCH_TYPE, props::MATCH_FULL),
        );
    }

    for matching in &doc.response.web_detection.partial_matching_images {
        let image = NodeKey::Image { url: matching.url.clone() };
        batch.merge_node(image.clone(), single(props::IS_DOCUMENT, false), Properties::new());
        // Partial matches set the type only at creation, unlike full
        // matches above
        batch.merge_edge(
            EdgeKind::Matches,
            subject.clone(),
            image,
            single(props::MATCH_TYPE, props::MATCH_PARTIAL),
            Properties::new(),
        );
    }

    for page in &doc.response.web_detection.pages_with_matching_images {
        let page_key = NodeKey::Page { url: page.url.clone() };
        batch.merge_node(page_key.clone(), Properties::new(), Properties::new());
        batch.merge_edge(
            EdgeKind::ImageOnPage,
            subject.clone(),
            page_key,
            Properties::new(),
            Properties::new(),
        );
    }

    for entity in &doc.response.web_detection.web_entities {
        let key = NodeKey::WebEntity { entity_id: entity.entity_id.clone() };
        batch.merge_node(
            key.clone(),
            single(props::DESCRIPTION, entity.description.clone()),
            Properties::new(),
        );
        batch.merge_edge(
            EdgeKind::ImageTaggedWebEntity,
            subject.clone(),
            key,
            single(props::SCORE, entity.score),
            Properties::new(),
        );
    }

    for annotation in &doc.response.landmark_annotations {
        let description = annotation
            .description
            .clone()
            .unwrap_or_else(|| annotation.mid.clone());
        let landmark = NodeKey::Landmark { mid: annotation.mid.clone(), description };
        batch.merge_node(landmark.clone(), Properties::new(), Properties::new());
        batch.merge_edge(
            EdgeKind::ImageContainsLandmark,
            subject.clone(),
            landmark.clone(),
            single(props::SCORE, annotation.score),
            Properties::new(),
        );

        for location in &annotation.locations {
            let point = GeoPoint {
                latitude: location.lat_lng.latitude,
                longitude: location.lat_lng.longitude,
            };
            let key = NodeKey::Location(point);
            batch.merge_node(key.clone(), Properties::new(), Properties::new());
            batch.merge_edge(
                EdgeKind::LocatedAtLocation,
                landmark.clone(),
                key,
                Properties::new(),
                Properties::new(),
            );
        }
    }

    batch
}

/// Applies one document's merges as a single atomic unit of work against a
/// store handle.
pub struct Ingestor<'a, S: GraphStore> {
    store: &'a S,
}

impl<'a, S: GraphStore> Ingestor<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Ingest one document. `StorageError::Rejected` means the backend
    /// refused the whole batch and nothing was written.
    pub fn ingest(&self, doc: &AnnotationDocument) -> StorageResult<ApplyStats> {
        self.store.apply(&plan_document(doc))
    }
}
