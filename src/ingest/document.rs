//! Annotation document schema
//!
//! One JSON object per file: a subject image URL plus an annotation
//! `response`. Every sub-collection of the response is optional; absence
//! means zero iterations for the corresponding ingestion step. A missing
//! `url` is a malformed document and fails deserialization.

use serde::Deserialize;

/// One per-image annotation document
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationDocument {
    /// Subject image URL
    pub url: String,
    /// Annotation payload
    #[serde(default)]
    pub response: AnnotationResponse,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnotationResponse {
    pub label_annotations: Vec<LabelAnnotation>,
    pub landmark_annotations: Vec<LandmarkAnnotation>,
    pub web_detection: WebDetection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelAnnotation {
    pub mid: String,
    pub description: String,
    pub score: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LandmarkAnnotation {
    pub mid: String,
    /// Falls back to the mid when absent
    #[serde(default)]
    pub description: Option<String>,
    pub score: f64,
    #[serde(default)]
    pub locations: Vec<LocationEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationEntry {
    pub lat_lng: LatLng,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebDetection {
    pub full_matching_images: Vec<ImageRef>,
    pub partial_matching_images: Vec<ImageRef>,
    pub pages_with_matching_images: Vec<PageRef>,
    pub web_entities: Vec<WebEntityAnnotation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageRef {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageRef {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebEntityAnnotation {
    pub entity_id: String,
    pub description: String,
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_complete_document() {
        let doc: AnnotationDocument = serde_json::from_str(
            r#"{
                "url": "http://example.com/subject.jpg",
                "response": {
                    "labelAnnotations": [
                        {"mid": "/m/015kr", "description": "bridge", "score": 0.97}
                    ],
                    "landmarkAnnotations": [
                        {"mid": "/m/059rby", "score": 0.5,
                         "locations": [{"latLng": {"latitude": 40.7, "longitude": -74.0}}]}
                    ],
                    "webDetection": {
                        "fullMatchingImages": [{"url": "http://example.com/full.jpg"}],
                        "partialMatchingImages": [{"url": "http://example.com/partial.jpg"}],
                        "pagesWithMatchingImages": [{"url": "http://example.com/page.html"}],
                        "webEntities": [
                            {"entityId": "/g/abc", "description": "Bridge", "score": 1.2}
                        ]
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(doc.url, "http://example.com/subject.jpg");
        assert_eq!(doc.response.label_annotations.len(), 1);
        assert_eq!(doc.response.landmark_annotations[0].description, None);
        assert_eq!(doc.response.landmark_annotations[0].locations.len(), 1);
        assert_eq!(doc.response.web_detection.web_entities[0].entity_id, "/g/abc");
    }

    #[test]
    fn absent_collections_deserialize_empty() {
        let doc: AnnotationDocument =
            serde_json::from_str(r#"{"url": "http://example.com/a.jpg"}"#).unwrap();
        assert!(doc.response.label_annotations.is_empty());
        assert!(doc.response.landmark_annotations.is_empty());
        assert!(doc.response.web_detection.full_matching_images.is_empty());
        assert!(doc.response.web_detection.web_entities.is_empty());

        let doc: AnnotationDocument =
            serde_json::from_str(r#"{"url": "a", "response": {"webDetection": {}}}"#).unwrap();
        assert!(doc.response.web_detection.pages_with_matching_images.is_empty());
    }

    #[test]
    fn missing_url_is_malformed() {
        let result = serde_json::from_str::<AnnotationDocument>(r#"{"response": {}}"#);
        assert!(result.is_err());
    }
}
