//! Document ingestion: schema, per-document merge planning, directory loading

mod document;
mod ingestor;
mod loader;

pub use document::{
    AnnotationDocument, AnnotationResponse, ImageRef, LabelAnnotation, LandmarkAnnotation,
    LatLng, LocationEntry, PageRef, WebDetection, WebEntityAnnotation,
};
pub use ingestor::{plan_document, Ingestor};
pub use loader::{clear_store, load_directory, LoadError, LoadOptions, LoadSummary};
