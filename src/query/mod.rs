//! The analytical query battery

mod battery;
mod types;

pub use battery::{
    QueryEngine, BRIDGE_LABEL_DESCRIPTION, BRIDGE_LABEL_MID, EXCLUDED_LANDMARK_MIDS, TOP_K,
};
pub use types::{
    EntityTagCount, KindCount, LabelImageRow, LabelUsage, LandmarkImageRow, PageUsage,
    QueryReport, SharedPagePair,
};
