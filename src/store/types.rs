use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;
use crate::schedule::SlotStatus;

/// A saved episode. Keyed by the slot id of the service it was made from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRecord {
    pub id: String,
    pub site_id: String,
    pub date: NaiveDate,
    pub time: String,
    pub ai_analysis: AnalysisResult,
    pub status: SlotStatus,
    pub saved_at: i64,
    pub saved_by: String,
    #[serde(default)]
    pub images: Vec<StoredImage>,
}

/// An uploaded artwork file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredImage {
    /// e.g. "episodes/campos85_20240512_1930/thumb_16_9.png"
    pub path: String,
    /// blake3 hex digest of the bytes.
    pub digest: String,
    pub size: usize,
}
