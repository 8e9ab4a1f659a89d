use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedLogData {
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub silhouette: String,
    #[serde(default)]
    pub formality: String,
}

/// What the user wore on a given day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyLog {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub items_worn: Vec<String>,
    #[serde(default)]
    pub aspiration_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selfie_image_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_data: Option<ExtractedLogData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment_score: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct DailyLogInput {
    pub items_worn: Vec<String>,
    pub aspiration_id: Option<String>,
    pub selfie_image_id: Option<String>,
    pub extracted_data: Option<ExtractedLogData>,
    pub ai_analysis: Option<String>,
    pub alignment_score: Option<u32>,
}
