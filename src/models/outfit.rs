use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Outfit {
    pub id: String,
    pub name: String,
    /// Wardrobe item ids.
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub aspiration_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occasion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styling_tips: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment_score: Option<u32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutfitInput {
    pub name: String,
    pub items: Vec<String>,
    pub aspiration_id: Option<String>,
    pub occasion: Option<String>,
    pub reason: Option<String>,
    pub styling_tips: Option<String>,
    pub alignment_score: Option<u32>,
}
