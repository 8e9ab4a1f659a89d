//! Aspirations, the identity archetype and cached style insights.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A target style identity that wardrobe items are scored against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Aspiration {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Aspiration {
    pub fn is_defined(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AspirationInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
}

/// Partial update; `None` fields are left as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AspirationUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub styles: Option<Vec<String>>,
    pub colors: Option<Vec<String>>,
}

/// LLM-derived identity profile built from keywords and inspiration images.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Archetype {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color_palette: Vec<String>,
    #[serde(default)]
    pub silhouettes: Vec<String>,
    #[serde(default)]
    pub archetypes: Vec<String>,
    #[serde(default)]
    pub style_statement: String,
    #[serde(default)]
    pub behavioral_cues: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(default)]
    pub inspiration_images: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub archetype: Option<Archetype>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StyleElements {
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub silhouettes: Vec<String>,
    #[serde(default)]
    pub fabrics: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StyleInsights {
    #[serde(default)]
    pub style_elements: StyleElements,
    #[serde(default)]
    pub essential_pieces: Vec<String>,
    #[serde(default)]
    pub dos: Vec<String>,
    #[serde(default)]
    pub donts: Vec<String>,
    #[serde(default)]
    pub transition_tips: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CachedStyleInsights {
    pub insights: StyleInsights,
    pub cached_at: DateTime<Utc>,
}

impl CachedStyleInsights {
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.cached_at > max_age
    }
}
