//! Wardrobe item models.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Top,
    Bottom,
    Shoes,
    Accessory,
    Outerwear,
    #[serde(other)]
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Top,
        Category::Bottom,
        Category::Shoes,
        Category::Accessory,
        Category::Outerwear,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Top => "top",
            Category::Bottom => "bottom",
            Category::Shoes => "shoes",
            Category::Accessory => "accessory",
            Category::Outerwear => "outerwear",
            Category::Other => "other",
        }
    }

    /// Lenient parse used for LLM output and legacy data ("tops", "Accessories", ...).
    pub fn parse_loose(value: &str) -> Category {
        match value.trim().to_ascii_lowercase().as_str() {
            "top" | "tops" => Category::Top,
            "bottom" | "bottoms" => Category::Bottom,
            "shoe" | "shoes" | "footwear" => Category::Shoes,
            "accessory" | "accessories" => Category::Accessory,
            "outerwear" | "jacket" | "coat" => Category::Outerwear,
            _ => Category::Other,
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Other
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of scoring one item against one aspiration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemAnalysis {
    pub match_score: f64,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<String>,
    #[serde(alias = "analyzedAt")]
    pub updated_at: DateTime<Utc>,
}

impl ItemAnalysis {
    /// Builds an analysis entry, clamping the score into `[0, 1]`.
    pub fn new(
        match_score: f64,
        reasoning: impl Into<String>,
        suggestions: Option<String>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let match_score = if match_score.is_finite() {
            match_score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            match_score,
            reasoning: reasoning.into(),
            suggestions,
            updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WardrobeItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub formality: String,
    #[serde(default)]
    pub season: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub last_worn: Option<DateTime<Utc>>,
    /// Keyed by aspiration id; at most one entry per aspiration.
    #[serde(default)]
    pub analysis_results: BTreeMap<String, ItemAnalysis>,
}

impl WardrobeItem {
    pub fn analysis_for(&self, aspiration_id: &str) -> Option<&ItemAnalysis> {
        self.analysis_results.get(aspiration_id)
    }

    /// Highest scoring aspiration for this item, if any analysis exists.
    pub fn best_match(&self) -> Option<(&str, f64)> {
        self.analysis_results
            .iter()
            .map(|(id, analysis)| (id.as_str(), analysis.match_score))
            .fold(None, |best, (id, score)| match best {
                Some((_, best_score)) if best_score >= score => best,
                _ => Some((id, score)),
            })
    }
}

/// User-supplied fields for a new wardrobe item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WardrobeItemInput {
    pub name: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub formality: String,
    #[serde(default)]
    pub season: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_id: Option<String>,
}

/// Qualitative bucket for a match score, as shown next to items.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchLevel {
    High,
    Medium,
    Low,
}

impl MatchLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.7 {
            MatchLevel::High
        } else if score >= 0.4 {
            MatchLevel::Medium
        } else {
            MatchLevel::Low
        }
    }
}
