use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{
    AlignmentState, Aspiration, CachedStyleInsights, DailyLog, Identity, ImageData, Outfit,
    Recommendation, User, WardrobeItem,
};

pub const DOCUMENT_VERSION: u32 = 1;

/// Top-level keys that `import_data` may replace.
pub const DOCUMENT_KEYS: [&str; 10] = [
    "user",
    "identity",
    "aspirations",
    "styleInsights",
    "images",
    "wardrobe",
    "dailyLogs",
    "alignment",
    "outfits",
    "recommendations",
];

fn current_version() -> u32 {
    DOCUMENT_VERSION
}

/// Everything the advisor persists, stored as one versioned value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoreDocument {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub identity: Identity,
    #[serde(default)]
    pub aspirations: Vec<Aspiration>,
    /// Keyed by aspiration id.
    #[serde(default)]
    pub style_insights: BTreeMap<String, CachedStyleInsights>,
    #[serde(default)]
    pub images: BTreeMap<String, ImageData>,
    #[serde(default)]
    pub wardrobe: Vec<WardrobeItem>,
    #[serde(default)]
    pub daily_logs: Vec<DailyLog>,
    #[serde(default)]
    pub alignment: AlignmentState,
    #[serde(default)]
    pub outfits: Vec<Outfit>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            user: None,
            identity: Identity::default(),
            aspirations: Vec::new(),
            style_insights: BTreeMap::new(),
            images: BTreeMap::new(),
            wardrobe: Vec::new(),
            daily_logs: Vec::new(),
            alignment: AlignmentState::default(),
            outfits: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

impl StoreDocument {
    pub fn aspiration(&self, id: &str) -> Option<&Aspiration> {
        self.aspirations.iter().find(|a| a.id == id)
    }

    pub fn item(&self, id: &str) -> Option<&WardrobeItem> {
        self.wardrobe.iter().find(|i| i.id == id)
    }

    pub fn item_mut(&mut self, id: &str) -> Option<&mut WardrobeItem> {
        self.wardrobe.iter_mut().find(|i| i.id == id)
    }
}
