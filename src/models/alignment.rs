//! Alignment scores and their bounded history.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_ALIGNMENT_HISTORY: usize = 30;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubScore {
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub insights: Vec<String>,
}

impl SubScore {
    pub fn new(score: u32, insights: Vec<String>) -> Self {
        Self {
            score: score.min(100),
            insights,
        }
    }
}

/// Alignment of the wardrobe and recent behavior with a single aspiration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AspirationAlignment {
    pub aspiration_id: String,
    pub wardrobe_score: u32,
    pub behavior_score: u32,
    pub overall: u32,
    #[serde(default)]
    pub matching_items: usize,
    #[serde(default)]
    pub total_items: usize,
    #[serde(default)]
    pub aligned_logs: usize,
    #[serde(default)]
    pub total_logs: usize,
}

/// One computed alignment: the overall triple plus the per-aspiration breakdown.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentSnapshot {
    pub overall: u32,
    pub identity: SubScore,
    pub wardrobe: SubScore,
    pub behavior: SubScore,
    #[serde(default)]
    pub aspirations: BTreeMap<String, AspirationAlignment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub overall: u32,
    pub identity: u32,
    pub wardrobe: u32,
    pub behavior: u32,
}

/// Latest alignment plus the history of past computations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentState {
    #[serde(default)]
    pub overall: u32,
    #[serde(default)]
    pub identity: SubScore,
    #[serde(default)]
    pub wardrobe: SubScore,
    #[serde(default)]
    pub behavior: SubScore,
    #[serde(default)]
    pub aspirations: BTreeMap<String, AspirationAlignment>,
    #[serde(default)]
    pub history: Vec<AlignmentHistoryEntry>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl AlignmentState {
    /// Replaces the current scores with `snapshot` and appends a history entry,
    /// evicting the oldest entries beyond [`MAX_ALIGNMENT_HISTORY`].
    pub fn record(&mut self, snapshot: AlignmentSnapshot, at: DateTime<Utc>) {
        self.history.push(AlignmentHistoryEntry {
            timestamp: at,
            overall: snapshot.overall,
            identity: snapshot.identity.score,
            wardrobe: snapshot.wardrobe.score,
            behavior: snapshot.behavior.score,
        });
        if self.history.len() > MAX_ALIGNMENT_HISTORY {
            let excess = self.history.len() - MAX_ALIGNMENT_HISTORY;
            self.history.drain(..excess);
        }

        self.overall = snapshot.overall;
        self.identity = snapshot.identity;
        self.wardrobe = snapshot.wardrobe;
        self.behavior = snapshot.behavior;
        self.aspirations = snapshot.aspirations;
        self.updated_at = Some(at);
    }

    pub fn forget_aspiration(&mut self, aspiration_id: &str) {
        self.aspirations.remove(aspiration_id);
    }
}
