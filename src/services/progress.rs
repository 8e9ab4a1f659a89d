use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::alignment::{logs_since, mean_percentage};
use crate::models::AlignmentHistoryEntry;
use crate::stage::Stage;
use crate::store::{Store, StoreDocument, StoreStats};

/// History entries the trend looks back over.
pub const TREND_WINDOW: usize = 7;
const WEEK_DAYS: i64 = 7;
const NO_BEHAVIOR_INSIGHT: &str = "Log your outfits this week to see how your habits line up.";

/// Change in overall alignment between the oldest and newest of the last
/// [`TREND_WINDOW`] entries; 0 with fewer than two.
pub fn alignment_trend(history: &[AlignmentHistoryEntry]) -> i64 {
    let window = &history[history.len().saturating_sub(TREND_WINDOW)..];
    match window {
        [first, .., last] => i64::from(last.overall) - i64::from(first.overall),
        _ => 0,
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
    /// Distinct calendar days (UTC) with at least one log.
    pub days_logged: usize,
    pub logs: usize,
    /// Mean of the logs' alignment scores, `None` when no log carries one.
    pub average_alignment: Option<u32>,
    pub top_insight: String,
    pub change: i64,
}

pub fn weekly_summary(doc: &StoreDocument, now: DateTime<Utc>) -> WeeklySummary {
    let recent = logs_since(&doc.daily_logs, now, WEEK_DAYS);
    let days_logged = recent
        .iter()
        .map(|log| log.timestamp.date_naive())
        .collect::<BTreeSet<_>>()
        .len();
    let scores: Vec<u32> = recent.iter().filter_map(|log| log.alignment_score).collect();

    WeeklySummary {
        days_logged,
        logs: recent.len(),
        average_alignment: (!scores.is_empty()).then(|| mean_percentage(&scores)),
        top_insight: doc
            .alignment
            .behavior
            .insights
            .first()
            .cloned()
            .unwrap_or_else(|| NO_BEHAVIOR_INSIGHT.to_string()),
        change: alignment_trend(&doc.alignment.history),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub stage: Stage,
    pub overall: u32,
    pub trend: i64,
    pub weekly: WeeklySummary,
    pub stats: StoreStats,
}

pub struct ProgressService {
    store: Arc<Store>,
}

impl ProgressService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub async fn trend(&self) -> i64 {
        alignment_trend(&self.store.alignment().await.history)
    }

    pub async fn weekly_summary(&self) -> WeeklySummary {
        weekly_summary(&self.store.snapshot().await, Utc::now())
    }

    pub async fn stats(&self) -> StoreStats {
        self.store.stats().await
    }

    pub async fn report(&self) -> ProgressReport {
        let doc = self.store.snapshot().await;
        ProgressReport {
            stage: Stage::of(&doc),
            overall: doc.alignment.overall,
            trend: alignment_trend(&doc.alignment.history),
            weekly: weekly_summary(&doc, Utc::now()),
            stats: self.store.stats().await,
        }
    }
}
