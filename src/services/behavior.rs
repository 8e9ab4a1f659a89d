use std::sync::Arc;

use chrono::Utc;
use log::info;
use serde::Deserialize;

use crate::error::{AdvisorError, AdvisorResult};
use crate::llm::{prompts, try_parse_structured, LlmClient, Validate};
use crate::models::{DailyLog, DailyLogInput, ExtractedLogData, ImageData, WardrobeItem};
use crate::settings::SettingsStore;
use crate::store::{check_image, Store};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutfitReading {
    #[serde(default)]
    colors: Vec<String>,
    #[serde(default)]
    silhouette: String,
    #[serde(default)]
    formality: String,
    alignment_score: f64,
    #[serde(default)]
    insight: String,
}

impl Validate for OutfitReading {
    fn validate(&self) -> Result<(), String> {
        if !(0.0..=100.0).contains(&self.alignment_score) {
            return Err(format!(
                "alignmentScore {} is outside 0-100",
                self.alignment_score
            ));
        }
        Ok(())
    }
}

/// Daily outfit logging.
pub struct BehaviorService {
    store: Arc<Store>,
    llm: Arc<dyn LlmClient>,
    settings: Arc<SettingsStore>,
}

impl BehaviorService {
    pub fn new(store: Arc<Store>, llm: Arc<dyn LlmClient>, settings: Arc<SettingsStore>) -> Self {
        Self {
            store,
            llm,
            settings,
        }
    }

    pub async fn daily_logs(&self) -> Vec<DailyLog> {
        self.store.daily_logs().await
    }

    /// Logs inside the configured recent window.
    pub async fn recent_logs(&self) -> Vec<DailyLog> {
        let days = self.settings.get().recent_log_days;
        self.store.recent_logs(Utc::now(), days).await
    }

    /// Records today's outfit after the model has read it against the
    /// identity. A model or parse failure is returned and nothing is stored.
    pub async fn log_outfit(
        &self,
        items_worn: Vec<String>,
        aspiration_id: Option<String>,
        selfie: Option<ImageData>,
    ) -> AdvisorResult<DailyLog> {
        if items_worn.is_empty() {
            return Err(AdvisorError::Validation(
                "a daily log needs at least one worn item".into(),
            ));
        }
        if let Some(selfie) = &selfie {
            check_image(selfie)?;
        }

        let doc = self.store.snapshot().await;
        let archetype = doc
            .identity
            .archetype
            .as_ref()
            .ok_or_else(|| AdvisorError::Configuration("no identity defined".into()))?;
        if let Some(id) = &aspiration_id {
            if doc.aspiration(id).is_none() {
                return Err(AdvisorError::not_found("aspiration", id.as_str()));
            }
        }
        let worn: Vec<WardrobeItem> = items_worn
            .iter()
            .map(|id| {
                doc.item(id)
                    .cloned()
                    .ok_or_else(|| AdvisorError::Validation(format!("unknown item {id}")))
            })
            .collect::<AdvisorResult<_>>()?;

        let raw = self
            .llm
            .complete(prompts::daily_log(archetype, &worn))
            .await?;
        let reading: OutfitReading = try_parse_structured(&raw)?;

        let insight = reading.insight.trim().to_string();
        let input = DailyLogInput {
            items_worn,
            aspiration_id,
            selfie_image_id: None,
            extracted_data: Some(ExtractedLogData {
                colors: reading.colors,
                silhouette: reading.silhouette,
                formality: reading.formality,
            }),
            ai_analysis: (!insight.is_empty()).then_some(insight),
            alignment_score: Some(reading.alignment_score.round() as u32),
        };
        let log = match selfie {
            Some(selfie) => self.store.add_daily_log_with_selfie(input, selfie).await?,
            None => self.store.add_daily_log(input).await?,
        };
        info!(
            "Logged outfit {} ({} items, score {:?})",
            log.id,
            log.items_worn.len(),
            log.alignment_score
        );
        Ok(log)
    }
}
