use std::sync::Arc;

use chrono::{Duration, Utc};
use log::{info, warn};

use crate::error::{AdvisorError, AdvisorResult};
use crate::llm::{prompts, try_parse_structured, LlmClient, Validate};
use crate::models::{Aspiration, StyleInsights};
use crate::settings::SettingsStore;
use crate::store::Store;

impl Validate for StyleInsights {
    fn validate(&self) -> Result<(), String> {
        let elements = &self.style_elements;
        let empty = elements.colors.is_empty()
            && elements.silhouettes.is_empty()
            && elements.fabrics.is_empty()
            && self.essential_pieces.is_empty()
            && self.dos.is_empty()
            && self.donts.is_empty();
        if empty {
            return Err("style insights are empty".into());
        }
        Ok(())
    }
}

/// Per-aspiration style guidance, cached and refreshed after it ages out.
pub struct InsightsService {
    store: Arc<Store>,
    llm: Arc<dyn LlmClient>,
    settings: Arc<SettingsStore>,
}

impl InsightsService {
    pub fn new(store: Arc<Store>, llm: Arc<dyn LlmClient>, settings: Arc<SettingsStore>) -> Self {
        Self {
            store,
            llm,
            settings,
        }
    }

    /// Cached insights while fresh; otherwise asks the model again. A failed
    /// refresh returns the stale copy when there is one.
    pub async fn style_insights(&self, aspiration_id: &str) -> AdvisorResult<StyleInsights> {
        let aspiration = self
            .store
            .aspiration(aspiration_id)
            .await
            .ok_or_else(|| AdvisorError::not_found("aspiration", aspiration_id))?;
        let days = self.settings.get().insights_max_age_days;
        let max_age = Duration::try_days(days).ok_or_else(|| {
            AdvisorError::Configuration(format!("insights max age of {days} days is out of range"))
        })?;
        let cached = self.store.style_insights(aspiration_id).await;

        if let Some(cached) = &cached {
            if !cached.is_stale(Utc::now(), max_age) {
                return Ok(cached.insights.clone());
            }
        }

        match self.fetch(&aspiration).await {
            Ok(insights) => {
                let cached = self
                    .store
                    .cache_style_insights(aspiration_id, insights)
                    .await?;
                info!("Cached style insights for {}", aspiration.name);
                Ok(cached.insights)
            }
            Err(err) => match cached {
                Some(stale) => {
                    warn!("Style insight refresh failed ({err}); serving cached copy");
                    Ok(stale.insights)
                }
                None => Err(err),
            },
        }
    }

    async fn fetch(&self, aspiration: &Aspiration) -> AdvisorResult<StyleInsights> {
        let raw = self
            .llm
            .complete(prompts::style_insights(aspiration))
            .await?;
        Ok(try_parse_structured(&raw)?)
    }
}
