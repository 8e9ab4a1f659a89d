use std::sync::Arc;

use log::{info, warn};
use serde::Deserialize;

use crate::error::{AdvisorError, AdvisorResult};
use crate::llm::{prompts, try_parse_structured, LlmClient, Validate};
use crate::models::{Priority, Recommendation, RecommendationDraft, RecommendationKind};
use crate::recommendations::rules::fallback_recommendations;
use crate::stage::Stage;
use crate::store::{Store, StoreDocument};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelRecommendation {
    #[serde(rename = "type")]
    kind: String,
    item: String,
    #[serde(default)]
    reason: String,
    priority: String,
    #[serde(default)]
    suggested_brand: Option<String>,
    #[serde(default)]
    alignment_impact: Option<f64>,
}

impl Validate for ModelRecommendation {
    fn validate(&self) -> Result<(), String> {
        if RecommendationKind::parse(&self.kind).is_none() {
            return Err(format!("unknown recommendation type '{}'", self.kind));
        }
        if Priority::parse(&self.priority).is_none() {
            return Err(format!("unknown priority '{}'", self.priority));
        }
        if self.item.trim().is_empty() {
            return Err("recommendation item is empty".into());
        }
        if let Some(impact) = self.alignment_impact {
            if !(0.0..=100.0).contains(&impact) {
                return Err(format!("alignment impact {impact} is outside 0-100"));
            }
        }
        Ok(())
    }
}

impl ModelRecommendation {
    fn into_draft(self) -> Option<RecommendationDraft> {
        Some(RecommendationDraft {
            kind: RecommendationKind::parse(&self.kind)?,
            item: self.item.trim().to_string(),
            reason: self.reason,
            priority: Priority::parse(&self.priority)?,
            suggested_brand: self.suggested_brand.filter(|b| !b.trim().is_empty()),
            alignment_impact: self.alignment_impact.map(|impact| impact.round() as u32),
        })
    }
}

/// Gap analysis: asks the model first and falls back to the category rules.
pub struct RecommendationService {
    store: Arc<Store>,
    llm: Arc<dyn LlmClient>,
}

impl RecommendationService {
    pub fn new(store: Arc<Store>, llm: Arc<dyn LlmClient>) -> Self {
        Self { store, llm }
    }

    pub async fn recommendations(&self) -> Vec<Recommendation> {
        self.store.recommendations().await
    }

    pub async fn clear_recommendations(&self) -> AdvisorResult<()> {
        self.store.clear_recommendations().await
    }

    /// Replaces the stored recommendations, optionally focused on one aspiration.
    pub async fn generate_recommendations(
        &self,
        aspiration_id: Option<&str>,
    ) -> AdvisorResult<Vec<Recommendation>> {
        let doc = self.store.snapshot().await;
        Stage::require(&doc, Stage::SteadyState)?;
        if let Some(id) = aspiration_id {
            if doc.aspiration(id).is_none() {
                return Err(AdvisorError::not_found("aspiration", id));
            }
        }

        let drafts = match self.model_drafts(&doc, aspiration_id).await {
            Ok(drafts) if !drafts.is_empty() => drafts,
            Ok(_) => {
                warn!("Model returned no recommendations; using category rules");
                fallback_recommendations(&doc.wardrobe, &mut rand::thread_rng())
            }
            Err(err) => {
                warn!("Recommendation generation failed ({err}); using category rules");
                fallback_recommendations(&doc.wardrobe, &mut rand::thread_rng())
            }
        };

        info!("Storing {} recommendations", drafts.len());
        self.store
            .set_recommendations(drafts, aspiration_id.map(str::to_string))
            .await
    }

    async fn model_drafts(
        &self,
        doc: &StoreDocument,
        aspiration_id: Option<&str>,
    ) -> AdvisorResult<Vec<RecommendationDraft>> {
        let identity_name = doc
            .identity
            .archetype
            .as_ref()
            .map(|a| a.name.as_str())
            .ok_or_else(|| AdvisorError::Configuration("no identity defined".into()))?;
        let aspiration = aspiration_id.and_then(|id| doc.aspiration(id));

        let request =
            prompts::recommendations(identity_name, aspiration, &doc.alignment, &doc.wardrobe);
        let raw = self.llm.complete(request).await?;
        let parsed: Vec<ModelRecommendation> = try_parse_structured(&raw)?;
        Ok(parsed
            .into_iter()
            .filter_map(ModelRecommendation::into_draft)
            .collect())
    }
}
