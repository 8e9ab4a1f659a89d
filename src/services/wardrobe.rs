use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::alignment::percentage;
use crate::error::{AdvisorError, AdvisorResult};
use crate::llm::{parse_structured_response, prompts, try_parse_structured, LlmClient, Validate};
use crate::models::{Aspiration, Category, ImageData, ItemAnalysis, WardrobeItem, WardrobeItemInput};
use crate::settings::SettingsStore;
use crate::store::{check_image, Store};

// Per-item progress of batch analysis
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

const FALLBACK_SCORE: f64 = 50.0;
const FALLBACK_REASONING: &str = "Analysis unavailable";
const FALLBACK_SUGGESTIONS: &str = "Try again later";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelAnalysis {
    aspiration_name: String,
    match_score: f64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    suggestions: Option<String>,
}

impl Validate for ModelAnalysis {
    fn validate(&self) -> Result<(), String> {
        if self.aspiration_name.trim().is_empty() {
            return Err("aspirationName is empty".into());
        }
        if !(0.0..=100.0).contains(&self.match_score) {
            return Err(format!("matchScore {} is outside 0-100", self.match_score));
        }
        Ok(())
    }
}

fn fallback_analyses(aspirations: &[Aspiration]) -> Vec<ModelAnalysis> {
    aspirations
        .iter()
        .map(|aspiration| ModelAnalysis {
            aspiration_name: aspiration.name.clone(),
            match_score: FALLBACK_SCORE,
            reasoning: FALLBACK_REASONING.into(),
            suggestions: Some(FALLBACK_SUGGESTIONS.into()),
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct DetectedItem {
    name: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    color: String,
    #[serde(default)]
    style: String,
    #[serde(default)]
    formality: String,
    #[serde(default)]
    season: String,
}

impl Validate for DetectedItem {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("detected item has no name".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisProgress {
    pub current: usize,
    pub total: usize,
    pub percentage: u32,
    pub item_id: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
    pub item_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub analyzed: usize,
    pub failures: Vec<ItemFailure>,
}

/// Item detection and scoring of wardrobe items against the aspirations.
pub struct WardrobeService {
    store: Arc<Store>,
    llm: Arc<dyn LlmClient>,
    settings: Arc<SettingsStore>,
}

impl WardrobeService {
    pub fn new(store: Arc<Store>, llm: Arc<dyn LlmClient>, settings: Arc<SettingsStore>) -> Self {
        Self {
            store,
            llm,
            settings,
        }
    }

    /// Asks the vision model what an item is and stores it with its image.
    pub async fn detect_item(
        &self,
        description: Option<&str>,
        image: Option<ImageData>,
    ) -> AdvisorResult<WardrobeItem> {
        let description = description.map(str::trim).filter(|d| !d.is_empty());
        if description.is_none() && image.is_none() {
            return Err(AdvisorError::Validation(
                "provide a description or a photo of the item".into(),
            ));
        }
        if let Some(image) = &image {
            check_image(image)?;
        }

        let request = prompts::detect_item(description, image.as_ref());
        let raw = self.llm.complete(request).await?;
        let detected: DetectedItem = try_parse_structured(&raw)?;

        let image_id = match image {
            Some(image) => Some(self.store.add_image(image).await?),
            None => None,
        };
        self.store
            .add_item(WardrobeItemInput {
                name: detected.name,
                category: Category::parse_loose(&detected.category),
                color: detected.color,
                style: detected.style,
                formality: detected.formality,
                season: detected.season,
                brand: None,
                description: description.map(str::to_string),
                image_id,
            })
            .await
    }

    /// Scores one item against every aspiration in a single request.
    ///
    /// Model scores are 0-100 and stored as fractions. An unreadable answer
    /// records the neutral fallback for every aspiration; aspirations the
    /// model skipped keep their previous analysis.
    pub async fn analyze_item(&self, item_id: &str) -> AdvisorResult<WardrobeItem> {
        let doc = self.store.snapshot().await;
        let item = doc
            .item(item_id)
            .ok_or_else(|| AdvisorError::not_found("item", item_id))?;
        if doc.aspirations.is_empty() {
            return Err(AdvisorError::Configuration("no aspirations defined".into()));
        }

        let request = prompts::item_analysis(item, &doc.aspirations);
        let raw = self.llm.complete(request).await?;
        let analyses: Vec<ModelAnalysis> =
            parse_structured_response(&raw, || fallback_analyses(&doc.aspirations));

        let now = Utc::now();
        let mut results = BTreeMap::new();
        for analysis in analyses {
            let name = analysis.aspiration_name.trim();
            let Some(aspiration) = doc
                .aspirations
                .iter()
                .find(|a| a.name.trim().eq_ignore_ascii_case(name))
            else {
                log_warn!("Analysis named unknown aspiration '{}'", name);
                continue;
            };
            results.insert(
                aspiration.id.clone(),
                ItemAnalysis::new(
                    analysis.match_score / 100.0,
                    analysis.reasoning,
                    analysis.suggestions.filter(|s| !s.trim().is_empty()),
                    now,
                ),
            );
        }

        self.store.set_item_analyses(item_id, results).await
    }

    /// Analyzes every item one after another, pausing between requests.
    /// A failing item is recorded in the report and the batch moves on.
    pub async fn analyze_wardrobe<F>(&self, mut on_progress: F) -> AdvisorResult<BatchReport>
    where
        F: FnMut(AnalysisProgress),
    {
        if self.store.aspirations().await.is_empty() {
            return Err(AdvisorError::Configuration("no aspirations defined".into()));
        }
        let item_ids: Vec<String> = self
            .store
            .wardrobe()
            .await
            .into_iter()
            .map(|item| item.id)
            .collect();
        let total = item_ids.len();
        let delay = Duration::from_millis(self.settings.get().batch_delay_ms);
        let mut report = BatchReport::default();

        for (index, item_id) in item_ids.into_iter().enumerate() {
            match self.analyze_item(&item_id).await {
                Ok(_) => report.analyzed += 1,
                Err(err) => {
                    log_warn!("Analysis of item {} failed: {}", item_id, err);
                    report.failures.push(ItemFailure {
                        item_id: item_id.clone(),
                        message: err.user_message(),
                    });
                }
            }

            let current = index + 1;
            log_info!("Analyzed {}/{} ({})", current, total, item_id);
            on_progress(AnalysisProgress {
                current,
                total,
                percentage: percentage(current, total),
                item_id,
            });

            if current < total && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::models::AspirationInput;
    use crate::testing::{test_state, ScriptedLlm};
    use crate::AppState;

    async fn with_aspirations(llm: Arc<ScriptedLlm>) -> (AppState, Vec<String>) {
        let state = test_state(llm).await;
        let mut ids = Vec::new();
        for name in ["Minimalist", "Street Style"] {
            let aspiration = state
                .store
                .add_aspiration(AspirationInput {
                    name: name.into(),
                    ..AspirationInput::default()
                })
                .await
                .unwrap();
            ids.push(aspiration.id);
        }
        (state, ids)
    }

    async fn add_item(state: &AppState, name: &str) -> String {
        state
            .store
            .add_item(WardrobeItemInput {
                name: name.into(),
                category: Category::Top,
                ..WardrobeItemInput::default()
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn scores_are_stored_as_fractions_by_aspiration_name() {
        let llm = Arc::new(ScriptedLlm::with_texts(vec![
            r#"[{"aspirationName": "minimalist", "matchScore": 85, "reasoning": "clean", "suggestions": "tuck it"},
                {"aspirationName": "Street Style", "matchScore": 30, "reasoning": "too plain"},
                {"aspirationName": "Gothic", "matchScore": 90}]"#,
        ]));
        let (state, ids) = with_aspirations(llm).await;
        let item_id = add_item(&state, "White tee").await;

        let item = state.wardrobe.analyze_item(&item_id).await.unwrap();
        assert_eq!(item.analysis_results.len(), 2);
        assert_eq!(item.analysis_results[&ids[0]].match_score, 0.85);
        assert_eq!(
            item.analysis_results[&ids[0]].suggestions.as_deref(),
            Some("tuck it")
        );
        assert_eq!(item.analysis_results[&ids[1]].match_score, 0.3);
    }

    #[tokio::test]
    async fn unreadable_answer_records_the_neutral_fallback() {
        let llm = Arc::new(ScriptedLlm::with_texts(vec!["Sorry, I can't score that."]));
        let (state, ids) = with_aspirations(llm).await;
        let item_id = add_item(&state, "White tee").await;

        let item = state.wardrobe.analyze_item(&item_id).await.unwrap();
        for id in &ids {
            let analysis = &item.analysis_results[id];
            assert_eq!(analysis.match_score, 0.5);
            assert_eq!(analysis.reasoning, "Analysis unavailable");
            assert_eq!(analysis.suggestions.as_deref(), Some("Try again later"));
        }
    }

    #[tokio::test]
    async fn batch_continues_past_failures_and_reports_progress() {
        let llm = Arc::new(ScriptedLlm::with_responses(vec![
            Ok(r#"[{"aspirationName": "Minimalist", "matchScore": 70}]"#.into()),
            Err(LlmError::from_status(500, "boom")),
            Ok(r#"[{"aspirationName": "Minimalist", "matchScore": 20}]"#.into()),
        ]));
        let (state, _) = with_aspirations(llm.clone()).await;
        let mut ids = Vec::new();
        for name in ["Tee", "Jeans", "Boots"] {
            ids.push(add_item(&state, name).await);
        }

        let mut progress = Vec::new();
        let report = state
            .wardrobe
            .analyze_wardrobe(|p| progress.push(p))
            .await
            .unwrap();

        assert_eq!(report.analyzed, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].item_id, ids[1]);
        assert_eq!(llm.call_count().await, 3);
        let percentages: Vec<u32> = progress.iter().map(|p| p.percentage).collect();
        assert_eq!(percentages, vec![33, 67, 100]);
        assert_eq!(progress[2].item_id, ids[2]);
        assert!(state.store.item(&ids[1]).await.unwrap().analysis_results.is_empty());
    }

    #[tokio::test]
    async fn analysis_needs_aspirations_and_a_known_item() {
        let state = test_state(Arc::new(ScriptedLlm::new())).await;
        let item_id = add_item(&state, "Tee").await;
        assert!(matches!(
            state.wardrobe.analyze_item(&item_id).await,
            Err(AdvisorError::Configuration(_))
        ));
        assert!(matches!(
            state.wardrobe.analyze_wardrobe(|_| {}).await,
            Err(AdvisorError::Configuration(_))
        ));

        let (state, _) = with_aspirations(Arc::new(ScriptedLlm::new())).await;
        assert!(matches!(
            state.wardrobe.analyze_item("missing").await,
            Err(AdvisorError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn detected_item_is_stored_with_its_image() {
        let llm = Arc::new(ScriptedLlm::with_texts(vec![
            r#"{"name": "Camel wool coat", "category": "Outerwear", "color": "camel", "style": "classic", "formality": "formal", "season": "winter"}"#,
        ]));
        let state = test_state(llm.clone()).await;
        let image = ImageData {
            media_type: "image/jpeg".into(),
            data: "/9j/4AAQ".into(),
        };

        let item = state
            .wardrobe
            .detect_item(Some("my winter coat"), Some(image.clone()))
            .await
            .unwrap();
        assert_eq!(item.name, "Camel wool coat");
        assert_eq!(item.category, Category::Outerwear);
        assert_eq!(item.description.as_deref(), Some("my winter coat"));
        let stored = state.store.image(item.image_id.as_deref().unwrap()).await;
        assert_eq!(stored, Some(image));
        assert!(llm.calls().await[0].has_image());
    }

    #[tokio::test]
    async fn detection_needs_input() {
        let state = test_state(Arc::new(ScriptedLlm::new())).await;
        assert!(matches!(
            state.wardrobe.detect_item(Some("  "), None).await,
            Err(AdvisorError::Validation(_))
        ));
    }
}
