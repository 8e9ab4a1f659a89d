use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};
use serde::Deserialize;

use crate::alignment::config::AlignmentConfig;
use crate::alignment::scoring::{compute_alignment, logs_since, mean_percentage, weighted_overall};
use crate::error::{AdvisorError, AdvisorResult};
use crate::llm::{prompts, try_parse_structured, LlmClient, Validate};
use crate::models::{AlignmentSnapshot, AlignmentState, AspirationAlignment, DailyLog, SubScore};
use crate::settings::SettingsStore;
use crate::stage::Stage;
use crate::store::{Store, StoreDocument};

#[derive(Debug, Deserialize)]
struct ScoredInsights {
    score: f64,
    #[serde(default)]
    insights: Vec<String>,
}

impl ScoredInsights {
    fn into_sub_score(self) -> SubScore {
        SubScore::new(self.score.round() as u32, self.insights)
    }
}

/// The model's overall/identity/wardrobe/behavior answer.
#[derive(Debug, Deserialize)]
struct ModelAlignment {
    overall: f64,
    identity: ScoredInsights,
    wardrobe: ScoredInsights,
    behavior: ScoredInsights,
}

impl Validate for ModelAlignment {
    fn validate(&self) -> Result<(), String> {
        let scores = [
            ("overall", self.overall),
            ("identity", self.identity.score),
            ("wardrobe", self.wardrobe.score),
            ("behavior", self.behavior.score),
        ];
        for (name, score) in scores {
            if !(0.0..=100.0).contains(&score) {
                return Err(format!("{name} score {score} is outside 0-100"));
            }
        }
        Ok(())
    }
}

/// Recomputes alignment for every aspiration and records it in the history.
pub struct AlignmentEngine {
    store: Arc<Store>,
    llm: Arc<dyn LlmClient>,
    settings: Arc<SettingsStore>,
}

impl AlignmentEngine {
    pub fn new(store: Arc<Store>, llm: Arc<dyn LlmClient>, settings: Arc<SettingsStore>) -> Self {
        Self {
            store,
            llm,
            settings,
        }
    }

    fn config(&self) -> AlignmentConfig {
        self.settings.get().alignment_config()
    }

    /// Alignment of the current data with one aspiration, without recording it.
    pub async fn aspiration_alignment(
        &self,
        aspiration_id: &str,
    ) -> AdvisorResult<AspirationAlignment> {
        let doc = self.store.snapshot().await;
        let config = self.config();
        let aspiration = doc
            .aspiration(aspiration_id)
            .ok_or_else(|| AdvisorError::not_found("aspiration", aspiration_id))?;
        let recent = logs_since(&doc.daily_logs, Utc::now(), config.recent_log_days);
        compute_alignment(aspiration, &doc.wardrobe, &recent, &config)
    }

    pub async fn update_alignment(&self) -> AdvisorResult<AlignmentState> {
        let doc = self.store.snapshot().await;
        Stage::require(&doc, Stage::SteadyState)?;

        let config = self.config();
        let recent = logs_since(&doc.daily_logs, Utc::now(), config.recent_log_days);

        let mut per_aspiration = BTreeMap::new();
        for aspiration in &doc.aspirations {
            let alignment = compute_alignment(aspiration, &doc.wardrobe, &recent, &config)?;
            per_aspiration.insert(aspiration.id.clone(), alignment);
        }

        let snapshot = match self.model_alignment(&doc, &recent).await {
            Ok(model) => AlignmentSnapshot {
                overall: model.overall.round() as u32,
                identity: model.identity.into_sub_score(),
                wardrobe: model.wardrobe.into_sub_score(),
                behavior: model.behavior.into_sub_score(),
                aspirations: per_aspiration,
            },
            Err(err) => {
                warn!("Using computed alignment instead of model scores: {err}");
                fallback_snapshot(&doc, per_aspiration, &config)
            }
        };

        info!(
            "Alignment updated: overall {} (identity {}, wardrobe {}, behavior {})",
            snapshot.overall,
            snapshot.identity.score,
            snapshot.wardrobe.score,
            snapshot.behavior.score
        );
        self.store.record_alignment(snapshot).await
    }

    async fn model_alignment(
        &self,
        doc: &StoreDocument,
        recent: &[DailyLog],
    ) -> AdvisorResult<ModelAlignment> {
        let archetype = doc
            .identity
            .archetype
            .as_ref()
            .ok_or_else(|| AdvisorError::Configuration("no identity defined".into()))?;
        let request = prompts::calculate_alignment(archetype, &doc.wardrobe, recent);
        let raw = self.llm.complete(request).await?;
        Ok(try_parse_structured(&raw)?)
    }
}

fn name_of<'a>(doc: &'a StoreDocument, aspiration_id: &'a str) -> &'a str {
    doc.aspiration(aspiration_id)
        .map(|a| a.name.as_str())
        .unwrap_or(aspiration_id)
}

/// Identity is the best single aspiration, wardrobe and behavior are means
/// over all aspirations, and overall weights those two means.
fn fallback_snapshot(
    doc: &StoreDocument,
    per_aspiration: BTreeMap<String, AspirationAlignment>,
    config: &AlignmentConfig,
) -> AlignmentSnapshot {
    let wardrobe_scores: Vec<u32> = per_aspiration.values().map(|a| a.wardrobe_score).collect();
    let behavior_scores: Vec<u32> = per_aspiration.values().map(|a| a.behavior_score).collect();
    let wardrobe = mean_percentage(&wardrobe_scores);
    let behavior = mean_percentage(&behavior_scores);

    let best = per_aspiration.values().max_by_key(|a| a.overall);
    let identity_score = best.map_or(0, |a| a.overall);
    let identity_insights = best
        .map(|a| {
            vec![format!(
                "Closest aspiration: {} ({}%)",
                name_of(doc, &a.aspiration_id),
                a.overall
            )]
        })
        .unwrap_or_default();

    let wardrobe_insights = per_aspiration
        .values()
        .map(|a| {
            format!(
                "{} of {} items match {}",
                a.matching_items,
                a.total_items,
                name_of(doc, &a.aspiration_id)
            )
        })
        .collect();

    let behavior_insights = match per_aspiration.values().next() {
        Some(a) if a.total_logs == 0 => vec![format!(
            "No outfits logged in the last {} days",
            config.recent_log_days
        )],
        _ => per_aspiration
            .values()
            .map(|a| {
                format!(
                    "{} of {} recent outfits aligned with {}",
                    a.aligned_logs,
                    a.total_logs,
                    name_of(doc, &a.aspiration_id)
                )
            })
            .collect(),
    };

    AlignmentSnapshot {
        overall: weighted_overall(wardrobe, behavior, config),
        identity: SubScore::new(identity_score, identity_insights),
        wardrobe: SubScore::new(wardrobe, wardrobe_insights),
        behavior: SubScore::new(behavior, behavior_insights),
        aspirations: per_aspiration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::models::{
        Archetype, AspirationInput, Category, DailyLogInput, Identity, ItemAnalysis,
        WardrobeItemInput,
    };
    use crate::testing::{test_state, ScriptedLlm};
    use crate::AppState;

    async fn steady_state(llm: Arc<ScriptedLlm>) -> (AppState, String) {
        let state = test_state(llm).await;
        state.store.create_user("Sam").await.unwrap();
        state
            .store
            .save_identity(Identity {
                archetype: Some(Archetype {
                    name: "Quiet Minimalist".into(),
                    ..Archetype::default()
                }),
                ..Identity::default()
            })
            .await
            .unwrap();
        let aspiration = state
            .store
            .add_aspiration(AspirationInput {
                name: "Minimalist".into(),
                ..AspirationInput::default()
            })
            .await
            .unwrap();
        (state, aspiration.id)
    }

    #[tokio::test]
    async fn refuses_to_run_before_steady_state() {
        let state = test_state(Arc::new(ScriptedLlm::new())).await;
        let err = state.alignment.update_alignment().await.unwrap_err();
        assert!(matches!(err, AdvisorError::Stage { .. }));
        assert!(state.store.alignment().await.history.is_empty());
    }

    #[tokio::test]
    async fn falls_back_to_computed_scores_when_model_fails() {
        let llm = Arc::new(ScriptedLlm::with_responses(vec![Err(LlmError::from_status(
            503, "down",
        ))]));
        let (state, aspiration_id) = steady_state(llm).await;

        let mut ids = Vec::new();
        for (name, score) in [("Tee", 0.9), ("Jeans", 0.2)] {
            let item = state
                .store
                .add_item(WardrobeItemInput {
                    name: name.into(),
                    category: Category::Top,
                    ..WardrobeItemInput::default()
                })
                .await
                .unwrap();
            state
                .store
                .set_item_analysis(
                    &item.id,
                    &aspiration_id,
                    ItemAnalysis::new(score, "", None, Utc::now()),
                )
                .await
                .unwrap();
            ids.push(item.id);
        }
        state
            .store
            .add_daily_log(DailyLogInput {
                items_worn: vec![ids[0].clone()],
                aspiration_id: Some(aspiration_id.clone()),
                ..DailyLogInput::default()
            })
            .await
            .unwrap();

        let result = state.alignment.update_alignment().await.unwrap();
        let per = &result.aspirations[&aspiration_id];
        assert_eq!(per.wardrobe_score, 50);
        assert_eq!(per.behavior_score, 100);
        assert_eq!(per.overall, 70);
        assert_eq!(result.identity.score, 70);
        assert_eq!(result.identity.insights[0], "Closest aspiration: Minimalist (70%)");
        assert_eq!(result.wardrobe.score, 50);
        assert_eq!(result.behavior.score, 100);
        assert_eq!(result.overall, 70);
        assert_eq!(result.history.len(), 1);
    }

    #[tokio::test]
    async fn single_aspiration_alignment_is_not_recorded() {
        let llm = Arc::new(ScriptedLlm::new());
        let (state, aspiration_id) = steady_state(llm.clone()).await;

        let mut first = None;
        for (name, score) in [("Tee", 0.9), ("Shirt", 0.6), ("Hoodie", 0.1)] {
            let item = state
                .store
                .add_item(WardrobeItemInput {
                    name: name.into(),
                    category: Category::Top,
                    ..WardrobeItemInput::default()
                })
                .await
                .unwrap();
            state
                .store
                .set_item_analysis(
                    &item.id,
                    &aspiration_id,
                    ItemAnalysis::new(score, "", None, Utc::now()),
                )
                .await
                .unwrap();
            first.get_or_insert(item.id);
        }
        state
            .store
            .add_daily_log(DailyLogInput {
                items_worn: first.into_iter().collect(),
                aspiration_id: Some(aspiration_id.clone()),
                ..DailyLogInput::default()
            })
            .await
            .unwrap();

        let alignment = state
            .alignment
            .aspiration_alignment(&aspiration_id)
            .await
            .unwrap();
        assert_eq!(alignment.matching_items, 2);
        assert_eq!(alignment.total_items, 3);
        assert_eq!(alignment.wardrobe_score, 67);
        assert_eq!(alignment.behavior_score, 100);
        assert_eq!(alignment.overall, 80);

        assert!(state.store.alignment().await.history.is_empty());
        assert_eq!(llm.call_count().await, 0);
        assert!(matches!(
            state.alignment.aspiration_alignment("missing").await,
            Err(AdvisorError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn uses_model_scores_when_valid() {
        let llm = Arc::new(ScriptedLlm::with_texts(vec![
            r#"```json
{"overall": 67, "identity": {"score": 75, "insights": ["clear"]}, "wardrobe": {"score": 80, "insights": []}, "behavior": {"score": 45, "insights": []}}
```"#,
        ]));
        let (state, aspiration_id) = steady_state(llm.clone()).await;

        let result = state.alignment.update_alignment().await.unwrap();
        assert_eq!(result.overall, 67);
        assert_eq!(result.identity.insights, vec!["clear"]);
        assert!(result.aspirations.contains_key(&aspiration_id));
        assert_eq!(llm.call_count().await, 1);
    }

    #[tokio::test]
    async fn out_of_range_model_scores_are_rejected() {
        let llm = Arc::new(ScriptedLlm::with_texts(vec![
            r#"{"overall": 140, "identity": {"score": 75}, "wardrobe": {"score": 80}, "behavior": {"score": 45}}"#,
        ]));
        let (state, _) = steady_state(llm).await;

        let result = state.alignment.update_alignment().await.unwrap();
        assert_eq!(result.overall, 0);
        assert!(result.overall <= 100);
    }
}
