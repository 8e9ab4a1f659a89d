use std::sync::Arc;

use std::collections::BTreeSet;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, AdvisorResult};
use crate::llm::{prompts, try_parse_structured, LlmClient, Validate};
use crate::models::{Aspiration, Category, Outfit, OutfitInput, WardrobeItem};
use crate::store::{Store, StoreDocument};

pub const MIN_OUTFIT_WARDROBE: usize = 3;
const DEFAULT_OCCASION: &str = "everyday";
const MAX_FALLBACK_ITEMS: usize = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelOutfit {
    name: String,
    items: Vec<String>,
    #[serde(default)]
    alignment_score: Option<f64>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    styling_tips: Option<String>,
}

impl Validate for ModelOutfit {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("outfit name is empty".into());
        }
        if self.items.is_empty() {
            return Err("outfit has no items".into());
        }
        if let Some(score) = self.alignment_score {
            if !(0.0..=100.0).contains(&score) {
                return Err(format!("alignmentScore {score} is outside 0-100"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInspirationMatch {
    matching_items: Vec<String>,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    missing_elements: Option<String>,
    #[serde(default)]
    styling_advice: Option<String>,
}

impl Validate for ModelInspirationMatch {
    fn validate(&self) -> Result<(), String> {
        if self.matching_items.is_empty() {
            return Err("no matching items".into());
        }
        Ok(())
    }
}

/// Wardrobe pieces that recreate a saved inspiration look. Not persisted.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InspirationMatch {
    pub item_ids: Vec<String>,
    pub reasoning: String,
    pub missing_elements: Option<String>,
    pub styling_advice: Option<String>,
}

fn words(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() >= 3)
        .map(str::to_lowercase)
        .collect()
}

/// Items sharing the most words with the description, best first; items
/// sharing none are left out.
fn fallback_inspiration_match(description: &str, wardrobe: &[WardrobeItem]) -> InspirationMatch {
    let wanted = words(description);
    let mut scored: Vec<(usize, &WardrobeItem)> = wardrobe
        .iter()
        .map(|item| {
            let mut have = words(&item.name);
            have.extend(words(&item.color));
            have.extend(words(&item.style));
            have.extend(words(item.category.as_str()));
            if let Some(text) = &item.description {
                have.extend(words(text));
            }
            (wanted.intersection(&have).count(), item)
        })
        .filter(|(overlap, _)| *overlap > 0)
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.truncate(MAX_FALLBACK_ITEMS);

    let reasoning = if scored.is_empty() {
        "Nothing in the wardrobe resembles this look yet".to_string()
    } else {
        "Picked by the words they share with the inspiration".to_string()
    };
    InspirationMatch {
        item_ids: scored.into_iter().map(|(_, item)| item.id.clone()).collect(),
        reasoning,
        missing_elements: None,
        styling_advice: None,
    }
}

/// Resolves model item names to wardrobe ids, ignoring case and unknown names.
fn resolve_item_names(names: &[String], wardrobe: &[WardrobeItem]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for name in names {
        let name = name.trim();
        if let Some(item) = wardrobe.iter().find(|i| i.name.trim().eq_ignore_ascii_case(name)) {
            if !ids.contains(&item.id) {
                ids.push(item.id.clone());
            }
        }
    }
    ids
}

fn score_for(item: &WardrobeItem, aspiration_id: &str) -> f64 {
    item.analysis_for(aspiration_id)
        .map_or(0.0, |analysis| analysis.match_score)
}

/// Best-scoring item of each category, in category order. Ties keep the
/// item added first.
fn fallback_outfit(aspiration: &Aspiration, wardrobe: &[WardrobeItem]) -> OutfitInput {
    let mut picked: Vec<&WardrobeItem> = Vec::new();
    for category in Category::ALL {
        let best = wardrobe
            .iter()
            .filter(|item| item.category == category)
            .fold(None::<&WardrobeItem>, |best, item| match best {
                Some(current) if score_for(current, &aspiration.id) >= score_for(item, &aspiration.id) => {
                    Some(current)
                }
                _ => Some(item),
            });
        if let Some(item) = best {
            picked.push(item);
        }
    }
    picked.truncate(MAX_FALLBACK_ITEMS);

    let score = if picked.is_empty() {
        0.0
    } else {
        picked.iter().map(|i| score_for(i, &aspiration.id)).sum::<f64>() / picked.len() as f64
    };
    OutfitInput {
        name: format!("{} Essentials", aspiration.name),
        items: picked.iter().map(|item| item.id.clone()).collect(),
        aspiration_id: Some(aspiration.id.clone()),
        occasion: None,
        reason: Some(format!(
            "Your strongest {} piece in each category",
            aspiration.name
        )),
        styling_tips: None,
        alignment_score: Some((score * 100.0).round() as u32),
    }
}

pub struct OutfitService {
    store: Arc<Store>,
    llm: Arc<dyn LlmClient>,
}

impl OutfitService {
    pub fn new(store: Arc<Store>, llm: Arc<dyn LlmClient>) -> Self {
        Self { store, llm }
    }

    pub async fn outfits(&self) -> Vec<Outfit> {
        self.store.outfits().await
    }

    pub async fn delete_outfit(&self, id: &str) -> AdvisorResult<bool> {
        self.store.delete_outfit(id).await
    }

    /// Builds and saves an outfit for an aspiration from existing items.
    pub async fn generate_outfit(
        &self,
        aspiration_id: &str,
        occasion: Option<&str>,
    ) -> AdvisorResult<Outfit> {
        let doc = self.store.snapshot().await;
        let aspiration = doc
            .aspiration(aspiration_id)
            .ok_or_else(|| AdvisorError::not_found("aspiration", aspiration_id))?;
        if doc.wardrobe.len() < MIN_OUTFIT_WARDROBE {
            return Err(AdvisorError::Validation(format!(
                "at least {MIN_OUTFIT_WARDROBE} wardrobe items are needed to build an outfit"
            )));
        }
        let occasion = occasion.map(str::trim).filter(|o| !o.is_empty());

        let mut input = match self.model_outfit(&doc, aspiration, occasion).await {
            Ok(input) => input,
            Err(err) => {
                warn!("Outfit generation failed ({err}); assembling from best matches");
                fallback_outfit(aspiration, &doc.wardrobe)
            }
        };
        input.occasion = occasion.map(str::to_string);
        self.store.add_outfit(input).await
    }

    /// Finds wardrobe items that recreate an inspiration described in words.
    /// Falls back to word overlap when the model answer is unusable.
    pub async fn match_inspiration(&self, description: &str) -> AdvisorResult<InspirationMatch> {
        let description = description.trim();
        if description.is_empty() {
            return Err(AdvisorError::Validation(
                "describe the inspiration to match".into(),
            ));
        }
        let wardrobe = self.store.wardrobe().await;
        if wardrobe.is_empty() {
            return Err(AdvisorError::Validation(
                "add wardrobe items before matching an inspiration".into(),
            ));
        }

        match self.model_inspiration_match(description, &wardrobe).await {
            Ok(found) => Ok(found),
            Err(err) => {
                warn!("Inspiration matching failed ({err}); matching on shared words");
                Ok(fallback_inspiration_match(description, &wardrobe))
            }
        }
    }

    async fn model_inspiration_match(
        &self,
        description: &str,
        wardrobe: &[WardrobeItem],
    ) -> AdvisorResult<InspirationMatch> {
        let raw = self
            .llm
            .complete(prompts::match_inspiration(description, wardrobe))
            .await?;
        let found: ModelInspirationMatch = try_parse_structured(&raw)?;

        let item_ids = resolve_item_names(&found.matching_items, wardrobe);
        if item_ids.is_empty() {
            return Err(AdvisorError::Parse(
                "inspiration match names no item from the wardrobe".into(),
            ));
        }
        Ok(InspirationMatch {
            item_ids,
            reasoning: found.reasoning.trim().to_string(),
            missing_elements: found.missing_elements.filter(|m| !m.trim().is_empty()),
            styling_advice: found.styling_advice.filter(|a| !a.trim().is_empty()),
        })
    }

    async fn model_outfit(
        &self,
        doc: &StoreDocument,
        aspiration: &Aspiration,
        occasion: Option<&str>,
    ) -> AdvisorResult<OutfitInput> {
        let request = prompts::generate_outfit(
            aspiration,
            doc.identity.archetype.as_ref(),
            &doc.wardrobe,
            occasion.unwrap_or(DEFAULT_OCCASION),
        );
        let raw = self.llm.complete(request).await?;
        let outfit: ModelOutfit = try_parse_structured(&raw)?;

        let items = resolve_item_names(&outfit.items, &doc.wardrobe);
        if items.is_empty() {
            return Err(AdvisorError::Parse(
                "outfit names no item from the wardrobe".into(),
            ));
        }
        Ok(OutfitInput {
            name: outfit.name.trim().to_string(),
            items,
            aspiration_id: Some(aspiration.id.clone()),
            occasion: None,
            reason: outfit.reason,
            styling_tips: outfit.styling_tips,
            alignment_score: outfit.alignment_score.map(|s| s.round() as u32),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::models::{AspirationInput, ItemAnalysis, WardrobeItemInput};
    use crate::testing::{test_state, ScriptedLlm};
    use crate::AppState;
    use chrono::Utc;

    async fn wardrobe(llm: Arc<ScriptedLlm>) -> (AppState, String, Vec<String>) {
        let state = test_state(llm).await;
        let aspiration = state
            .store
            .add_aspiration(AspirationInput {
                name: "Minimalist".into(),
                ..AspirationInput::default()
            })
            .await
            .unwrap();
        let mut ids = Vec::new();
        for (name, category, score) in [
            ("White Tee", Category::Top, 0.6),
            ("Black Knit", Category::Top, 0.9),
            ("Dark Jeans", Category::Bottom, 0.7),
            ("Loafers", Category::Shoes, 0.5),
        ] {
            let item = state
                .store
                .add_item(WardrobeItemInput {
                    name: name.into(),
                    category,
                    ..WardrobeItemInput::default()
                })
                .await
                .unwrap();
            state
                .store
                .set_item_analysis(
                    &item.id,
                    &aspiration.id,
                    ItemAnalysis::new(score, "", None, Utc::now()),
                )
                .await
                .unwrap();
            ids.push(item.id);
        }
        (state, aspiration.id, ids)
    }

    #[tokio::test]
    async fn maps_model_names_to_item_ids() {
        let llm = Arc::new(ScriptedLlm::with_texts(vec![
            r#"{"name": "Gallery Opening", "items": ["white tee", "DARK JEANS", "Loafers", "Silk Scarf"], "alignmentScore": 88, "reason": "clean", "stylingTips": "cuff the jeans"}"#,
        ]));
        let (state, aspiration_id, ids) = wardrobe(llm).await;

        let outfit = state
            .outfits
            .generate_outfit(&aspiration_id, Some("gallery"))
            .await
            .unwrap();
        assert_eq!(outfit.name, "Gallery Opening");
        assert_eq!(outfit.items, vec![ids[0].clone(), ids[2].clone(), ids[3].clone()]);
        assert_eq!(outfit.alignment_score, Some(88));
        assert_eq!(outfit.occasion.as_deref(), Some("gallery"));
        assert_eq!(state.outfits.outfits().await.len(), 1);
    }

    #[tokio::test]
    async fn failure_assembles_best_item_per_category() {
        let llm = Arc::new(ScriptedLlm::with_responses(vec![Err(LlmError::from_status(
            503, "down",
        ))]));
        let (state, aspiration_id, ids) = wardrobe(llm).await;

        let outfit = state
            .outfits
            .generate_outfit(&aspiration_id, None)
            .await
            .unwrap();
        assert_eq!(outfit.items, vec![ids[1].clone(), ids[2].clone(), ids[3].clone()]);
        assert_eq!(outfit.alignment_score, Some(70));
        assert_eq!(outfit.aspiration_id.as_deref(), Some(aspiration_id.as_str()));
    }

    #[tokio::test]
    async fn unknown_item_names_fall_back() {
        let llm = Arc::new(ScriptedLlm::with_texts(vec![
            r#"{"name": "Dream", "items": ["Cashmere coat"]}"#,
        ]));
        let (state, aspiration_id, ids) = wardrobe(llm).await;

        let outfit = state
            .outfits
            .generate_outfit(&aspiration_id, None)
            .await
            .unwrap();
        assert_eq!(outfit.items[0], ids[1]);
    }

    #[tokio::test]
    async fn needs_three_items() {
        let state = test_state(Arc::new(ScriptedLlm::new())).await;
        let aspiration = state
            .store
            .add_aspiration(AspirationInput {
                name: "Minimalist".into(),
                ..AspirationInput::default()
            })
            .await
            .unwrap();
        assert!(matches!(
            state.outfits.generate_outfit(&aspiration.id, None).await,
            Err(AdvisorError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn inspiration_names_map_to_items() {
        let llm = Arc::new(ScriptedLlm::with_texts(vec![
            r#"{"matchingItems": ["black knit", "Dark Jeans", "Trench"], "reasoning": "monochrome base",
                "missingElements": "a long coat", "stylingAdvice": ""}"#,
        ]));
        let (state, _, ids) = wardrobe(llm.clone()).await;

        let found = state
            .outfits
            .match_inspiration("  all-black street look  ")
            .await
            .unwrap();
        assert_eq!(found.item_ids, vec![ids[1].clone(), ids[2].clone()]);
        assert_eq!(found.reasoning, "monochrome base");
        assert_eq!(found.missing_elements.as_deref(), Some("a long coat"));
        assert_eq!(found.styling_advice, None);
        assert!(llm.calls().await[0].prompt_text().contains("\"all-black street look\""));
        assert!(state.outfits.outfits().await.is_empty());
    }

    #[tokio::test]
    async fn inspiration_falls_back_to_shared_words() {
        let llm = Arc::new(ScriptedLlm::with_texts(vec!["Sorry, no idea."]));
        let (state, _, ids) = wardrobe(llm).await;

        let found = state
            .outfits
            .match_inspiration("dark jeans with a black knit and white tee")
            .await
            .unwrap();
        assert_eq!(
            found.item_ids,
            vec![ids[0].clone(), ids[1].clone(), ids[2].clone()]
        );

        let nothing = fallback_inspiration_match("sequin gown", &state.store.wardrobe().await);
        assert!(nothing.item_ids.is_empty());
    }

    #[tokio::test]
    async fn inspiration_needs_a_description_and_a_wardrobe() {
        let llm = Arc::new(ScriptedLlm::new());
        let state = test_state(llm.clone()).await;
        assert!(matches!(
            state.outfits.match_inspiration("linen suit").await,
            Err(AdvisorError::Validation(_))
        ));
        assert!(matches!(
            state.outfits.match_inspiration("   ").await,
            Err(AdvisorError::Validation(_))
        ));
        assert_eq!(llm.call_count().await, 0);
    }

    #[tokio::test]
    async fn deleting_is_idempotent() {
        let (state, aspiration_id, _) = wardrobe(Arc::new(ScriptedLlm::new())).await;
        let outfit = state
            .outfits
            .generate_outfit(&aspiration_id, None)
            .await
            .unwrap();
        assert!(state.outfits.delete_outfit(&outfit.id).await.unwrap());
        assert!(!state.outfits.delete_outfit(&outfit.id).await.unwrap());
    }
}
