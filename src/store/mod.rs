//! The persisted advisor data and every read-modify-write on it.
//!
//! A mutation clones the snapshot, applies the change, flushes the clone to the
//! backend and only then swaps it in, so a failed write leaves the in-memory
//! state exactly as it was.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

mod backend;
mod document;
mod migrate;

pub use backend::{DataStore, MemoryStore};
pub use document::{StoreDocument, DOCUMENT_KEYS, DOCUMENT_VERSION};
pub use migrate::{migrate_document, normalize};

use crate::alignment::window_start;
use crate::error::{AdvisorError, AdvisorResult};
use crate::models::{
    AlignmentSnapshot, AlignmentState, Aspiration, AspirationInput, AspirationUpdate,
    CachedStyleInsights, Category, DailyLog, DailyLogInput, Identity, ImageData, ItemAnalysis,
    Outfit, OutfitInput, Recommendation, RecommendationDraft, StyleInsights, User, WardrobeItem,
    WardrobeItemInput,
};

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn require_text(value: &str, field: &str) -> AdvisorResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AdvisorError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Rejects payloads that are not a non-empty `image/*` body.
pub fn check_image(image: &ImageData) -> AdvisorResult<()> {
    if !image.media_type.starts_with("image/") || image.data.is_empty() {
        return Err(AdvisorError::Validation(format!(
            "unsupported image payload ({})",
            image.media_type
        )));
    }
    Ok(())
}

fn insert_image(doc: &mut StoreDocument, image: ImageData) -> String {
    let id = new_id();
    doc.images.insert(id.clone(), image);
    id
}

fn apply_identity(doc: &mut StoreDocument, identity: Identity) -> AdvisorResult<Identity> {
    for image_id in &identity.inspiration_images {
        require_image(doc, Some(image_id))?;
    }
    doc.identity = identity.clone();
    Ok(identity)
}

fn check_log_input(input: &DailyLogInput) -> AdvisorResult<()> {
    if input.items_worn.is_empty() {
        return Err(AdvisorError::Validation(
            "a daily log needs at least one worn item".into(),
        ));
    }
    if input.alignment_score.map_or(false, |score| score > 100) {
        return Err(AdvisorError::Validation(
            "alignment score must be between 0 and 100".into(),
        ));
    }
    Ok(())
}

fn push_daily_log(
    doc: &mut StoreDocument,
    input: DailyLogInput,
    timestamp: DateTime<Utc>,
) -> AdvisorResult<DailyLog> {
    if let Some(missing) = input.items_worn.iter().find(|id| doc.item(id).is_none()) {
        return Err(AdvisorError::Validation(format!("unknown item {missing}")));
    }
    if let Some(aspiration_id) = &input.aspiration_id {
        if doc.aspiration(aspiration_id).is_none() {
            return Err(AdvisorError::not_found("aspiration", aspiration_id.as_str()));
        }
    }
    require_image(doc, input.selfie_image_id.as_ref())?;

    for item in doc.wardrobe.iter_mut() {
        if input.items_worn.contains(&item.id) {
            item.last_worn = Some(item.last_worn.map_or(timestamp, |t| t.max(timestamp)));
        }
    }

    let log = DailyLog {
        id: new_id(),
        timestamp,
        items_worn: input.items_worn,
        aspiration_id: input.aspiration_id,
        selfie_image_id: input.selfie_image_id,
        extracted_data: input.extracted_data,
        ai_analysis: input.ai_analysis,
        alignment_score: input.alignment_score,
    };
    doc.daily_logs.push(log.clone());
    Ok(log)
}

fn require_image(doc: &StoreDocument, image_id: Option<&String>) -> AdvisorResult<()> {
    match image_id {
        Some(id) if !doc.images.contains_key(id) => {
            Err(AdvisorError::Validation(format!("unknown image {id}")))
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_items: usize,
    pub items_by_category: BTreeMap<Category, usize>,
    /// Items with at least one analysis entry.
    pub analyzed_items: usize,
    /// Mean over every analysis entry, `None` when nothing is analyzed.
    pub average_match_score: Option<f64>,
    pub aspirations: usize,
    pub daily_logs: usize,
    pub outfits: usize,
    pub images: usize,
}

pub struct Store {
    backend: Arc<dyn DataStore>,
    document: Mutex<StoreDocument>,
}

impl Store {
    /// Loads the stored document, upgrading older layouts once.
    pub async fn open(backend: Arc<dyn DataStore>) -> anyhow::Result<Self> {
        let document = match backend.load().await? {
            Some(value) => {
                let stored_version = value.get("version").and_then(Value::as_u64);
                let document = migrate_document(value)?;
                if stored_version != Some(u64::from(DOCUMENT_VERSION)) {
                    backend
                        .save(&document)
                        .await
                        .context("failed to store upgraded document")?;
                    info!("Upgraded stored data to version {DOCUMENT_VERSION}");
                }
                document
            }
            None => StoreDocument::default(),
        };

        Ok(Self {
            backend,
            document: Mutex::new(document),
        })
    }

    pub async fn snapshot(&self) -> StoreDocument {
        self.document.lock().await.clone()
    }

    async fn read<T>(&self, view: impl FnOnce(&StoreDocument) -> T) -> T {
        let guard = self.document.lock().await;
        view(&guard)
    }

    async fn mutate<T, F>(&self, apply: F) -> AdvisorResult<T>
    where
        F: FnOnce(&mut StoreDocument) -> AdvisorResult<T>,
    {
        let mut guard = self.document.lock().await;
        let mut next = guard.clone();
        let result = apply(&mut next)?;
        self.backend
            .save(&next)
            .await
            .context("failed to persist advisor data")?;
        *guard = next;
        Ok(result)
    }

    // ---- user & identity ----

    pub async fn user(&self) -> Option<User> {
        self.read(|doc| doc.user.clone()).await
    }

    pub async fn create_user(&self, name: &str) -> AdvisorResult<User> {
        let name = require_text(name, "name")?;
        self.mutate(move |doc| {
            let user = match doc.user.take() {
                Some(existing) => User { name, ..existing },
                None => User {
                    name,
                    onboarding_complete: false,
                    created_at: Utc::now(),
                },
            };
            doc.user = Some(user.clone());
            Ok(user)
        })
        .await
    }

    pub async fn set_onboarding_complete(&self, complete: bool) -> AdvisorResult<User> {
        self.mutate(move |doc| {
            let user = doc
                .user
                .as_mut()
                .ok_or_else(|| AdvisorError::not_found("user", "current"))?;
            user.onboarding_complete = complete;
            Ok(user.clone())
        })
        .await
    }

    pub async fn identity(&self) -> Identity {
        self.read(|doc| doc.identity.clone()).await
    }

    pub async fn save_identity(&self, identity: Identity) -> AdvisorResult<Identity> {
        self.mutate(move |doc| apply_identity(doc, identity)).await
    }

    /// Stores `images` as inspiration images and saves the identity in one flush.
    pub async fn save_identity_with_images(
        &self,
        mut identity: Identity,
        images: Vec<ImageData>,
    ) -> AdvisorResult<Identity> {
        for image in &images {
            check_image(image)?;
        }
        self.mutate(move |doc| {
            for image in images {
                identity.inspiration_images.push(insert_image(doc, image));
            }
            apply_identity(doc, identity)
        })
        .await
    }

    // ---- aspirations ----

    pub async fn aspirations(&self) -> Vec<Aspiration> {
        self.read(|doc| doc.aspirations.clone()).await
    }

    pub async fn aspiration(&self, id: &str) -> Option<Aspiration> {
        self.read(|doc| doc.aspiration(id).cloned()).await
    }

    pub async fn add_aspiration(&self, input: AspirationInput) -> AdvisorResult<Aspiration> {
        let name = require_text(&input.name, "aspiration name")?;
        self.mutate(move |doc| {
            let aspiration = Aspiration {
                id: new_id(),
                name,
                description: input.description.trim().to_string(),
                keywords: input.keywords,
                styles: input.styles,
                colors: input.colors,
                created_at: Utc::now(),
                updated_at: None,
            };
            doc.aspirations.push(aspiration.clone());
            Ok(aspiration)
        })
        .await
    }

    pub async fn update_aspiration(
        &self,
        id: &str,
        update: AspirationUpdate,
    ) -> AdvisorResult<Aspiration> {
        let name = update
            .name
            .as_deref()
            .map(|name| require_text(name, "aspiration name"))
            .transpose()?;
        self.mutate(move |doc| {
            let aspiration = doc
                .aspirations
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or_else(|| AdvisorError::not_found("aspiration", id))?;
            if let Some(name) = name {
                aspiration.name = name;
            }
            if let Some(description) = update.description {
                aspiration.description = description;
            }
            if let Some(keywords) = update.keywords {
                aspiration.keywords = keywords;
            }
            if let Some(styles) = update.styles {
                aspiration.styles = styles;
            }
            if let Some(colors) = update.colors {
                aspiration.colors = colors;
            }
            aspiration.updated_at = Some(Utc::now());
            Ok(aspiration.clone())
        })
        .await
    }

    /// Removes the aspiration with its cached insights, per-item analyses and
    /// alignment entry. Deleting an unknown id is a no-op returning `false`.
    pub async fn delete_aspiration(&self, id: &str) -> AdvisorResult<bool> {
        let known = self.read(|doc| doc.aspiration(id).is_some()).await;
        if !known {
            return Ok(false);
        }
        self.mutate(|doc| {
            doc.aspirations.retain(|a| a.id != id);
            doc.style_insights.remove(id);
            for item in &mut doc.wardrobe {
                item.analysis_results.remove(id);
            }
            doc.alignment.forget_aspiration(id);
            Ok(true)
        })
        .await
    }

    // ---- wardrobe ----

    pub async fn wardrobe(&self) -> Vec<WardrobeItem> {
        self.read(|doc| doc.wardrobe.clone()).await
    }

    pub async fn item(&self, id: &str) -> Option<WardrobeItem> {
        self.read(|doc| doc.item(id).cloned()).await
    }

    pub async fn add_item(&self, input: WardrobeItemInput) -> AdvisorResult<WardrobeItem> {
        let name = require_text(&input.name, "item name")?;
        self.mutate(move |doc| {
            require_image(doc, input.image_id.as_ref())?;
            let item = WardrobeItem {
                id: new_id(),
                name,
                category: input.category,
                color: input.color,
                style: input.style,
                formality: input.formality,
                season: input.season,
                brand: input.brand,
                description: input.description,
                image_id: input.image_id,
                added_at: Utc::now(),
                last_worn: None,
                analysis_results: BTreeMap::new(),
            };
            doc.wardrobe.push(item.clone());
            Ok(item)
        })
        .await
    }

    /// Replaces the descriptive fields; analyses and wear history are kept.
    pub async fn update_item(
        &self,
        id: &str,
        input: WardrobeItemInput,
    ) -> AdvisorResult<WardrobeItem> {
        let name = require_text(&input.name, "item name")?;
        self.mutate(move |doc| {
            require_image(doc, input.image_id.as_ref())?;
            let item = doc
                .item_mut(id)
                .ok_or_else(|| AdvisorError::not_found("item", id))?;
            item.name = name;
            item.category = input.category;
            item.color = input.color;
            item.style = input.style;
            item.formality = input.formality;
            item.season = input.season;
            item.brand = input.brand;
            item.description = input.description;
            item.image_id = input.image_id;
            Ok(item.clone())
        })
        .await
    }

    /// Logs and outfits that reference the item keep their ids.
    pub async fn delete_item(&self, id: &str) -> AdvisorResult<bool> {
        let known = self.read(|doc| doc.item(id).is_some()).await;
        if !known {
            return Ok(false);
        }
        self.mutate(|doc| {
            doc.wardrobe.retain(|item| item.id != id);
            Ok(true)
        })
        .await
    }

    pub async fn set_item_analysis(
        &self,
        item_id: &str,
        aspiration_id: &str,
        analysis: ItemAnalysis,
    ) -> AdvisorResult<WardrobeItem> {
        let mut results = BTreeMap::new();
        results.insert(aspiration_id.to_string(), analysis);
        self.mutate(|doc| {
            if doc.aspiration(aspiration_id).is_none() {
                return Err(AdvisorError::not_found("aspiration", aspiration_id));
            }
            apply_analyses(doc, item_id, results)
        })
        .await
    }

    /// Writes several analyses for one item in a single flush. Entries for
    /// aspirations that no longer exist are dropped.
    pub async fn set_item_analyses(
        &self,
        item_id: &str,
        results: BTreeMap<String, ItemAnalysis>,
    ) -> AdvisorResult<WardrobeItem> {
        self.mutate(|doc| {
            let known: BTreeMap<String, ItemAnalysis> = results
                .into_iter()
                .filter(|(aspiration_id, _)| doc.aspiration(aspiration_id).is_some())
                .collect();
            apply_analyses(doc, item_id, known)
        })
        .await
    }

    pub async fn matching_items(&self, aspiration_id: &str, threshold: f64) -> Vec<WardrobeItem> {
        self.read(|doc| {
            doc.wardrobe
                .iter()
                .filter(|item| crate::alignment::is_match(item, aspiration_id, threshold))
                .cloned()
                .collect()
        })
        .await
    }

    // ---- behavior ----

    pub async fn daily_logs(&self) -> Vec<DailyLog> {
        self.read(|doc| doc.daily_logs.clone()).await
    }

    pub async fn add_daily_log(&self, input: DailyLogInput) -> AdvisorResult<DailyLog> {
        self.add_daily_log_at(input, Utc::now()).await
    }

    /// Records a log at `timestamp` and stamps `lastWorn` on the worn items.
    pub async fn add_daily_log_at(
        &self,
        input: DailyLogInput,
        timestamp: DateTime<Utc>,
    ) -> AdvisorResult<DailyLog> {
        check_log_input(&input)?;
        self.mutate(move |doc| push_daily_log(doc, input, timestamp))
            .await
    }

    /// Stores the selfie and the log in one flush; a failed write keeps neither.
    pub async fn add_daily_log_with_selfie(
        &self,
        mut input: DailyLogInput,
        selfie: ImageData,
    ) -> AdvisorResult<DailyLog> {
        check_log_input(&input)?;
        check_image(&selfie)?;
        self.mutate(move |doc| {
            input.selfie_image_id = Some(insert_image(doc, selfie));
            push_daily_log(doc, input, Utc::now())
        })
        .await
    }

    /// Logs strictly newer than `now - days`.
    pub async fn recent_logs(&self, now: DateTime<Utc>, days: i64) -> Vec<DailyLog> {
        let cutoff = window_start(now, days);
        self.read(|doc| {
            doc.daily_logs
                .iter()
                .filter(|log| log.timestamp > cutoff)
                .cloned()
                .collect()
        })
        .await
    }

    // ---- alignment ----

    pub async fn alignment(&self) -> AlignmentState {
        self.read(|doc| doc.alignment.clone()).await
    }

    pub async fn record_alignment(
        &self,
        snapshot: AlignmentSnapshot,
    ) -> AdvisorResult<AlignmentState> {
        self.mutate(move |doc| {
            doc.alignment.record(snapshot, Utc::now());
            Ok(doc.alignment.clone())
        })
        .await
    }

    // ---- outfits ----

    pub async fn outfits(&self) -> Vec<Outfit> {
        self.read(|doc| doc.outfits.clone()).await
    }

    pub async fn add_outfit(&self, input: OutfitInput) -> AdvisorResult<Outfit> {
        let name = require_text(&input.name, "outfit name")?;
        if input.items.is_empty() {
            return Err(AdvisorError::Validation(
                "an outfit needs at least one item".into(),
            ));
        }
        self.mutate(move |doc| {
            if let Some(missing) = input.items.iter().find(|id| doc.item(id).is_none()) {
                return Err(AdvisorError::Validation(format!("unknown item {missing}")));
            }
            let outfit = Outfit {
                id: new_id(),
                name,
                items: input.items,
                aspiration_id: input.aspiration_id,
                occasion: input.occasion,
                reason: input.reason,
                styling_tips: input.styling_tips,
                alignment_score: input.alignment_score.map(|score| score.min(100)),
                created_at: Utc::now(),
            };
            doc.outfits.push(outfit.clone());
            Ok(outfit)
        })
        .await
    }

    pub async fn delete_outfit(&self, id: &str) -> AdvisorResult<bool> {
        let known = self.read(|doc| doc.outfits.iter().any(|o| o.id == id)).await;
        if !known {
            return Ok(false);
        }
        self.mutate(|doc| {
            doc.outfits.retain(|outfit| outfit.id != id);
            Ok(true)
        })
        .await
    }

    // ---- recommendations ----

    pub async fn recommendations(&self) -> Vec<Recommendation> {
        self.read(|doc| doc.recommendations.clone()).await
    }

    /// Replaces the stored recommendations.
    pub async fn set_recommendations(
        &self,
        drafts: Vec<RecommendationDraft>,
        aspiration_id: Option<String>,
    ) -> AdvisorResult<Vec<Recommendation>> {
        self.mutate(move |doc| {
            let now = Utc::now();
            doc.recommendations = drafts
                .into_iter()
                .map(|draft| draft.into_recommendation(new_id(), aspiration_id.clone(), now))
                .collect();
            Ok(doc.recommendations.clone())
        })
        .await
    }

    pub async fn clear_recommendations(&self) -> AdvisorResult<()> {
        self.mutate(|doc| {
            doc.recommendations.clear();
            Ok(())
        })
        .await
    }

    // ---- images ----

    pub async fn add_image(&self, image: ImageData) -> AdvisorResult<String> {
        check_image(&image)?;
        self.mutate(move |doc| Ok(insert_image(doc, image))).await
    }

    pub async fn image(&self, id: &str) -> Option<ImageData> {
        self.read(|doc| doc.images.get(id).cloned()).await
    }

    /// Drops images referenced by no item, log or identity. Returns how many went.
    pub async fn delete_unused_images(&self) -> AdvisorResult<usize> {
        self.mutate(|doc| {
            let mut used: BTreeSet<&str> = BTreeSet::new();
            used.extend(doc.wardrobe.iter().filter_map(|i| i.image_id.as_deref()));
            used.extend(doc.daily_logs.iter().filter_map(|l| l.selfie_image_id.as_deref()));
            used.extend(doc.identity.inspiration_images.iter().map(String::as_str));
            let used: BTreeSet<String> = used.into_iter().map(str::to_string).collect();

            let before = doc.images.len();
            doc.images.retain(|id, _| used.contains(id));
            Ok(before - doc.images.len())
        })
        .await
    }

    // ---- style insights ----

    pub async fn style_insights(&self, aspiration_id: &str) -> Option<CachedStyleInsights> {
        self.read(|doc| doc.style_insights.get(aspiration_id).cloned())
            .await
    }

    pub async fn cache_style_insights(
        &self,
        aspiration_id: &str,
        insights: StyleInsights,
    ) -> AdvisorResult<CachedStyleInsights> {
        self.mutate(|doc| {
            if doc.aspiration(aspiration_id).is_none() {
                return Err(AdvisorError::not_found("aspiration", aspiration_id));
            }
            let cached = CachedStyleInsights {
                insights,
                cached_at: Utc::now(),
            };
            doc.style_insights
                .insert(aspiration_id.to_string(), cached.clone());
            Ok(cached)
        })
        .await
    }

    /// True when nothing is cached or the cache is older than `max_age`.
    pub async fn needs_style_insights_refresh(
        &self,
        aspiration_id: &str,
        now: DateTime<Utc>,
        max_age: Duration,
    ) -> bool {
        self.read(|doc| match doc.style_insights.get(aspiration_id) {
            Some(cached) => cached.is_stale(now, max_age),
            None => true,
        })
        .await
    }

    // ---- whole document ----

    pub async fn stats(&self) -> StoreStats {
        self.read(|doc| {
            let mut stats = StoreStats {
                total_items: doc.wardrobe.len(),
                aspirations: doc.aspirations.len(),
                daily_logs: doc.daily_logs.len(),
                outfits: doc.outfits.len(),
                images: doc.images.len(),
                ..StoreStats::default()
            };
            let mut score_sum = 0.0;
            let mut score_count = 0usize;
            for item in &doc.wardrobe {
                *stats.items_by_category.entry(item.category).or_insert(0) += 1;
                if !item.analysis_results.is_empty() {
                    stats.analyzed_items += 1;
                }
                for analysis in item.analysis_results.values() {
                    score_sum += analysis.match_score;
                    score_count += 1;
                }
            }
            if score_count > 0 {
                stats.average_match_score = Some(score_sum / score_count as f64);
            }
            stats
        })
        .await
    }

    /// Full document plus `exportedAt`.
    pub async fn export_data(&self) -> AdvisorResult<Value> {
        let document = self.snapshot().await;
        let mut value = serde_json::to_value(&document).context("failed to export data")?;
        if let Value::Object(map) = &mut value {
            map.insert("exportedAt".into(), Value::String(Utc::now().to_rfc3339()));
        }
        Ok(value)
    }

    /// Replaces every top-level key present in `data` (after upgrading older
    /// layouts); absent keys and unknown fields are left alone.
    pub async fn import_data(&self, data: Value) -> AdvisorResult<()> {
        let imported = match normalize(data, Utc::now()) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(AdvisorError::Validation("import must be an object".into())),
            Err(err) => return Err(AdvisorError::Validation(format!("{err:#}"))),
        };

        self.mutate(move |doc| {
            let mut merged = match serde_json::to_value(&*doc).context("failed to read data")? {
                Value::Object(map) => map,
                _ => serde_json::Map::new(),
            };
            let mut replaced = Vec::new();
            for key in DOCUMENT_KEYS {
                if let Some(value) = imported.get(key) {
                    merged.insert(key.to_string(), value.clone());
                    replaced.push(key);
                }
            }
            *doc = serde_json::from_value(Value::Object(merged))
                .map_err(|err| AdvisorError::Validation(format!("invalid import: {err}")))?;
            info!("Imported data for keys: {}", replaced.join(", "));
            Ok(())
        })
        .await
    }

    /// Drops everything, in storage and in memory.
    pub async fn clear_all(&self) -> AdvisorResult<()> {
        let mut guard = self.document.lock().await;
        self.backend
            .clear()
            .await
            .context("failed to clear advisor data")?;
        *guard = StoreDocument::default();
        warn!("All advisor data cleared");
        Ok(())
    }
}

fn apply_analyses(
    doc: &mut StoreDocument,
    item_id: &str,
    results: BTreeMap<String, ItemAnalysis>,
) -> AdvisorResult<WardrobeItem> {
    let item = doc
        .item_mut(item_id)
        .ok_or_else(|| AdvisorError::not_found("item", item_id))?;
    item.analysis_results.extend(results);
    Ok(item.clone())
}
