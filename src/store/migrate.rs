//! Upgrades stored or imported JSON to the current [`StoreDocument`] layout.
//!
//! Two older layouts are recognised: the per-key export (`aspire_user`,
//! `aspire_wardrobe`, ...) and the single `aspire_loop_data` blob with nested
//! `wardrobe.items` / `behavior.dailyLogs`, epoch-millisecond timestamps and
//! inline image data.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::document::{StoreDocument, DOCUMENT_VERSION};
use crate::models::{Category, ImageData, MAX_ALIGNMENT_HISTORY};

const LEGACY_BLOB_KEY: &str = "aspire_loop_data";

const LEGACY_KEY_MAP: [(&str, &str); 5] = [
    ("aspire_user", "user"),
    ("aspire_aspirations", "aspirations"),
    ("aspire_wardrobe", "wardrobe"),
    ("aspire_outfits", "outfits"),
    ("aspire_recommendations", "recommendations"),
];

const TIMESTAMP_KEYS: [&str; 8] = [
    "createdAt",
    "updatedAt",
    "addedAt",
    "lastWorn",
    "timestamp",
    "cachedAt",
    "analyzedAt",
    "exportedAt",
];

pub fn migrate_document(value: Value) -> Result<StoreDocument> {
    let normalized = normalize(value, Utc::now())?;
    serde_json::from_value(normalized).context("stored data does not match the document layout")
}

/// Rewrites any supported layout into the current one, still as JSON.
/// Already-current documents pass through unchanged apart from defaults.
pub fn normalize(value: Value, now: DateTime<Utc>) -> Result<Value> {
    let mut root = match value {
        Value::Object(map) => map,
        other => bail!("expected a JSON object, found {}", kind_of(&other)),
    };

    if let Some(version) = root.get("version").and_then(Value::as_u64) {
        if version > u64::from(DOCUMENT_VERSION) {
            bail!(
                "data version ({version}) is newer than supported ({})",
                DOCUMENT_VERSION
            );
        }
    }

    if let Some(blob) = root.remove(LEGACY_BLOB_KEY) {
        root = match blob {
            Value::Object(map) => map,
            Value::String(text) => match serde_json::from_str(&text)
                .context("legacy data blob is not valid JSON")?
            {
                Value::Object(map) => map,
                other => bail!("legacy data blob is {}", kind_of(&other)),
            },
            other => bail!("legacy data blob is {}", kind_of(&other)),
        };
    }

    for (legacy, current) in LEGACY_KEY_MAP {
        if let Some(value) = root.remove(legacy) {
            root.entry(current).or_insert(value);
        }
    }

    match root.remove("wardrobe") {
        Some(Value::Object(mut wardrobe)) => {
            root.insert(
                "wardrobe".into(),
                wardrobe.remove("items").unwrap_or_else(|| Value::Array(vec![])),
            );
        }
        Some(items @ Value::Array(_)) => {
            root.insert("wardrobe".into(), items);
        }
        _ => {}
    }

    if let Some(Value::Object(mut behavior)) = root.remove("behavior") {
        if let Some(logs) = behavior.remove("dailyLogs") {
            root.entry("dailyLogs").or_insert(logs);
        }
    }

    drop_nulls(&mut root);
    convert_timestamps(&mut root);

    let had_images = root.contains_key("images");
    let had_insights = root.contains_key("styleInsights");
    let mut images = take_object(&mut root, "images");
    let mut insights = take_object(&mut root, "styleInsights");

    normalize_user(&mut root, now);
    normalize_aspirations(&mut root, &mut insights, now);
    normalize_items(&mut root, &mut images, now);
    normalize_logs(&mut root, &mut images, now);
    normalize_identity(&mut root, &mut images);
    normalize_outfits(&mut root, now);
    normalize_alignment(&mut root);
    normalize_recommendations(&mut root, now);
    normalize_insights(&mut insights, now);

    // Only keys that were supplied (or produced by the upgrade) are emitted,
    // so a partial import leaves the rest of the document alone.
    if had_images || !images.is_empty() {
        root.insert("images".into(), Value::Object(images));
    }
    if had_insights || !insights.is_empty() {
        root.insert("styleInsights".into(), Value::Object(insights));
    }
    root.insert("version".into(), Value::from(DOCUMENT_VERSION));
    root.remove("exportedAt");

    Ok(Value::Object(root))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn rfc3339(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339())
}

/// Top-level `null`s mean "absent"; defaults fill them in.
fn drop_nulls(root: &mut Map<String, Value>) {
    root.retain(|key, value| key == "user" || !value.is_null());
}

fn take_object(root: &mut Map<String, Value>, key: &str) -> Map<String, Value> {
    match root.remove(key) {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn array_mut<'a>(root: &'a mut Map<String, Value>, key: &str) -> Option<&'a mut Vec<Value>> {
    root.get_mut(key).and_then(Value::as_array_mut)
}

/// Epoch-millisecond numbers under timestamp keys become RFC 3339 strings.
fn convert_timestamps(map: &mut Map<String, Value>) {
    for (key, value) in map.iter_mut() {
        match value {
            Value::Number(number) if TIMESTAMP_KEYS.contains(&key.as_str()) => {
                if let Some(converted) = number
                    .as_i64()
                    .or_else(|| number.as_f64().map(|f| f as i64))
                    .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                {
                    *value = rfc3339(converted);
                }
            }
            Value::Object(inner) => convert_timestamps(inner),
            Value::Array(entries) => {
                for entry in entries {
                    if let Value::Object(inner) = entry {
                        convert_timestamps(inner);
                    }
                }
            }
            _ => {}
        }
    }
}

fn ensure_string(object: &mut Map<String, Value>, key: &str, default: impl FnOnce() -> Value) {
    let present = matches!(object.get(key), Some(Value::String(s)) if !s.is_empty());
    if !present {
        object.insert(key.to_string(), default());
    }
}

/// Whole percentages in `[0, 100]`; anything unusable is dropped.
fn normalize_percent(object: &mut Map<String, Value>, key: &str) {
    match object.get(key).map(|v| v.as_f64()) {
        Some(Some(score)) => {
            let clamped = score.clamp(0.0, 100.0).round() as u32;
            object.insert(key.to_string(), Value::from(clamped));
        }
        Some(None) => {
            object.remove(key);
        }
        None => {}
    }
}

/// Stores a `data:` URL in the image map and returns its new id.
fn intern_image(images: &mut Map<String, Value>, data_url: &str) -> Option<String> {
    let image = ImageData::from_data_url(data_url)?;
    let id = new_id();
    images.insert(id.clone(), serde_json::to_value(image).ok()?);
    Some(id)
}

fn normalize_user(root: &mut Map<String, Value>, now: DateTime<Utc>) {
    if let Some(Value::Object(user)) = root.get_mut("user") {
        ensure_string(user, "createdAt", || rfc3339(now));
        if !user.get("name").map_or(false, Value::is_string) {
            user.insert("name".into(), Value::String(String::new()));
        }
    }
}

fn normalize_aspirations(
    root: &mut Map<String, Value>,
    insights: &mut Map<String, Value>,
    now: DateTime<Utc>,
) {
    let Some(aspirations) = array_mut(root, "aspirations") else {
        return;
    };
    aspirations.retain(Value::is_object);
    for entry in aspirations.iter_mut() {
        let Value::Object(aspiration) = entry else {
            continue;
        };
        ensure_string(aspiration, "id", || Value::String(new_id()));
        ensure_string(aspiration, "createdAt", || rfc3339(now));

        // Older layouts cached insights on the aspiration as `{data, cachedAt}`.
        if let Some(Value::Object(mut cached)) = aspiration.remove("styleInsights") {
            if let (Some(Value::String(id)), Some(data)) =
                (aspiration.get("id").cloned(), cached.remove("data"))
            {
                let mut entry = Map::new();
                entry.insert("insights".into(), data);
                entry.insert(
                    "cachedAt".into(),
                    cached.remove("cachedAt").unwrap_or_else(|| rfc3339(now)),
                );
                insights.entry(id).or_insert(Value::Object(entry));
            }
        }
    }
}

fn normalize_items(
    root: &mut Map<String, Value>,
    images: &mut Map<String, Value>,
    now: DateTime<Utc>,
) {
    let Some(items) = array_mut(root, "wardrobe") else {
        return;
    };
    items.retain(Value::is_object);
    for entry in items.iter_mut() {
        let Value::Object(item) = entry else {
            continue;
        };
        ensure_string(item, "id", || Value::String(new_id()));
        ensure_string(item, "addedAt", || rfc3339(now));
        if !item.get("name").map_or(false, Value::is_string) {
            item.insert("name".into(), Value::String("Untitled item".into()));
        }

        let category = item
            .get("category")
            .or_else(|| item.get("type"))
            .and_then(Value::as_str)
            .map(Category::parse_loose)
            .unwrap_or_default();
        item.insert("category".into(), Value::String(category.as_str().into()));
        item.remove("type");

        if let Some(Value::String(data_url)) = item.remove("imageData") {
            if !item.contains_key("imageId") {
                if let Some(id) = intern_image(images, &data_url) {
                    item.insert("imageId".into(), Value::String(id));
                }
            }
        }

        if let Some(Value::Object(results)) = item.get_mut("analysisResults") {
            results.retain(|_, analysis| analysis.is_object());
            for analysis in results.values_mut() {
                let Value::Object(analysis) = analysis else {
                    continue;
                };
                let score = analysis
                    .get("matchScore")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0)
                    .clamp(0.0, 1.0);
                analysis.insert("matchScore".into(), Value::from(score));
                if !analysis.contains_key("updatedAt") && !analysis.contains_key("analyzedAt") {
                    analysis.insert("updatedAt".into(), rfc3339(now));
                }
            }
        }
    }
}

fn normalize_logs(
    root: &mut Map<String, Value>,
    images: &mut Map<String, Value>,
    now: DateTime<Utc>,
) {
    let Some(logs) = array_mut(root, "dailyLogs") else {
        return;
    };
    logs.retain(Value::is_object);
    for entry in logs.iter_mut() {
        let Value::Object(log) = entry else {
            continue;
        };
        ensure_string(log, "id", || Value::String(new_id()));
        ensure_string(log, "timestamp", || rfc3339(now));

        if let Some(Value::String(data_url)) = log.remove("selfie") {
            if let Some(id) = intern_image(images, &data_url) {
                log.entry("selfieImageId").or_insert(Value::String(id));
            }
        }
        normalize_percent(log, "alignmentScore");
    }
}

fn normalize_identity(root: &mut Map<String, Value>, images: &mut Map<String, Value>) {
    let Some(Value::Object(identity)) = root.get_mut("identity") else {
        return;
    };
    if let Some(Value::Array(entries)) = identity.get_mut("inspirationImages") {
        let ids = entries
            .drain(..)
            .filter_map(|entry| match entry {
                Value::String(s) if s.starts_with("data:") => intern_image(images, &s),
                Value::String(s) => Some(s),
                _ => None,
            })
            .map(Value::String)
            .collect();
        *entries = ids;
    }
}

fn normalize_outfits(root: &mut Map<String, Value>, now: DateTime<Utc>) {
    let Some(outfits) = array_mut(root, "outfits") else {
        return;
    };
    outfits.retain(Value::is_object);
    for entry in outfits.iter_mut() {
        let Value::Object(outfit) = entry else {
            continue;
        };
        ensure_string(outfit, "id", || Value::String(new_id()));
        ensure_string(outfit, "createdAt", || rfc3339(now));
        if !outfit.get("name").map_or(false, Value::is_string) {
            outfit.insert("name".into(), Value::String("Outfit".into()));
        }
        normalize_percent(outfit, "alignmentScore");
        // Generated outfits kept the names in `items` and the ids alongside.
        if let Some(ids) = outfit.remove("itemIds") {
            outfit.insert("items".into(), ids);
        }
    }
}

/// Keeps only the newest [`MAX_ALIGNMENT_HISTORY`] snapshots, oldest first.
fn normalize_alignment(root: &mut Map<String, Value>) {
    let Some(Value::Object(alignment)) = root.get_mut("alignment") else {
        return;
    };
    if let Some(Value::Array(history)) = alignment.get_mut("history") {
        history.retain(Value::is_object);
        if history.len() > MAX_ALIGNMENT_HISTORY {
            let excess = history.len() - MAX_ALIGNMENT_HISTORY;
            history.drain(..excess);
        }
    }
}

fn normalize_recommendations(root: &mut Map<String, Value>, now: DateTime<Utc>) {
    let Some(recommendations) = array_mut(root, "recommendations") else {
        return;
    };
    recommendations.retain(|entry| {
        let kind = entry.get("type").and_then(Value::as_str);
        let priority = entry.get("priority").and_then(Value::as_str);
        let item = entry.get("item").and_then(Value::as_str);
        matches!(kind.map(str::trim), Some("wear-existing") | Some("consider-adding"))
            && priority.map_or(false, |p| {
                matches!(p.trim().to_ascii_lowercase().as_str(), "high" | "medium" | "low")
            })
            && item.is_some()
    });
    for entry in recommendations.iter_mut() {
        let Value::Object(recommendation) = entry else {
            continue;
        };
        ensure_string(recommendation, "id", || Value::String(new_id()));
        ensure_string(recommendation, "createdAt", || rfc3339(now));
        if let Some(Value::String(priority)) = recommendation.get_mut("priority") {
            *priority = priority.trim().to_ascii_lowercase();
        }
        if let Some(Value::String(kind)) = recommendation.get_mut("type") {
            *kind = kind.trim().to_string();
        }
    }
}

/// Insight entries were once stored flat, `{...insights, cachedAt}`.
fn normalize_insights(insights: &mut Map<String, Value>, now: DateTime<Utc>) {
    insights.retain(|_, entry| entry.is_object());
    for entry in insights.values_mut() {
        let Value::Object(cached) = entry else {
            continue;
        };
        if !cached.contains_key("insights") {
            let cached_at = cached.remove("cachedAt").unwrap_or_else(|| rfc3339(now));
            let body = std::mem::take(cached);
            cached.insert("insights".into(), Value::Object(body));
            cached.insert("cachedAt".into(), cached_at);
        } else if !cached.contains_key("cachedAt") {
            cached.insert("cachedAt".into(), rfc3339(now));
        }
    }
}
