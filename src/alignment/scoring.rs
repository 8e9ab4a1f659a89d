use chrono::{DateTime, Duration, Utc};

use crate::alignment::config::{AlignmentConfig, BehaviorPolicy};
use crate::error::{AdvisorError, AdvisorResult};
use crate::models::{Aspiration, AspirationAlignment, DailyLog, WardrobeItem};

/// An item matches an aspiration when it has been analyzed against it and
/// scored at or above `threshold`. Unanalyzed items never match.
pub fn is_match(item: &WardrobeItem, aspiration_id: &str, threshold: f64) -> bool {
    item.analysis_for(aspiration_id)
        .map_or(false, |analysis| analysis.match_score >= threshold)
}

/// `round_half_up(100 * part / total)` in integer arithmetic, 0 when `total` is 0.
pub fn percentage(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let part = part.min(total) as u64;
    let total = total as u64;
    ((200 * part + total) / (2 * total)) as u32
}

/// Weighted mean of the two sub-scores, rounded half up. With the default
/// 60/40 weights this is `(60w + 40b + 50) / 100`.
pub fn weighted_overall(wardrobe: u32, behavior: u32, config: &AlignmentConfig) -> u32 {
    let weight_sum = u64::from(config.wardrobe_weight_pct + config.behavior_weight_pct);
    if weight_sum == 0 {
        return 0;
    }
    let weighted = u64::from(config.wardrobe_weight_pct) * u64::from(wardrobe)
        + u64::from(config.behavior_weight_pct) * u64::from(behavior);
    ((2 * weighted + weight_sum) / (2 * weight_sum)) as u32
}

/// Mean of whole percentages, rounded half up; 0 for no values.
pub fn mean_percentage(values: &[u32]) -> u32 {
    if values.is_empty() {
        return 0;
    }
    let sum: u64 = values.iter().map(|&v| u64::from(v)).sum();
    let count = values.len() as u64;
    ((2 * sum + count) / (2 * count)) as u32
}

/// Start of a `days`-long window ending at `now`. Windows reaching past the
/// representable range start at the earliest instant.
pub fn window_start(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    Duration::try_days(days.max(0))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Logs strictly newer than `now - days`.
pub fn logs_since(logs: &[DailyLog], now: DateTime<Utc>, days: i64) -> Vec<DailyLog> {
    let cutoff = window_start(now, days);
    logs.iter()
        .filter(|log| log.timestamp > cutoff)
        .cloned()
        .collect()
}

fn log_is_aligned(
    log: &DailyLog,
    aspiration_id: &str,
    wardrobe: &[WardrobeItem],
    config: &AlignmentConfig,
) -> bool {
    let tagged = log.aspiration_id.as_deref() == Some(aspiration_id);
    let worn = || {
        log.items_worn.iter().any(|worn_id| {
            wardrobe
                .iter()
                .find(|item| &item.id == worn_id)
                .map_or(false, |item| is_match(item, aspiration_id, config.match_threshold))
        })
    };
    match config.behavior_policy {
        BehaviorPolicy::Tagged => tagged,
        BehaviorPolicy::WornItems => worn(),
        BehaviorPolicy::TaggedOrWorn => tagged || worn(),
    }
}

/// Scores the wardrobe and the recent logs against one aspiration.
/// `recent_logs` must already be limited to the scoring window.
pub fn compute_alignment(
    aspiration: &Aspiration,
    wardrobe: &[WardrobeItem],
    recent_logs: &[DailyLog],
    config: &AlignmentConfig,
) -> AdvisorResult<AspirationAlignment> {
    if !aspiration.is_defined() {
        return Err(AdvisorError::Configuration("no identity defined".into()));
    }

    let matching_items = wardrobe
        .iter()
        .filter(|item| is_match(item, &aspiration.id, config.match_threshold))
        .count();
    let aligned_logs = recent_logs
        .iter()
        .filter(|log| log_is_aligned(log, &aspiration.id, wardrobe, config))
        .count();

    let wardrobe_score = percentage(matching_items, wardrobe.len());
    let behavior_score = percentage(aligned_logs, recent_logs.len());

    Ok(AspirationAlignment {
        aspiration_id: aspiration.id.clone(),
        wardrobe_score,
        behavior_score,
        overall: weighted_overall(wardrobe_score, behavior_score, config),
        matching_items,
        total_items: wardrobe.len(),
        aligned_logs,
        total_logs: recent_logs.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, ItemAnalysis};
    use std::collections::BTreeMap;

    fn aspiration(id: &str, name: &str) -> Aspiration {
        Aspiration {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            keywords: vec![],
            styles: vec![],
            colors: vec![],
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn item(id: &str, scores: &[(&str, f64)]) -> WardrobeItem {
        let now = Utc::now();
        WardrobeItem {
            id: id.into(),
            name: id.into(),
            category: Category::Top,
            color: String::new(),
            style: String::new(),
            formality: String::new(),
            season: String::new(),
            brand: None,
            description: None,
            image_id: None,
            added_at: now,
            last_worn: None,
            analysis_results: scores
                .iter()
                .map(|(a, s)| (a.to_string(), ItemAnalysis::new(*s, "", None, now)))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn log(aspiration_id: Option<&str>, worn: &[&str]) -> DailyLog {
        DailyLog {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            items_worn: worn.iter().map(|s| s.to_string()).collect(),
            aspiration_id: aspiration_id.map(str::to_string),
            selfie_image_id: None,
            extracted_data: None,
            ai_analysis: None,
            alignment_score: None,
        }
    }

    #[test]
    fn match_requires_analysis_at_or_above_threshold() {
        let shirt = item("shirt", &[("a", 0.5), ("b", 0.49)]);
        assert!(is_match(&shirt, "a", 0.5));
        assert!(!is_match(&shirt, "b", 0.5));
        assert!(!is_match(&shirt, "c", 0.5));
        assert!(is_match(&shirt, "b", 0.4));
    }

    #[test]
    fn percentages_round_half_up() {
        assert_eq!(percentage(10, 20), 50);
        assert_eq!(percentage(3, 7), 43);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(5, 0), 0);
        assert_eq!(percentage(4, 4), 100);
    }

    #[test]
    fn overall_is_sixty_forty() {
        let config = AlignmentConfig::default();
        assert_eq!(weighted_overall(50, 43, &config), 47);
        assert_eq!(weighted_overall(100, 100, &config), 100);
        assert_eq!(weighted_overall(0, 0, &config), 0);
        // 0.6 * 75 + 0.4 * 0 = 45; 0.6 * 1 + 0.4 * 1 = 1
        assert_eq!(weighted_overall(75, 0, &config), 45);
        assert_eq!(weighted_overall(1, 1, &config), 1);
        // 0.6 * 1 + 0.4 * 0 = 0.6 rounds up
        assert_eq!(weighted_overall(1, 0, &config), 1);
    }

    #[test]
    fn scores_ten_of_twenty_items_and_three_of_seven_logs() {
        let target = aspiration("a", "Minimalist");
        let wardrobe: Vec<_> = (0..20)
            .map(|i| {
                let score = if i < 10 { 0.8 } else { 0.2 };
                item(&format!("item-{i}"), &[("a", score)])
            })
            .collect();
        let logs: Vec<_> = (0..7)
            .map(|i| log(if i < 3 { Some("a") } else { Some("other") }, &["item-15"]))
            .collect();

        let result =
            compute_alignment(&target, &wardrobe, &logs, &AlignmentConfig::default()).unwrap();
        assert_eq!(result.wardrobe_score, 50);
        assert_eq!(result.behavior_score, 43);
        assert_eq!(result.overall, 47);
        assert_eq!(result.matching_items, 10);
        assert_eq!(result.aligned_logs, 3);
    }

    #[test]
    fn empty_inputs_score_zero() {
        let target = aspiration("a", "Minimalist");
        let result = compute_alignment(&target, &[], &[], &AlignmentConfig::default()).unwrap();
        assert_eq!(result.wardrobe_score, 0);
        assert_eq!(result.behavior_score, 0);
        assert_eq!(result.overall, 0);
    }

    #[test]
    fn unnamed_aspiration_is_a_configuration_error() {
        let target = aspiration("a", " ");
        let err = compute_alignment(&target, &[], &[], &AlignmentConfig::default()).unwrap_err();
        assert!(matches!(err, AdvisorError::Configuration(_)));
    }

    #[test]
    fn behavior_policies_count_different_logs() {
        let target = aspiration("a", "Minimalist");
        let wardrobe = vec![item("good", &[("a", 0.9)]), item("bad", &[("a", 0.1)])];
        let logs = vec![
            log(Some("a"), &["bad"]),
            log(None, &["good"]),
            log(None, &["bad"]),
            log(Some("a"), &["good"]),
        ];

        let score = |policy| {
            let config = AlignmentConfig {
                behavior_policy: policy,
                ..AlignmentConfig::default()
            };
            compute_alignment(&target, &wardrobe, &logs, &config)
                .unwrap()
                .aligned_logs
        };
        assert_eq!(score(BehaviorPolicy::Tagged), 2);
        assert_eq!(score(BehaviorPolicy::WornItems), 2);
        assert_eq!(score(BehaviorPolicy::TaggedOrWorn), 3);
    }

    #[test]
    fn oversized_window_keeps_every_log() {
        let now = Utc::now();
        let mut old = log(None, &[]);
        old.timestamp = now - Duration::days(4000);
        assert_eq!(logs_since(&[old], now, 900_000_000_000_000).len(), 1);
        assert_eq!(window_start(now, i64::MAX), DateTime::<Utc>::MIN_UTC);
        assert_eq!(window_start(now, -3), now);
    }

    #[test]
    fn window_keeps_only_recent_logs() {
        let now = Utc::now();
        let mut old = log(None, &["x"]);
        old.timestamp = now - Duration::days(7);
        let mut fresh = log(None, &["x"]);
        fresh.timestamp = now - Duration::days(6);

        let recent = logs_since(&[old, fresh.clone()], now, 7);
        assert_eq!(recent, vec![fresh]);
    }

    #[test]
    fn mean_percentage_rounds_half_up() {
        assert_eq!(mean_percentage(&[]), 0);
        assert_eq!(mean_percentage(&[50, 43]), 47);
        assert_eq!(mean_percentage(&[10, 20, 30]), 20);
    }
}
