use serde::{Deserialize, Serialize};

/// Which daily logs count as "aligned" with an aspiration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum BehaviorPolicy {
    /// The log was tagged with the aspiration.
    #[default]
    Tagged,
    /// Any worn item matches the aspiration.
    WornItems,
    TaggedOrWorn,
}

/// Tunables for alignment scoring.
#[derive(Debug, Clone)]
pub struct AlignmentConfig {
    /// Minimum match score for an item to count toward an aspiration.
    pub match_threshold: f64,

    /// Only logs newer than this many days feed the behavior score.
    pub recent_log_days: i64,

    pub behavior_policy: BehaviorPolicy,

    /// Overall = weighted mean of wardrobe and behavior, in whole percent.
    pub wardrobe_weight_pct: u32,
    pub behavior_weight_pct: u32,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.5,
            recent_log_days: 7,
            behavior_policy: BehaviorPolicy::Tagged,
            wardrobe_weight_pct: 60,
            behavior_weight_pct: 40,
        }
    }
}
