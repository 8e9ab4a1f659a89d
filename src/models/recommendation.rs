use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendationKind {
    WearExisting,
    ConsiderAdding,
}

impl RecommendationKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "wear-existing" => Some(RecommendationKind::WearExisting),
            "consider-adding" => Some(RecommendationKind::ConsiderAdding),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub item: String,
    #[serde(default)]
    pub reason: String,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment_impact: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspiration_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A recommendation before it is assigned an id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationDraft {
    pub kind: RecommendationKind,
    pub item: String,
    pub reason: String,
    pub priority: Priority,
    pub suggested_brand: Option<String>,
    pub alignment_impact: Option<u32>,
}

impl RecommendationDraft {
    pub fn into_recommendation(
        self,
        id: String,
        aspiration_id: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Recommendation {
        Recommendation {
            id,
            kind: self.kind,
            item: self.item,
            reason: self.reason,
            priority: self.priority,
            suggested_brand: self.suggested_brand,
            alignment_impact: self.alignment_impact,
            aspiration_id,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_as_kebab_case() {
        let json = serde_json::to_string(&RecommendationKind::ConsiderAdding).unwrap();
        assert_eq!(json, "\"consider-adding\"");
        assert_eq!(
            RecommendationKind::parse(" Wear-Existing"),
            Some(RecommendationKind::WearExisting)
        );
        assert_eq!(RecommendationKind::parse("buy"), None);
    }
}
