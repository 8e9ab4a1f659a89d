pub mod generator;
pub mod rules;

pub use generator::RecommendationService;
pub use rules::{fallback_recommendations, CategoryRule, CATEGORY_RULES};
