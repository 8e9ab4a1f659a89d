mod alignment;
mod aspiration;
mod behavior;
mod outfit;
mod recommendation;
mod user;
mod wardrobe;

pub use alignment::{
    AlignmentHistoryEntry, AlignmentSnapshot, AlignmentState, AspirationAlignment, SubScore,
    MAX_ALIGNMENT_HISTORY,
};
pub use aspiration::{
    Archetype, Aspiration, AspirationInput, AspirationUpdate, CachedStyleInsights, Identity,
    StyleElements, StyleInsights,
};
pub use behavior::{DailyLog, DailyLogInput, ExtractedLogData};
pub use outfit::{Outfit, OutfitInput};
pub use recommendation::{Priority, Recommendation, RecommendationDraft, RecommendationKind};
pub use user::{ImageData, User};
pub use wardrobe::{Category, ItemAnalysis, MatchLevel, WardrobeItem, WardrobeItemInput};
