//! User-facing operations that combine the store with the model.

pub mod behavior;
pub mod identity;
pub mod insights;
pub mod outfits;
pub mod progress;
pub mod wardrobe;

pub use behavior::BehaviorService;
pub use identity::IdentityService;
pub use insights::InsightsService;
pub use outfits::{InspirationMatch, OutfitService};
pub use progress::{alignment_trend, weekly_summary, ProgressReport, ProgressService, WeeklySummary};
pub use wardrobe::{AnalysisProgress, BatchReport, ItemFailure, WardrobeService};
