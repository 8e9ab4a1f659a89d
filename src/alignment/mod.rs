pub mod config;
pub mod engine;
pub mod scoring;

pub use config::{AlignmentConfig, BehaviorPolicy};
pub use engine::AlignmentEngine;
pub use scoring::{
    compute_alignment, is_match, logs_since, mean_percentage, percentage, weighted_overall,
    window_start,
};
