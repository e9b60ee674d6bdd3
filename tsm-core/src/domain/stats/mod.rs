// tsm-core/src/domain/stats/mod.rs

pub mod correlation;
pub mod distribution;
pub mod percentile;

pub use correlation::{MIN_SAMPLE_SIZE, Spearman, compute_correlations, spearman};
pub use percentile::{compute_percentiles, percentile_of_score};
