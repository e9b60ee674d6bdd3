// tsm-core/src/application/mod.rs

pub mod analytics;
pub mod cache;
pub mod pipeline;
pub mod validation;

// Facade: the CLI imports use cases from here without knowing the file layout.
pub use analytics::{AnalyticsService, MomentumReport};
pub use cache::SheetCache;
pub use pipeline::{LoadPipeline, RunSummary, SheetReport, run_pipeline};
pub use validation::{CheckStatus, ValidationReport, validate_store};
