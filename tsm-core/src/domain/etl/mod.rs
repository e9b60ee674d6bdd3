// tsm-core/src/domain/etl/mod.rs

pub mod coverage;
pub mod dedup;
pub mod extractor;
pub mod transform;

pub use coverage::{CoverageEntry, CoverageTable};
pub use dedup::{DedupOutcome, DedupStats, check_isolation, deduplicate};
pub use extractor::{Extraction, ExtractionReport, Extractor, RangeCheck};
pub use transform::{to_mappings, to_score_records, to_summaries};
