// tsm-core/src/domain/etl/transform.rs

use crate::domain::etl::coverage::CoverageTable;
use crate::domain::records::{
    ProviderDatasetMapping, ProviderSummary, RawProviderRow, ScoreRecord,
};

/// Wide to long: one record per present, applicable score.
/// Output order is row order, then catalog order within a row.
pub fn to_score_records(rows: &[RawProviderRow], year: i32) -> Vec<ScoreRecord> {
    rows.iter()
        .flat_map(|row| {
            row.applicable_scores().map(move |(measure, score)| ScoreRecord {
                provider_code: row.provider_code.clone(),
                provider_name: row.provider_name.clone(),
                year,
                measure,
                dataset_type: row.dataset_type,
                score,
            })
        })
        .collect()
}

/// One mapping per (code, dataset) pair present in `rows`.
pub fn to_mappings(
    rows: &[RawProviderRow],
    coverage: &CoverageTable,
    year: i32,
) -> Vec<ProviderDatasetMapping> {
    rows.iter()
        .map(|row| ProviderDatasetMapping {
            provider_code: row.provider_code.clone(),
            provider_name: row.provider_name.clone(),
            dataset_type: row.dataset_type,
            provider_category: coverage.category(&row.provider_code),
            year,
        })
        .collect()
}

pub fn to_summaries(rows: &[RawProviderRow], year: i32) -> Vec<ProviderSummary> {
    rows.iter()
        .map(|row| ProviderSummary::from_row(row, year))
        .collect()
}
