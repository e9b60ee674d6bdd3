// tsm-core/src/domain/records.rs
//
// Typed records flowing from extraction to the store.

use crate::domain::dataset::DatasetType;
use crate::domain::measure::{MeasureCode, MeasureScores};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Provider {
    pub code: String,
    pub display_name: String,
    pub dataset_type: DatasetType,
}

/// One provider row as read from a data sheet (wide shape).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProviderRow {
    pub provider_code: String,
    pub provider_name: String,
    pub dataset_type: DatasetType,
    pub scores: MeasureScores,
}

impl RawProviderRow {
    /// Scores for the measures that apply to this row's dataset, in catalog order.
    pub fn applicable_scores(&self) -> impl Iterator<Item = (MeasureCode, f64)> + '_ {
        self.scores
            .present()
            .filter(|(code, _)| self.dataset_type.applies(*code))
    }

    pub fn provider(&self) -> Provider {
        Provider {
            code: self.provider_code.clone(),
            display_name: self.provider_name.clone(),
            dataset_type: self.dataset_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub provider_code: String,
    pub provider_name: String,
    pub year: i32,
    pub measure: MeasureCode,
    pub dataset_type: DatasetType,
    pub score: f64,
}

impl ScoreRecord {
    pub fn in_range(&self) -> bool {
        (0.0..=100.0).contains(&self.score)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileRecord {
    pub provider_code: String,
    pub year: i32,
    pub measure: MeasureCode,
    pub dataset_type: DatasetType,
    pub percentile_rank: f64,
    pub peer_group_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationRecord {
    pub year: i32,
    pub measure: MeasureCode,
    pub dataset_type: DatasetType,
    pub correlation_with_primary: f64,
    pub p_value: f64,
    pub sample_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDatasetMapping {
    pub provider_code: String,
    pub provider_name: String,
    pub dataset_type: DatasetType,
    pub provider_category: Option<String>,
    pub year: i32,
}

/// Wide per-provider row persisted for quick lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSummary {
    pub provider_code: String,
    pub provider_name: String,
    pub dataset_type: DatasetType,
    pub year: i32,
    pub scores: MeasureScores,
}

impl ProviderSummary {
    pub fn from_row(row: &RawProviderRow, year: i32) -> Self {
        let mut scores = MeasureScores::default();
        for (code, value) in row.applicable_scores() {
            scores.set(code, Some(value));
        }
        Self {
            provider_code: row.provider_code.clone(),
            provider_name: row.provider_name.clone(),
            dataset_type: row.dataset_type,
            year,
            scores,
        }
    }
}

/// Everything one year's reload writes. Replaced as a unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct YearBatch {
    pub year: i32,
    pub scores: Vec<ScoreRecord>,
    pub percentiles: Vec<PercentileRecord>,
    pub correlations: Vec<CorrelationRecord>,
    pub mappings: Vec<ProviderDatasetMapping>,
    pub summaries: Vec<ProviderSummary>,
}

/// Row counts per persisted relation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCounts {
    pub raw_scores: u64,
    pub calculated_percentiles: u64,
    pub calculated_correlations: u64,
    pub provider_dataset_mapping: u64,
    pub provider_summary: u64,
}

impl YearBatch {
    pub fn counts(&self) -> TableCounts {
        TableCounts {
            raw_scores: self.scores.len() as u64,
            calculated_percentiles: self.percentiles.len() as u64,
            calculated_correlations: self.correlations.len() as u64,
            provider_dataset_mapping: self.mappings.len() as u64,
            provider_summary: self.summaries.len() as u64,
        }
    }
}
