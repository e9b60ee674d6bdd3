// tsm-core/src/domain/analytics/priority.rs

use crate::domain::dataset::DatasetType;
use crate::domain::error::DomainError;
use crate::domain::measure::MeasureCode;
use crate::domain::records::{CorrelationRecord, PercentileRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const IMPROVEMENT_WEIGHT: f64 = 0.6;
pub const CORRELATION_WEIGHT: f64 = 0.4;
/// Magnitude assumed when a measure has no correlation record. Not zero.
pub const DEFAULT_CORRELATION: f64 = 0.5;

/// Ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl PriorityLevel {
    pub fn from_score(score: f64) -> Self {
        if score > 70.0 {
            Self::Critical
        } else if score > 50.0 {
            Self::High
        } else if score > 30.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn priority_score(percentile: f64, correlation: Option<f64>) -> f64 {
    let improvement_potential = 100.0 - percentile;
    let strength = correlation.unwrap_or(DEFAULT_CORRELATION).abs();
    improvement_potential * IMPROVEMENT_WEIGHT + strength * 100.0 * CORRELATION_WEIGHT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurePriority {
    pub measure: MeasureCode,
    pub percentile: f64,
    /// `None` when no correlation was stored and the default magnitude was used.
    pub correlation: Option<f64>,
    pub improvement_potential: f64,
    pub priority_score: f64,
    pub level: PriorityLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityAssessment {
    pub provider_code: String,
    pub year: i32,
    pub dataset_type: DatasetType,
    pub top: MeasurePriority,
    /// Highest score first; equal scores in catalog order.
    pub measures: Vec<MeasurePriority>,
}

/// Scores every applicable non-primary measure the provider has a percentile for.
pub fn assess_priorities(
    provider_code: &str,
    year: i32,
    dataset: DatasetType,
    percentiles: &[PercentileRecord],
    correlations: &[CorrelationRecord],
) -> Result<PriorityAssessment, DomainError> {
    let mut measures: Vec<MeasurePriority> = dataset
        .applicable_measures()
        .into_iter()
        .filter(|m| !m.is_primary())
        .filter_map(|measure| {
            let percentile = percentiles
                .iter()
                .find(|p| {
                    p.provider_code == provider_code
                        && p.year == year
                        && p.dataset_type == dataset
                        && p.measure == measure
                })?
                .percentile_rank;
            let correlation = correlations
                .iter()
                .find(|c| c.year == year && c.dataset_type == dataset && c.measure == measure)
                .map(|c| c.correlation_with_primary);
            let score = priority_score(percentile, correlation);
            Some(MeasurePriority {
                measure,
                percentile,
                correlation,
                improvement_potential: 100.0 - percentile,
                priority_score: score,
                level: PriorityLevel::from_score(score),
            })
        })
        .collect();

    measures.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));

    let top = measures
        .first()
        .cloned()
        .ok_or_else(|| DomainError::NoPriorityCandidates(provider_code.to_string()))?;

    Ok(PriorityAssessment {
        provider_code: provider_code.to_string(),
        year,
        dataset_type: dataset,
        top,
        measures,
    })
}
