// tsm-core/src/domain/analytics/ranking.rs

use crate::domain::records::ProviderSummary;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quartile {
    Low,
    Mid,
    High,
    Top,
}

impl Quartile {
    pub fn from_percentile(percentile: f64) -> Self {
        if percentile >= 75.0 {
            Self::Top
        } else if percentile >= 50.0 {
            Self::High
        } else if percentile >= 25.0 {
            Self::Mid
        } else {
            Self::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "Top",
            Self::High => "High",
            Self::Mid => "Mid",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Quartile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which providers of a dataset type form the peer group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PeerFilter {
    #[default]
    All,
    /// Only providers of this landlord type (case-insensitive).
    ProviderCategory(String),
}

impl PeerFilter {
    pub fn matches(&self, category: Option<&str>) -> bool {
        match self {
            Self::All => true,
            Self::ProviderCategory(wanted) => {
                category.is_some_and(|c| c.trim().eq_ignore_ascii_case(wanted.trim()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedProvider {
    pub provider_code: String,
    pub provider_name: String,
    pub composite_score: f64,
    pub measures_count: usize,
    pub rank: usize,
    pub percentile: f64,
    pub quartile: Quartile,
}

/// Unweighted mean of the measures the provider actually has, with their count.
pub fn composite_score(summary: &ProviderSummary) -> Option<(f64, usize)> {
    let values: Vec<f64> = summary
        .scores
        .present()
        .filter(|(code, _)| summary.dataset_type.applies(*code))
        .map(|(_, v)| v)
        .collect();
    if values.is_empty() {
        return None;
    }
    Some((values.iter().sum::<f64>() / values.len() as f64, values.len()))
}

/// Rank 1 is the highest composite. Equal composites keep their input order.
pub fn rank_providers(summaries: &[ProviderSummary]) -> Vec<RankedProvider> {
    let mut scored: Vec<(&ProviderSummary, f64, usize)> = summaries
        .iter()
        .filter_map(|s| composite_score(s).map(|(score, count)| (s, score, count)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let n = scored.len();
    scored
        .into_iter()
        .enumerate()
        .map(|(i, (summary, composite, count))| {
            let rank = i + 1;
            let percentile = (n - rank) as f64 / n as f64 * 100.0;
            RankedProvider {
                provider_code: summary.provider_code.clone(),
                provider_name: summary.provider_name.clone(),
                composite_score: composite,
                measures_count: count,
                rank,
                percentile,
                quartile: Quartile::from_percentile(percentile),
            }
        })
        .collect()
}
