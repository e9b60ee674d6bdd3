// tsm-core/src/domain/etl/dedup.rs

use crate::domain::dataset::DatasetType;
use crate::domain::error::DomainError;
use crate::domain::records::RawProviderRow;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupStats {
    /// COMBINED rows removed because the code also filed LCRA or LCHO.
    pub combined_suppressed: usize,
    /// Repeated (code, dataset) rows removed; the first one is kept.
    pub repeated_dropped: usize,
}

#[derive(Debug, Clone)]
pub struct DedupOutcome {
    pub rows: Vec<RawProviderRow>,
    pub stats: DedupStats,
}

/// Enforces dataset isolation on one year's extracted rows.
/// LCRA and LCHO rows of the same code are independent and both survive.
pub fn deduplicate(rows: Vec<RawProviderRow>) -> DedupOutcome {
    let specific: HashSet<String> = rows
        .iter()
        .filter(|r| r.dataset_type != DatasetType::Combined)
        .map(|r| r.provider_code.clone())
        .collect();

    let mut stats = DedupStats::default();
    let mut seen: HashSet<(String, DatasetType)> = HashSet::new();
    let mut kept = Vec::with_capacity(rows.len());

    for row in rows {
        if row.dataset_type == DatasetType::Combined && specific.contains(&row.provider_code) {
            stats.combined_suppressed += 1;
            continue;
        }
        if !seen.insert((row.provider_code.clone(), row.dataset_type)) {
            warn!(
                provider = %row.provider_code,
                dataset = %row.dataset_type,
                "Provider listed twice in the same sheet, keeping the first row"
            );
            stats.repeated_dropped += 1;
            continue;
        }
        kept.push(row);
    }

    if stats.combined_suppressed > 0 {
        info!(
            suppressed = stats.combined_suppressed,
            "🧹 Removed COMBINED rows already covered by LCRA/LCHO"
        );
    }

    DedupOutcome { rows: kept, stats }
}

/// Post-condition of [`deduplicate`]. A failure here is a defect, never tolerated.
pub fn check_isolation(rows: &[RawProviderRow]) -> Result<(), DomainError> {
    let mut seen: HashSet<(&str, DatasetType)> = HashSet::new();
    for row in rows {
        if !seen.insert((row.provider_code.as_str(), row.dataset_type)) {
            return Err(DomainError::IsolationViolation(format!(
                "provider '{}' appears more than once as {}",
                row.provider_code, row.dataset_type
            )));
        }
    }

    for row in rows.iter().filter(|r| r.dataset_type == DatasetType::Combined) {
        let code = row.provider_code.as_str();
        if seen.contains(&(code, DatasetType::Primary)) || seen.contains(&(code, DatasetType::Secondary))
        {
            return Err(DomainError::IsolationViolation(format!(
                "provider '{}' appears as COMBINED and as LCRA/LCHO",
                code
            )));
        }
    }
    Ok(())
}
