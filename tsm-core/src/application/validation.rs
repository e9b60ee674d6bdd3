// tsm-core/src/application/validation.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

use crate::error::TsmError;
use crate::ports::store::ScoreStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pass => "PASS",
            Self::Warn => "WARN",
            Self::Fail => "FAIL",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub name: String,
    pub status: CheckStatus,
    pub offending_rows: u64,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub year: Option<i32>,
    pub checks: Vec<ValidationCheck>,
}

impl ValidationReport {
    /// Worst status across all checks.
    pub fn status(&self) -> CheckStatus {
        self.checks
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(CheckStatus::Pass)
    }

    pub fn passed(&self) -> bool {
        self.status() != CheckStatus::Fail
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.checks {
            writeln!(f, "[{}] {}: {}", c.status, c.name, c.detail)?;
        }
        write!(f, "Overall: {}", self.status())
    }
}

struct Rule {
    name: &'static str,
    /// Severity when the query finds rows.
    on_hit: CheckStatus,
    query: String,
    sample: Option<String>,
    describe: fn(u64) -> String,
}

fn year_filter(column: &str, year: Option<i32>, leading: &str) -> String {
    match year {
        Some(y) => format!(" {} {} = {}", leading, column, y),
        None => String::new(),
    }
}

fn rules(year: Option<i32>) -> Vec<Rule> {
    let overlap_from = format!(
        "FROM provider_dataset_mapping c \
         JOIN provider_dataset_mapping s ON s.provider_code = c.provider_code AND s.year = c.year \
         WHERE c.dataset_type = 'COMBINED' AND s.dataset_type IN ('LCRA', 'LCHO'){}",
        year_filter("c.year", year, "AND")
    );

    vec![
        Rule {
            name: "combined_isolation",
            on_hit: CheckStatus::Fail,
            query: format!(
                "SELECT count(*) FROM (SELECT DISTINCT c.provider_code, c.year {})",
                overlap_from
            ),
            sample: Some(format!(
                "SELECT DISTINCT c.provider_code {} ORDER BY 1 LIMIT 5",
                overlap_from
            )),
            describe: |n| format!("{} provider(s) mapped as COMBINED and as LCRA/LCHO", n),
        },
        Rule {
            name: "unique_provider_rows",
            on_hit: CheckStatus::Fail,
            query: format!(
                "SELECT count(*) FROM (SELECT year, provider_code, dataset_type FROM provider_summary{} \
                 GROUP BY year, provider_code, dataset_type HAVING count(*) > 1)",
                year_filter("year", year, "WHERE")
            ),
            sample: None,
            describe: |n| format!("{} (year, provider, dataset) key(s) repeated", n),
        },
        Rule {
            name: "percentile_peer_groups",
            on_hit: CheckStatus::Fail,
            query: format!(
                "SELECT count(*) FROM calculated_percentiles p \
                 JOIN (SELECT year, dataset_type, tp_measure, count(*) AS n FROM raw_scores \
                       GROUP BY year, dataset_type, tp_measure) g \
                 ON g.year = p.year AND g.dataset_type = p.dataset_type AND g.tp_measure = p.tp_measure \
                 WHERE p.peer_group_size <> g.n{}",
                year_filter("p.year", year, "AND")
            ),
            sample: None,
            describe: |n| format!("{} percentile(s) computed over a foreign peer group", n),
        },
        Rule {
            name: "correlation_sample_size",
            on_hit: CheckStatus::Fail,
            query: format!(
                "SELECT count(*) FROM calculated_correlations WHERE sample_size <= 5{}",
                year_filter("year", year, "AND")
            ),
            sample: None,
            describe: |n| format!("{} correlation(s) with 5 or fewer providers", n),
        },
        Rule {
            name: "score_range",
            on_hit: CheckStatus::Warn,
            query: format!(
                "SELECT count(*) FROM raw_scores WHERE (score < 0 OR score > 100){}",
                year_filter("year", year, "AND")
            ),
            sample: None,
            describe: |n| format!("{} score(s) outside [0, 100]", n),
        },
        Rule {
            name: "percentile_coverage",
            on_hit: CheckStatus::Warn,
            query: format!(
                "SELECT count(*) FROM v_provider_scores WHERE percentile_rank IS NULL{}",
                year_filter("year", year, "AND")
            ),
            sample: None,
            describe: |n| format!("{} score(s) without a percentile", n),
        },
    ]
}

/// Integrity checks over the persisted tables. Structural violations are `Fail`, never tolerated.
pub async fn validate_store(
    store: &dyn ScoreStore,
    year: Option<i32>,
) -> Result<ValidationReport, TsmError> {
    store.initialize().await?;
    let mut report = ValidationReport {
        year,
        checks: Vec::new(),
    };

    for rule in rules(year) {
        let hits = store.query_count(&rule.query).await?;
        let (status, mut detail) = if hits == 0 {
            (CheckStatus::Pass, "ok".to_string())
        } else {
            (rule.on_hit, (rule.describe)(hits))
        };
        if hits > 0
            && let Some(sample) = &rule.sample
        {
            let offenders = store.query_column(sample).await?;
            detail = format!("{} (e.g. {})", detail, offenders.join(", "));
        }

        match status {
            CheckStatus::Pass => info!(check = rule.name, "✅ PASS"),
            CheckStatus::Warn => warn!(check = rule.name, %detail, "⚠️  WARN"),
            CheckStatus::Fail => warn!(check = rule.name, %detail, "❌ FAIL"),
        }

        report.checks.push(ValidationCheck {
            name: rule.name.to_string(),
            status,
            offending_rows: hits,
            detail,
        });
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::DatasetType;
    use crate::domain::measure::MeasureCode;
    use crate::domain::records::{CorrelationRecord, ProviderDatasetMapping, ScoreRecord, YearBatch};
    use crate::infrastructure::adapters::DuckDbStore;
    use anyhow::Result;

    fn mapping(code: &str, dataset: DatasetType) -> ProviderDatasetMapping {
        ProviderDatasetMapping {
            provider_code: code.to_string(),
            provider_name: code.to_string(),
            dataset_type: dataset,
            provider_category: None,
            year: 2024,
        }
    }

    #[tokio::test]
    async fn test_empty_store_passes() -> Result<()> {
        let store = DuckDbStore::in_memory()?;
        let report = validate_store(&store, None).await?;
        assert!(report.passed());
        assert_eq!(report.status(), CheckStatus::Pass);
        assert_eq!(report.checks.len(), 6);
        Ok(())
    }

    #[tokio::test]
    async fn test_defects_are_reported() -> Result<()> {
        let store = DuckDbStore::in_memory()?;
        store.initialize().await?;
        let batch = YearBatch {
            year: 2024,
            scores: vec![ScoreRecord {
                provider_code: "A".to_string(),
                provider_name: "A".to_string(),
                year: 2024,
                measure: MeasureCode::Tp01,
                dataset_type: DatasetType::Primary,
                score: 450.0,
            }],
            correlations: vec![CorrelationRecord {
                year: 2024,
                measure: MeasureCode::Tp02,
                dataset_type: DatasetType::Primary,
                correlation_with_primary: 0.1,
                p_value: 0.9,
                sample_size: 4,
            }],
            mappings: vec![
                mapping("A", DatasetType::Primary),
                mapping("A", DatasetType::Combined),
            ],
            ..Default::default()
        };
        store.replace_year(&batch).await?;

        let report = validate_store(&store, Some(2024)).await?;
        assert!(!report.passed());
        let status = |name: &str| report.checks.iter().find(|c| c.name == name).map(|c| c.status);
        assert_eq!(status("combined_isolation"), Some(CheckStatus::Fail));
        assert_eq!(status("correlation_sample_size"), Some(CheckStatus::Fail));
        assert_eq!(status("score_range"), Some(CheckStatus::Warn));
        assert_eq!(status("percentile_coverage"), Some(CheckStatus::Warn));
        assert_eq!(status("unique_provider_rows"), Some(CheckStatus::Pass));

        // Other years are out of scope.
        assert!(validate_store(&store, Some(2023)).await?.passed());
        Ok(())
    }

    #[test]
    fn test_report_rendering() {
        let report = ValidationReport {
            year: Some(2024),
            checks: vec![
                ValidationCheck {
                    name: "combined_isolation".to_string(),
                    status: CheckStatus::Pass,
                    offending_rows: 0,
                    detail: "ok".to_string(),
                },
                ValidationCheck {
                    name: "score_range".to_string(),
                    status: CheckStatus::Warn,
                    offending_rows: 2,
                    detail: "2 score(s) outside [0, 100]".to_string(),
                },
            ],
        };
        insta::assert_snapshot!(report.to_string(), @r"
        [PASS] combined_isolation: ok
        [WARN] score_range: 2 score(s) outside [0, 100]
        Overall: WARN
        ");
    }
}
