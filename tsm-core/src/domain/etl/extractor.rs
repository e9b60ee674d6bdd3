// tsm-core/src/domain/etl/extractor.rs

use crate::domain::dataset::DatasetType;
use crate::domain::measure::{MeasureCode, MeasureScores};
use crate::domain::records::RawProviderRow;
use crate::domain::schema::ColumnMapping;
use crate::ports::workbook::SheetGrid;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Range audit of one measure column after extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeCheck {
    pub measure: MeasureCode,
    pub non_missing: usize,
    pub in_range: usize,
    /// Fewer than the configured share of values sit in [0, 100].
    pub suspect: bool,
}

impl RangeCheck {
    pub fn out_of_range(&self) -> usize {
        self.non_missing - self.in_range
    }

    pub fn in_range_ratio(&self) -> f64 {
        if self.non_missing == 0 {
            return 1.0;
        }
        self.in_range as f64 / self.non_missing as f64
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub rows_scanned: usize,
    pub rows_kept: usize,
    pub dropped_without_code: usize,
    pub dropped_without_scores: usize,
    pub range_checks: Vec<RangeCheck>,
}

impl ExtractionReport {
    pub fn suspect_columns(&self) -> impl Iterator<Item = &RangeCheck> {
        self.range_checks.iter().filter(|c| c.suspect)
    }

    pub fn out_of_range_values(&self) -> usize {
        self.range_checks.iter().map(RangeCheck::out_of_range).sum()
    }
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub rows: Vec<RawProviderRow>,
    pub report: ExtractionReport,
}

pub struct Extractor {
    min_in_range_ratio: f64,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl Extractor {
    pub fn new(min_in_range_ratio: f64) -> Self {
        Self { min_in_range_ratio }
    }

    /// Slices `grid` through `mapping`. Never fails: bad cells become missing values.
    pub fn extract(
        &self,
        grid: &SheetGrid,
        mapping: &ColumnMapping,
        dataset: DatasetType,
    ) -> Extraction {
        let applicable = dataset.applicable_measures();
        let mut report = ExtractionReport::default();
        let mut rows = Vec::new();

        for (_, cells) in grid.rows_from(mapping.data_start_row) {
            report.rows_scanned += 1;
            let cell = |col: usize| cells.get(col);

            let Some(provider_code) = cell(mapping.provider_code).and_then(|c| c.as_text()) else {
                report.dropped_without_code += 1;
                continue;
            };

            // Inapplicable measures stay None even if the sheet has something there.
            let mut scores = MeasureScores::default();
            for code in &applicable {
                let value = mapping
                    .measures
                    .get(code)
                    .and_then(|col| cell(*col))
                    .and_then(|c| c.as_number());
                scores.set(*code, value);
            }

            if scores.count_present() == 0 {
                report.dropped_without_scores += 1;
                continue;
            }

            rows.push(RawProviderRow {
                provider_code,
                provider_name: cell(mapping.provider_name)
                    .and_then(|c| c.as_text())
                    .unwrap_or_default(),
                dataset_type: dataset,
                scores,
            });
        }

        report.rows_kept = rows.len();
        report.range_checks = self.audit_ranges(&rows, &applicable, dataset);

        debug!(
            dataset = %dataset,
            scanned = report.rows_scanned,
            kept = report.rows_kept,
            no_code = report.dropped_without_code,
            no_scores = report.dropped_without_scores,
            "Extraction finished"
        );

        Extraction { rows, report }
    }

    fn audit_ranges(
        &self,
        rows: &[RawProviderRow],
        applicable: &[MeasureCode],
        dataset: DatasetType,
    ) -> Vec<RangeCheck> {
        let mut checks = Vec::with_capacity(applicable.len());
        for code in applicable {
            let values: Vec<f64> = rows.iter().filter_map(|r| r.scores.get(*code)).collect();
            let in_range = values
                .iter()
                .filter(|v| (0.0..=100.0).contains(*v))
                .count();
            let mut check = RangeCheck {
                measure: *code,
                non_missing: values.len(),
                in_range,
                suspect: false,
            };
            check.suspect = check.non_missing > 0 && check.in_range_ratio() < self.min_in_range_ratio;

            if check.suspect {
                warn!(
                    dataset = %dataset,
                    measure = %code,
                    in_range = check.in_range,
                    values = check.non_missing,
                    "🚨 Most values of this measure column are outside [0, 100]: the column mapping is probably wrong"
                );
            } else if check.out_of_range() > 0 {
                warn!(
                    dataset = %dataset,
                    measure = %code,
                    count = check.out_of_range(),
                    "Scores outside [0, 100] loaded as-is"
                );
            }
            checks.push(check);
        }
        checks
    }
}
