// tsm-core/src/domain/etl/coverage.rs
//
// Landlord classification sheet: which returns a provider made and what kind of landlord it is.

use crate::domain::dataset::DatasetType;
use crate::domain::project::CoverageColumns;
use crate::domain::records::RawProviderRow;
use crate::ports::workbook::SheetGrid;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageEntry {
    pub provider_code: String,
    pub provider_name: String,
    pub provider_type: Option<String>,
    pub primary: bool,
    pub secondary: bool,
    pub combined: bool,
}

impl CoverageEntry {
    /// A combined return wins; otherwise LCRA, then LCHO.
    pub fn classification(&self) -> Option<DatasetType> {
        if self.combined {
            Some(DatasetType::Combined)
        } else if self.primary {
            Some(DatasetType::Primary)
        } else if self.secondary {
            Some(DatasetType::Secondary)
        } else {
            None
        }
    }

    pub fn declares(&self, dataset: DatasetType) -> bool {
        match dataset {
            DatasetType::Primary => self.primary,
            DatasetType::Secondary => self.secondary,
            DatasetType::Combined => self.combined,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CoverageTable {
    entries: HashMap<String, CoverageEntry>,
}

fn is_yes(text: Option<String>) -> bool {
    text.is_some_and(|t| t.eq_ignore_ascii_case("yes") || t.eq_ignore_ascii_case("y"))
}

impl CoverageTable {
    pub fn parse(grid: &SheetGrid, columns: &CoverageColumns) -> Self {
        let mut entries = HashMap::new();
        for (_, row) in grid.rows_from(columns.data_start_row) {
            let text = |col: usize| row.get(col).and_then(|c| c.as_text());
            let Some(code) = text(columns.code) else {
                continue;
            };
            // First occurrence wins, later rows for the same code are ignored.
            entries.entry(code.clone()).or_insert_with(|| CoverageEntry {
                provider_code: code,
                provider_name: text(columns.name).unwrap_or_default(),
                provider_type: text(columns.provider_type),
                primary: is_yes(text(columns.primary_flag)),
                secondary: is_yes(text(columns.secondary_flag)),
                combined: is_yes(text(columns.combined_flag)),
            });
        }
        debug!(providers = entries.len(), "Coverage sheet parsed");
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, provider_code: &str) -> Option<&CoverageEntry> {
        self.entries.get(provider_code)
    }

    pub fn category(&self, provider_code: &str) -> Option<String> {
        self.get(provider_code).and_then(|e| e.provider_type.clone())
    }

    pub fn classification_counts(&self) -> BTreeMap<DatasetType, usize> {
        let mut counts = BTreeMap::new();
        for entry in self.entries.values() {
            if let Some(dataset) = entry.classification() {
                *counts.entry(dataset).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Logs the coverage classification and how many extracted rows disagree with it.
    pub fn reconcile(&self, rows: &[RawProviderRow]) -> usize {
        for (dataset, count) in self.classification_counts() {
            info!(dataset = %dataset, providers = count, "Coverage classification");
        }

        let mut mismatches = 0;
        let mut seen: HashSet<(&str, DatasetType)> = HashSet::new();
        for row in rows {
            if !seen.insert((row.provider_code.as_str(), row.dataset_type)) {
                continue;
            }
            let agrees = self
                .get(&row.provider_code)
                .is_some_and(|e| e.declares(row.dataset_type));
            if !agrees {
                mismatches += 1;
                debug!(
                    provider = %row.provider_code,
                    dataset = %row.dataset_type,
                    "Data sheet row not declared on the coverage sheet"
                );
            }
        }
        mismatches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::measure::MeasureScores;
    use crate::ports::workbook::Cell;

    fn grid() -> SheetGrid {
        let row = |cells: &[&str]| cells.iter().map(|c| Cell::text(*c)).collect::<Vec<_>>();
        SheetGrid::new(vec![
            row(&["Coverage"]),
            vec![],
            vec![],
            row(&["Name", "Code", "Type", "LCRA", "LCHO", "Combined"]),
            row(&["Acme Homes", "L0001", "Private registered provider", "Yes", "Yes", "No"]),
            row(&["Borough Council", "L0002", "Local authority", "No", "No", "Yes"]),
            row(&["", "", "", "", "", ""]),
            row(&["Small Trust", "L0003", "", "No", "Yes", "No"]),
        ])
    }

    #[test]
    fn test_parse_and_classify() {
        let table = CoverageTable::parse(&grid(), &CoverageColumns::default());
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.get("L0001").and_then(|e| e.classification()),
            Some(DatasetType::Primary)
        );
        assert_eq!(
            table.get("L0002").and_then(|e| e.classification()),
            Some(DatasetType::Combined)
        );
        assert_eq!(table.category("L0003"), None);
        assert_eq!(
            table.category("L0002").as_deref(),
            Some("Local authority")
        );
    }

    #[test]
    fn test_reconcile_counts_undeclared_rows() {
        let table = CoverageTable::parse(&grid(), &CoverageColumns::default());
        let row = |code: &str, dataset| RawProviderRow {
            provider_code: code.to_string(),
            provider_name: String::new(),
            dataset_type: dataset,
            scores: MeasureScores::default(),
        };
        let rows = vec![
            row("L0001", DatasetType::Primary),
            row("L0001", DatasetType::Secondary),
            row("L0003", DatasetType::Primary),
            row("L9999", DatasetType::Primary),
        ];
        assert_eq!(table.reconcile(&rows), 2);
    }
}
