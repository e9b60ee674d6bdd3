// tsm-core/src/application/pipeline.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use crate::application::cache::SheetCache;
use crate::domain::dataset::DatasetType;
use crate::domain::error::DomainError;
use crate::domain::etl::{
    CoverageTable, DedupStats, ExtractionReport, Extractor, check_isolation, deduplicate,
    to_mappings, to_score_records, to_summaries,
};
use crate::domain::project::ProjectConfig;
use crate::domain::records::{RawProviderRow, TableCounts, YearBatch};
use crate::domain::schema::{LayoutKey, MappingSource, SchemaDetector, SchemaDrift};
use crate::domain::stats::{compute_correlations, compute_percentiles};
use crate::error::TsmError;
use crate::infrastructure::fs::write_json;
use crate::ports::store::ScoreStore;
use crate::ports::workbook::WorkbookSource;

/// What happened to one data sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetReport {
    pub dataset: DatasetType,
    pub sheet: String,
    pub mapping_source: MappingSource,
    pub confidence: f64,
    pub drift: Vec<SchemaDrift>,
    pub extraction: ExtractionReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub year: i32,
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Providers per dataset type after deduplication.
    pub providers: BTreeMap<DatasetType, usize>,
    pub dedup: DedupStats,
    pub coverage_providers: usize,
    pub coverage_mismatches: usize,
    pub sheets: Vec<SheetReport>,
    pub counts: TableCounts,
}

impl RunSummary {
    pub fn range_warnings(&self) -> usize {
        self.sheets
            .iter()
            .map(|s| s.extraction.out_of_range_values())
            .sum()
    }

    pub fn fallback_sheets(&self) -> impl Iterator<Item = &SheetReport> {
        self.sheets
            .iter()
            .filter(|s| s.mapping_source == MappingSource::Fallback)
    }
}

/// Everything computed in memory for one year, before anything is written.
#[derive(Debug, Clone)]
pub struct PreparedYear {
    pub batch: YearBatch,
    pub rows: Vec<RawProviderRow>,
    pub dedup: DedupStats,
    pub coverage_providers: usize,
    pub coverage_mismatches: usize,
    pub sheets: Vec<SheetReport>,
}

pub struct LoadPipeline {
    config: ProjectConfig,
    detector: SchemaDetector,
    extractor: Extractor,
}

impl LoadPipeline {
    pub fn new(config: ProjectConfig) -> Result<Self, TsmError> {
        let detector = SchemaDetector::new(
            config.detection.scan_rows,
            config.detection.min_measure_ratio,
            config.fallback_layouts(),
        )?;
        let extractor = Extractor::new(config.validation.min_in_range_ratio);
        Ok(Self {
            config,
            detector,
            extractor,
        })
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Resolves every sheet the year needs. Fails before anything is read if a required one is absent.
    fn locate_sheets<W: WorkbookSource>(
        &self,
        cache: &SheetCache<W>,
        year: i32,
    ) -> Result<(String, Vec<(DatasetType, String)>), DomainError> {
        let missing = |wanted: String| DomainError::MissingSheet {
            sheet: wanted,
            year,
            available: cache.sheet_names().join(", "),
        };

        let coverage_name = self.config.sheets.coverage_sheet(year);
        let coverage = cache
            .resolve(&coverage_name)
            .ok_or_else(|| missing(coverage_name))?;

        let mut data = Vec::new();
        for dataset in DatasetType::ALL {
            let wanted = self.config.sheets.resolve(dataset, year);
            match cache.resolve(&wanted) {
                Some(found) => data.push((dataset, found)),
                None if dataset == DatasetType::Combined => {
                    info!(sheet = %wanted, "No combined sheet for this year");
                }
                None => return Err(missing(wanted)),
            }
        }
        Ok((coverage, data))
    }

    /// Extract, deduplicate, transform and aggregate one year. Pure apart from reading the workbook.
    #[instrument(skip(self, cache), fields(source = %cache.origin()))]
    pub fn prepare<W: WorkbookSource>(
        &self,
        cache: &mut SheetCache<W>,
        year: i32,
    ) -> Result<PreparedYear, TsmError> {
        let (coverage_sheet, data_sheets) = self.locate_sheets(cache, year)?;

        let coverage = CoverageTable::parse(cache.get(&coverage_sheet)?, &self.config.coverage);
        if coverage.is_empty() {
            warn!(sheet = %coverage_sheet, "Coverage sheet has no provider rows");
        }

        let mut rows = Vec::new();
        let mut sheets = Vec::new();
        for (dataset, sheet) in data_sheets {
            let grid = cache.get(&sheet)?;
            let detection = self.detector.detect(grid, LayoutKey::new(dataset, year));
            let extraction = self.extractor.extract(grid, &detection.mapping, dataset);
            info!(
                dataset = %dataset,
                sheet = %sheet,
                mapping = ?detection.source,
                providers = extraction.rows.len(),
                "📄 Sheet extracted"
            );
            sheets.push(SheetReport {
                dataset,
                sheet,
                mapping_source: detection.source,
                confidence: detection.confidence,
                drift: detection.drift,
                extraction: extraction.report,
            });
            rows.extend(extraction.rows);
        }

        let outcome = deduplicate(rows);
        check_isolation(&outcome.rows)?;
        let coverage_mismatches = coverage.reconcile(&outcome.rows);

        let scores = to_score_records(&outcome.rows, year);
        let percentiles = compute_percentiles(&scores);
        let correlations = compute_correlations(&scores, year);
        let batch = YearBatch {
            year,
            mappings: to_mappings(&outcome.rows, &coverage, year),
            summaries: to_summaries(&outcome.rows, year),
            scores,
            percentiles,
            correlations,
        };

        Ok(PreparedYear {
            batch,
            rows: outcome.rows,
            dedup: outcome.stats,
            coverage_providers: coverage.len(),
            coverage_mismatches,
            sheets,
        })
    }

    /// Prepares the year, then replaces it in the store as one unit.
    pub async fn run<W: WorkbookSource>(
        &self,
        cache: &mut SheetCache<W>,
        year: i32,
        store: &dyn ScoreStore,
    ) -> Result<RunSummary, TsmError> {
        let started_at = Utc::now();
        info!(year, source = %cache.origin(), "🚀 Loading survey year");

        let prepared = self.prepare(cache, year)?;

        let mut providers = BTreeMap::new();
        for row in &prepared.rows {
            *providers.entry(row.dataset_type).or_insert(0) += 1;
        }
        for (dataset, count) in &providers {
            info!(dataset = %dataset, providers = count, "Providers after deduplication");
        }

        store.initialize().await?;
        let counts = store.replace_year(&prepared.batch).await?;

        let summary = RunSummary {
            year,
            source: cache.origin(),
            started_at,
            finished_at: Utc::now(),
            providers,
            dedup: prepared.dedup,
            coverage_providers: prepared.coverage_providers,
            coverage_mismatches: prepared.coverage_mismatches,
            sheets: prepared.sheets,
            counts,
        };
        info!(
            year,
            raw_scores = counts.raw_scores,
            percentiles = counts.calculated_percentiles,
            correlations = counts.calculated_correlations,
            "✨ Year loaded"
        );
        Ok(summary)
    }
}

pub fn summary_path(target_dir: &Path, year: i32) -> PathBuf {
    target_dir.join(format!("run_{}.json", year))
}

/// One invocation = one year's reload. The sheet cache lives for this call only.
pub async fn run_pipeline<W: WorkbookSource>(
    source: W,
    year: i32,
    config: &ProjectConfig,
    store: &dyn ScoreStore,
    target_dir: &Path,
) -> Result<RunSummary, TsmError> {
    let pipeline = LoadPipeline::new(config.clone())?;
    let mut cache = SheetCache::new(source);
    let summary = pipeline.run(&mut cache, year, store).await?;

    let path = summary_path(target_dir, year);
    write_json(&path, &summary)?;
    info!(path = ?path, "Run summary written");
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::duckdb::TABLES;
    use crate::infrastructure::adapters::{DuckDbStore, MemoryWorkbook};
    use crate::ports::workbook::Cell;
    use anyhow::Result;

    fn data_sheet(providers: &[(&str, f64)]) -> Vec<Vec<Cell>> {
        let mut header = vec![Cell::text("Landlord name"), Cell::text("Landlord code")];
        for n in 1..=12 {
            header.push(Cell::text(format!("TP{:02}", n)));
        }
        let mut rows = vec![vec![Cell::text("Title")], header];
        for (code, base) in providers {
            let mut row = vec![Cell::text(format!("{} Homes", code)), Cell::text(*code)];
            for n in 0..12 {
                row.push(Cell::Number(base - n as f64));
            }
            rows.push(row);
        }
        rows
    }

    fn coverage_sheet() -> Vec<Vec<Cell>> {
        let mut rows = vec![vec![]; 4];
        rows.push(["Acme", "A", "Local authority", "Yes", "No", "No"].map(Cell::text).to_vec());
        rows
    }

    fn workbook(with_combined: bool) -> MemoryWorkbook {
        let wb = MemoryWorkbook::new("mem")
            .with_sheet("Table_Coverage", coverage_sheet())
            .with_sheet("TSM24_LCRA_Perception", data_sheet(&[("A", 90.0), ("B", 80.0)]))
            .with_sheet("TSM24_LCHO_Perception", data_sheet(&[("A", 70.0)]));
        if with_combined {
            wb.with_sheet("TSM24_Combined_Perception", data_sheet(&[("A", 60.0), ("C", 50.0)]))
        } else {
            wb
        }
    }

    #[tokio::test]
    async fn test_missing_required_sheet_writes_nothing() -> Result<()> {
        let store = DuckDbStore::in_memory()?;
        let wb = MemoryWorkbook::new("mem").with_sheet("Table_Coverage", coverage_sheet());
        let pipeline = LoadPipeline::new(ProjectConfig::default())?;
        let err = pipeline
            .run(&mut SheetCache::new(wb), 2024, &store)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TsmError::Domain(DomainError::MissingSheet { .. })
        ));
        store.initialize().await?;
        assert_eq!(store.table_counts(None).await?, TableCounts::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_combined_is_optional_and_deduplicated() -> Result<()> {
        let pipeline = LoadPipeline::new(ProjectConfig::default())?;

        let without = pipeline.prepare(&mut SheetCache::new(workbook(false)), 2024)?;
        assert_eq!(without.sheets.len(), 2);

        let with = pipeline.prepare(&mut SheetCache::new(workbook(true)), 2024)?;
        assert_eq!(with.dedup.combined_suppressed, 1);
        let combined: Vec<_> = with
            .rows
            .iter()
            .filter(|r| r.dataset_type == DatasetType::Combined)
            .map(|r| r.provider_code.as_str())
            .collect();
        assert_eq!(combined, vec!["C"]);
        // LCHO rows carry no repairs measures.
        assert!(with
            .batch
            .scores
            .iter()
            .filter(|s| s.dataset_type == DatasetType::Secondary)
            .all(|s| s.dataset_type.applies(s.measure)));
        assert_eq!(
            with.batch.mappings[0].provider_category.as_deref(),
            Some("Local authority")
        );
        Ok(())
    }

    /// Every persisted row of every table, rendered and sorted.
    async fn dump(store: &DuckDbStore) -> Result<Vec<Vec<String>>> {
        let mut tables = Vec::new();
        for table in TABLES {
            tables.push(
                store
                    .query_column(&format!("SELECT CAST(t AS VARCHAR) FROM {} t ORDER BY 1", table))
                    .await?,
            );
        }
        Ok(tables)
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = DuckDbStore::in_memory()?;
        let config = ProjectConfig::default();

        let first = run_pipeline(workbook(true), 2024, &config, &store, dir.path()).await?;
        let snapshot = dump(&store).await?;
        let second = run_pipeline(workbook(true), 2024, &config, &store, dir.path()).await?;

        assert_eq!(first.counts, second.counts);
        assert!(!snapshot[0].is_empty());
        assert_eq!(dump(&store).await?, snapshot);
        assert_eq!(store.table_counts(None).await?, second.counts);
        assert!(summary_path(dir.path(), 2024).exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_year() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = DuckDbStore::in_memory()?;
        let config = ProjectConfig::default();

        run_pipeline(workbook(true), 2024, &config, &store, dir.path()).await?;
        let before = dump(&store).await?;
        assert!(!before[0].is_empty());

        let broken = MemoryWorkbook::new("mem")
            .with_sheet("Table_Coverage", coverage_sheet())
            .with_sheet("TSM24_LCRA_Perception", data_sheet(&[("Z", 10.0)]));
        let err = run_pipeline(broken, 2024, &config, &store, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TsmError::Domain(DomainError::MissingSheet { .. })
        ));

        assert_eq!(dump(&store).await?, before);
        Ok(())
    }
}
