// tsm-core/src/infrastructure/adapters/duckdb.rs

use async_trait::async_trait;
use duckdb::{Config, Connection, params};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, instrument};

use crate::domain::dataset::DatasetType;
use crate::domain::measure::{MeasureCode, MeasureScores};
use crate::domain::records::{
    CorrelationRecord, PercentileRecord, ProviderDatasetMapping, ProviderSummary, ScoreRecord,
    TableCounts, YearBatch,
};
use crate::error::TsmError;
use crate::infrastructure::error::{DatabaseError, InfrastructureError};
use crate::ports::store::ScoreStore;

/// The five relations replaced together on a yearly reload.
pub const TABLES: [&str; 5] = [
    "raw_scores",
    "calculated_percentiles",
    "calculated_correlations",
    "provider_dataset_mapping",
    "provider_summary",
];

pub const SCORES_VIEW: &str = "v_provider_scores";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS raw_scores (
    provider_code VARCHAR NOT NULL,
    provider_name VARCHAR,
    dataset_type VARCHAR NOT NULL,
    tp_measure VARCHAR NOT NULL,
    score DOUBLE NOT NULL,
    year INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS calculated_percentiles (
    provider_code VARCHAR NOT NULL,
    year INTEGER NOT NULL,
    tp_measure VARCHAR NOT NULL,
    percentile_rank DOUBLE NOT NULL,
    dataset_type VARCHAR NOT NULL,
    peer_group_size INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS calculated_correlations (
    year INTEGER NOT NULL,
    tp_measure VARCHAR NOT NULL,
    correlation_with_primary DOUBLE NOT NULL,
    p_value DOUBLE NOT NULL,
    sample_size INTEGER NOT NULL,
    dataset_type VARCHAR NOT NULL
);

CREATE TABLE IF NOT EXISTS provider_dataset_mapping (
    provider_code VARCHAR NOT NULL,
    provider_name VARCHAR,
    dataset_type VARCHAR NOT NULL,
    provider_type VARCHAR,
    year INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS provider_summary (
    provider_code VARCHAR NOT NULL,
    provider_name VARCHAR,
    dataset_type VARCHAR NOT NULL,
    year INTEGER NOT NULL,
    tp01 DOUBLE, tp02 DOUBLE, tp03 DOUBLE, tp04 DOUBLE,
    tp05 DOUBLE, tp06 DOUBLE, tp07 DOUBLE, tp08 DOUBLE,
    tp09 DOUBLE, tp10 DOUBLE, tp11 DOUBLE, tp12 DOUBLE
);

CREATE INDEX IF NOT EXISTS idx_raw_scores_lookup
    ON raw_scores (year, dataset_type, tp_measure);
CREATE INDEX IF NOT EXISTS idx_raw_scores_provider
    ON raw_scores (provider_code, year);
CREATE INDEX IF NOT EXISTS idx_percentiles_provider
    ON calculated_percentiles (provider_code, year, dataset_type);
CREATE INDEX IF NOT EXISTS idx_mapping_provider
    ON provider_dataset_mapping (provider_code, year);
CREATE INDEX IF NOT EXISTS idx_summary_provider
    ON provider_summary (provider_code, year, dataset_type);

CREATE OR REPLACE VIEW v_provider_scores AS
SELECT
    r.provider_code,
    r.provider_name,
    r.dataset_type,
    r.year,
    r.tp_measure,
    r.score,
    p.percentile_rank,
    p.peer_group_size
FROM raw_scores r
LEFT JOIN calculated_percentiles p
    ON p.provider_code = r.provider_code
    AND p.year = r.year
    AND p.tp_measure = r.tp_measure
    AND p.dataset_type = r.dataset_type;
"#;

const SUMMARY_COLUMNS: &str = "provider_code, provider_name, dataset_type, year, \
    tp01, tp02, tp03, tp04, tp05, tp06, tp07, tp08, tp09, tp10, tp11, tp12";

pub struct DuckDbStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbStore {
    /// Opens (or creates) a database file. `:memory:` opens a private in-memory store.
    pub fn open(db_path: &str) -> Result<Self, InfrastructureError> {
        let config = Config::default();
        let conn = if db_path == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            if let Some(parent) = Path::new(db_path).parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            Connection::open_with_flags(db_path, config)?
        };

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self, InfrastructureError> {
        Self::open(":memory:")
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, TsmError> {
        self.conn
            .lock()
            .map_err(|_| TsmError::Infrastructure(DatabaseError::Poisoned.into()))
    }
}

fn parse_dataset(label: &str) -> Result<DatasetType, TsmError> {
    Ok(DatasetType::from_str(label)?)
}

fn parse_measure(code: &str) -> Result<MeasureCode, TsmError> {
    Ok(MeasureCode::from_str(code)?)
}

fn count(conn: &Connection, table: &str, year: Option<i32>) -> Result<u64, TsmError> {
    let value: i64 = match year {
        Some(y) => conn.query_row(
            &format!("SELECT count(*) FROM {} WHERE year = ?", table),
            params![y],
            |row| row.get(0),
        )?,
        None => conn.query_row(&format!("SELECT count(*) FROM {}", table), [], |row| {
            row.get(0)
        })?,
    };
    Ok(u64::try_from(value).unwrap_or(0))
}

fn insert_batch(conn: &Connection, batch: &YearBatch) -> Result<(), TsmError> {
    let mut stmt = conn.prepare(
        "INSERT INTO raw_scores (provider_code, provider_name, dataset_type, tp_measure, score, year) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )?;
    for s in &batch.scores {
        stmt.execute(params![
            s.provider_code,
            s.provider_name,
            s.dataset_type.as_str(),
            s.measure.as_str(),
            s.score,
            s.year
        ])?;
    }

    let mut stmt = conn.prepare(
        "INSERT INTO calculated_percentiles \
         (provider_code, year, tp_measure, percentile_rank, dataset_type, peer_group_size) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )?;
    for p in &batch.percentiles {
        stmt.execute(params![
            p.provider_code,
            p.year,
            p.measure.as_str(),
            p.percentile_rank,
            p.dataset_type.as_str(),
            p.peer_group_size as i64
        ])?;
    }

    let mut stmt = conn.prepare(
        "INSERT INTO calculated_correlations \
         (year, tp_measure, correlation_with_primary, p_value, sample_size, dataset_type) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )?;
    for c in &batch.correlations {
        stmt.execute(params![
            c.year,
            c.measure.as_str(),
            c.correlation_with_primary,
            c.p_value,
            c.sample_size as i64,
            c.dataset_type.as_str()
        ])?;
    }

    let mut stmt = conn.prepare(
        "INSERT INTO provider_dataset_mapping \
         (provider_code, provider_name, dataset_type, provider_type, year) \
         VALUES (?, ?, ?, ?, ?)",
    )?;
    for m in &batch.mappings {
        stmt.execute(params![
            m.provider_code,
            m.provider_name,
            m.dataset_type.as_str(),
            m.provider_category,
            m.year
        ])?;
    }

    let mut stmt = conn.prepare(&format!(
        "INSERT INTO provider_summary ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        SUMMARY_COLUMNS
    ))?;
    for s in &batch.summaries {
        let tp = |code: MeasureCode| s.scores.get(code);
        stmt.execute(params![
            s.provider_code,
            s.provider_name,
            s.dataset_type.as_str(),
            s.year,
            tp(MeasureCode::Tp01),
            tp(MeasureCode::Tp02),
            tp(MeasureCode::Tp03),
            tp(MeasureCode::Tp04),
            tp(MeasureCode::Tp05),
            tp(MeasureCode::Tp06),
            tp(MeasureCode::Tp07),
            tp(MeasureCode::Tp08),
            tp(MeasureCode::Tp09),
            tp(MeasureCode::Tp10),
            tp(MeasureCode::Tp11),
            tp(MeasureCode::Tp12)
        ])?;
    }
    Ok(())
}

type SummaryRow = (String, String, String, i32, [Option<f64>; 12]);

fn read_summaries(
    conn: &Connection,
    filter: &str,
    args: &[&dyn duckdb::ToSql],
) -> Result<Vec<ProviderSummary>, TsmError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM provider_summary WHERE {} ORDER BY provider_code, dataset_type",
        SUMMARY_COLUMNS, filter
    ))?;
    let rows = stmt
        .query_map(args, |row| {
            let mut tp = [None; 12];
            for (i, slot) in tp.iter_mut().enumerate() {
                *slot = row.get::<_, Option<f64>>(4 + i)?;
            }
            Ok::<SummaryRow, duckdb::Error>((
                row.get(0)?,
                row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                row.get(2)?,
                row.get(3)?,
                tp,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(code, name, dataset, year, tp)| {
            let mut scores = MeasureScores::default();
            for (code, value) in MeasureCode::ALL.iter().zip(tp) {
                scores.set(*code, value);
            }
            Ok(ProviderSummary {
                provider_code: code,
                provider_name: name,
                dataset_type: parse_dataset(&dataset)?,
                year,
                scores,
            })
        })
        .collect()
}

fn read_mappings(
    conn: &Connection,
    filter: &str,
    args: &[&dyn duckdb::ToSql],
) -> Result<Vec<ProviderDatasetMapping>, TsmError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT provider_code, provider_name, dataset_type, provider_type, year \
         FROM provider_dataset_mapping WHERE {} ORDER BY provider_code, dataset_type",
        filter
    ))?;
    let rows = stmt
        .query_map(args, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, i32>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(code, name, dataset, category, year)| {
            Ok(ProviderDatasetMapping {
                provider_code: code,
                provider_name: name.unwrap_or_default(),
                dataset_type: parse_dataset(&dataset)?,
                provider_category: category,
                year,
            })
        })
        .collect()
}

#[async_trait]
impl ScoreStore for DuckDbStore {
    async fn initialize(&self) -> Result<(), TsmError> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA)?;
        debug!("Store schema ready");
        Ok(())
    }

    #[instrument(skip(self, batch), fields(year = batch.year))]
    async fn replace_year(&self, batch: &YearBatch) -> Result<TableCounts, TsmError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        for table in TABLES {
            let deleted = tx.execute(
                &format!("DELETE FROM {} WHERE year = ?", table),
                params![batch.year],
            )?;
            if deleted > 0 {
                debug!(table, deleted, "Cleared previous rows for year");
            }
        }
        insert_batch(&tx, batch)?;
        // Dropping an uncommitted transaction rolls it back, so any `?` above leaves the year intact.
        tx.commit()?;

        let counts = TableCounts {
            raw_scores: count(&conn, "raw_scores", Some(batch.year))?,
            calculated_percentiles: count(&conn, "calculated_percentiles", Some(batch.year))?,
            calculated_correlations: count(&conn, "calculated_correlations", Some(batch.year))?,
            provider_dataset_mapping: count(&conn, "provider_dataset_mapping", Some(batch.year))?,
            provider_summary: count(&conn, "provider_summary", Some(batch.year))?,
        };
        info!(
            year = batch.year,
            raw_scores = counts.raw_scores,
            percentiles = counts.calculated_percentiles,
            correlations = counts.calculated_correlations,
            mappings = counts.provider_dataset_mapping,
            summaries = counts.provider_summary,
            "💾 Year replaced"
        );
        Ok(counts)
    }

    async fn years(&self) -> Result<Vec<i32>, TsmError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT year FROM provider_summary \
             UNION SELECT DISTINCT year FROM raw_scores ORDER BY year",
        )?;
        let years = stmt
            .query_map([], |row| row.get::<_, i32>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(years)
    }

    async fn table_counts(&self, year: Option<i32>) -> Result<TableCounts, TsmError> {
        let conn = self.lock()?;
        Ok(TableCounts {
            raw_scores: count(&conn, "raw_scores", year)?,
            calculated_percentiles: count(&conn, "calculated_percentiles", year)?,
            calculated_correlations: count(&conn, "calculated_correlations", year)?,
            provider_dataset_mapping: count(&conn, "provider_dataset_mapping", year)?,
            provider_summary: count(&conn, "provider_summary", year)?,
        })
    }

    async fn scores(&self, year: i32, dataset: DatasetType) -> Result<Vec<ScoreRecord>, TsmError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT provider_code, provider_name, tp_measure, score FROM raw_scores \
             WHERE year = ? AND dataset_type = ? ORDER BY provider_code, tp_measure",
        )?;
        let rows = stmt
            .query_map(params![year, dataset.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(code, name, measure, score)| {
                Ok(ScoreRecord {
                    provider_code: code,
                    provider_name: name.unwrap_or_default(),
                    year,
                    measure: parse_measure(&measure)?,
                    dataset_type: dataset,
                    score,
                })
            })
            .collect()
    }

    async fn provider_percentiles(
        &self,
        provider_code: &str,
        year: i32,
        dataset: DatasetType,
    ) -> Result<Vec<PercentileRecord>, TsmError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT tp_measure, percentile_rank, peer_group_size FROM calculated_percentiles \
             WHERE provider_code = ? AND year = ? AND dataset_type = ? ORDER BY tp_measure",
        )?;
        let rows = stmt
            .query_map(params![provider_code, year, dataset.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(measure, rank, size)| {
                Ok(PercentileRecord {
                    provider_code: provider_code.to_string(),
                    year,
                    measure: parse_measure(&measure)?,
                    dataset_type: dataset,
                    percentile_rank: rank,
                    peer_group_size: usize::try_from(size).unwrap_or(0),
                })
            })
            .collect()
    }

    async fn correlations(
        &self,
        year: i32,
        dataset: DatasetType,
    ) -> Result<Vec<CorrelationRecord>, TsmError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT tp_measure, correlation_with_primary, p_value, sample_size \
             FROM calculated_correlations WHERE year = ? AND dataset_type = ? ORDER BY tp_measure",
        )?;
        let rows = stmt
            .query_map(params![year, dataset.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(measure, rho, p, n)| {
                Ok(CorrelationRecord {
                    year,
                    measure: parse_measure(&measure)?,
                    dataset_type: dataset,
                    correlation_with_primary: rho,
                    p_value: p,
                    sample_size: usize::try_from(n).unwrap_or(0),
                })
            })
            .collect()
    }

    async fn summaries(
        &self,
        year: i32,
        dataset: DatasetType,
    ) -> Result<Vec<ProviderSummary>, TsmError> {
        let conn = self.lock()?;
        read_summaries(
            &conn,
            "year = ? AND dataset_type = ?",
            params![year, dataset.as_str()],
        )
    }

    async fn provider_summary(
        &self,
        provider_code: &str,
        year: i32,
        dataset: DatasetType,
    ) -> Result<Option<ProviderSummary>, TsmError> {
        let conn = self.lock()?;
        let mut rows = read_summaries(
            &conn,
            "provider_code = ? AND year = ? AND dataset_type = ?",
            params![provider_code, year, dataset.as_str()],
        )?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    async fn mappings(&self, year: i32) -> Result<Vec<ProviderDatasetMapping>, TsmError> {
        let conn = self.lock()?;
        read_mappings(&conn, "year = ?", params![year])
    }

    async fn provider_mappings(
        &self,
        provider_code: &str,
        year: i32,
    ) -> Result<Vec<ProviderDatasetMapping>, TsmError> {
        let conn = self.lock()?;
        read_mappings(
            &conn,
            "provider_code = ? AND year = ?",
            params![provider_code, year],
        )
    }

    async fn query_count(&self, query: &str) -> Result<u64, TsmError> {
        let conn = self.lock()?;
        let value: i64 = conn.query_row(query, [], |row| row.get(0))?;
        Ok(u64::try_from(value).unwrap_or(0))
    }

    async fn query_column(&self, query: &str) -> Result<Vec<String>, TsmError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(query)?;
        let values = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(values)
    }

    fn engine_name(&self) -> &str {
        "duckdb"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn batch(year: i32, scores: &[(&str, DatasetType, f64)]) -> YearBatch {
        let mut b = YearBatch {
            year,
            ..Default::default()
        };
        for (code, dataset, value) in scores {
            b.scores.push(ScoreRecord {
                provider_code: code.to_string(),
                provider_name: format!("{} Homes", code),
                year,
                measure: MeasureCode::Tp01,
                dataset_type: *dataset,
                score: *value,
            });
            b.percentiles.push(PercentileRecord {
                provider_code: code.to_string(),
                year,
                measure: MeasureCode::Tp01,
                dataset_type: *dataset,
                percentile_rank: 50.0,
                peer_group_size: scores.len(),
            });
            let mut s = MeasureScores::default();
            s.set(MeasureCode::Tp01, Some(*value));
            b.summaries.push(ProviderSummary {
                provider_code: code.to_string(),
                provider_name: format!("{} Homes", code),
                dataset_type: *dataset,
                year,
                scores: s,
            });
            b.mappings.push(ProviderDatasetMapping {
                provider_code: code.to_string(),
                provider_name: format!("{} Homes", code),
                dataset_type: *dataset,
                provider_category: Some("Local authority".to_string()),
                year,
            });
        }
        b.correlations.push(CorrelationRecord {
            year,
            measure: MeasureCode::Tp05,
            dataset_type: DatasetType::Primary,
            correlation_with_primary: 0.7,
            p_value: 0.001,
            sample_size: 40,
        });
        b
    }

    async fn store() -> Result<DuckDbStore> {
        let store = DuckDbStore::in_memory()?;
        store.initialize().await?;
        Ok(store)
    }

    #[tokio::test]
    async fn test_replace_year_round_trip() -> Result<()> {
        let store = store().await?;
        let b = batch(2024, &[("B", DatasetType::Primary, 70.0), ("A", DatasetType::Primary, 80.0)]);
        let counts = store.replace_year(&b).await?;
        assert_eq!(counts, b.counts());

        let scores = store.scores(2024, DatasetType::Primary).await?;
        let codes: Vec<_> = scores.iter().map(|s| s.provider_code.as_str()).collect();
        assert_eq!(codes, vec!["A", "B"]);

        let summary = store.provider_summary("A", 2024, DatasetType::Primary).await?;
        assert_eq!(summary.map(|s| s.scores.get(MeasureCode::Tp01)), Some(Some(80.0)));
        assert_eq!(
            store.provider_summary("A", 2024, DatasetType::Secondary).await?,
            None
        );

        let corr = store.correlations(2024, DatasetType::Primary).await?;
        assert_eq!(corr.len(), 1);
        assert_eq!(corr[0].sample_size, 40);

        let mappings = store.provider_mappings("A", 2024).await?;
        assert_eq!(mappings[0].provider_category.as_deref(), Some("Local authority"));
        Ok(())
    }

    #[tokio::test]
    async fn test_reload_replaces_only_that_year() -> Result<()> {
        let store = store().await?;
        store
            .replace_year(&batch(2024, &[("A", DatasetType::Primary, 80.0)]))
            .await?;
        store
            .replace_year(&batch(2025, &[("A", DatasetType::Primary, 82.0)]))
            .await?;

        // Reload 2024 with different content.
        let reload = batch(
            2024,
            &[("A", DatasetType::Primary, 81.0), ("C", DatasetType::Secondary, 60.0)],
        );
        store.replace_year(&reload).await?;
        store.replace_year(&reload).await?;

        assert_eq!(store.table_counts(Some(2024)).await?.raw_scores, 2);
        assert_eq!(store.table_counts(Some(2025)).await?.raw_scores, 1);
        assert_eq!(store.years().await?, vec![2024, 2025]);
        let kept = store.scores(2025, DatasetType::Primary).await?;
        assert_eq!(kept[0].score, 82.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_insert_rolls_back() -> Result<()> {
        let store = store().await?;
        store
            .replace_year(&batch(2024, &[("A", DatasetType::Primary, 80.0)]))
            .await?;

        // Without the last table the transaction fails after earlier deletes ran.
        store.lock()?.execute_batch("DROP TABLE provider_summary")?;
        let result = store
            .replace_year(&batch(2024, &[("Z", DatasetType::Primary, 10.0)]))
            .await;
        assert!(result.is_err());

        let scores = store.scores(2024, DatasetType::Primary).await?;
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].provider_code, "A");
        Ok(())
    }

    #[tokio::test]
    async fn test_view_joins_percentiles() -> Result<()> {
        let store = store().await?;
        store
            .replace_year(&batch(2024, &[("A", DatasetType::Primary, 80.0)]))
            .await?;
        let n = store
            .query_count("SELECT count(*) FROM v_provider_scores WHERE percentile_rank IS NOT NULL")
            .await?;
        assert_eq!(n, 1);
        let labels = store
            .query_column("SELECT DISTINCT dataset_type FROM raw_scores")
            .await?;
        assert_eq!(labels, vec!["LCRA".to_string()]);
        Ok(())
    }
}
