// tsm-core/src/ports/store.rs

// Contract for the persisted, pre-aggregated score store.
// The engine writes one year at a time and reads back through these queries.

use crate::domain::dataset::DatasetType;
use crate::domain::records::{
    CorrelationRecord, PercentileRecord, ProviderDatasetMapping, ProviderSummary, ScoreRecord,
    TableCounts, YearBatch,
};
use crate::error::TsmError;
use async_trait::async_trait;

#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Creates tables, indexes and views if missing.
    async fn initialize(&self) -> Result<(), TsmError>;

    /// Deletes every row of `batch.year` from all tables and inserts the batch.
    /// All-or-nothing: a failure leaves the previous state of that year untouched.
    async fn replace_year(&self, batch: &YearBatch) -> Result<TableCounts, TsmError>;

    async fn years(&self) -> Result<Vec<i32>, TsmError>;

    async fn table_counts(&self, year: Option<i32>) -> Result<TableCounts, TsmError>;

    async fn scores(&self, year: i32, dataset: DatasetType) -> Result<Vec<ScoreRecord>, TsmError>;

    async fn provider_percentiles(
        &self,
        provider_code: &str,
        year: i32,
        dataset: DatasetType,
    ) -> Result<Vec<PercentileRecord>, TsmError>;

    async fn correlations(
        &self,
        year: i32,
        dataset: DatasetType,
    ) -> Result<Vec<CorrelationRecord>, TsmError>;

    /// Wide rows of one peer group, ordered by provider code.
    async fn summaries(
        &self,
        year: i32,
        dataset: DatasetType,
    ) -> Result<Vec<ProviderSummary>, TsmError>;

    async fn provider_summary(
        &self,
        provider_code: &str,
        year: i32,
        dataset: DatasetType,
    ) -> Result<Option<ProviderSummary>, TsmError>;

    async fn mappings(&self, year: i32) -> Result<Vec<ProviderDatasetMapping>, TsmError>;

    async fn provider_mappings(
        &self,
        provider_code: &str,
        year: i32,
    ) -> Result<Vec<ProviderDatasetMapping>, TsmError>;

    /// Runs a `SELECT count(*)`-shaped query (used by validation tooling).
    async fn query_count(&self, query: &str) -> Result<u64, TsmError>;

    /// Runs a query returning one text column.
    async fn query_column(&self, query: &str) -> Result<Vec<String>, TsmError>;

    fn engine_name(&self) -> &str;
}
