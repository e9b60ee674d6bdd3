// tsm-core/src/application/analytics.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::domain::analytics::{
    Momentum, PeerFilter, PeerStatistics, PriorityAssessment, RankedProvider, assess_priorities,
    compute_momentum, peer_statistics, rank_providers,
};
use crate::domain::dataset::DatasetType;
use crate::domain::error::DomainError;
use crate::domain::measure::MeasureCode;
use crate::error::TsmError;
use crate::ports::store::ScoreStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumReport {
    pub provider_code: String,
    pub dataset_type: DatasetType,
    pub from_year: i32,
    pub to_year: i32,
    pub momentum: Momentum,
}

/// Read-side queries recomputed on demand from the persisted store.
pub struct AnalyticsService<'a> {
    store: &'a dyn ScoreStore,
}

impl<'a> AnalyticsService<'a> {
    pub fn new(store: &'a dyn ScoreStore) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn rankings(
        &self,
        year: i32,
        dataset: DatasetType,
        filter: &PeerFilter,
    ) -> Result<Vec<RankedProvider>, TsmError> {
        let mut summaries = self.store.summaries(year, dataset).await?;

        if *filter != PeerFilter::All {
            let categories: HashMap<String, Option<String>> = self
                .store
                .mappings(year)
                .await?
                .into_iter()
                .filter(|m| m.dataset_type == dataset)
                .map(|m| (m.provider_code, m.provider_category))
                .collect();
            summaries.retain(|s| {
                filter.matches(
                    categories
                        .get(&s.provider_code)
                        .and_then(|c| c.as_deref()),
                )
            });
        }

        debug!(peers = summaries.len(), "Ranking peer group");
        Ok(rank_providers(&summaries))
    }

    /// Explicit dataset wins; otherwise LCRA, then LCHO, then COMBINED.
    pub async fn resolve_dataset(
        &self,
        provider_code: &str,
        year: i32,
        dataset: Option<DatasetType>,
    ) -> Result<DatasetType, TsmError> {
        if let Some(d) = dataset {
            return Ok(d);
        }
        self.store
            .provider_mappings(provider_code, year)
            .await?
            .into_iter()
            .map(|m| m.dataset_type)
            .min_by_key(|d| d.preference())
            .ok_or_else(|| {
                DomainError::ProviderNotFound {
                    provider: provider_code.to_string(),
                    year,
                }
                .into()
            })
    }

    #[instrument(skip(self))]
    pub async fn priority(
        &self,
        provider_code: &str,
        year: i32,
        dataset: Option<DatasetType>,
    ) -> Result<PriorityAssessment, TsmError> {
        let dataset = self.resolve_dataset(provider_code, year, dataset).await?;
        let percentiles = self
            .store
            .provider_percentiles(provider_code, year, dataset)
            .await?;
        if percentiles.is_empty() {
            return Err(DomainError::ProviderNotFound {
                provider: provider_code.to_string(),
                year,
            }
            .into());
        }
        let correlations = self.store.correlations(year, dataset).await?;
        Ok(assess_priorities(
            provider_code,
            year,
            dataset,
            &percentiles,
            &correlations,
        )?)
    }

    /// A provider absent from one of the years yields insufficient data; absent from both, `ProviderNotFound`.
    #[instrument(skip(self))]
    pub async fn momentum(
        &self,
        provider_code: &str,
        from_year: i32,
        to_year: i32,
        dataset: Option<DatasetType>,
    ) -> Result<MomentumReport, TsmError> {
        let dataset = match dataset {
            Some(d) => d,
            None => match self.resolve_dataset(provider_code, to_year, None).await {
                Ok(d) => d,
                Err(TsmError::Domain(DomainError::ProviderNotFound { .. })) => {
                    self.resolve_dataset(provider_code, from_year, None).await?
                }
                Err(e) => return Err(e),
            },
        };

        let from = self
            .store
            .provider_summary(provider_code, from_year, dataset)
            .await?;
        let to = self
            .store
            .provider_summary(provider_code, to_year, dataset)
            .await?;

        Ok(MomentumReport {
            provider_code: provider_code.to_string(),
            dataset_type: dataset,
            from_year,
            to_year,
            momentum: compute_momentum(
                from.as_ref().map(|s| &s.scores),
                to.as_ref().map(|s| &s.scores),
            ),
        })
    }

    pub async fn peer_statistics(
        &self,
        year: i32,
        dataset: DatasetType,
        measure: MeasureCode,
    ) -> Result<Option<PeerStatistics>, TsmError> {
        let values: Vec<f64> = self
            .store
            .scores(year, dataset)
            .await?
            .into_iter()
            .filter(|s| s.measure == measure)
            .map(|s| s.score)
            .collect();
        Ok(peer_statistics(&values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analytics::{Quartile, Trend};
    use crate::domain::etl::to_score_records;
    use crate::domain::measure::MeasureScores;
    use crate::domain::records::{
        CorrelationRecord, PercentileRecord, ProviderDatasetMapping, ProviderSummary,
        RawProviderRow, ScoreRecord, TableCounts, YearBatch,
    };
    use crate::domain::stats::{compute_correlations, compute_percentiles};
    use crate::infrastructure::adapters::DuckDbStore;
    use anyhow::Result;
    use async_trait::async_trait;

    /// Every call fails, as a lost connection would.
    struct OfflineStore;

    fn offline<T>() -> Result<T, TsmError> {
        Err(TsmError::InternalError("store offline".to_string()))
    }

    #[async_trait]
    impl ScoreStore for OfflineStore {
        async fn initialize(&self) -> Result<(), TsmError> {
            offline()
        }
        async fn replace_year(&self, _: &YearBatch) -> Result<TableCounts, TsmError> {
            offline()
        }
        async fn years(&self) -> Result<Vec<i32>, TsmError> {
            offline()
        }
        async fn table_counts(&self, _: Option<i32>) -> Result<TableCounts, TsmError> {
            offline()
        }
        async fn scores(&self, _: i32, _: DatasetType) -> Result<Vec<ScoreRecord>, TsmError> {
            offline()
        }
        async fn provider_percentiles(
            &self,
            _: &str,
            _: i32,
            _: DatasetType,
        ) -> Result<Vec<PercentileRecord>, TsmError> {
            offline()
        }
        async fn correlations(
            &self,
            _: i32,
            _: DatasetType,
        ) -> Result<Vec<CorrelationRecord>, TsmError> {
            offline()
        }
        async fn summaries(&self, _: i32, _: DatasetType) -> Result<Vec<ProviderSummary>, TsmError> {
            offline()
        }
        async fn provider_summary(
            &self,
            _: &str,
            _: i32,
            _: DatasetType,
        ) -> Result<Option<ProviderSummary>, TsmError> {
            offline()
        }
        async fn mappings(&self, _: i32) -> Result<Vec<ProviderDatasetMapping>, TsmError> {
            offline()
        }
        async fn provider_mappings(
            &self,
            _: &str,
            _: i32,
        ) -> Result<Vec<ProviderDatasetMapping>, TsmError> {
            offline()
        }
        async fn query_count(&self, _: &str) -> Result<u64, TsmError> {
            offline()
        }
        async fn query_column(&self, _: &str) -> Result<Vec<String>, TsmError> {
            offline()
        }
        fn engine_name(&self) -> &str {
            "offline"
        }
    }

    fn row(code: &str, dataset: DatasetType, values: &[(MeasureCode, f64)]) -> RawProviderRow {
        let mut scores = MeasureScores::default();
        for (m, v) in values {
            scores.set(*m, Some(*v));
        }
        RawProviderRow {
            provider_code: code.to_string(),
            provider_name: format!("{} Homes", code),
            dataset_type: dataset,
            scores,
        }
    }

    async fn load(store: &DuckDbStore, year: i32, rows: &[RawProviderRow], category: &[(&str, &str)]) -> Result<()> {
        let scores = to_score_records(rows, year);
        let batch = YearBatch {
            year,
            percentiles: compute_percentiles(&scores),
            correlations: compute_correlations(&scores, year),
            mappings: rows
                .iter()
                .map(|r| ProviderDatasetMapping {
                    provider_code: r.provider_code.clone(),
                    provider_name: r.provider_name.clone(),
                    dataset_type: r.dataset_type,
                    provider_category: category
                        .iter()
                        .find(|(c, _)| *c == r.provider_code)
                        .map(|(_, t)| t.to_string()),
                    year,
                })
                .collect(),
            summaries: rows.iter().map(|r| ProviderSummary::from_row(r, year)).collect(),
            scores,
        };
        store.initialize().await?;
        store.replace_year(&batch).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_rankings_with_category_filter() -> Result<()> {
        let store = DuckDbStore::in_memory()?;
        let rows = vec![
            row("A", DatasetType::Primary, &[(MeasureCode::Tp01, 90.0)]),
            row("B", DatasetType::Primary, &[(MeasureCode::Tp01, 80.0), (MeasureCode::Tp02, 50.0)]),
            row("C", DatasetType::Primary, &[(MeasureCode::Tp01, 70.0)]),
            row("D", DatasetType::Primary, &[(MeasureCode::Tp01, 60.0)]),
        ];
        load(&store, 2024, &rows, &[("A", "LA"), ("C", "LA")]).await?;
        let service = AnalyticsService::new(&store);

        let all = service.rankings(2024, DatasetType::Primary, &PeerFilter::All).await?;
        let order: Vec<_> = all.iter().map(|r| r.provider_code.as_str()).collect();
        assert_eq!(order, vec!["A", "C", "B", "D"]);
        assert_eq!(all[3].quartile, Quartile::Low);

        let la = service
            .rankings(2024, DatasetType::Primary, &PeerFilter::ProviderCategory("la".into()))
            .await?;
        assert_eq!(la.len(), 2);
        assert_eq!(la[1].provider_code, "C");
        Ok(())
    }

    #[tokio::test]
    async fn test_priority_prefers_primary_dataset() -> Result<()> {
        let store = DuckDbStore::in_memory()?;
        let rows = vec![
            row("A", DatasetType::Primary, &[(MeasureCode::Tp01, 90.0), (MeasureCode::Tp05, 40.0)]),
            row("B", DatasetType::Primary, &[(MeasureCode::Tp01, 80.0), (MeasureCode::Tp05, 80.0)]),
            row("A", DatasetType::Secondary, &[(MeasureCode::Tp01, 50.0), (MeasureCode::Tp06, 50.0)]),
        ];
        load(&store, 2024, &rows, &[]).await?;
        let service = AnalyticsService::new(&store);

        let p = service.priority("A", 2024, None).await?;
        assert_eq!(p.dataset_type, DatasetType::Primary);
        assert_eq!(p.top.measure, MeasureCode::Tp05);
        // 50th percentile, no correlation stored: 50 * 0.6 + 0.5 * 40
        assert!((p.top.priority_score - 50.0).abs() < 1e-9);

        let s = service.priority("A", 2024, Some(DatasetType::Secondary)).await?;
        assert_eq!(s.top.measure, MeasureCode::Tp06);

        let missing = service.priority("Z", 2024, None).await;
        assert!(matches!(
            missing,
            Err(TsmError::Domain(DomainError::ProviderNotFound { .. }))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_momentum_across_years() -> Result<()> {
        let store = DuckDbStore::in_memory()?;
        load(
            &store,
            2024,
            &[row("A", DatasetType::Primary, &[(MeasureCode::Tp01, 70.0), (MeasureCode::Tp02, 72.0)])],
            &[],
        )
        .await?;
        load(
            &store,
            2025,
            &[row("A", DatasetType::Primary, &[(MeasureCode::Tp01, 75.0), (MeasureCode::Tp02, 74.0)])],
            &[],
        )
        .await?;
        let service = AnalyticsService::new(&store);

        let report = service.momentum("A", 2024, 2025, None).await?;
        assert_eq!(report.momentum.trend(), Some(Trend::Improving));

        let gap = service.momentum("A", 2023, 2025, None).await?;
        assert!(matches!(gap.momentum, Momentum::InsufficientData { .. }));

        let stats = service
            .peer_statistics(2025, DatasetType::Primary, MeasureCode::Tp02)
            .await?;
        assert_eq!(stats.map(|s| s.count), Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn test_momentum_propagates_store_failures() -> Result<()> {
        let store = OfflineStore;
        let service = AnalyticsService::new(&store);
        let result = service.momentum("A", 2024, 2025, None).await;
        assert!(matches!(result, Err(TsmError::InternalError(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_momentum_for_unknown_provider_is_not_found() -> Result<()> {
        let store = DuckDbStore::in_memory()?;
        load(
            &store,
            2024,
            &[row("A", DatasetType::Primary, &[(MeasureCode::Tp01, 70.0)])],
            &[],
        )
        .await?;
        let service = AnalyticsService::new(&store);

        let result = service.momentum("Z", 2024, 2025, None).await;
        assert!(matches!(
            result,
            Err(TsmError::Domain(DomainError::ProviderNotFound { .. }))
        ));

        // Present in the base year only: resolved from it, then insufficient data.
        let report = service.momentum("A", 2024, 2025, None).await?;
        assert_eq!(report.dataset_type, DatasetType::Primary);
        assert!(matches!(report.momentum, Momentum::InsufficientData { .. }));
        Ok(())
    }
}
