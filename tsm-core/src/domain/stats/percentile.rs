// tsm-core/src/domain/stats/percentile.rs

use crate::domain::dataset::DatasetType;
use crate::domain::measure::MeasureCode;
use crate::domain::records::{PercentileRecord, ScoreRecord};
use std::collections::HashMap;

type GroupKey = (i32, DatasetType, MeasureCode);

/// Percentage of `sorted` values that are <= `score` (inclusive, so ties share the top value).
/// `sorted` must be ascending. An empty group yields 0.
pub fn percentile_of_score(sorted: &[f64], score: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let at_or_below = sorted.partition_point(|v| *v <= score);
    100.0 * at_or_below as f64 / sorted.len() as f64
}

/// One percentile per input record, in input order. Groups never mix dataset types.
pub fn compute_percentiles(scores: &[ScoreRecord]) -> Vec<PercentileRecord> {
    let mut groups: HashMap<GroupKey, Vec<f64>> = HashMap::new();
    for s in scores {
        groups
            .entry((s.year, s.dataset_type, s.measure))
            .or_default()
            .push(s.score);
    }
    for values in groups.values_mut() {
        values.sort_by(f64::total_cmp);
    }

    scores
        .iter()
        .filter_map(|s| {
            let group = groups.get(&(s.year, s.dataset_type, s.measure))?;
            Some(PercentileRecord {
                provider_code: s.provider_code.clone(),
                year: s.year,
                measure: s.measure,
                dataset_type: s.dataset_type,
                percentile_rank: percentile_of_score(group, s.score),
                peer_group_size: group.len(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(code: &str, dataset: DatasetType, measure: MeasureCode, value: f64) -> ScoreRecord {
        ScoreRecord {
            provider_code: code.to_string(),
            provider_name: code.to_string(),
            year: 2024,
            measure,
            dataset_type: dataset,
            score: value,
        }
    }

    fn ranks(records: &[PercentileRecord]) -> Vec<f64> {
        records.iter().map(|r| r.percentile_rank).collect()
    }

    #[test]
    fn test_four_provider_group() {
        let scores: Vec<_> = [("A", 90.0), ("B", 80.0), ("C", 70.0), ("D", 60.0)]
            .iter()
            .map(|(c, v)| score(c, DatasetType::Primary, MeasureCode::Tp01, *v))
            .collect();
        let out = compute_percentiles(&scores);
        assert_eq!(ranks(&out), vec![100.0, 75.0, 50.0, 25.0]);
        assert!(out.iter().all(|r| r.peer_group_size == 4));
    }

    #[test]
    fn test_ties_share_inclusive_rank() {
        let scores: Vec<_> = [80.0, 80.0, 60.0, 90.0]
            .iter()
            .enumerate()
            .map(|(i, v)| score(&i.to_string(), DatasetType::Primary, MeasureCode::Tp05, *v))
            .collect();
        assert_eq!(ranks(&compute_percentiles(&scores)), vec![75.0, 75.0, 25.0, 100.0]);
    }

    #[test]
    fn test_singleton_group_is_100() {
        let out = compute_percentiles(&[score("A", DatasetType::Combined, MeasureCode::Tp01, 42.0)]);
        assert_eq!(out[0].percentile_rank, 100.0);
        assert_eq!(out[0].peer_group_size, 1);
    }

    #[test]
    fn test_other_dataset_does_not_leak_into_group() {
        let primary: Vec<_> = [("A", 90.0), ("B", 80.0), ("C", 70.0), ("D", 60.0)]
            .iter()
            .map(|(c, v)| score(c, DatasetType::Primary, MeasureCode::Tp01, *v))
            .collect();
        let baseline = compute_percentiles(&primary);

        let mut mixed = vec![
            score("X", DatasetType::Secondary, MeasureCode::Tp01, 95.0),
            score("Y", DatasetType::Secondary, MeasureCode::Tp01, 65.0),
        ];
        mixed.extend(primary.iter().rev().cloned());
        let out = compute_percentiles(&mixed);

        for b in &baseline {
            let m = out
                .iter()
                .find(|r| r.provider_code == b.provider_code && r.dataset_type == DatasetType::Primary);
            assert_eq!(m.map(|r| (r.percentile_rank, r.peer_group_size)), Some((b.percentile_rank, 4)));
        }
        let x = out.iter().find(|r| r.provider_code == "X").map(|r| r.percentile_rank);
        assert_eq!(x, Some(100.0));
    }
}
