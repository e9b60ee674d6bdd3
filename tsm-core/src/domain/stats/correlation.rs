// tsm-core/src/domain/stats/correlation.rs

use crate::domain::dataset::DatasetType;
use crate::domain::measure::MeasureCode;
use crate::domain::records::{CorrelationRecord, ScoreRecord};
use crate::domain::stats::distribution::student_t_two_sided;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Correlations need strictly more than five paired providers.
pub const MIN_SAMPLE_SIZE: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spearman {
    pub rho: f64,
    pub p_value: f64,
    pub sample_size: usize,
}

/// 1-based ranks; tied values get the mean of the ranks they span.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|a, b| values[*a].total_cmp(&values[*b]));

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // Positions i..=j share rank ((i+1) + (j+1)) / 2.
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for idx in &order[i..=j] {
            ranks[*idx] = rank;
        }
        i = j + 1;
    }
    ranks
}

fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Spearman rank correlation with a two-sided p-value (t approximation, n - 2 df).
/// `None` when fewer than three pairs or when either side is constant.
pub fn spearman(x: &[f64], y: &[f64]) -> Option<Spearman> {
    let n = x.len().min(y.len());
    if n < 3 {
        return None;
    }
    let rho = pearson(&average_ranks(&x[..n]), &average_ranks(&y[..n]))?;
    let df = (n - 2) as f64;
    let p_value = if (1.0 - rho.abs()) < 1e-12 {
        0.0
    } else {
        let t = rho * (df / ((1.0 - rho) * (1.0 + rho))).sqrt();
        student_t_two_sided(t, df)
    };
    Some(Spearman {
        rho,
        p_value,
        sample_size: n,
    })
}

/// Every applicable non-primary measure against TP01, per dataset type.
/// Pairs are joined on provider code; small or degenerate samples are omitted.
pub fn compute_correlations(scores: &[ScoreRecord], year: i32) -> Vec<CorrelationRecord> {
    // dataset -> measure -> provider -> score. BTreeMaps keep output deterministic.
    let mut index: BTreeMap<DatasetType, HashMap<MeasureCode, BTreeMap<&str, f64>>> =
        BTreeMap::new();
    for s in scores.iter().filter(|s| s.year == year) {
        index
            .entry(s.dataset_type)
            .or_default()
            .entry(s.measure)
            .or_default()
            .insert(s.provider_code.as_str(), s.score);
    }

    let mut out = Vec::new();
    for (dataset, by_measure) in &index {
        let Some(primary) = by_measure.get(&MeasureCode::PRIMARY) else {
            continue;
        };
        for measure in dataset.applicable_measures() {
            if measure.is_primary() {
                continue;
            }
            let Some(other) = by_measure.get(&measure) else {
                continue;
            };

            let (xs, ys): (Vec<f64>, Vec<f64>) = other
                .iter()
                .filter_map(|(code, v)| primary.get(code).map(|p| (*v, *p)))
                .unzip();

            if xs.len() < MIN_SAMPLE_SIZE {
                debug!(
                    dataset = %dataset,
                    measure = %measure,
                    sample = xs.len(),
                    "Sample too small for correlation, omitted"
                );
                continue;
            }

            match spearman(&xs, &ys) {
                Some(result) => out.push(CorrelationRecord {
                    year,
                    measure,
                    dataset_type: *dataset,
                    correlation_with_primary: result.rho,
                    p_value: result.p_value,
                    sample_size: result.sample_size,
                }),
                None => warn!(
                    dataset = %dataset,
                    measure = %measure,
                    "Constant scores, correlation undefined and omitted"
                ),
            }
        }
    }
    out
}
