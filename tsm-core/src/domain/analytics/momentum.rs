// tsm-core/src/domain/analytics/momentum.rs

use crate::domain::measure::{MeasureCode, MeasureScores};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Average change beyond which a provider is trending.
pub const TREND_THRESHOLD: f64 = 0.5;
/// Per-measure deadband.
pub const CHANGE_THRESHOLD: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

impl Trend {
    pub fn from_average(average_change: f64) -> Self {
        if average_change > TREND_THRESHOLD {
            Self::Improving
        } else if average_change < -TREND_THRESHOLD {
            Self::Declining
        } else {
            Self::Stable
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Improving => "improving",
            Self::Stable => "stable",
            Self::Declining => "declining",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Improved,
    Unchanged,
    Declined,
}

impl Direction {
    pub fn from_change(change: f64) -> Self {
        if change > CHANGE_THRESHOLD {
            Self::Improved
        } else if change < -CHANGE_THRESHOLD {
            Self::Declined
        } else {
            Self::Unchanged
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Improved => "improved",
            Self::Unchanged => "unchanged",
            Self::Declined => "declined",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureMomentum {
    pub measure: MeasureCode,
    pub from: f64,
    pub to: f64,
    pub change: f64,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Momentum {
    /// One of the years is missing, or they share no measure.
    InsufficientData { reason: String },
    Assessed {
        average_change: f64,
        trend: Trend,
        measures: Vec<MeasureMomentum>,
    },
}

impl Momentum {
    pub fn trend(&self) -> Option<Trend> {
        match self {
            Self::Assessed { trend, .. } => Some(*trend),
            Self::InsufficientData { .. } => None,
        }
    }
}

/// `change = to - from` for every measure scored in both years.
pub fn compute_momentum(from: Option<&MeasureScores>, to: Option<&MeasureScores>) -> Momentum {
    let (Some(from), Some(to)) = (from, to) else {
        return Momentum::InsufficientData {
            reason: "no scores for one of the years".to_string(),
        };
    };

    let measures: Vec<MeasureMomentum> = MeasureCode::ALL
        .iter()
        .filter_map(|code| {
            let a = from.get(*code)?;
            let b = to.get(*code)?;
            let change = b - a;
            Some(MeasureMomentum {
                measure: *code,
                from: a,
                to: b,
                change,
                direction: Direction::from_change(change),
            })
        })
        .collect();

    if measures.is_empty() {
        return Momentum::InsufficientData {
            reason: "no measure scored in both years".to_string(),
        };
    }

    let average_change = measures.iter().map(|m| m.change).sum::<f64>() / measures.len() as f64;
    Momentum::Assessed {
        average_change,
        trend: Trend::from_average(average_change),
        measures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(values: &[(MeasureCode, f64)]) -> MeasureScores {
        let mut s = MeasureScores::default();
        for (m, v) in values {
            s.set(*m, Some(*v));
        }
        s
    }

    #[test]
    fn test_improving_example() {
        let a = scores(&[(MeasureCode::Tp01, 70.0), (MeasureCode::Tp02, 72.0)]);
        let b = scores(&[(MeasureCode::Tp01, 75.0), (MeasureCode::Tp02, 74.0)]);
        match compute_momentum(Some(&a), Some(&b)) {
            Momentum::Assessed {
                average_change,
                trend,
                measures,
            } => {
                assert!((average_change - 3.5).abs() < 1e-9);
                assert_eq!(trend, Trend::Improving);
                assert_eq!(measures[0].direction, Direction::Improved);
                assert_eq!(measures[1].direction, Direction::Improved);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_deadbands() {
        let a = scores(&[(MeasureCode::Tp01, 70.0), (MeasureCode::Tp05, 70.0)]);
        let b = scores(&[(MeasureCode::Tp01, 71.0), (MeasureCode::Tp05, 69.6)]);
        let m = compute_momentum(Some(&a), Some(&b));
        assert_eq!(m.trend(), Some(Trend::Stable));
        if let Momentum::Assessed { measures, .. } = m {
            assert!(measures.iter().all(|m| m.direction == Direction::Unchanged));
        }
        assert_eq!(Trend::from_average(-0.51), Trend::Declining);
        assert_eq!(Direction::from_change(-1.01), Direction::Declined);
    }

    #[test]
    fn test_missing_year_is_insufficient_not_stable() {
        let a = scores(&[(MeasureCode::Tp01, 70.0)]);
        assert!(matches!(
            compute_momentum(Some(&a), None),
            Momentum::InsufficientData { .. }
        ));
        let b = scores(&[(MeasureCode::Tp02, 70.0)]);
        assert_eq!(compute_momentum(Some(&a), Some(&b)).trend(), None);
    }

    #[test]
    fn test_only_shared_measures_count() {
        let a = scores(&[(MeasureCode::Tp01, 60.0), (MeasureCode::Tp03, 10.0)]);
        let b = scores(&[(MeasureCode::Tp01, 58.0), (MeasureCode::Tp04, 99.0)]);
        match compute_momentum(Some(&a), Some(&b)) {
            Momentum::Assessed { average_change, trend, measures } => {
                assert_eq!(measures.len(), 1);
                assert!((average_change + 2.0).abs() < 1e-9);
                assert_eq!(trend, Trend::Declining);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
