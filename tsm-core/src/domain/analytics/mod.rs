// tsm-core/src/domain/analytics/mod.rs

pub mod distribution;
pub mod momentum;
pub mod priority;
pub mod ranking;

pub use distribution::{PeerStatistics, peer_statistics};
pub use momentum::{Direction, MeasureMomentum, Momentum, Trend, compute_momentum};
pub use priority::{MeasurePriority, PriorityAssessment, PriorityLevel, assess_priorities, priority_score};
pub use ranking::{PeerFilter, Quartile, RankedProvider, composite_score, rank_providers};
