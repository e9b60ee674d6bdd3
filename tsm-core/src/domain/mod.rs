// tsm-core/src/domain/mod.rs

pub mod analytics;
pub mod dataset;
pub mod error;
pub mod etl;
pub mod measure;
pub mod project;
pub mod records;
pub mod schema;
pub mod stats;

pub use dataset::DatasetType;
pub use error::DomainError;
pub use measure::{MeasureCode, MeasureScores};
