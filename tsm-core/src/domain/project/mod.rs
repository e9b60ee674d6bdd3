// tsm-core/src/domain/project/mod.rs

pub mod configuration;

pub use configuration::{
    CoverageColumns, DetectionConfig, ProjectConfig, SheetNames, ValidationConfig,
};
