// tsm-core/src/domain/project/configuration.rs

use crate::domain::dataset::DatasetType;
use crate::domain::schema::{FallbackLayouts, LayoutOverride};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Serialize, Validate, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectConfig {
    #[serde(default = "default_name")]
    #[validate(length(min = 1, message = "Project name cannot be empty"))]
    pub name: String,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_target_path")]
    pub target_path: String,

    #[serde(default)]
    #[validate(nested)]
    pub sheets: SheetNames,

    #[serde(default)]
    #[validate(nested)]
    pub coverage: CoverageColumns,

    #[serde(default)]
    #[validate(nested)]
    pub detection: DetectionConfig,

    #[serde(default)]
    #[validate(nested)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub layouts: Vec<LayoutOverride>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            database: default_database(),
            target_path: default_target_path(),
            sheets: SheetNames::default(),
            coverage: CoverageColumns::default(),
            detection: DetectionConfig::default(),
            validation: ValidationConfig::default(),
            layouts: Vec::new(),
        }
    }
}

impl ProjectConfig {
    pub fn fallback_layouts(&self) -> FallbackLayouts {
        FallbackLayouts::builtin().with_overrides(&self.layouts)
    }
}

/// Sheet name templates. `{yy}` and `{yyyy}` expand to the load year.
#[derive(Debug, Deserialize, Serialize, Validate, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct SheetNames {
    #[validate(length(min = 1))]
    pub coverage: String,
    #[validate(length(min = 1))]
    pub primary: String,
    #[validate(length(min = 1))]
    pub secondary: String,
    #[validate(length(min = 1))]
    pub combined: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            coverage: "Table_Coverage".to_string(),
            primary: "TSM{yy}_LCRA_Perception".to_string(),
            secondary: "TSM{yy}_LCHO_Perception".to_string(),
            combined: "TSM{yy}_Combined_Perception".to_string(),
        }
    }
}

impl SheetNames {
    pub fn template(&self, dataset: DatasetType) -> &str {
        match dataset {
            DatasetType::Primary => &self.primary,
            DatasetType::Secondary => &self.secondary,
            DatasetType::Combined => &self.combined,
        }
    }

    pub fn resolve(&self, dataset: DatasetType, year: i32) -> String {
        expand_template(self.template(dataset), year)
    }

    pub fn coverage_sheet(&self, year: i32) -> String {
        expand_template(&self.coverage, year)
    }
}

pub fn expand_template(template: &str, year: i32) -> String {
    template
        .replace("{yyyy}", &year.to_string())
        .replace("{yy}", &format!("{:02}", year.rem_euclid(100)))
}

/// Column positions of the coverage sheet (0-based).
#[derive(Debug, Deserialize, Serialize, Validate, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct CoverageColumns {
    #[validate(range(max = 1000))]
    pub data_start_row: usize,
    pub name: usize,
    pub code: usize,
    pub provider_type: usize,
    pub primary_flag: usize,
    pub secondary_flag: usize,
    pub combined_flag: usize,
}

impl Default for CoverageColumns {
    fn default() -> Self {
        Self {
            data_start_row: 4,
            name: 0,
            code: 1,
            provider_type: 2,
            primary_flag: 3,
            secondary_flag: 4,
            combined_flag: 5,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct DetectionConfig {
    #[validate(range(min = 1, max = 200))]
    pub scan_rows: usize,
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_measure_ratio: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            scan_rows: crate::domain::schema::detector::DEFAULT_SCAN_ROWS,
            min_measure_ratio: crate::domain::schema::detector::DEFAULT_MIN_MEASURE_RATIO,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ValidationConfig {
    /// Below this share of in-range values a measure column is reported as suspect.
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_in_range_ratio: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_in_range_ratio: 0.5,
        }
    }
}

fn default_name() -> String {
    "tsm".to_string()
}
fn default_database() -> String {
    "target/tsm_analytics.duckdb".to_string()
}
fn default_target_path() -> String {
    "target".to_string()
}
