// tsm/src/commands/mod.rs

pub mod inspect;
pub mod load;
pub mod momentum;
pub mod priority;
pub mod rank;
pub mod validate;

use anyhow::{Context, bail};
use comfy_table::{Row, Table, presets::UTF8_FULL};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use tsm_core::domain::DatasetType;
use tsm_core::domain::project::ProjectConfig;
use tsm_core::infrastructure::adapters::DuckDbStore;
use tsm_core::infrastructure::config::load_project_config_or_default;

use crate::cli::GlobalArgs;

/// Project configuration plus the resolved database location.
pub struct Session {
    pub config: ProjectConfig,
    pub db_path: String,
    pub target_dir: PathBuf,
}

impl Session {
    pub fn resolve(global: &GlobalArgs) -> anyhow::Result<Self> {
        let config = load_project_config_or_default(&global.project_dir).with_context(|| {
            format!(
                "Failed to load project configuration from {:?}",
                global.project_dir
            )
        })?;
        let db_path = match &global.db {
            Some(db) => db.clone(),
            None => relative_to(&global.project_dir, &config.database),
        };
        let target_dir = global.project_dir.join(&config.target_path);
        debug!(db = %db_path, target = ?target_dir, "Session resolved");
        Ok(Self {
            config,
            db_path,
            target_dir,
        })
    }

    /// Read commands never create a database.
    pub fn require_database(&self) -> anyhow::Result<()> {
        if self.db_path != ":memory:" && !Path::new(&self.db_path).exists() {
            bail!(
                "❌ Database not found at: {}\n👉 Have you run 'tsm load'?",
                self.db_path
            );
        }
        Ok(())
    }

    pub fn open_existing(&self) -> anyhow::Result<DuckDbStore> {
        self.require_database()?;
        DuckDbStore::open(&self.db_path)
            .with_context(|| format!("Failed to open DuckDB at {}", self.db_path))
    }
}

fn relative_to(dir: &Path, path: &str) -> String {
    if path == ":memory:" || Path::new(path).is_absolute() {
        path.to_string()
    } else {
        dir.join(path).to_string_lossy().into_owned()
    }
}

/// Every command prints through the same table style.
pub fn table(header: impl Into<Row>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header);
    table
}

pub fn parse_dataset(value: &str) -> anyhow::Result<DatasetType> {
    Ok(DatasetType::from_str(value)?)
}

pub fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.1}", v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_table_keeps_header_and_rows() {
        let mut t = table(vec!["Code", "Score"]);
        t.add_row(vec!["L1", "81.0"]);
        let rendered = t.to_string();
        assert!(rendered.contains("Code"));
        assert!(rendered.contains("81.0"));
    }

    #[test]
    fn test_dataset_labels() -> Result<()> {
        assert_eq!(parse_dataset("lcho")?, DatasetType::Secondary);
        assert!(parse_dataset("HOSTEL").is_err());
        assert_eq!(fmt_opt(None), "-");
        assert_eq!(fmt_opt(Some(0.456)), "0.5");
        Ok(())
    }
}
