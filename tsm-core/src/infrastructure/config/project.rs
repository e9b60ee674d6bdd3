// tsm-core/src/infrastructure/config/project.rs

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::domain::project::ProjectConfig;
use crate::infrastructure::error::InfrastructureError;

pub const CONFIG_CANDIDATES: [&str; 2] = ["tsm_project.yaml", "tsm.yaml"];

#[instrument(skip(project_dir))]
pub fn load_project_config(project_dir: &Path) -> Result<ProjectConfig, InfrastructureError> {
    let config_path = find_main_config(project_dir)?;
    info!(path = ?config_path, "Loading project configuration");

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read project config at {:?}", config_path))?;
    let mut config: ProjectConfig = serde_yaml::from_str(&content)?;

    // Layering: TSM_DATABASE=/tmp/x.duckdb tsm load ...
    apply_env_overrides(&mut config);
    config.validate()?;

    Ok(config)
}

/// Same as [`load_project_config`] but a missing file yields the built-in defaults.
pub fn load_project_config_or_default(
    project_dir: &Path,
) -> Result<ProjectConfig, InfrastructureError> {
    match load_project_config(project_dir) {
        Err(InfrastructureError::ConfigNotFound(reason)) => {
            warn!(%reason, "No project file, using defaults");
            let mut config = ProjectConfig::default();
            apply_env_overrides(&mut config);
            Ok(config)
        }
        other => other,
    }
}

fn find_main_config(root: &Path) -> Result<PathBuf, InfrastructureError> {
    for filename in CONFIG_CANDIDATES {
        let p = root.join(filename);
        if p.exists() {
            return Ok(p);
        }
    }
    Err(InfrastructureError::ConfigNotFound(format!(
        "No configuration file found in {:?}. Checked: {:?}",
        root, CONFIG_CANDIDATES
    )))
}

fn apply_env_overrides(config: &mut ProjectConfig) {
    if let Ok(val) = std::env::var("TSM_DATABASE") {
        info!(old = ?config.database, new = ?val, "Overriding database path via ENV");
        config.database = val;
    }
    if let Ok(val) = std::env::var("TSM_TARGET_PATH") {
        info!(old = ?config.target_path, new = ?val, "Overriding target path via ENV");
        config.target_path = val;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_not_found() -> Result<()> {
        let dir = tempdir()?;
        assert!(matches!(
            load_project_config(dir.path()),
            Err(InfrastructureError::ConfigNotFound(_))
        ));
        let config = load_project_config_or_default(dir.path())?;
        assert_eq!(config.sheets.coverage, "Table_Coverage");
        Ok(())
    }

    #[test]
    fn test_second_candidate_and_validation() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("tsm.yaml"), "name: demo\nvalidation:\n  min-in-range-ratio: 0.8\n")?;
        let config = load_project_config(dir.path())?;
        assert_eq!(config.name, "demo");
        assert_eq!(config.validation.min_in_range_ratio, 0.8);

        fs::write(dir.path().join("tsm_project.yaml"), "name: ''\n")?;
        assert!(matches!(
            load_project_config(dir.path()),
            Err(InfrastructureError::ConfigInvalid(_))
        ));
        Ok(())
    }

    #[test]
    fn test_broken_yaml_is_reported() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("tsm_project.yaml"), "detection: [unclosed")?;
        assert!(matches!(
            load_project_config(dir.path()),
            Err(InfrastructureError::YamlError(_))
        ));
        Ok(())
    }
}
