// tsm-core/src/infrastructure/fs.rs

use crate::infrastructure::error::InfrastructureError;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Writes through a sibling temp file and a rename: readers see the old file or the new one.
pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(
    path: P,
    content: C,
) -> Result<(), InfrastructureError> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(content.as_ref())?;
    temp_file
        .persist(path)
        .map_err(|e| InfrastructureError::Io(e.error))?;
    Ok(())
}

/// Pretty JSON, written atomically.
pub fn write_json<P: AsRef<Path>, T: Serialize>(
    path: P,
    value: &T,
) -> Result<(), InfrastructureError> {
    let body = serde_json::to_string_pretty(value)?;
    atomic_write(path, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_creates_parents_and_overwrites() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("target").join("run_2024.json");

        atomic_write(&file_path, "first")?;
        atomic_write(&file_path, "second")?;

        assert_eq!(fs::read_to_string(&file_path)?, "second");
        let leftovers = fs::read_dir(file_path.parent().unwrap_or(dir.path()))?.count();
        assert_eq!(leftovers, 1);
        Ok(())
    }

    #[test]
    fn test_write_json() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("summary.json");
        write_json(&path, &serde_json::json!({"year": 2024}))?;
        let back: serde_json::Value = serde_json::from_str(&fs::read_to_string(path)?)?;
        assert_eq!(back["year"], 2024);
        Ok(())
    }
}
