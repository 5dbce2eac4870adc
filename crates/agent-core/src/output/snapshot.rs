//! Snapshot files
//!
//! Snapshots are written as pretty JSON, one file per snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use agent_model::EngineSnapshot;

use crate::error::OutputError;

/// Write a snapshot to `path`, creating parent directories as needed
pub fn write_snapshot(snapshot: &EngineSnapshot, path: impl AsRef<Path>) -> Result<(), OutputError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(path, json)?;
    Ok(())
}

/// Write a snapshot into `dir` as `<snapshot_id>.json`. Returns the file path.
pub fn write_snapshot_to_dir(
    snapshot: &EngineSnapshot,
    dir: impl AsRef<Path>,
) -> Result<PathBuf, OutputError> {
    let path = dir.as_ref().join(format!("{}.json", snapshot.snapshot_id));
    write_snapshot(snapshot, &path)?;
    Ok(path)
}

pub fn read_snapshot(path: impl AsRef<Path>) -> Result<EngineSnapshot, OutputError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
