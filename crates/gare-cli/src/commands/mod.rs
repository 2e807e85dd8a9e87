pub mod infer;
pub mod layout;
pub mod search;
pub mod session;
pub mod stats;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gare_graph::{EngineConfig, MemoryStore};
use tracing::debug;

use crate::paths;

/// Load the engine config from `--config` or the default location.
pub fn load_config(explicit: Option<&Path>) -> Result<EngineConfig> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(paths::get_config_path);
    if explicit.is_some() && !path.exists() {
        anyhow::bail!("Config file not found: {}", path.display());
    }
    debug!(path = %path.display(), "Loading config");
    EngineConfig::load(&path)
}

/// Resolve the snapshot path and load it.
pub fn open_snapshot(snapshot: Option<PathBuf>) -> Result<(PathBuf, MemoryStore)> {
    let path = snapshot.unwrap_or_else(paths::get_snapshot_path);
    if !path.exists() {
        anyhow::bail!(
            "No record snapshot at {}. Pass a snapshot path or set GARE_DATA_DIR.",
            path.display()
        );
    }
    let store = MemoryStore::load(&path)
        .with_context(|| format!("Could not open snapshot {}", path.display()))?;
    Ok((path, store))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_config(Some(&missing)).is_err());
    }

    #[test]
    fn test_open_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = testing::write_family_snapshot(dir.path());
        let (opened, store) = open_snapshot(Some(path.clone())).unwrap();
        assert_eq!(opened, path);
        assert_eq!(store.edge_count(), 0);
        assert!(open_snapshot(Some(dir.path().join("missing.json"))).is_err());
    }
}
