//! Shared path utilities for gare-cli

use std::path::PathBuf;

/// Get the base Gare data directory.
pub fn get_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("GARE_DATA_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home).join(".gare");
    }
    PathBuf::from(".gare")
}

/// Config file: `$GARE_CONFIG` if set, else `gare.toml` in the data dir.
pub fn get_config_path() -> PathBuf {
    if let Some(path) = std::env::var_os("GARE_CONFIG") {
        return PathBuf::from(path);
    }
    get_data_dir().join("gare.toml")
}

/// Default record snapshot
pub fn get_snapshot_path() -> PathBuf {
    get_data_dir().join("records.json")
}
