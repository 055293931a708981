//! Configuration loading from TOML files.
//!
//! Thin wrapper over [`ccindex_store::RunConfig`]: resolves which file to
//! load (an explicit `--config`, else `./ccindex.toml`, else the user's XDG
//! config directory), then hands back the parsed `RunConfig` CLI flags
//! layer on top of.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ccindex_store::RunConfig;

/// Search order: `./ccindex.toml`, then `~/.config/ccindex/config.toml`.
/// Returns built-in defaults if neither exists.
pub fn load() -> Result<RunConfig> {
    let local_config = PathBuf::from("ccindex.toml");
    if local_config.exists() {
        return from_file(&local_config);
    }

    if let Some(dirs) = directories::ProjectDirs::from("", "", "ccindex") {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            return from_file(&user_config);
        }
    }

    log::debug!("no config file found, using defaults");
    Ok(RunConfig::default())
}

pub fn from_file(path: &Path) -> Result<RunConfig> {
    let config = RunConfig::from_file(path).with_context(|| format!("loading config {}", path.display()))?;
    log::info!("loaded config from {}", path.display());
    Ok(config)
}
