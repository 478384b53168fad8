use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

fn home_dir<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    runtime.home_dir().context("Could not find home directory")
}

/// Get the default config file location: `~/.bfm.json`
#[tracing::instrument(skip(runtime))]
pub fn default_config_path<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    Ok(home_dir(runtime)?.join(".bfm.json"))
}

/// Get the default metadata cache root: `~/.bfm/cache`
#[tracing::instrument(skip(runtime))]
pub fn default_cache_dir<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    Ok(home_dir(runtime)?.join(".bfm").join("cache"))
}

/// Expand a leading `~` to the home directory.
pub fn expand_home<R: Runtime>(runtime: &R, path: &Path) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => Ok(home_dir(runtime)?.join(rest)),
        Err(_) => Ok(path.to_path_buf()),
    }
}
