use anyhow::Result;
use std::path::Path;

use crate::metadata::MetadataCache;
use crate::runtime::Runtime;

use super::config::Config;

/// Rebuild the metadata cache, from brew or from a saved
/// `brew info --json=v1` dump.
#[tracing::instrument(skip(runtime, config))]
pub fn refresh<R: Runtime>(runtime: R, from_file: Option<&Path>, config: Config) -> Result<()> {
    let cache = MetadataCache::new(&runtime, &config.cache_dir);
    let count = match from_file {
        Some(path) => cache.refresh_from_file(path)?,
        None => cache.refresh_from_brew(&config.brew_command)?,
    };
    println!(
        "Cached metadata for {} formulae in {}",
        count,
        cache.root().display()
    );
    Ok(())
}
