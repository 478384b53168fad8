use anyhow::Result;
use log::debug;

use crate::runtime::Runtime;

use super::config::Config;
use super::{BrewSection, load_brewfile, open_cache, save_brewfile};

/// Regenerate the brew section: pull in missing dependencies up to the
/// configured level and rewrite every annotation.
#[tracing::instrument(skip(runtime, config))]
pub fn clean<R: Runtime>(runtime: R, dry_run: bool, config: Config) -> Result<()> {
    let (path, mut packages) = load_brewfile(&runtime, &config)?;

    let cache = open_cache(&runtime, &config)?;
    let section = BrewSection::load(&cache, &packages, config.level)?;
    debug!(
        "Resolved {} brew entries at level {}",
        section.graph.len(),
        config.level
    );
    let untracked = section.untracked.len();
    section.store(&mut packages);

    save_brewfile(&runtime, &path, &packages, dry_run)?;
    if untracked > 0 {
        println!(
            "Kept {} brew entries without metadata as they are. Run 'bfm refresh' if they come from a new tap.",
            untracked
        );
    }
    println!("Cleaned {}", path.display());
    Ok(())
}
