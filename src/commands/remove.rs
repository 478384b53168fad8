use anyhow::{Result, bail};
use log::debug;

use crate::brew::{Declaration, GraphError};
use crate::brewfile::{PackageKind, Packages};
use crate::runtime::Runtime;

use super::config::Config;
use super::{BrewSection, join_names, load_brewfile, open_cache, save_brewfile};

/// Remove a package from the Brewfile, pruning brew dependencies nothing
/// needs any more.
#[tracing::instrument(skip(runtime, config))]
pub fn remove<R: Runtime>(
    runtime: R,
    name: &str,
    kind: PackageKind,
    dry_run: bool,
    config: Config,
) -> Result<()> {
    debug!("Removing {} {}", kind, name);
    let (path, mut packages) = load_brewfile(&runtime, &config)?;

    let report = match kind {
        PackageKind::Brew => remove_brew(&runtime, name, &config, &mut packages)?,
        kind => {
            if packages.remove(kind, name) == 0 {
                bail!("{} {} not found in the Brewfile.", kind, name);
            }
            vec![format!("Removed {} {} from the Brewfile.", kind, name)]
        }
    };

    save_brewfile(&runtime, &path, &packages, dry_run)?;
    for line in report {
        println!("{}", line);
    }
    Ok(())
}

fn remove_brew<R: Runtime>(
    runtime: &R,
    name: &str,
    config: &Config,
    packages: &mut Packages,
) -> Result<Vec<String>> {
    let cache = open_cache(runtime, config)?;
    let mut section = BrewSection::load(&cache, packages, config.level)?;

    // A line the cache knows nothing about can still be dropped by name.
    let before = section.untracked.len();
    section.untracked.retain(|line| {
        Declaration::parse(line).is_none_or(|declaration| declaration.name != name)
    });
    if section.untracked.len() != before {
        section.store(packages);
        return Ok(vec![format!("Removed {} from the Brewfile.", name)]);
    }

    let canonical = match section.graph.canonical_name(name) {
        Ok(canonical) if section.graph.contains(&canonical) => canonical,
        Ok(_) | Err(GraphError::MetadataNotFound(_)) => {
            bail!("{} not found in the Brewfile.", name)
        }
        Err(err) => return Err(err.into()),
    };

    let before = section.tracked_names();
    section.graph.remove(&canonical, config.level)?;
    let pruned: Vec<String> = before
        .difference(&section.tracked_names())
        .filter(|dependency| **dependency != canonical)
        .cloned()
        .collect();

    let mut report = vec![format!("Removed {} from the Brewfile.", canonical)];
    if !pruned.is_empty() {
        report.push(format!(
            "Removed dependencies no longer needed: {}",
            join_names(&pruned)
        ));
    }

    section.store(packages);
    Ok(report)
}
