use anyhow::Result;
use log::{debug, info};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::{
    brew::{Declaration, DependencyGraph, DependencyLevel},
    brewfile::Packages,
    metadata::{MetadataCache, MetadataSource},
    runtime::Runtime,
};

mod add;
mod check;
mod clean;
pub mod config;
mod paths;
mod refresh;
mod remove;

pub use add::{AddOptions, add};
pub use check::check;
pub use clean::clean;
pub use config::{Config, ConfigOverrides};
pub use refresh::refresh;
pub use remove::remove;

/// Load the configured Brewfile.
fn load_brewfile<R: Runtime>(runtime: &R, config: &Config) -> Result<(PathBuf, Packages)> {
    let path = config.brewfile()?.to_path_buf();
    debug!("Using Brewfile: {:?}", path);
    let packages = Packages::load(runtime, &path)?;
    Ok((path, packages))
}

/// Write the Brewfile, or print it to stdout on a dry run.
#[tracing::instrument(skip(runtime, packages))]
fn save_brewfile<R: Runtime>(
    runtime: &R,
    path: &Path,
    packages: &Packages,
    dry_run: bool,
) -> Result<()> {
    if dry_run {
        print!("{}", packages.to_contents());
        return Ok(());
    }
    packages.save(runtime, path)?;
    info!("Wrote {:?}", path);
    Ok(())
}

/// Open the metadata cache, building it from brew when it does not exist yet.
#[tracing::instrument(skip(runtime, config))]
fn open_cache<'a, R: Runtime>(runtime: &'a R, config: &Config) -> Result<MetadataCache<'a, R>> {
    let cache = MetadataCache::new(runtime, &config.cache_dir);
    if !cache.is_built() {
        eprintln!("Cache not found. Building...");
        cache.refresh_from_brew(&config.brew_command)?;
    }
    Ok(cache)
}

/// The brew section of a Brewfile loaded into a dependency graph.
struct BrewSection<'a, S: MetadataSource> {
    graph: DependencyGraph<'a, S>,
    /// Lines the graph could not track (no metadata). Written back verbatim.
    untracked: Vec<String>,
}

impl<'a, S: MetadataSource> BrewSection<'a, S> {
    /// Ingest the brew lines and materialise back-references up to `level`.
    fn load(source: &'a S, packages: &Packages, level: DependencyLevel) -> Result<Self> {
        let mut graph = DependencyGraph::new(source);
        graph.from_packages(packages.brew.as_slice())?;

        let untracked: Vec<String> = packages
            .brew
            .iter()
            .filter(|line| {
                Declaration::parse(line)
                    .is_none_or(|declaration| !graph.contains(&declaration.name))
            })
            .cloned()
            .collect();
        if !untracked.is_empty() {
            debug!("Keeping {} brew lines without metadata", untracked.len());
        }

        graph.resolve_dependency_map(level)?;
        Ok(Self { graph, untracked })
    }

    fn tracked_names(&self) -> BTreeSet<String> {
        self.graph.entries().map(|entry| entry.name.clone()).collect()
    }

    /// Replace the brew section of `packages` with the graph's rendering.
    fn store(self, packages: &mut Packages) {
        let mut lines = self.graph.lines();
        lines.extend(self.untracked);
        packages.set_brews(lines);
    }
}

fn join_names<'n>(names: impl IntoIterator<Item = &'n String>) -> String {
    names
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
