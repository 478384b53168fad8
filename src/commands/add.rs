use anyhow::{Context, Result, bail};
use log::{debug, warn};

use crate::brew::{Entry, RestartService};
use crate::brewfile::{PackageKind, Packages};
use crate::runtime::Runtime;

use super::config::Config;
use super::{BrewSection, join_names, load_brewfile, open_cache, save_brewfile};

/// What to add, as given on the command line.
#[derive(Debug, Clone)]
pub struct AddOptions {
    pub name: String,
    pub kind: PackageKind,
    /// Install arguments (brew only).
    pub args: Vec<String>,
    /// Service restart behaviour (brew only).
    pub restart_service: Option<RestartService>,
    /// App Store id (mas only).
    pub mas_id: Option<u64>,
    pub dry_run: bool,
}

impl AddOptions {
    pub fn new(name: impl Into<String>, kind: PackageKind) -> Self {
        Self {
            name: name.into(),
            kind,
            args: Vec::new(),
            restart_service: None,
            mas_id: None,
            dry_run: false,
        }
    }
}

/// Add a package to the Brewfile
#[tracing::instrument(skip(runtime, config))]
pub fn add<R: Runtime>(runtime: R, options: AddOptions, config: Config) -> Result<()> {
    debug!("Adding {} {}", options.kind, options.name);
    let (path, mut packages) = load_brewfile(&runtime, &config)?;

    let report = match options.kind {
        PackageKind::Brew => add_brew(&runtime, &options, &config, &mut packages)?,
        kind => add_declaration(kind, &options, &mut packages)?,
    };

    save_brewfile(&runtime, &path, &packages, options.dry_run)?;
    for line in report {
        println!("{}", line);
    }
    Ok(())
}

fn add_brew<R: Runtime>(
    runtime: &R,
    options: &AddOptions,
    config: &Config,
    packages: &mut Packages,
) -> Result<Vec<String>> {
    if options.mas_id.is_some() {
        warn!("--id only applies to mas apps; ignoring it for {}", options.name);
    }

    let cache = open_cache(runtime, config)?;
    let mut section = BrewSection::load(&cache, packages, config.level)?;

    let canonical = section.graph.canonical_name(&options.name)?;
    if section.graph.get(&canonical).is_some_and(Entry::is_root) {
        bail!("{} is already in the Brewfile.", canonical);
    }

    let before = section.tracked_names();
    let entry = Entry::new(options.name.clone())
        .with_args(options.args.clone())
        .with_restart_service(options.restart_service);
    let name = section.graph.add(entry, config.level)?;

    let pulled_in: Vec<String> = section
        .tracked_names()
        .difference(&before)
        .filter(|dependency| **dependency != name)
        .cloned()
        .collect();

    let mut report = vec![format!("Added {} to the Brewfile.", name)];
    if !pulled_in.is_empty() {
        report.push(format!(
            "Added {} dependencies: {}",
            config.level,
            join_names(&pulled_in)
        ));
    }

    section.store(packages);
    Ok(report)
}

fn add_declaration(
    kind: PackageKind,
    options: &AddOptions,
    packages: &mut Packages,
) -> Result<Vec<String>> {
    let name = options.name.as_str();
    if !options.args.is_empty() || options.restart_service.is_some() {
        warn!("Install options only apply to brew packages; ignoring them for {}", name);
    }
    if packages.contains(kind, name) {
        bail!("{} is already in the Brewfile.", name);
    }

    let line = match kind {
        PackageKind::Tap => {
            let valid = name
                .split_once('/')
                .is_some_and(|(user, repo)| !user.is_empty() && !repo.is_empty());
            if !valid {
                bail!("Unrecognised tap format. Use the format 'user/repo'.");
            }
            kind.declaration(name)
        }
        PackageKind::Mas => {
            let id = options
                .mas_id
                .with_context(|| format!("An App Store id is required to add {}. Use --id.", name))?;
            format!("{}, id: {}", kind.declaration(name), id)
        }
        _ => kind.declaration(name),
    };

    packages.add_line(kind, line);
    Ok(vec![format!("Added {} {} to the Brewfile.", kind, name)])
}
