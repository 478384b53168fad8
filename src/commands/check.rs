use anyhow::Result;

use crate::brewfile::PackageKind;
use crate::runtime::Runtime;

use super::config::Config;
use super::load_brewfile;

/// Report whether the Brewfile declares a package. Returns `false` when it
/// does not.
#[tracing::instrument(skip(runtime, config))]
pub fn check<R: Runtime>(
    runtime: R,
    name: &str,
    kind: PackageKind,
    config: Config,
) -> Result<bool> {
    let (_, packages) = load_brewfile(&runtime, &config)?;

    let found = packages.contains(kind, name);
    if found {
        println!("{} {} is in the Brewfile.", kind, name);
    } else {
        println!("{} {} is not in the Brewfile.", kind, name);
    }
    Ok(found)
}
