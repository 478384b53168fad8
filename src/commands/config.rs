use anyhow::{Context, Result, bail};
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::brew::DependencyLevel;
use crate::runtime::Runtime;

use super::paths::{default_cache_dir, default_config_path, expand_home};

/// Homebrew's own variable for the Brewfile location, honoured as a fallback.
const HOMEBREW_BUNDLE_FILE: &str = "HOMEBREW_BUNDLE_FILE";

/// Settings given on the command line (or through `BFM_*` variables, which
/// clap folds into the flags). These win over the config file.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub brewfile: Option<PathBuf>,
    pub level: Option<DependencyLevel>,
    pub cache_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// Contents of `~/.bfm.json`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    brewfile: Option<PathBuf>,
    level: Option<String>,
    cache_dir: Option<PathBuf>,
    brew_command: Option<String>,
}

/// Resolved settings passed to every command.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub brewfile: Option<PathBuf>,
    pub level: DependencyLevel,
    pub cache_dir: PathBuf,
    pub brew_command: String,
}

impl Config {
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, overrides: ConfigOverrides) -> Result<Self> {
        let file = match &overrides.config {
            Some(path) => {
                if !runtime.exists(path) {
                    bail!("Config file not found at {}", path.display());
                }
                Self::read_file(runtime, path)?
            }
            None => {
                let path = default_config_path(runtime)?;
                if runtime.exists(&path) {
                    Self::read_file(runtime, &path)?
                } else {
                    debug!("No config file at {:?}", path);
                    ConfigFile::default()
                }
            }
        };

        let brewfile = match overrides.brewfile.or(file.brewfile) {
            Some(path) => Some(path),
            None => runtime.env_var(HOMEBREW_BUNDLE_FILE).ok().map(PathBuf::from),
        };
        let brewfile = brewfile
            .map(|path| expand_home(runtime, &path))
            .transpose()?;

        let level = match (overrides.level, file.level) {
            (Some(level), _) => level,
            (None, Some(level)) => level
                .parse()
                .context("Invalid 'level' in config file")?,
            (None, None) => DependencyLevel::default(),
        };

        let cache_dir = match overrides.cache_dir.or(file.cache_dir) {
            Some(path) => expand_home(runtime, &path)?,
            None => default_cache_dir(runtime)?,
        };

        let config = Config {
            brewfile,
            level,
            cache_dir,
            brew_command: file.brew_command.unwrap_or_else(|| "brew".to_string()),
        };
        debug!("Using config: {:?}", config);
        Ok(config)
    }

    fn read_file<R: Runtime>(runtime: &R, path: &Path) -> Result<ConfigFile> {
        let content = runtime.read_to_string(path)?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// The Brewfile location, required by every command except `refresh`.
    pub fn brewfile(&self) -> Result<&Path> {
        self.brewfile.as_deref().context(
            "The location of the Brewfile is not set. Use --brewfile, set BFM_BREWFILE \
             or add \"brewfile\" to ~/.bfm.json.",
        )
    }
}
