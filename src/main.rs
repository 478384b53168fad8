use anyhow::Result;
use bfm::{
    brew::{DependencyLevel, RestartService},
    brewfile::PackageKind,
    commands::{self, AddOptions, Config, ConfigOverrides},
    runtime::RealRuntime,
};
use clap::Parser;
use std::path::PathBuf;

/// bfm - Brewfile manager
///
/// Add and remove packages in a Brewfile while keeping the formulae they
/// depend on declared and annotated with who needs them.
///
/// Formula metadata comes from `brew info` and is cached locally; run
/// `bfm refresh` after adding a tap.
///
/// Examples:
///   bfm add vim -b              # Add vim and its required dependencies
///   bfm remove vim -b           # Remove vim and dependencies nothing else needs
///   bfm --level build clean     # Re-resolve every brew, build dependencies included
#[derive(Parser, Debug)]
#[command(author, version = env!("BFM_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path of the Brewfile (also via BFM_BREWFILE or the config file)
    #[arg(
        long,
        short = 'f',
        env = "BFM_BREWFILE",
        value_name = "PATH",
        global = true
    )]
    pub brewfile: Option<PathBuf>,

    /// How deep to follow dependencies [default: required]
    #[arg(long, short = 'l', env = "BFM_LEVEL", value_enum, global = true)]
    pub level: Option<DependencyLevel>,

    /// Metadata cache directory (defaults to ~/.bfm/cache)
    #[arg(long = "cache-dir", env = "BFM_CACHE_DIR", value_name = "PATH", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Config file (defaults to ~/.bfm.json)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            brewfile: self.brewfile.clone(),
            level: self.level,
            cache_dir: self.cache_dir.clone(),
            config: self.config.clone(),
        }
    }
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Add a package to the Brewfile
    Add(AddArgs),

    /// Remove a package from the Brewfile
    Remove(RemoveArgs),

    /// Check whether the Brewfile declares a package (exit code 1 if not)
    Check(CheckArgs),

    /// Regenerate dependencies and annotations for every brew
    Clean(CleanArgs),

    /// Rebuild the formula metadata cache
    Refresh(RefreshArgs),
}

/// Exactly one package type per command.
#[derive(clap::Args, Debug)]
#[group(required = true, multiple = false)]
pub struct PackageType {
    /// A tap (user/repo)
    #[arg(short = 't', long)]
    pub tap: bool,

    /// A formula
    #[arg(short = 'b', long)]
    pub brew: bool,

    /// A cask
    #[arg(short = 'c', long)]
    pub cask: bool,

    /// A Mac App Store app
    #[arg(short = 'm', long)]
    pub mas: bool,
}

impl PackageType {
    fn kind(&self) -> PackageKind {
        if self.tap {
            PackageKind::Tap
        } else if self.cask {
            PackageKind::Cask
        } else if self.mas {
            PackageKind::Mas
        } else {
            PackageKind::Brew
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Package name
    pub name: String,

    #[command(flatten)]
    pub package_type: PackageType,

    /// Install arguments, comma separated (brew only)
    #[arg(short = 'a', long, value_delimiter = ',', value_name = "ARGS")]
    pub args: Vec<String>,

    /// Restart the service always or only when changed (brew only)
    #[arg(short = 'r', long = "restart-service", value_enum)]
    pub restart_service: Option<RestartService>,

    /// App Store id (mas only)
    #[arg(short = 'i', long = "id", value_name = "ID")]
    pub mas_id: Option<u64>,

    /// Print the resulting Brewfile instead of writing it
    #[arg(short = 'd', long = "dry-run")]
    pub dry_run: bool,
}

impl AddArgs {
    fn into_options(self) -> AddOptions {
        AddOptions {
            kind: self.package_type.kind(),
            name: self.name,
            args: self.args,
            restart_service: self.restart_service,
            mas_id: self.mas_id,
            dry_run: self.dry_run,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Package name
    pub name: String,

    #[command(flatten)]
    pub package_type: PackageType,

    /// Print the resulting Brewfile instead of writing it
    #[arg(short = 'd', long = "dry-run")]
    pub dry_run: bool,
}

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Package name
    pub name: String,

    #[command(flatten)]
    pub package_type: PackageType,
}

#[derive(clap::Args, Debug)]
pub struct CleanArgs {
    /// Print the resulting Brewfile instead of writing it
    #[arg(short = 'd', long = "dry-run")]
    pub dry_run: bool,
}

#[derive(clap::Args, Debug)]
pub struct RefreshArgs {
    /// Read `brew info --json=v1` output from a file instead of running brew
    #[arg(long = "from-file", value_name = "PATH")]
    pub from_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = RealRuntime;
    let config = Config::load(&runtime, cli.overrides())?;

    match cli.command {
        Commands::Add(args) => commands::add(runtime, args.into_options(), config)?,
        Commands::Remove(args) => commands::remove(
            runtime,
            &args.name,
            args.package_type.kind(),
            args.dry_run,
            config,
        )?,
        Commands::Check(args) => {
            if !commands::check(runtime, &args.name, args.package_type.kind(), config)? {
                std::process::exit(1);
            }
        }
        Commands::Clean(args) => commands::clean(runtime, args.dry_run, config)?,
        Commands::Refresh(args) => commands::refresh(runtime, args.from_file.as_deref(), config)?,
    }
    Ok(())
}
