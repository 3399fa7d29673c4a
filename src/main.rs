//! pkgmirror main entry point
//!
//! This is the command-line interface for building an offline cache of a
//! FreeBSD package repository.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use pkgmirror::config::{effective_timeout, load_config, validate_repository_url, Config};
use pkgmirror::crawler::{download_updates, HttpFetcher};
use pkgmirror::seed::{add_from_pkg_info, add_from_reader};
use pkgmirror::{MirrorError, PackageIndex};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// pkgmirror: an offline cache builder for FreeBSD package repositories
///
/// pkgmirror keeps a list of wanted packages next to the cache and downloads
/// those packages, their dependencies and the repository catalog from a
/// remote repository.
#[derive(Parser, Debug)]
#[command(name = "pkgmirror")]
#[command(version)]
#[command(about = "Mirror the wanted part of a FreeBSD package repository", long_about = None)]
#[command(infer_subcommands = true)]
struct Cli {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Seconds to wait for data from the server (values below 2 are ignored)
    #[arg(short, long, value_name = "SECS", env = "HTTP_TIMEOUT", global = true)]
    timeout: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add package names from standard input, one per line
    Add(Target),
    /// Create or extend the package list from 'pkg info'
    Create(Target),
    /// Download wanted packages and their dependencies
    Download(Target),
}

#[derive(Args, Debug)]
struct Target {
    /// Cache directory or package list file (default: current directory)
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Repository base URL to store in the package list
    #[arg(long, value_name = "URL")]
    repo: Option<String>,
}

impl Command {
    fn target(&self) -> &Target {
        match self {
            Command::Add(target) | Command::Create(target) | Command::Download(target) => target,
        }
    }
}

/// Where the package list and the cache live
#[derive(Debug, PartialEq)]
struct Location {
    list_file: PathBuf,
    cache_dir: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            if let Some(MirrorError::IncompletePage { .. }) = e.downcast_ref::<MirrorError>() {
                tracing::error!(
                    "The listing may be cut short by the HTTP timeout; re-run the download, \
                     possibly with a larger --timeout"
                );
            }
            ExitCode::FAILURE
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pkgmirror=info,warn"),
            1 => EnvFilter::new("pkgmirror=debug,info"),
            2 => EnvFilter::new("pkgmirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    let target = cli.command.target();
    let must_exist = matches!(cli.command, Command::Download(_));
    let location = resolve_location(target.path.as_deref(), &config.mirror.list_file, must_exist)?;

    println!("Package List: {}", location.list_file.display());
    let mut index = PackageIndex::load(&location.list_file)?;

    if let Some(url) = &target.repo {
        validate_repository_url(url)?;
        index.set_repository_url(url);
    } else if index.repository_url().is_none() {
        if let Some(url) = &config.mirror.repository_url {
            tracing::info!("Using repository URL from configuration");
            index.set_repository_url(url);
        }
    }

    let outcome = execute(&cli, &config, &location, &mut index).await;

    // Names gathered before a failure are kept for the next run
    index
        .save(&location.list_file)
        .with_context(|| format!("Failed to save {}", location.list_file.display()))?;

    outcome?;

    println!("{}", stats_line(index.stat_new(), index.stat_existing()));
    Ok(())
}

async fn execute(
    cli: &Cli,
    config: &Config,
    location: &Location,
    index: &mut PackageIndex,
) -> anyhow::Result<()> {
    match &cli.command {
        Command::Add(_) => {
            println!("\nEnter package names, one per line, an empty line to quit!");
            let count = add_from_reader(std::io::stdin().lock(), index)?;
            tracing::debug!("{} names read", count);
        }

        Command::Create(_) => {
            add_from_pkg_info(index).context("Workaround: use the add command")?;
        }

        Command::Download(_) => {
            let timeout = effective_timeout(config, cli.timeout.as_deref());
            tracing::info!("HTTP fetch timeout: {} sec.", timeout);

            let fetcher = HttpFetcher::new(&config.http, timeout)?;
            let report =
                download_updates(&fetcher, index, &location.cache_dir, &config.mirror).await?;

            tracing::info!(
                "{} directories listed, {} files downloaded, {} dependencies discovered",
                report.stats.directories,
                report.stats.downloaded,
                report.stats.dependencies_added
            );
            if report.stats.failed > 0 {
                tracing::warn!(
                    "{} downloads failed; they will be retried on the next run",
                    report.stats.failed
                );
            }
        }
    }

    Ok(())
}

/// Splits the PATH argument into the package list file and the cache directory
///
/// A directory holds the list under `list_name`; anything else is the list
/// file itself, cached into its parent directory.
fn resolve_location(
    path: Option<&Path>,
    list_name: &str,
    must_exist: bool,
) -> Result<Location, MirrorError> {
    let path = path.unwrap_or_else(|| Path::new("."));

    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(Location {
            list_file: path.join(list_name),
            cache_dir: path.to_path_buf(),
        }),
        Ok(_) => Ok(file_location(path)),
        Err(source) if must_exist => Err(MirrorError::AccessDenied {
            path: path.to_path_buf(),
            source,
        }),
        Err(_) => Ok(file_location(path)),
    }
}

fn file_location(list_file: &Path) -> Location {
    let cache_dir = match list_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    Location {
        list_file: list_file.to_path_buf(),
        cache_dir,
    }
}

fn stats_line(new: usize, existing: usize) -> String {
    format!(
        "Stats: {} new {} added, {} existing {} revisited.",
        new,
        plural(new),
        existing,
        plural(existing)
    )
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        "package"
    } else {
        "packages"
    }
}
