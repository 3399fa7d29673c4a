//! pkgmirror: an offline cache builder for FreeBSD package repositories
//!
//! This crate mirrors the wanted subset of a remote package repository to a
//! local directory. What is wanted comes from a persisted package list; the
//! dependencies of every downloaded package are folded back into that list so
//! the mirror stays installable offline.

pub mod config;
pub mod crawler;
pub mod deps;
pub mod index;
pub mod seed;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for pkgmirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("The path {path} can't be accessed: {source}")]
    AccessDenied {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Write failed for {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Read failed for {resource}: {message}")]
    Read { resource: String, message: String },

    #[error("Out of memory while growing the package list")]
    ResourceExhausted,

    #[error("The repository URL is missing from the package list")]
    RepositoryUrlMissing,

    #[error("{url} didn't load completely")]
    IncompletePage { url: String },

    #[error("Archive error in {path}: {source}")]
    Archive {
        path: PathBuf,
        source: deps::ArchiveError,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Can't fetch 'pkg info' results: {0}")]
    PackageTool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MirrorError {
    /// True when re-running the same crawl step may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::IncompletePage { .. })
    }

    /// True for single-file read failures the crawler skips over
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Read { .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for pkgmirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{download_updates, HttpFetcher, Mirror, MirrorStats};
pub use index::{AddOutcome, PackageIndex, PackageName};
