//! Configuration module for pkgmirror
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file. Every key has a default, so running without a file
//! behaves exactly like running with an empty one.
//!
//! # Example
//!
//! ```no_run
//! use pkgmirror::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("pkgmirror.toml")).unwrap();
//! println!("Package list: {}", config.mirror.list_file);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, HttpConfig, MirrorConfig, DEFAULT_ALWAYS_FETCH, DEFAULT_TIMEOUT_SECS,
};

// Re-export parser functions
pub use parser::{effective_timeout, load_config, parse_config};
pub use validation::validate_repository_url;
