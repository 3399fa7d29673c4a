use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use pkgmirror::config::load_config;
///
/// let config = load_config(Path::new("pkgmirror.toml")).unwrap();
/// println!("Timeout: {}s", config.http.timeout_secs);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Picks the effective read timeout
///
/// An override (`--timeout` or `HTTP_TIMEOUT`) that is not a number, or is
/// below 2 seconds, is ignored.
pub fn effective_timeout(config: &Config, override_secs: Option<&str>) -> u64 {
    let Some(raw) = override_secs else {
        return config.http.timeout_secs;
    };

    match raw.trim().parse::<u64>() {
        Ok(secs) if secs >= 2 => secs,
        _ => {
            tracing::warn!(
                "Ignoring HTTP timeout of {:?}, using {}s",
                raw,
                config.http.timeout_secs
            );
            config.http.timeout_secs
        }
    }
}
