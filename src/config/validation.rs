use crate::config::types::{Config, HttpConfig, MirrorConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_http_config(&config.http)?;
    validate_mirror_config(&config.mirror)?;
    Ok(())
}

/// Validates HTTP configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 2 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 2, got {}",
            config.timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "connect-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates mirror configuration
fn validate_mirror_config(config: &MirrorConfig) -> Result<(), ConfigError> {
    validate_file_name("list-file", &config.list_file)?;

    for name in &config.always_fetch {
        validate_file_name("always-fetch", name)?;
    }

    if let Some(url) = &config.repository_url {
        validate_repository_url(url)?;
    }

    Ok(())
}

/// A bare file name: non-empty, no directory separators
fn validate_file_name(field: &str, name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(format!(
            "{} entries cannot be empty",
            field
        )));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(ConfigError::Validation(format!(
            "{} entry '{}' must be a file name, not a path",
            field, name
        )));
    }

    Ok(())
}

/// Validates a repository URL: http or https, with a host
pub fn validate_repository_url(url: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid repository URL '{}': {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => {
            if parsed.host_str().is_none() {
                return Err(ConfigError::InvalidUrl(format!(
                    "Repository URL '{}' has no host",
                    url
                )));
            }
        }
        other => {
            return Err(ConfigError::InvalidUrl(format!(
                "Repository URL '{}' uses unsupported scheme '{}'",
                url, other
            )));
        }
    }

    Ok(())
}
