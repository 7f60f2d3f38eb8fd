use crate::config::types::Config;
use crate::ConfigResult;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// Validation is deliberately left to [`crate::config::validate`] so that
/// command-line overrides (start URL, delay, output directory) can be applied
/// to the parsed file before it is checked.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded configuration
/// * `Err(ConfigError)` - Failed to read or parse the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use catalog_scraper::config::{load_config, validate};
///
/// let config = load_config(Path::new("scraper.toml")).unwrap();
/// validate(&config).unwrap();
/// ```
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> ConfigResult<String> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> ConfigResult<(Config, String)> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Fingerprint identifying which crawl a checkpoint belongs to
///
/// Only the discovery mode and the start URL take part: changing the delay or
/// the retry policy between runs must not look like a different crawl.
pub fn run_fingerprint(config: &Config) -> String {
    let mut hasher = Sha256::new();
    hasher.update(config.crawler.mode.as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(config.crawler.start_url.trim().as_bytes());
    hex::encode(hasher.finalize())
}
