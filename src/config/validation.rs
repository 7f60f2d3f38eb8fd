use crate::config::types::{
    ClassifierConfig, Config, CrawlerConfig, FetcherConfig, OutputConfig, ProductSignal,
};
use crate::{ConfigError, ConfigResult};
use url::Url;

/// Validates the entire configuration
///
/// Call this after command-line overrides have been applied.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_crawler_config(&config.crawler)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_output_config(&config.output)?;
    validate_classifier_config(&config.classifier)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> ConfigResult<()> {
    if config.start_url.trim().is_empty() {
        return Err(ConfigError::Validation(
            "start_url is required (config file or command line)".to_string(),
        ));
    }

    let url = Url::parse(config.start_url.trim())
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "start_url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(
            "start_url must include a host".to_string(),
        ));
    }

    if config.max_site_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_site_pages must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> ConfigResult<()> {
    if config.max_retries < 1 || config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be between 1 and 10, got {}",
            config.max_retries
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.stem.is_empty() {
        return Err(ConfigError::Validation(
            "output stem cannot be empty".to_string(),
        ));
    }

    if config.stem.contains('/') || config.stem.contains('\\') {
        return Err(ConfigError::Validation(format!(
            "output stem must be a bare file name, got '{}'",
            config.stem
        )));
    }

    if config.image_columns < 1 || config.image_columns > 50 {
        return Err(ConfigError::Validation(format!(
            "image_columns must be between 1 and 50, got {}",
            config.image_columns
        )));
    }

    if config.download_images && config.images_per_product < 1 {
        return Err(ConfigError::Validation(
            "images_per_product must be >= 1 when download_images is enabled".to_string(),
        ));
    }

    Ok(())
}

/// Validates the product page classifier policy
fn validate_classifier_config(config: &ClassifierConfig) -> ConfigResult<()> {
    if config.signals.contains(&ProductSignal::UrlMarker)
        && config.url_markers.iter().all(|m| m.trim().is_empty())
    {
        return Err(ConfigError::Validation(
            "url_markers cannot be empty while the url-marker signal is enabled".to_string(),
        ));
    }

    Ok(())
}
