use crate::config::types::{Config, CrawlConfig, ServiceConfig, StorageConfig};
use crate::ConfigError;
use std::collections::BTreeMap;
use url::Url;

/// Upper bound on `max-retries`
pub const MAX_RETRIES_LIMIT: u32 = 100;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_service_config(&config.service)?;
    validate_storage_config(&config.storage)?;
    validate_crawl_config(&config.crawl)?;
    validate_rate_limits(&config.rate_limits)?;
    Ok(())
}

/// Validates service configuration
fn validate_service_config(config: &ServiceConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if url.query().is_some() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must not carry a query string",
            config.base_url
        )));
    }

    if config.max_retries > MAX_RETRIES_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= {}, got {}",
            MAX_RETRIES_LIMIT, config.max_retries
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.checkpoint_dir.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint-dir cannot be empty".to_string(),
        ));
    }

    if config.results_dir.is_empty() {
        return Err(ConfigError::Validation(
            "results-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawl configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.variants.is_empty() {
        return Err(ConfigError::Validation(
            "at least one variant must be requested".to_string(),
        ));
    }

    if config.variants.iter().any(|v| v.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "variant ids cannot be empty".to_string(),
        ));
    }

    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "checkpoint-interval must be >= 1, got {}",
            config.checkpoint_interval
        )));
    }

    Ok(())
}

/// Validates per-variant rate overrides
fn validate_rate_limits(limits: &BTreeMap<String, u32>) -> Result<(), ConfigError> {
    for (variant, rate) in limits {
        if *rate < 1 {
            return Err(ConfigError::Validation(format!(
                "rate limit for '{}' must be >= 1 request per minute",
                variant
            )));
        }
    }
    Ok(())
}
