//! Configuration module for Prefix-Sweep
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and turns them into the settings the crawler components consume.
//!
//! # Example
//!
//! ```no_run
//! use prefix_sweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sweep.toml")).unwrap();
//! println!("Crawling variants: {:?}", config.crawl.variants);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlConfig, ServiceConfig, StorageConfig};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;

use crate::crawler::RetryPolicy;
use crate::storage::JsonFileStore;
use crate::variant::PROFILES;
use std::time::Duration;

impl ServiceConfig {
    /// Retry budget and default backoff for the service client
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            default_delay: Duration::from_secs(self.retry_delay_secs),
        }
    }
}

impl StorageConfig {
    /// JSON file store over the configured directories
    pub fn file_store(&self) -> JsonFileStore {
        JsonFileStore::new(&self.checkpoint_dir, &self.results_dir)
    }
}

impl Config {
    /// Effective request rate for every known variant plus explicit overrides
    ///
    /// Built-in profiles contribute their default rate unless overridden.
    pub fn effective_rate_limits(&self) -> Vec<(String, u32)> {
        let mut rates: Vec<(String, u32)> = PROFILES
            .iter()
            .map(|profile| {
                let rate = self
                    .rate_limits
                    .get(profile.id)
                    .copied()
                    .unwrap_or(profile.requests_per_minute);
                (profile.id.to_string(), rate)
            })
            .collect();

        for (variant, rate) in &self.rate_limits {
            if !rates.iter().any(|(id, _)| id == variant) {
                rates.push((variant.clone(), *rate));
            }
        }

        rates
    }
}
