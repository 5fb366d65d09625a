use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for Prefix-Sweep
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub crawl: CrawlConfig,

    /// Requests per minute by variant id, overriding profile defaults
    #[serde(rename = "rate-limits")]
    pub rate_limits: BTreeMap<String, u32>,
}

/// Autocomplete service connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL; requests go to `{base-url}/{variant}/autocomplete`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Retries after the first attempt on 429 or transport failure
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Wait between retries when no `Retry-After` is given (seconds)
    #[serde(rename = "retry-delay-secs")]
    pub retry_delay_secs: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            max_retries: 3,
            retry_delay_secs: 60,
            timeout_secs: 30,
        }
    }
}

/// Where checkpoints and results are written
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    #[serde(rename = "checkpoint-dir")]
    pub checkpoint_dir: String,

    #[serde(rename = "results-dir")]
    pub results_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: "data/checkpoints".to_string(),
            results_dir: "data/results".to_string(),
        }
    }
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Variant ids to crawl
    pub variants: Vec<String>,

    /// Run variants concurrently instead of one after another
    pub parallel: bool,

    /// Save a checkpoint every this many requests
    #[serde(rename = "checkpoint-interval")]
    pub checkpoint_interval: u64,

    /// Ignore existing checkpoints
    pub fresh: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            variants: vec!["v1".to_string(), "v2".to_string(), "v3".to_string()],
            parallel: false,
            checkpoint_interval: crate::crawler::DEFAULT_CHECKPOINT_INTERVAL,
            fresh: false,
        }
    }
}
