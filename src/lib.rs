//! Prefix-Sweep: exhaustive vocabulary discovery over autocomplete APIs
//!
//! This crate walks the space of query prefixes against a prefix-based
//! autocomplete service, using full result pages as the signal to search
//! deeper. Crawls are rate limited per API variant, retried on transient
//! failures, and checkpointed so that multi-hour runs can be resumed.

pub mod config;
pub mod crawler;
pub mod events;
pub mod output;
pub mod state;
pub mod storage;
pub mod variant;

use thiserror::Error;

/// Main error type for Prefix-Sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Unknown API variant: {0}")]
    UnknownVariant(String),
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

/// Result type alias for Prefix-Sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlReport, CrawlSupervisor, PrefixCrawler, Shutdown};
pub use state::{CrawlState, PrefixState};
pub use variant::VariantProfile;
