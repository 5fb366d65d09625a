//! Structured crawl events
//!
//! Components never log through a global handle. Each one is handed an
//! [`EventSink`] at construction and reports what happened as a
//! [`CrawlEvent`]; the sink decides where the event ends up. The binary uses
//! [`TracingSink`], tests use [`RecordingSink`] to assert on behavior.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Something noteworthy that happened during a crawl
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlEvent {
    /// A crawler is starting (or resuming) a variant
    CrawlStarted {
        variant: String,
        restored_names: usize,
        restored_prefixes: usize,
        restored_requests: u64,
    },

    /// A prefix was queried
    PrefixExplored {
        variant: String,
        prefix: String,
        returned: usize,
        branching: bool,
    },

    /// A prefix was skipped by the validity filter
    PrefixRejected {
        variant: String,
        prefix: String,
        reason: &'static str,
    },

    /// A previously branching prefix is being re-expanded after a restore
    PrefixResumed { variant: String, prefix: String },

    /// The local rate limiter is holding back the next request
    RateLimitWait { variant: String, wait: Duration },

    /// The service answered HTTP 429
    ServiceRateLimited {
        variant: String,
        prefix: String,
        attempt: u32,
        retry_in: Duration,
    },

    /// The HTTP request itself failed
    TransportFailure {
        variant: String,
        prefix: String,
        attempt: u32,
        error: String,
    },

    /// Every retry was used without a usable answer
    RetriesExhausted {
        variant: String,
        prefix: String,
        attempts: u32,
    },

    /// The service answered with a non-retryable status
    UnexpectedStatus {
        variant: String,
        prefix: String,
        status: u16,
        body: String,
    },

    /// The response body did not match any known shape
    UnrecognizedResponse {
        variant: String,
        prefix: String,
        detail: String,
    },

    /// Periodic progress report
    Progress {
        variant: String,
        requests: u64,
        names: usize,
    },

    CheckpointLoaded {
        variant: String,
        names: usize,
        prefixes: usize,
    },

    CheckpointLoadFailed { variant: String, error: String },

    CheckpointSaved { variant: String, requests: u64 },

    CheckpointSaveFailed { variant: String, error: String },

    ResultsSaved { variant: String, names: usize },

    ResultsSaveFailed { variant: String, error: String },

    /// A crawl ran its frontier to exhaustion
    CrawlFinished {
        variant: String,
        requests: u64,
        names: usize,
        elapsed: Duration,
    },

    /// A crawl stopped early because shutdown was requested
    CrawlCancelled {
        variant: String,
        requests: u64,
        names: usize,
    },

    /// A requested variant has no profile and will not run
    UnknownVariant { variant: String },

    /// A crawler task ended without producing a report
    CrawlerAborted { error: String },
}

/// Destination for crawl events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: CrawlEvent);
}

/// Shared handle to an event sink
pub type SharedSink = Arc<dyn EventSink>;

/// Forwards events to `tracing` with structured fields
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    /// Convenience constructor for a shared tracing sink
    pub fn shared() -> SharedSink {
        Arc::new(Self)
    }
}

impl EventSink for TracingSink {
    fn emit(&self, event: CrawlEvent) {
        match event {
            CrawlEvent::CrawlStarted {
                variant,
                restored_names,
                restored_prefixes,
                restored_requests,
            } => tracing::info!(
                %variant,
                restored_names,
                restored_prefixes,
                restored_requests,
                "Starting extraction for {}",
                variant
            ),
            CrawlEvent::PrefixExplored {
                variant,
                prefix,
                returned,
                branching,
            } => {
                if branching {
                    tracing::debug!(%variant, %prefix, returned, "Full page, exploring deeper");
                } else {
                    tracing::debug!(%variant, %prefix, returned, "Prefix complete, not exploring deeper");
                }
            }
            CrawlEvent::PrefixRejected {
                variant,
                prefix,
                reason,
            } => tracing::trace!(%variant, prefix = ?prefix, reason, "Prefix rejected"),
            CrawlEvent::PrefixResumed { variant, prefix } => {
                tracing::debug!(%variant, %prefix, "Resuming expansion of restored prefix")
            }
            CrawlEvent::RateLimitWait { variant, wait } => {
                tracing::debug!(%variant, ?wait, "Rate limit reached, waiting")
            }
            CrawlEvent::ServiceRateLimited {
                variant,
                prefix,
                attempt,
                retry_in,
            } => tracing::warn!(
                %variant,
                %prefix,
                attempt,
                ?retry_in,
                "Rate limit exceeded by service, retrying"
            ),
            CrawlEvent::TransportFailure {
                variant,
                prefix,
                attempt,
                error,
            } => tracing::error!(%variant, %prefix, attempt, %error, "Request failed"),
            CrawlEvent::RetriesExhausted {
                variant,
                prefix,
                attempts,
            } => tracing::error!(%variant, %prefix, attempts, "Max retries reached"),
            CrawlEvent::UnexpectedStatus {
                variant,
                prefix,
                status,
                body,
            } => tracing::error!(%variant, %prefix, status, %body, "Unexpected response status"),
            CrawlEvent::UnrecognizedResponse {
                variant,
                prefix,
                detail,
            } => tracing::warn!(%variant, %prefix, %detail, "Unknown response format"),
            CrawlEvent::Progress {
                variant,
                requests,
                names,
            } => tracing::info!(
                %variant,
                requests,
                names,
                "{}: {} requests, {} names found",
                variant,
                requests,
                names
            ),
            CrawlEvent::CheckpointLoaded {
                variant,
                names,
                prefixes,
            } => tracing::info!(
                %variant,
                names,
                prefixes,
                "Loaded checkpoint for {}",
                variant
            ),
            CrawlEvent::CheckpointLoadFailed { variant, error } => {
                tracing::error!(%variant, %error, "Failed to load checkpoint, starting empty")
            }
            CrawlEvent::CheckpointSaved { variant, requests } => {
                tracing::debug!(%variant, requests, "Saved checkpoint")
            }
            CrawlEvent::CheckpointSaveFailed { variant, error } => {
                tracing::error!(%variant, %error, "Failed to save checkpoint")
            }
            CrawlEvent::ResultsSaved { variant, names } => {
                tracing::info!(%variant, names, "Saved {} names for {}", names, variant)
            }
            CrawlEvent::ResultsSaveFailed { variant, error } => {
                tracing::error!(%variant, %error, "Failed to save results")
            }
            CrawlEvent::CrawlFinished {
                variant,
                requests,
                names,
                elapsed,
            } => tracing::info!(
                %variant,
                requests,
                names,
                elapsed_secs = elapsed.as_secs_f64(),
                "Completed extraction for {}",
                variant
            ),
            CrawlEvent::CrawlCancelled {
                variant,
                requests,
                names,
            } => tracing::info!(
                %variant,
                requests,
                names,
                "Extraction for {} stopped, progress saved",
                variant
            ),
            CrawlEvent::UnknownVariant { variant } => {
                tracing::warn!(%variant, "Unknown API variant, skipping")
            }
            CrawlEvent::CrawlerAborted { error } => {
                tracing::error!(%error, "Variant crawler task failed")
            }
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<CrawlEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns a copy of every event recorded so far
    pub fn events(&self) -> Vec<CrawlEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Counts the recorded events matching a predicate
    pub fn count(&self, predicate: impl Fn(&CrawlEvent) -> bool) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|event| predicate(event))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: CrawlEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
