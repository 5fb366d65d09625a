//! Depth-first prefix traversal for one API variant
//!
//! The crawler queries every single-character prefix of the variant's
//! alphabet, and whenever a query comes back with a full page it assumes the
//! list was truncated and descends into every one-character extension. A
//! page with fewer results than the cap is taken as complete.
//!
//! The traversal runs on an explicit work stack instead of recursion, which
//! keeps memory bounded and gives a natural place to observe cancellation
//! between every step.

use crate::crawler::client::{ServiceClient, Transport};
use crate::crawler::rate_limiter::RateLimiter;
use crate::crawler::shutdown::{Cancelled, Shutdown};
use crate::events::{CrawlEvent, SharedSink};
use crate::state::{rejection_reason, CrawlState};
use crate::storage::CheckpointStore;
use crate::variant::VariantProfile;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Default number of requests between checkpoints
pub const DEFAULT_CHECKPOINT_INTERVAL: u64 = 20;

/// Collaborators shared by every crawler of a run
///
/// Nothing in here is mutable per variant: the rate limiter keeps one
/// isolated window per variant, and the store is keyed by variant.
#[derive(Clone)]
pub struct CrawlContext {
    pub limiter: Arc<RateLimiter>,
    pub store: Arc<dyn CheckpointStore>,
    pub sink: SharedSink,
    pub shutdown: Shutdown,
    pub checkpoint_interval: u64,
}

/// How a crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// The frontier was exhausted
    Completed,

    /// Shutdown was requested before the frontier was exhausted
    Cancelled,
}

/// Summary of one crawler run
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlReport {
    pub variant: String,
    pub outcome: CrawlOutcome,
    pub requests: u64,
    pub names: usize,
    pub elapsed: Duration,
    pub results_saved: bool,
}

/// A prefix whose children are being explored
#[derive(Debug)]
struct Frame {
    prefix: String,
    next_child: usize,
}

impl Frame {
    fn new(prefix: String) -> Self {
        Self {
            prefix,
            next_child: 0,
        }
    }
}

/// Drives the prefix traversal for one variant
pub struct PrefixCrawler<T> {
    profile: VariantProfile,
    state: CrawlState,
    client: ServiceClient<T>,
    context: CrawlContext,

    /// Branching prefixes whose children were scheduled during this run
    expanded: HashSet<String>,
}

impl<T: Transport> PrefixCrawler<T> {
    /// Creates a crawler over an existing (possibly restored) state
    pub fn new(
        profile: VariantProfile,
        state: CrawlState,
        client: ServiceClient<T>,
        context: CrawlContext,
    ) -> Self {
        Self {
            profile,
            state,
            client,
            context,
            expanded: HashSet::new(),
        }
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    /// Runs the traversal from every top-level prefix to completion
    ///
    /// Always saves a final checkpoint. The results artifact is only written
    /// when the frontier was exhausted.
    pub async fn run(mut self) -> CrawlReport {
        let start = Instant::now();
        let variant = self.profile.id.to_string();

        self.context.sink.emit(CrawlEvent::CrawlStarted {
            variant: variant.clone(),
            restored_names: self.state.name_count(),
            restored_prefixes: self.state.visited_count(),
            restored_requests: self.state.request_count(),
        });

        let mut outcome = CrawlOutcome::Completed;
        let roots = self.profile.character_set;
        for root in roots {
            if self.explore(root).await.is_err() {
                outcome = CrawlOutcome::Cancelled;
                break;
            }
        }

        self.state
            .save(self.context.store.as_ref(), self.context.sink.as_ref());

        let results_saved = match outcome {
            CrawlOutcome::Completed => self.save_results(),
            CrawlOutcome::Cancelled => false,
        };

        let elapsed = start.elapsed();
        let requests = self.state.request_count();
        let names = self.state.name_count();

        match outcome {
            CrawlOutcome::Completed => self.context.sink.emit(CrawlEvent::CrawlFinished {
                variant: variant.clone(),
                requests,
                names,
                elapsed,
            }),
            CrawlOutcome::Cancelled => self.context.sink.emit(CrawlEvent::CrawlCancelled {
                variant: variant.clone(),
                requests,
                names,
            }),
        }

        CrawlReport {
            variant,
            outcome,
            requests,
            names,
            elapsed,
            results_saved,
        }
    }

    /// Explores `root` and everything beneath it, depth first, pre-order
    ///
    /// Calling this for a prefix already handled in this run issues no
    /// queries.
    pub async fn explore(&mut self, root: &str) -> Result<(), Cancelled> {
        let mut stack: Vec<Frame> = Vec::new();
        if let Some(frame) = self.visit(root.to_string()).await? {
            stack.push(frame);
        }

        while let Some(frame) = stack.last_mut() {
            let Some(suffix) = self.profile.character_set.get(frame.next_child) else {
                stack.pop();
                continue;
            };
            frame.next_child += 1;

            let child = format!("{}{}", frame.prefix, suffix);
            if child.chars().count() > self.profile.max_prefix_length {
                continue;
            }

            if let Some(next) = self.visit(child).await? {
                stack.push(next);
            }
        }

        Ok(())
    }

    /// Handles a single prefix
    ///
    /// Returns a frame when the prefix's children should be explored.
    async fn visit(&mut self, prefix: String) -> Result<Option<Frame>, Cancelled> {
        if self.context.shutdown.is_triggered() {
            return Err(Cancelled);
        }

        let variant = self.profile.id;

        if self.state.is_visited(&prefix) {
            // A restored branching prefix still owes its children a visit
            if self.state.is_branching(&prefix) && self.expanded.insert(prefix.clone()) {
                self.context.sink.emit(CrawlEvent::PrefixResumed {
                    variant: variant.to_string(),
                    prefix: prefix.clone(),
                });
                return Ok(Some(Frame::new(prefix)));
            }
            return Ok(None);
        }

        if let Some(reason) = rejection_reason(&prefix) {
            self.state.mark_rejected(&prefix);
            self.context.sink.emit(CrawlEvent::PrefixRejected {
                variant: variant.to_string(),
                prefix,
                reason,
            });
            return Ok(None);
        }

        // Nothing is recorded until the query completes, so a cancelled
        // prefix stays unvisited and is queried again on resume.
        self.context
            .limiter
            .acquire(variant, &self.context.shutdown)
            .await?;
        let outcome = self
            .client
            .query(variant, &prefix, &self.context.shutdown)
            .await?;

        let names = outcome.into_names();
        let returned = names.len();
        let branching = self.profile.is_truncated(returned);

        self.state.record_query(&prefix, names, branching);
        if branching {
            self.expanded.insert(prefix.clone());
        }

        self.context.sink.emit(CrawlEvent::PrefixExplored {
            variant: variant.to_string(),
            prefix: prefix.clone(),
            returned,
            branching,
        });

        self.maybe_checkpoint();

        Ok(branching.then(|| Frame::new(prefix)))
    }

    /// Saves a checkpoint every `checkpoint_interval` requests
    fn maybe_checkpoint(&self) {
        let interval = self.context.checkpoint_interval.max(1);
        let requests = self.state.request_count();
        if requests % interval != 0 {
            return;
        }

        self.state
            .save(self.context.store.as_ref(), self.context.sink.as_ref());
        self.context.sink.emit(CrawlEvent::Progress {
            variant: self.profile.id.to_string(),
            requests,
            names: self.state.name_count(),
        });
    }

    fn save_results(&self) -> bool {
        let results = self.state.results(Utc::now());
        match self.context.store.save_results(&results) {
            Ok(()) => {
                self.context.sink.emit(CrawlEvent::ResultsSaved {
                    variant: results.variant,
                    names: results.total_names,
                });
                true
            }
            Err(e) => {
                self.context.sink.emit(CrawlEvent::ResultsSaveFailed {
                    variant: results.variant,
                    error: e.to_string(),
                });
                false
            }
        }
    }
}
