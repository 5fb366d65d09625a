//! Runs one crawler per requested variant

use crate::config::Config;
use crate::crawler::client::{HttpTransport, ServiceClient, Transport};
use crate::crawler::prefix_crawler::{CrawlContext, CrawlReport, PrefixCrawler};
use crate::crawler::rate_limiter::RateLimiter;
use crate::crawler::shutdown::Shutdown;
use crate::events::{CrawlEvent, SharedSink};
use crate::state::CrawlState;
use crate::storage::CheckpointStore;
use crate::variant::VariantProfile;
use crate::SweepError;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Owns the shared collaborators and spawns per-variant crawlers
pub struct CrawlSupervisor<T> {
    config: Arc<Config>,
    transport: T,
    store: Arc<dyn CheckpointStore>,
    sink: SharedSink,
    limiter: Arc<RateLimiter>,
}

impl CrawlSupervisor<HttpTransport> {
    /// Builds a supervisor talking HTTP and writing JSON files
    ///
    /// Creates the storage directories if they are missing.
    pub fn from_config(config: Config, sink: SharedSink) -> Result<Self, SweepError> {
        let transport = HttpTransport::new(&config.service)?;
        let store = config.storage.file_store();
        store.ensure_dirs()?;
        Ok(Self::new(config, transport, Arc::new(store), sink))
    }
}

impl<T> CrawlSupervisor<T>
where
    T: Transport + Clone + 'static,
{
    pub fn new(
        config: Config,
        transport: T,
        store: Arc<dyn CheckpointStore>,
        sink: SharedSink,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(
            config.effective_rate_limits(),
            sink.clone(),
        ));
        Self {
            config: Arc::new(config),
            transport,
            store,
            sink,
            limiter,
        }
    }

    /// Maps requested ids to profiles
    ///
    /// Duplicates are dropped; unknown ids are reported once and skipped.
    pub fn resolve(&self, requested: &[String]) -> Vec<VariantProfile> {
        let mut profiles: Vec<VariantProfile> = Vec::new();
        let mut unknown: Vec<&str> = Vec::new();

        for id in requested {
            let id = id.trim();
            match VariantProfile::by_id(id) {
                Some(profile) => {
                    if !profiles.iter().any(|p| p.id == profile.id) {
                        profiles.push(*profile);
                    }
                }
                None => {
                    if !unknown.contains(&id) {
                        unknown.push(id);
                        self.sink.emit(CrawlEvent::UnknownVariant {
                            variant: id.to_string(),
                        });
                    }
                }
            }
        }

        profiles
    }

    /// Builds the crawler for one variant
    ///
    /// Resumes from the stored checkpoint unless the config asks for a fresh
    /// start.
    pub fn crawler(&self, profile: VariantProfile, shutdown: Shutdown) -> PrefixCrawler<T> {
        let state = if self.config.crawl.fresh {
            CrawlState::new(profile.id)
        } else {
            CrawlState::restore(profile.id, self.store.as_ref(), self.sink.as_ref())
        };

        let client = ServiceClient::new(
            self.transport.clone(),
            self.config.service.retry_policy(),
            self.sink.clone(),
        );
        let context = CrawlContext {
            limiter: self.limiter.clone(),
            store: self.store.clone(),
            sink: self.sink.clone(),
            shutdown,
            checkpoint_interval: self.config.crawl.checkpoint_interval,
        };

        PrefixCrawler::new(profile, state, client, context)
    }

    /// Crawls every requested variant and returns one report per crawler
    ///
    /// Reports come back in the order the variants were requested.
    pub async fn run(&self, requested: &[String], shutdown: Shutdown) -> Vec<CrawlReport> {
        let profiles = self.resolve(requested);
        if profiles.is_empty() {
            return Vec::new();
        }

        if !self.config.crawl.parallel {
            let mut reports = Vec::with_capacity(profiles.len());
            for profile in profiles {
                if shutdown.is_triggered() {
                    break;
                }
                reports.push(self.crawler(profile, shutdown.clone()).run().await);
            }
            return reports;
        }

        let mut tasks = JoinSet::new();
        for (index, profile) in profiles.into_iter().enumerate() {
            let crawler = self.crawler(profile, shutdown.clone());
            tasks.spawn(async move { (index, crawler.run().await) });
        }

        let mut reports = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => self.sink.emit(CrawlEvent::CrawlerAborted {
                    error: e.to_string(),
                }),
            }
        }

        reports.sort_by_key(|(index, _)| *index);
        reports.into_iter().map(|(_, report)| report).collect()
    }
}
