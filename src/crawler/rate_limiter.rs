//! Sliding-window rate limiting per API variant
//!
//! Each variant gets its own window of request timestamps. A request may go
//! out only when fewer than `R` requests were issued in the trailing 60
//! seconds. Windows are independent: waiting on one variant never delays
//! another.

use crate::crawler::shutdown::{Cancelled, Shutdown};
use crate::events::{CrawlEvent, SharedSink};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Length of the rolling window
pub const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Request timestamps for one variant
#[derive(Debug)]
pub struct SlidingWindow {
    requests_per_window: usize,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl SlidingWindow {
    /// Creates a window allowing `requests_per_minute` requests per minute
    ///
    /// A rate of zero is treated as one so that the window can always drain.
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            requests_per_window: requests_per_minute.max(1) as usize,
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Returns the configured number of requests per window
    pub fn capacity(&self) -> usize {
        self.requests_per_window
    }

    /// Records a request at `now` if the window has room
    ///
    /// Returns `None` when the request was recorded, otherwise how long to
    /// wait before the oldest request leaves the window.
    fn try_record(&self, now: Instant) -> Option<Duration> {
        let mut timestamps = self
            .timestamps
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        while let Some(&oldest) = timestamps.front() {
            if now.duration_since(oldest) >= RATE_WINDOW {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() >= self.requests_per_window {
            let oldest = timestamps.front().copied().unwrap_or(now);
            return Some((oldest + RATE_WINDOW).saturating_duration_since(now));
        }

        timestamps.push_back(now);
        None
    }

    /// Number of requests currently inside the window
    pub fn in_flight(&self) -> usize {
        let now = Instant::now();
        self.timestamps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|&&t| now.duration_since(t) < RATE_WINDOW)
            .count()
    }
}

/// Registry of sliding windows keyed by variant id
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Arc<SlidingWindow>>>,
    fallback_rate: u32,
    sink: SharedSink,
}

impl RateLimiter {
    /// Creates a limiter from per-variant rates (requests per minute)
    ///
    /// Variants not listed here get their own window at the most conservative
    /// of the configured rates.
    pub fn new(rates: impl IntoIterator<Item = (String, u32)>, sink: SharedSink) -> Self {
        let windows: HashMap<String, Arc<SlidingWindow>> = rates
            .into_iter()
            .map(|(variant, rate)| (variant, Arc::new(SlidingWindow::new(rate))))
            .collect();

        let fallback_rate = windows
            .values()
            .map(|w| w.capacity() as u32)
            .min()
            .unwrap_or(1);

        Self {
            windows: Mutex::new(windows),
            fallback_rate,
            sink,
        }
    }

    /// Rate applied to variants without a configured window
    pub fn fallback_rate(&self) -> u32 {
        self.fallback_rate
    }

    /// Returns the window for a variant, creating a fallback one if needed
    pub fn window(&self, variant: &str) -> Arc<SlidingWindow> {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        windows
            .entry(variant.to_string())
            .or_insert_with(|| Arc::new(SlidingWindow::new(self.fallback_rate)))
            .clone()
    }

    /// Waits until one more request for `variant` fits in its window, then records it
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The request slot was recorded
    /// * `Err(Cancelled)` - Shutdown was requested while waiting
    pub async fn acquire(&self, variant: &str, shutdown: &Shutdown) -> Result<(), Cancelled> {
        let window = self.window(variant);

        loop {
            if shutdown.is_triggered() {
                return Err(Cancelled);
            }

            match window.try_record(Instant::now()) {
                None => return Ok(()),
                Some(wait) => {
                    self.sink.emit(CrawlEvent::RateLimitWait {
                        variant: variant.to_string(),
                        wait,
                    });
                    shutdown.sleep(wait).await?;
                }
            }
        }
    }
}
