//! Cooperative cancellation
//!
//! A [`ShutdownTrigger`] is held by whoever decides the crawl should stop
//! (the Ctrl-C handler in the binary). Every crawler gets a cloned
//! [`Shutdown`] and checks it at each suspension point: the rate-limit wait,
//! the retry backoff, and the HTTP call.

use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

/// Returned by any operation interrupted by a shutdown request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("crawl cancelled")]
pub struct Cancelled;

/// Receiving side of the shutdown signal
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Sending side of the shutdown signal
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    /// Creates a connected trigger/receiver pair
    pub fn channel() -> (ShutdownTrigger, Shutdown) {
        let (tx, rx) = watch::channel(false);
        (ShutdownTrigger { tx }, Shutdown { rx })
    }

    /// A receiver that is never triggered
    pub fn never() -> Shutdown {
        let (_trigger, shutdown) = Self::channel();
        shutdown
    }

    /// Returns true once shutdown has been requested
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes when shutdown is requested
    ///
    /// If the trigger is dropped without firing, this never completes.
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Sleeps for `duration` unless shutdown is requested first
    pub async fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        if self.is_triggered() {
            return Err(Cancelled);
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.triggered() => Err(Cancelled),
        }
    }
}

impl ShutdownTrigger {
    /// Requests shutdown for every connected receiver
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Returns true once [`ShutdownTrigger::trigger`] has been called
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}
