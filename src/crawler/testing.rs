//! Scripted transport for unit tests

use crate::crawler::client::{RawResponse, Transport, TransportError};
use crate::crawler::shutdown::ShutdownTrigger;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Script {
    queued: HashMap<String, VecDeque<Result<RawResponse, TransportError>>>,
    fixed: HashMap<String, Vec<String>>,
    calls: Vec<String>,
    trigger_after: Option<(usize, Arc<ShutdownTrigger>)>,
}

/// Answers from a per-prefix script and records every call
///
/// Queued responses are consumed first; then the fixed name list for the
/// prefix; otherwise an empty array.
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, prefix: &str, response: RawResponse) -> Self {
        self.push(prefix, Ok(response))
    }

    pub(crate) fn fail(self, prefix: &str, error: TransportError) -> Self {
        self.push(prefix, Err(error))
    }

    /// Always answers `prefix` with these names
    pub(crate) fn names(self, prefix: &str, names: &[&str]) -> Self {
        self.script
            .lock()
            .unwrap()
            .fixed
            .insert(prefix.to_string(), names.iter().map(|n| n.to_string()).collect());
        self
    }

    /// Answers `prefix` with `count` generated names
    pub(crate) fn full_page(self, prefix: &str, count: usize) -> Self {
        let names: Vec<String> = (0..count).map(|i| format!("{}~{}", prefix, i)).collect();
        self.script
            .lock()
            .unwrap()
            .fixed
            .insert(prefix.to_string(), names);
        self
    }

    /// Fires `trigger` once `calls` requests have been answered
    pub(crate) fn trigger_after(self, calls: usize, trigger: ShutdownTrigger) -> Self {
        self.script.lock().unwrap().trigger_after = Some((calls, Arc::new(trigger)));
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.script.lock().unwrap().calls.clone()
    }

    fn push(self, prefix: &str, response: Result<RawResponse, TransportError>) -> Self {
        self.script
            .lock()
            .unwrap()
            .queued
            .entry(prefix.to_string())
            .or_default()
            .push_back(response);
        self
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, _variant: &str, prefix: &str) -> Result<RawResponse, TransportError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(prefix.to_string());

        if let Some((limit, trigger)) = &script.trigger_after {
            if script.calls.len() >= *limit {
                trigger.trigger();
            }
        }

        if let Some(response) = script.queued.get_mut(prefix).and_then(|q| q.pop_front()) {
            return response;
        }

        let names = script.fixed.get(prefix).cloned().unwrap_or_default();
        Ok(RawResponse::ok(
            serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string()),
        ))
    }
}
