//! Autocomplete service client
//!
//! This module handles every request to the autocomplete API, including:
//! - Building the reqwest-backed transport
//! - Normalizing the different response shapes into a list of names
//! - Retrying on HTTP 429 (honoring `Retry-After`) and transport failures
//! - Classifying the final outcome of a query
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | HTTP 2xx | Parse body, no retry |
//! | HTTP 429 | Wait `Retry-After` seconds (or the default delay), retry |
//! | Other status | Immediate → Rejected |
//! | Timeout / connection error | Wait the default delay, retry |
//! | Budget exhausted | Exhausted |

use crate::config::ServiceConfig;
use crate::crawler::shutdown::{Cancelled, Shutdown};
use crate::events::{CrawlEvent, SharedSink};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Response keys accepted for an object payload, in priority order
pub const RESULT_FIELDS: [&str; 3] = ["results", "suggestions", "names"];

/// Longest response body excerpt kept in events
const BODY_EXCERPT_LEN: usize = 200;

/// Raw HTTP answer, before any interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub retry_after: Option<String>,
    pub body: String,
}

impl RawResponse {
    /// A 200 response with the given body
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            retry_after: None,
            body: body.into(),
        }
    }

    /// A response with an arbitrary status and empty body
    pub fn status(status: u16) -> Self {
        Self {
            status,
            retry_after: None,
            body: String::new(),
        }
    }

    /// Sets the `Retry-After` header value
    pub fn with_retry_after(mut self, value: impl Into<String>) -> Self {
        self.retry_after = Some(value.into());
        self
    }
}

/// Failure to obtain any HTTP response
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timeout")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request failed: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

/// Issues one autocomplete GET for a variant and prefix
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, variant: &str, prefix: &str) -> Result<RawResponse, TransportError>;
}

/// Builds the endpoint URL for a variant
///
/// # Example
///
/// ```
/// use prefix_sweep::crawler::endpoint_url;
///
/// assert_eq!(
///     endpoint_url("http://localhost:8000/", "v2"),
///     "http://localhost:8000/v2/autocomplete"
/// );
/// ```
pub fn endpoint_url(base_url: &str, variant: &str) -> String {
    format!("{}/{}/autocomplete", base_url.trim_end_matches('/'), variant)
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Builds a transport from the service configuration
    pub fn new(config: &ServiceConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(config)?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

/// Builds an HTTP client with the configured timeout
pub fn build_http_client(config: &ServiceConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("prefix-sweep/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, variant: &str, prefix: &str) -> Result<RawResponse, TransportError> {
        let response = self
            .client
            .get(endpoint_url(&self.base_url, variant))
            .query(&[("query", prefix)])
            .send()
            .await?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        Ok(RawResponse {
            status,
            retry_after,
            body,
        })
    }
}

/// Why a response body could not be turned into names
#[derive(Debug, Error)]
pub enum ResponseShapeError {
    #[error("invalid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("object has none of the expected fields (found: {0:?})")]
    UnknownFields(Vec<String>),

    #[error("field '{0}' is not an array")]
    FieldNotArray(&'static str),

    #[error("unexpected response type: {0}")]
    UnexpectedType(&'static str),
}

/// Extracts suggestion names from a response body
///
/// Accepts a bare array, or an object carrying `results`, `suggestions` or
/// `names` (checked in that order). Non-string elements are skipped.
pub fn parse_suggestions(body: &str) -> Result<Vec<String>, ResponseShapeError> {
    let value: Value = serde_json::from_str(body)?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let field = RESULT_FIELDS
                .iter()
                .copied()
                .find(|field| map.contains_key(*field));

            match field {
                Some(field) => match map.remove(field) {
                    Some(Value::Array(items)) => items,
                    _ => return Err(ResponseShapeError::FieldNotArray(field)),
                },
                None => {
                    return Err(ResponseShapeError::UnknownFields(
                        map.keys().cloned().collect(),
                    ))
                }
            }
        }
        other => return Err(ResponseShapeError::UnexpectedType(json_type_name(&other))),
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(name),
            _ => None,
        })
        .collect())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parses a `Retry-After` header holding a whole number of seconds
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse::<u64>().ok().map(Duration::from_secs)
}

/// Retry budget and default backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Wait used when the service gives no usable `Retry-After`
    pub default_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            default_delay: Duration::from_secs(60),
        }
    }
}

/// Final result of one query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// The service answered with a recognized payload (possibly empty)
    Suggestions(Vec<String>),

    /// The service answered but the payload shape was not recognized
    Unrecognized,

    /// The service answered with a non-retryable status
    Rejected { status: u16 },

    /// Every attempt hit a 429 or a transport failure
    Exhausted,
}

impl QueryOutcome {
    /// Collapses the outcome to the names it carries; failures yield none
    pub fn into_names(self) -> Vec<String> {
        match self {
            QueryOutcome::Suggestions(names) => names,
            _ => Vec::new(),
        }
    }
}

/// Executes queries with retry semantics over a [`Transport`]
#[derive(Clone)]
pub struct ServiceClient<T> {
    transport: T,
    policy: RetryPolicy,
    sink: SharedSink,
}

impl<T: Transport> ServiceClient<T> {
    pub fn new(transport: T, policy: RetryPolicy, sink: SharedSink) -> Self {
        Self {
            transport,
            policy,
            sink,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Queries the service for `prefix` on `variant`
    ///
    /// Network failures never surface as errors; they are folded into the
    /// returned [`QueryOutcome`]. The only error is cancellation, which can
    /// interrupt the HTTP call or any backoff wait.
    pub async fn query(
        &self,
        variant: &str,
        prefix: &str,
        shutdown: &Shutdown,
    ) -> Result<QueryOutcome, Cancelled> {
        let attempts = self.policy.max_retries.saturating_add(1);

        for attempt in 1..=attempts {
            if shutdown.is_triggered() {
                return Err(Cancelled);
            }

            let result = tokio::select! {
                biased;
                result = self.transport.get(variant, prefix) => result,
                _ = shutdown.triggered() => return Err(Cancelled),
            };

            let wait = match result {
                Ok(response) if (200..300).contains(&response.status) => {
                    return Ok(self.interpret_body(variant, prefix, &response.body));
                }
                Ok(response) if response.status == StatusCode::TOO_MANY_REQUESTS.as_u16() => {
                    let wait = response
                        .retry_after
                        .as_deref()
                        .and_then(parse_retry_after)
                        .unwrap_or(self.policy.default_delay);
                    if attempt < attempts {
                        self.sink.emit(CrawlEvent::ServiceRateLimited {
                            variant: variant.to_string(),
                            prefix: prefix.to_string(),
                            attempt,
                            retry_in: wait,
                        });
                    }
                    wait
                }
                Ok(response) => {
                    self.sink.emit(CrawlEvent::UnexpectedStatus {
                        variant: variant.to_string(),
                        prefix: prefix.to_string(),
                        status: response.status,
                        body: excerpt(&response.body),
                    });
                    return Ok(QueryOutcome::Rejected {
                        status: response.status,
                    });
                }
                Err(error) => {
                    self.sink.emit(CrawlEvent::TransportFailure {
                        variant: variant.to_string(),
                        prefix: prefix.to_string(),
                        attempt,
                        error: error.to_string(),
                    });
                    self.policy.default_delay
                }
            };

            if attempt < attempts {
                shutdown.sleep(wait).await?;
            }
        }

        self.sink.emit(CrawlEvent::RetriesExhausted {
            variant: variant.to_string(),
            prefix: prefix.to_string(),
            attempts,
        });
        Ok(QueryOutcome::Exhausted)
    }

    /// Collapsing form of [`ServiceClient::query`]: names, or nothing
    pub async fn suggestions(
        &self,
        variant: &str,
        prefix: &str,
        shutdown: &Shutdown,
    ) -> Result<Vec<String>, Cancelled> {
        Ok(self.query(variant, prefix, shutdown).await?.into_names())
    }

    fn interpret_body(&self, variant: &str, prefix: &str, body: &str) -> QueryOutcome {
        match parse_suggestions(body) {
            Ok(names) => QueryOutcome::Suggestions(names),
            Err(e) => {
                self.sink.emit(CrawlEvent::UnrecognizedResponse {
                    variant: variant.to_string(),
                    prefix: prefix.to_string(),
                    detail: format!("{}: {}", e, excerpt(body)),
                });
                QueryOutcome::Unrecognized
            }
        }
    }
}

fn excerpt(body: &str) -> String {
    match body.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::testing::ScriptedTransport;
    use crate::events::RecordingSink;
    use tokio::time::Instant;

    fn client(transport: ScriptedTransport, max_retries: u32) -> ServiceClient<ScriptedTransport> {
        ServiceClient::new(
            transport,
            RetryPolicy {
                max_retries,
                default_delay: Duration::from_secs(60),
            },
            RecordingSink::new(),
        )
    }

    #[test]
    fn test_parse_bare_array() {
        assert_eq!(
            parse_suggestions(r#"["alpha", "beta"]"#).unwrap(),
            vec!["alpha", "beta"]
        );
    }

    #[test]
    fn test_parse_object_fields() {
        assert_eq!(parse_suggestions(r#"{"results": ["a"]}"#).unwrap(), vec!["a"]);
        assert_eq!(
            parse_suggestions(r#"{"suggestions": ["b"], "count": 1}"#).unwrap(),
            vec!["b"]
        );
        assert_eq!(parse_suggestions(r#"{"names": ["c"]}"#).unwrap(), vec!["c"]);
    }

    #[test]
    fn test_parse_field_priority_when_several_present() {
        let body = r#"{"names": ["n"], "suggestions": ["s"], "results": ["r"]}"#;
        assert_eq!(parse_suggestions(body).unwrap(), vec!["r"]);

        let body = r#"{"names": ["n"], "suggestions": ["s"]}"#;
        assert_eq!(parse_suggestions(body).unwrap(), vec!["s"]);
    }

    #[test]
    fn test_parse_skips_non_string_elements() {
        assert_eq!(
            parse_suggestions(r#"["a", 1, null, "b"]"#).unwrap(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_parse_rejects_unknown_shapes() {
        assert!(matches!(
            parse_suggestions(r#"{"data": []}"#),
            Err(ResponseShapeError::UnknownFields(keys)) if keys == vec!["data".to_string()]
        ));
        assert!(matches!(
            parse_suggestions(r#"{"results": "nope"}"#),
            Err(ResponseShapeError::FieldNotArray("results"))
        ));
        assert!(matches!(
            parse_suggestions("42"),
            Err(ResponseShapeError::UnexpectedType("number"))
        ));
        assert!(matches!(
            parse_suggestions("not json"),
            Err(ResponseShapeError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("5"), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after(" 12 "), Some(Duration::from_secs(12)));
        assert_eq!(parse_retry_after("-1"), None);
        assert_eq!(parse_retry_after("1.5"), None);
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
        assert_eq!(parse_retry_after(""), None);
    }

    #[test]
    fn test_endpoint_url() {
        assert_eq!(
            endpoint_url("http://host:8000", "v1"),
            "http://host:8000/v1/autocomplete"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_429_honors_header() {
        let transport = ScriptedTransport::new()
            .respond("ab", RawResponse::status(429).with_retry_after("5"))
            .respond("ab", RawResponse::ok(r#"["x","y"]"#));
        let client = client(transport.clone(), 1);

        let start = Instant::now();
        let outcome = client.query("v1", "ab", &Shutdown::never()).await.unwrap();

        assert_eq!(outcome, QueryOutcome::Suggestions(vec!["x".into(), "y".into()]));
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(60));
        assert_eq!(transport.calls(), vec!["ab", "ab"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_429_without_header_uses_default_delay() {
        let transport = ScriptedTransport::new()
            .respond("ab", RawResponse::status(429).with_retry_after("soon"))
            .respond("ab", RawResponse::ok("[]"));
        let client = client(transport, 3);

        let start = Instant::now();
        let outcome = client.query("v1", "ab", &Shutdown::never()).await.unwrap();

        assert_eq!(outcome, QueryOutcome::Suggestions(vec![]));
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_budget_collapses_to_empty() {
        let transport = ScriptedTransport::new()
            .respond("ab", RawResponse::status(429).with_retry_after("1"))
            .respond("ab", RawResponse::status(429).with_retry_after("1"))
            .respond("ab", RawResponse::status(429).with_retry_after("1"));
        let sink = RecordingSink::new();
        let client = ServiceClient::new(
            transport.clone(),
            RetryPolicy {
                max_retries: 2,
                default_delay: Duration::from_secs(1),
            },
            sink.clone(),
        );

        let outcome = client.query("v1", "ab", &Shutdown::never()).await.unwrap();

        assert_eq!(outcome, QueryOutcome::Exhausted);
        assert!(outcome.into_names().is_empty());
        assert_eq!(transport.calls().len(), 3);
        assert_eq!(
            sink.count(|e| matches!(e, CrawlEvent::RetriesExhausted { attempts: 3, .. })),
            1
        );
        assert_eq!(
            sink.count(|e| matches!(e, CrawlEvent::ServiceRateLimited { .. })),
            2
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_largest_retry_budget_still_queries() {
        let transport = ScriptedTransport::new().names("ab", &["x"]);
        let client = client(transport.clone(), u32::MAX);

        let outcome = client.query("v1", "ab", &Shutdown::never()).await.unwrap();

        assert_eq!(outcome, QueryOutcome::Suggestions(vec!["x".to_string()]));
        assert_eq!(transport.calls(), vec!["ab"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_status_is_not_retried() {
        let transport = ScriptedTransport::new().respond("ab", RawResponse::status(500));
        let client = client(transport.clone(), 3);

        let outcome = client.query("v1", "ab", &Shutdown::never()).await.unwrap();

        assert_eq!(outcome, QueryOutcome::Rejected { status: 500 });
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_is_retried_with_default_delay() {
        let transport = ScriptedTransport::new()
            .fail("ab", TransportError::Timeout)
            .respond("ab", RawResponse::ok(r#"{"names": ["abc"]}"#));
        let client = client(transport.clone(), 3);

        let start = Instant::now();
        let names = client
            .suggestions("v1", "ab", &Shutdown::never())
            .await
            .unwrap();

        assert_eq!(names, vec!["abc"]);
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecognized_body_is_not_retried() {
        let transport = ScriptedTransport::new().respond("ab", RawResponse::ok(r#"{"data": 1}"#));
        let sink = RecordingSink::new();
        let client = ServiceClient::new(transport.clone(), RetryPolicy::default(), sink.clone());

        let outcome = client.query("v1", "ab", &Shutdown::never()).await.unwrap();

        assert_eq!(outcome, QueryOutcome::Unrecognized);
        assert_eq!(transport.calls().len(), 1);
        assert_eq!(
            sink.count(|e| matches!(e, CrawlEvent::UnrecognizedResponse { .. })),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_is_cancellable() {
        let transport = ScriptedTransport::new()
            .respond("ab", RawResponse::status(429).with_retry_after("600"));
        let client = client(transport, 3);
        let (trigger, shutdown) = Shutdown::channel();

        let task = tokio::spawn(async move { client.query("v1", "ab", &shutdown).await });
        tokio::time::sleep(Duration::from_secs(10)).await;
        trigger.trigger();

        assert_eq!(task.await.unwrap(), Err(Cancelled));
    }
}
