//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock autocomplete servers and test
//! the HTTP transport and the full crawl cycle end-to-end.

use prefix_sweep::config::{Config, ServiceConfig};
use prefix_sweep::crawler::{
    CrawlOutcome, CrawlSupervisor, HttpTransport, QueryOutcome, RetryPolicy, ServiceClient,
    Shutdown,
};
use prefix_sweep::events::{CrawlEvent, RecordingSink};
use prefix_sweep::output::aggregate_results;
use prefix_sweep::storage::{Checkpoint, CheckpointStore, JsonFileStore};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service_config(base_url: &str) -> ServiceConfig {
    ServiceConfig {
        base_url: base_url.to_string(),
        max_retries: 3,
        retry_delay_secs: 0,
        timeout_secs: 5,
    }
}

fn client(base_url: &str, max_retries: u32) -> (ServiceClient<HttpTransport>, Arc<RecordingSink>) {
    let sink = RecordingSink::new();
    let transport = HttpTransport::new(&service_config(base_url)).expect("Failed to build client");
    let policy = RetryPolicy {
        max_retries,
        default_delay: Duration::ZERO,
    };
    (ServiceClient::new(transport, policy, sink.clone()), sink)
}

/// Creates a test configuration pointing at the mock server and a temp dir
fn create_test_config(base_url: &str, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.service = service_config(base_url);
    config.storage.checkpoint_dir = dir.path().join("checkpoints").display().to_string();
    config.storage.results_dir = dir.path().join("results").display().to_string();
    config.crawl.variants = vec!["v1".to_string()];
    config
}

#[tokio::test]
async fn test_query_hits_variant_endpoint() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/autocomplete"))
        .and(query_param("query", "ab"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"results": ["abby", "abe"]}"#),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, _) = client(&mock_server.uri(), 3);
    let outcome = client.query("v2", "ab", &Shutdown::never()).await.unwrap();

    assert_eq!(
        outcome,
        QueryOutcome::Suggestions(vec!["abby".to_string(), "abe".to_string()])
    );
}

#[tokio::test]
async fn test_response_shapes() {
    let mock_server = MockServer::start().await;

    for (prefix, body) in [
        ("a", r#"["ann", 7, "amy"]"#),
        ("b", r#"{"suggestions": ["bob"]}"#),
        ("c", r#"{"names": ["cy"], "results": ["cal"]}"#),
        ("d", r#"{"total": 3}"#),
        ("e", "not json"),
    ] {
        Mock::given(method("GET"))
            .and(path("/v1/autocomplete"))
            .and(query_param("query", prefix))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;
    }

    let (client, sink) = client(&mock_server.uri(), 0);
    let never = Shutdown::never();

    assert_eq!(
        client.suggestions("v1", "a", &never).await.unwrap(),
        vec!["ann", "amy"]
    );
    assert_eq!(client.suggestions("v1", "b", &never).await.unwrap(), vec!["bob"]);
    assert_eq!(client.suggestions("v1", "c", &never).await.unwrap(), vec!["cal"]);
    assert_eq!(
        client.query("v1", "d", &never).await.unwrap(),
        QueryOutcome::Unrecognized
    );
    assert_eq!(
        client.query("v1", "e", &never).await.unwrap(),
        QueryOutcome::Unrecognized
    );
    assert_eq!(
        sink.count(|e| matches!(e, CrawlEvent::UnrecognizedResponse { .. })),
        2
    );
}

#[tokio::test]
async fn test_rate_limited_then_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/autocomplete"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/autocomplete"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"["x", "y"]"#))
        .mount(&mock_server)
        .await;

    let (client, sink) = client(&mock_server.uri(), 1);
    let outcome = client.query("v1", "x", &Shutdown::never()).await.unwrap();

    assert_eq!(
        outcome,
        QueryOutcome::Suggestions(vec!["x".to_string(), "y".to_string()])
    );
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        sink.count(|e| matches!(e, CrawlEvent::ServiceRateLimited { .. })),
        1
    );
}

#[tokio::test]
async fn test_retries_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let (client, sink) = client(&mock_server.uri(), 2);
    let outcome = client.query("v1", "q", &Shutdown::never()).await.unwrap();

    assert_eq!(outcome, QueryOutcome::Exhausted);
    assert_eq!(
        sink.count(|e| matches!(e, CrawlEvent::RetriesExhausted { attempts: 3, .. })),
        1
    );
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, sink) = client(&mock_server.uri(), 3);
    let outcome = client.query("v1", "q", &Shutdown::never()).await.unwrap();

    assert_eq!(outcome, QueryOutcome::Rejected { status: 500 });
    assert_eq!(
        sink.count(|e| matches!(e, CrawlEvent::UnexpectedStatus { status: 500, .. })),
        1
    );
}

#[tokio::test]
async fn test_unreachable_service_degrades_to_empty() {
    // Reserve a free port, then close it so connections are refused
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let (client, sink) = client(&format!("http://127.0.0.1:{}", port), 1);

    let names = client
        .suggestions("v1", "a", &Shutdown::never())
        .await
        .unwrap();

    assert!(names.is_empty());
    assert_eq!(
        sink.count(|e| matches!(e, CrawlEvent::TransportFailure { .. })),
        2
    );
}

#[tokio::test]
async fn test_full_crawl_writes_artifacts() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // A full page for "a" makes the crawler descend one level
    let page: Vec<String> = (0..10).map(|i| format!("a-name-{}", i)).collect();
    Mock::given(method("GET"))
        .and(path("/v1/autocomplete"))
        .and(query_param("query", "a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&page))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/autocomplete"))
        .and(query_param("query", "ab"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"results": ["abbey"]}"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/autocomplete"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &dir);
    let store = config.storage.file_store();
    store.ensure_dirs().unwrap();
    let sink = RecordingSink::new();
    let supervisor = CrawlSupervisor::from_config(config, sink.clone()).unwrap();

    let reports = supervisor
        .run(&["v1".to_string()], Shutdown::never())
        .await;

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].outcome, CrawlOutcome::Completed);
    assert_eq!(reports[0].requests, 52);
    assert_eq!(reports[0].names, 11);
    assert!(reports[0].results_saved);

    // Results artifact on disk
    let raw = std::fs::read_to_string(dir.path().join("results").join("v1_names.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["version"], "v1");
    assert_eq!(json["total_names"], 11);
    assert_eq!(json["request_count"], 52);
    assert!(json["completed_at"].is_string());

    // Final checkpoint on disk
    let checkpoint = store.load_checkpoint("v1").unwrap().unwrap();
    assert_eq!(checkpoint.request_count, 52);
    assert!(checkpoint.branching_prefixes.contains("a"));
    assert_eq!(checkpoint.visited_prefixes.len(), 52);

    let summary = aggregate_results(&store, &["v1".to_string()]).unwrap();
    assert_eq!(summary.total_unique(), 11);
    assert_eq!(summary.total_requests, 52);
}

#[tokio::test]
async fn test_crawl_resumes_from_checkpoint_file() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/v1/autocomplete"))
        .and(query_param("query", "z"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"["zoe"]"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &dir);
    let store = JsonFileStore::new(
        &config.storage.checkpoint_dir,
        &config.storage.results_dir,
    );
    store.ensure_dirs().unwrap();

    let checkpoint = Checkpoint {
        names: ["cat".to_string(), "car".to_string()].into_iter().collect(),
        visited_prefixes: ('a'..'z').map(|c| c.to_string()).collect(),
        request_count: 25,
        branching_prefixes: Default::default(),
    };
    store.save_checkpoint("v1", &checkpoint).unwrap();

    let sink = RecordingSink::new();
    let supervisor = CrawlSupervisor::from_config(config, sink.clone()).unwrap();
    let reports = supervisor
        .run(&["v1".to_string()], Shutdown::never())
        .await;

    assert_eq!(reports[0].requests, 26);
    assert_eq!(reports[0].names, 3);
    assert_eq!(
        sink.count(|e| matches!(e, CrawlEvent::CheckpointLoaded { names: 2, .. })),
        1
    );

    let results = store.load_results("v1").unwrap().unwrap();
    assert_eq!(results.names, vec!["car", "cat", "zoe"]);
}
