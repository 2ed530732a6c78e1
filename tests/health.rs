use httpmock::Method::GET;
use httpmock::MockServer;

mod common;

use stasis_bench::config::{HEALTH_PATH, TEST_PATH};
use stasis_bench::Benchmark;

#[tokio::test]
async fn healthy_service() {
    let server = MockServer::start();
    let health = common::mock_healthy(&server);

    let configuration = common::build_configuration(&server, vec![]);
    let benchmark = Benchmark::new(configuration).unwrap();
    assert!(benchmark.check_health().await);
    health.assert_hits(1);
}

#[tokio::test]
async fn health_without_service_field() {
    let server = MockServer::start();
    let health = server.mock(|when, then| {
        when.method(GET).path(HEALTH_PATH);
        then.status(200)
            .header("content-type", "application/json")
            .body("{}");
    });

    let configuration = common::build_configuration(&server, vec![]);
    let benchmark = Benchmark::new(configuration).unwrap();
    // The service name is only informational.
    assert!(benchmark.check_health().await);
    health.assert_hits(1);
}

#[tokio::test]
async fn health_requires_json() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(HEALTH_PATH);
        then.status(200).body("all good");
    });

    let configuration = common::build_configuration(&server, vec![]);
    let benchmark = Benchmark::new(configuration).unwrap();
    assert!(!benchmark.check_health().await);
}

#[tokio::test]
async fn unreachable_service() {
    // Nothing listens on port 1.
    let server = MockServer::start();
    let configuration = common::build_configuration(&server, vec!["--url", "http://127.0.0.1:1"]);
    let benchmark = Benchmark::new(configuration).unwrap();
    assert!(!benchmark.check_health().await);
}

#[tokio::test]
async fn unhealthy_service_generates_no_load() {
    let server = MockServer::start();
    let health = server.mock(|when, then| {
        when.method(GET).path(HEALTH_PATH);
        then.status(503)
            .header("content-type", "application/json")
            .body(r#"{"service":"stasis","status":"starting"}"#);
    });
    let test_endpoint = server.mock(|when, then| {
        when.method(GET).path(TEST_PATH);
        then.status(200).body("%PDF-1.7");
    });

    let configuration = common::build_configuration(&server, vec!["--users", "2"]);
    let benchmark = Benchmark::new(configuration).unwrap();
    assert!(!benchmark.check_health().await);

    // No report is produced, and the load test endpoint is never touched.
    let report = benchmark.execute().await.unwrap();
    assert!(report.is_none());
    health.assert_hits(2);
    test_endpoint.assert_hits(0);
}
