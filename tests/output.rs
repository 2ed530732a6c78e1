use httpmock::MockServer;
use serial_test::serial;

mod common;

use stasis_bench::report::OutputDocument;
use stasis_bench::Benchmark;

const OUTPUT_FILE: &str = "stasis-bench-results.json";

#[tokio::test]
#[serial]
async fn output_file_is_valid_json() {
    common::cleanup_files(vec![OUTPUT_FILE]);

    let server = MockServer::start();
    common::mock_healthy(&server);
    common::mock_pdf(&server, "%PDF-1.7");

    let configuration = common::build_configuration(
        &server,
        vec!["--users", "2", "--requests", "3", "--output", OUTPUT_FILE],
    );
    let report = Benchmark::new(configuration)
        .unwrap()
        .execute()
        .await
        .unwrap()
        .expect("health check should pass");

    let contents = std::fs::read_to_string(OUTPUT_FILE).expect("results file was not written");
    let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
    let object = value.as_object().unwrap();
    for key in &["timestamp", "configuration", "duration", "analysis"] {
        assert!(object.contains_key(*key), "missing key {}", key);
    }

    let configuration = &value["configuration"];
    assert_eq!(configuration["url"], server.base_url().as_str());
    assert_eq!(configuration["concurrent_users"], 2);
    assert_eq!(configuration["requests_per_user"], 3);
    assert_eq!(configuration["total_requests"], 6);
    assert_eq!(value["analysis"]["total_requests"], 6);
    assert_eq!(value["analysis"]["file_sizes"]["max"], 8);

    // The document parses back into the analysis that was returned.
    let document: OutputDocument = serde_json::from_str(&contents).unwrap();
    assert_eq!(document.analysis.total_requests, report.analysis.total_requests);
    assert_eq!(document.analysis.errors, report.analysis.errors);
    assert!((document.duration - report.duration).abs() < 1e-9);

    common::cleanup_files(vec![OUTPUT_FILE]);
}

#[tokio::test]
#[serial]
async fn no_output_file_unless_requested() {
    common::cleanup_files(vec![OUTPUT_FILE]);

    let server = MockServer::start();
    common::mock_healthy(&server);
    common::mock_pdf(&server, "%PDF-1.7");

    let configuration = common::build_configuration(&server, vec!["--verbose"]);
    let report = Benchmark::new(configuration)
        .unwrap()
        .execute()
        .await
        .unwrap();
    assert!(report.is_some());
    assert!(!std::path::Path::new(OUTPUT_FILE).exists());
}

#[tokio::test]
async fn unwritable_output_file_is_an_error() {
    let server = MockServer::start();
    common::mock_healthy(&server);
    common::mock_pdf(&server, "%PDF-1.7");

    let configuration = common::build_configuration(
        &server,
        vec!["--output", "no-such-directory/stasis/results.json"],
    );
    let result = Benchmark::new(configuration).unwrap().execute().await;
    assert!(matches!(result, Err(stasis_bench::BenchError::Io(_))));
}
