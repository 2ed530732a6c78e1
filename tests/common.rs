use gumdrop::Options;
use httpmock::Method::GET;
use httpmock::{Mock, MockServer};
use serde_json::json;

use stasis_bench::config::{BenchConfiguration, RunConfiguration, HEALTH_PATH, TEST_PATH};

// Not every test file uses every helper, so the helpers other than
// build_configuration carry allow(dead_code).

/// The following options are configured by default, if not set to a custom value:
///  --url <mock-server>
///  --users 1
///  --requests 1
///  --timeout 5
pub fn build_configuration(server: &MockServer, custom: Vec<&str>) -> RunConfiguration {
    // Start with an empty configuration.
    let mut configuration: Vec<&str> = vec![];
    // Declare server_url here no matter what, so its lifetime is sufficient when needed.
    let server_url = server.base_url();

    // Merge in all custom options first.
    configuration.extend_from_slice(&custom);

    // Default to using mock server if not otherwise configured.
    if !configuration.contains(&"--url") {
        configuration.extend_from_slice(&["--url", &server_url]);
    }

    // Default to testing with 1 user if not otherwise configured.
    if !configuration.contains(&"--users") {
        configuration.extend_from_slice(&["--users", "1"]);
    }

    // Default to 1 request per user if not otherwise configured.
    if !configuration.contains(&"--requests") {
        configuration.extend_from_slice(&["--requests", "1"]);
    }

    // Keep tests from hanging on an unresponsive endpoint.
    if !configuration.contains(&"--timeout") {
        configuration.extend_from_slice(&["--timeout", "5"]);
    }

    // Parse these options to generate a BenchConfiguration, then resolve it.
    BenchConfiguration::parse_args_default(&configuration)
        .expect("failed to parse options and generate a configuration")
        .configure()
        .expect("failed to validate configuration")
}

/// Mock a healthy service status endpoint.
#[allow(dead_code)]
pub fn mock_healthy<'a>(server: &'a MockServer) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(GET).path(HEALTH_PATH);
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "status": "ok", "service": "stasis" }));
    })
}

/// Mock the test endpoint returning a small PDF document.
#[allow(dead_code)]
pub fn mock_pdf<'a>(server: &'a MockServer, body: &str) -> Mock<'a> {
    let body = body.to_string();
    server.mock(|when, then| {
        when.method(GET).path(TEST_PATH);
        then.status(200)
            .header("content-type", "application/pdf")
            .body(body);
    })
}

/// Helper to delete test artifacts, if existing.
#[allow(dead_code)]
pub fn cleanup_files(files: Vec<&str>) {
    for file in files {
        if std::path::Path::new(file).exists() {
            std::fs::remove_file(file).expect("failed to remove file");
        }
    }
}
