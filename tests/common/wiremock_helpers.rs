use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One result row as the search API returns it.
pub fn search_hit(url: &str, query: &str) -> Value {
    json!({
        "title": format!("Title of {}", url),
        "link": url,
        "displayLink": url.trim_start_matches("https://"),
        "snippet": "A local business",
        "query": query,
    })
}

/// Creates a mock search API that answers every POST with the given hits.
pub async fn mock_search_api(hits: Vec<Value>, queries: &[&str], total_results: u64) -> MockServer {
    let server = MockServer::start().await;

    let stats: Vec<Value> = queries
        .iter()
        .map(|q| json!({ "query": q, "totalResults": total_results, "success": true }))
        .collect();

    Mock::given(method("POST"))
        .and(path("/api/industry-search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "results": hits,
            "perQueryStats": stats,
            "totalResults": total_results,
        })))
        .mount(&server)
        .await;

    server
}

/// Creates a mock backend whose extraction endpoint returns the given businesses.
pub async fn mock_extraction(businesses: Vec<Value>) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/business-discovery/extract"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "businesses": businesses,
        })))
        .mount(&server)
        .await;

    server
}

/// Mounts a job record answer for `GET /jobs?jobId=`.
pub async fn mount_job_status(server: &MockServer, job_id: &str, status: &str, processed: u64) {
    Mock::given(method("GET"))
        .and(path("/api/business-discovery/jobs"))
        .and(query_param("jobId", job_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": job_id,
            "status": status,
            "totalResults": 10,
            "processedResults": processed,
            "successCount": processed,
            "errorCount": 0,
            "startTime": "2024-05-01T12:00:00Z",
        })))
        .mount(server)
        .await;
}

/// Creates a mock HTTP server that delays responses to simulate network timeouts.
pub async fn mock_timeout_server(delay: Duration) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true }))
                .set_delay(delay),
        )
        .mount(&server)
        .await;

    server
}

/// Creates a mock HTTP server that returns the specified HTTP error status code.
pub async fn mock_error_server(status_code: u16) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(status_code).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    server
}
