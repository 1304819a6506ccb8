mod common;

use std::{sync::Arc, time::Duration};

use common::wiremock_helpers::{mock_error_server, mock_search_api, mock_timeout_server, search_hit};
use scout::{
    domain::{Recency, SearchFilters},
    error::ScoutError,
    services::{harvest_all, search, HarvestLimits, HttpSearchClient, SearchCredentials, SearchRequest},
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

const QUERY: &str = "Dentist in Austin, Texas";

fn request(page_size: u32, recency: Recency) -> SearchRequest {
    SearchRequest {
        queries: vec![QUERY.to_string()],
        credentials: Arc::new(SearchCredentials::new("test-key", "test-cx".to_string())),
        page_size,
        page: 1,
        filters: SearchFilters::default(),
        recency,
    }
}

fn client(server: &MockServer, timeout: Duration) -> HttpSearchClient {
    HttpSearchClient::new(format!("{}/api/industry-search", server.uri()), timeout).unwrap()
}

#[tokio::test]
async fn search_reads_results_and_computes_pagination() {
    let server = mock_search_api(
        vec![
            search_hit("https://austinsmiles.com", QUERY),
            search_hit("https://downtowndental.com", QUERY),
        ],
        &[QUERY],
        45,
    )
    .await;

    let response = search(
        &client(&server, Duration::from_secs(5)),
        &request(10, Recency::AnyTime),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(response.results.len(), 2);
    assert_eq!(response.results[0].source_query, QUERY);
    assert_eq!(response.results[0].display_url, "austinsmiles.com");
    assert!(response.results[0].query_stats.as_ref().unwrap().success);
    assert_eq!(response.pagination.total_pages, 5);
    assert!(response.pagination.has_next);
    assert!(!response.pagination.has_prev);
}

#[tokio::test]
async fn recency_is_forwarded_as_max_age_days() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/industry-search"))
        .and(body_partial_json(json!({
            "queries": [QUERY],
            "apiKey": "test-key",
            "searchEngineId": "test-cx",
            "resultsPerPage": 10,
            "page": 1,
            "maxAgeDays": 7,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "results": [],
            "totalResults": 0,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = search(
        &client(&server, Duration::from_secs(5)),
        &request(10, Recency::PastWeek),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(response.date_filtering_applied.unwrap().max_age_days, 7);
}

#[tokio::test]
async fn http_error_becomes_api_error() {
    let server = mock_error_server(500).await;

    let err = search(
        &client(&server, Duration::from_secs(5)),
        &request(10, Recency::AnyTime),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    match err {
        ScoutError::Api { service, message } => {
            assert_eq!(service, "search");
            assert!(message.contains("500"));
        }
        other => panic!("expected an API error, got {:?}", other),
    }
}

#[tokio::test]
async fn slow_api_times_out_as_transport_error() {
    let server = mock_timeout_server(Duration::from_secs(5)).await;
    let client = HttpSearchClient::new(server.uri(), Duration::from_millis(200)).unwrap();

    let err = search(&client, &request(10, Recency::AnyTime), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ScoutError::Transport(_)));
}

#[tokio::test]
async fn cancel_returns_without_waiting_for_the_api() {
    let server = mock_timeout_server(Duration::from_secs(30)).await;
    let client = HttpSearchClient::new(server.uri(), Duration::from_secs(60)).unwrap();
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let err = search(&client, &request(10, Recency::AnyTime), &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn harvest_walks_pages_until_the_last() {
    let server = MockServer::start().await;
    for page in 1..=3u32 {
        let hits: Vec<_> = (0..2)
            .map(|i| search_hit(&format!("https://p{}-{}.com", page, i), QUERY))
            .collect();
        Mock::given(method("POST"))
            .and(path("/api/industry-search"))
            .and(body_partial_json(json!({ "page": page })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "results": hits,
                "totalResults": 6,
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let outcome = harvest_all(
        &client(&server, Duration::from_secs(5)),
        &request(2, Recency::AnyTime),
        HarvestLimits::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.pages_fetched, 3);
    assert_eq!(outcome.results.len(), 6);
    assert_eq!(outcome.results[0].url, "https://p1-0.com");
    assert_eq!(outcome.results[5].url, "https://p3-1.com");
    assert!(outcome.stopped_by_error.is_none());
}
