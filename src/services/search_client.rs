use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{DateFilterApplied, QueryStats, SearchFilters},
    error::{Result, ScoutError},
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchApiRequest {
    pub queries: Vec<String>,
    pub api_key: String,
    pub search_engine_id: String,
    pub results_per_page: u32,
    pub page: u32,
    pub filters: SearchFilters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age_days: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchApiResponse {
    pub success: bool,
    #[serde(default)]
    pub results: Vec<ApiSearchResult>,
    #[serde(default)]
    pub per_query_stats: Vec<QueryStats>,
    #[serde(default)]
    pub total_results: u64,
    pub pagination: Option<ApiPagination>,
    pub date_filtering_applied: Option<DateFilterApplied>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSearchResult {
    pub position: Option<u32>,
    #[serde(default)]
    pub title: String,
    #[serde(alias = "link")]
    pub url: String,
    #[serde(alias = "displayLink")]
    pub display_url: Option<String>,
    #[serde(alias = "snippet")]
    pub description: Option<String>,
    #[serde(alias = "query")]
    pub source_query: String,
    pub cache_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

/// The external web-search API, treated as a black box.
#[async_trait]
pub trait SearchApi: Send + Sync {
    async fn search(&self, request: &SearchApiRequest) -> Result<SearchApiResponse>;
}

pub struct HttpSearchClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSearchClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(HttpSearchClient {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl SearchApi for HttpSearchClient {
    async fn search(&self, request: &SearchApiRequest) -> Result<SearchApiResponse> {
        let res = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                log::error!("No response from search API, error: {:?}", e);
                ScoutError::from(e)
            })?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            log::error!("Search API answered {}: {}", status, body);
            return Err(ScoutError::api(
                "search",
                format!("HTTP {}: {}", status, body.trim()),
            ));
        }

        res.json::<SearchApiResponse>().await.map_err(|e| {
            log::error!("Error when deserializing search response: {:?}", e);
            ScoutError::Transport(format!("invalid search response: {}", e))
        })
    }
}
