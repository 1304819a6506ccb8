use std::{collections::HashMap, sync::Arc};

use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{
        DateFilterApplied, PaginationState, QueryStats, Recency, SearchFilters, SearchResponse,
        SearchResult,
    },
    error::{Result, ScoutError},
};

use super::{ApiSearchResult, SearchApi, SearchApiRequest, SearchApiResponse};

pub const MAX_RESULTS_PER_PAGE: u32 = 100;

#[derive(Debug, Clone)]
pub struct SearchCredentials {
    api_key: SecretString,
    pub search_engine_id: String,
}

impl SearchCredentials {
    pub fn new(api_key: &str, search_engine_id: String) -> Self {
        SearchCredentials {
            api_key: SecretString::from(api_key.to_string()),
            search_engine_id,
        }
    }

    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    fn validate(&self) -> Result<()> {
        if self.api_key().trim().is_empty() {
            return Err(ScoutError::Configuration(
                "search API key is not set".to_string(),
            ));
        }
        if self.search_engine_id.trim().is_empty() {
            return Err(ScoutError::Configuration(
                "search engine id is not set".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub queries: Vec<String>,
    pub credentials: Arc<SearchCredentials>,
    pub page_size: u32,
    pub page: u32,
    pub filters: SearchFilters,
    pub recency: Recency,
}

impl SearchRequest {
    pub fn for_page(&self, page: u32) -> Self {
        SearchRequest {
            page,
            ..self.clone()
        }
    }

    fn validate(&self) -> Result<()> {
        self.credentials.validate()?;

        if self.queries.is_empty() {
            return Err(ScoutError::InputValidation(
                "no search queries were generated".to_string(),
            ));
        }
        if self.page == 0 {
            return Err(ScoutError::InputValidation(
                "page numbers start at 1".to_string(),
            ));
        }
        if !(1..=MAX_RESULTS_PER_PAGE).contains(&self.page_size) {
            return Err(ScoutError::InputValidation(format!(
                "results per page must be between 1 and {}",
                MAX_RESULTS_PER_PAGE
            )));
        }
        Ok(())
    }

    /// Results before this page, used to number results the API left unnumbered.
    fn position_offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.page_size as usize
    }

    fn to_api_request(&self) -> SearchApiRequest {
        SearchApiRequest {
            queries: self.queries.clone(),
            api_key: self.credentials.api_key().to_string(),
            search_engine_id: self.credentials.search_engine_id.clone(),
            results_per_page: self.page_size,
            page: self.page,
            filters: self.filters,
            max_age_days: self.recency.max_age_days(),
        }
    }
}

/// Runs every query for one page and merges the results.
///
/// If `cancel` fires first, the request future is dropped (closing its
/// connection) and `Cancelled` is returned.
pub async fn search(
    api: &dyn SearchApi,
    request: &SearchRequest,
    cancel: &CancellationToken,
) -> Result<SearchResponse> {
    request.validate()?;

    let api_request = request.to_api_request();
    log::info!(
        "Searching {} queries, page {} ({} per page)",
        request.queries.len(),
        request.page,
        request.page_size
    );

    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            log::info!("Search for page {} cancelled", request.page);
            return Err(ScoutError::Cancelled);
        }
        response = api.search(&api_request) => response?,
    };

    merge_response(request, response)
}

fn merge_response(request: &SearchRequest, response: SearchApiResponse) -> Result<SearchResponse> {
    if !response.success {
        return Err(ScoutError::api(
            "search",
            response
                .error
                .unwrap_or_else(|| "search API reported failure".to_string()),
        ));
    }

    let stats_by_query: HashMap<&str, &QueryStats> = response
        .per_query_stats
        .iter()
        .map(|s| (s.query.as_str(), s))
        .collect();

    for failed in response.per_query_stats.iter().filter(|s| !s.success) {
        log::warn!(
            "Query '{}' failed: {}",
            failed.query,
            failed.error.as_deref().unwrap_or("unknown error")
        );
    }

    let results: Vec<SearchResult> = response
        .results
        .into_iter()
        .enumerate()
        .filter_map(|(i, r)| {
            if !request.queries.contains(&r.source_query) {
                log::warn!(
                    "Dropping result {} tagged with unknown query '{}'",
                    r.url,
                    r.source_query
                );
                return None;
            }
            let stats = stats_by_query.get(r.source_query.as_str()).map(|s| (*s).clone());
            Some(into_search_result(r, request.position_offset() + i, stats))
        })
        .collect();

    let pagination = match response.pagination {
        Some(p) => PaginationState {
            current_page: p.current_page,
            results_per_page: request.page_size,
            total_pages: p.total_pages,
            total_results: response.total_results,
            has_next: p.has_next,
            has_prev: p.has_prev,
        },
        None => PaginationState::compute(request.page, request.page_size, response.total_results),
    };

    let date_filtering_applied = response.date_filtering_applied.or_else(|| {
        request
            .recency
            .max_age_days()
            .map(|max_age_days| DateFilterApplied { max_age_days })
    });

    log::info!(
        "Search page {} returned {} results of {} total",
        pagination.current_page,
        results.len(),
        response.total_results
    );

    Ok(SearchResponse {
        results,
        query_stats: response.per_query_stats,
        total_results: response.total_results,
        pagination,
        date_filtering_applied,
    })
}

fn into_search_result(r: ApiSearchResult, index: usize, stats: Option<QueryStats>) -> SearchResult {
    let display_url = r.display_url.unwrap_or_else(|| r.url.clone());
    SearchResult {
        position: r.position.unwrap_or(index as u32 + 1),
        title: r.title,
        url: r.url,
        display_url,
        description: r.description.unwrap_or_default(),
        source_query: r.source_query,
        cache_id: r.cache_id,
        query_stats: stats,
        classification: None,
        is_expanded: false,
        is_processing: false,
        error: None,
    }
}
