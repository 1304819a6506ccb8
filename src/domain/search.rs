use serde::{Deserialize, Serialize};
use url::Url;

use super::classification::ClassificationOutcome;

/// Key used to compare result URLs: lowercase host, no fragment, no
/// trailing slash. Unparseable input is only trimmed.
pub fn normalize_url(url: &str) -> String {
    match Url::parse(url.trim()) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.as_str().trim_end_matches('/').to_string()
        }
        Err(_) => url.trim().trim_end_matches('/').to_string(),
    }
}

/// Content filters forwarded to the search API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    pub exclude_directories: bool,
    pub exclude_forums: bool,
    pub exclude_social_media: bool,
    pub exclude_news_sites: bool,
    pub exclude_blogs: bool,
}

/// How recent results must be. The search API enforces it, we only forward it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Recency {
    #[default]
    AnyTime,
    PastDay,
    PastWeek,
    PastMonth,
    PastYear,
    Days(u32),
}

impl Recency {
    pub fn max_age_days(&self) -> Option<u32> {
        match self {
            Recency::AnyTime => None,
            Recency::PastDay => Some(1),
            Recency::PastWeek => Some(7),
            Recency::PastMonth => Some(30),
            Recency::PastYear => Some(365),
            Recency::Days(0) => None,
            Recency::Days(days) => Some(*days),
        }
    }
}

/// The date restriction the search API reports it honored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateFilterApplied {
    pub max_age_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStats {
    pub query: String,
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub search_time_secs: f64,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub position: u32,
    pub title: String,
    pub url: String,
    pub display_url: String,
    pub description: String,
    pub source_query: String,
    pub cache_id: Option<String>,
    pub query_stats: Option<QueryStats>,

    // Decorations written while classifying.
    #[serde(default)]
    pub classification: Option<ClassificationOutcome>,
    #[serde(default)]
    pub is_expanded: bool,
    #[serde(default)]
    pub is_processing: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationState {
    pub current_page: u32,
    pub results_per_page: u32,
    pub total_pages: u32,
    pub total_results: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationState {
    pub fn compute(current_page: u32, results_per_page: u32, total_results: u64) -> Self {
        let total_pages = match results_per_page {
            0 => 0,
            per_page => total_results.div_ceil(u64::from(per_page)),
        };
        let total_pages = u32::try_from(total_pages).unwrap_or(u32::MAX);

        PaginationState {
            current_page,
            results_per_page,
            total_pages,
            total_results,
            has_next: current_page < total_pages,
            has_prev: current_page > 1,
        }
    }
}

/// One page of merged results for every query of a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub query_stats: Vec<QueryStats>,
    pub total_results: u64,
    pub pagination: PaginationState,
    pub date_filtering_applied: Option<DateFilterApplied>,
}

impl SearchResponse {
    /// Queries that failed while the rest of the search succeeded.
    pub fn failed_queries(&self) -> Vec<&QueryStats> {
        self.query_stats.iter().filter(|s| !s.success).collect()
    }
}
