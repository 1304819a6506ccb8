use itertools::Itertools;
use serde::Serialize;

use crate::error::ScoutError;

use super::{
    classification::ClassificationOutcome,
    search::{DateFilterApplied, PaginationState, SearchResponse, SearchResult},
};

/// Everything the panel shows about the current search.
///
/// Each result carries an `is_processing` flag that works as a busy lock:
/// a result can be claimed by one classification at a time.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchState {
    pub queries: Vec<String>,
    pub results: Vec<SearchResult>,
    pub pagination: Option<PaginationState>,
    pub date_filtering_applied: Option<DateFilterApplied>,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
pub struct Claimed {
    pub results: Vec<SearchResult>,
    pub busy: Vec<String>,
    pub unknown: Vec<String>,
}

impl SearchState {
    pub fn apply_response(&mut self, queries: Vec<String>, response: SearchResponse) {
        self.queries = queries;
        self.results = response.results;
        self.pagination = Some(response.pagination);
        self.date_filtering_applied = response.date_filtering_applied;
        self.last_error = None;
    }

    /// Harvested results are shown as a single page.
    pub fn apply_harvest(&mut self, queries: Vec<String>, results: Vec<SearchResult>) {
        let count = results.len();
        self.queries = queries;
        self.results = results;
        self.pagination = Some(PaginationState::compute(
            1,
            u32::try_from(count).unwrap_or(u32::MAX).max(1),
            count as u64,
        ));
        self.last_error = None;
    }

    /// Cancellation leaves everything as it was. Any other failure clears
    /// the pagination so no stale paging controls are shown.
    pub fn apply_failure(&mut self, error: &ScoutError) {
        if error.is_cancelled() {
            return;
        }
        self.results.clear();
        self.pagination = None;
        self.date_filtering_applied = None;
        self.last_error = Some(error.to_string());
    }

    pub fn find(&self, url: &str) -> Option<&SearchResult> {
        self.results.iter().find(|r| r.url == url)
    }

    /// Every result listed under `url`. The same site can come back from
    /// several queries, all copies share one busy flag and one outcome.
    fn copies_mut<'a>(&'a mut self, url: &'a str) -> impl Iterator<Item = &'a mut SearchResult> + 'a {
        self.results.iter_mut().filter(move |r| r.url == url)
    }

    pub fn claim(&mut self, url: &str) -> Result<SearchResult, ScoutError> {
        let first = self.find(url).cloned().ok_or_else(|| ScoutError::UnknownResult {
            url: url.to_string(),
        })?;
        if self.results.iter().any(|r| r.url == url && r.is_processing) {
            return Err(ScoutError::Busy {
                url: url.to_string(),
            });
        }

        for result in self.copies_mut(url) {
            result.is_processing = true;
            result.error = None;
        }

        Ok(SearchResult {
            is_processing: true,
            error: None,
            ..first
        })
    }

    /// Claims every listed result that is not busy. An empty list means all
    /// results. Each URL is claimed once.
    pub fn claim_many(&mut self, urls: &[String]) -> Claimed {
        let urls: Vec<String> = match urls.is_empty() {
            true => self.results.iter().map(|r| r.url.clone()).unique().collect(),
            false => urls.iter().unique().cloned().collect(),
        };

        let mut claimed = Claimed::default();
        for url in urls {
            match self.claim(&url) {
                Ok(result) => claimed.results.push(result),
                Err(ScoutError::Busy { url }) => claimed.busy.push(url),
                Err(_) => claimed.unknown.push(url),
            }
        }

        claimed
    }

    /// Stores the outcome (or the error) and clears the busy flag.
    pub fn finish(&mut self, url: &str, outcome: Result<ClassificationOutcome, String>) {
        let mut found = false;
        for result in self.copies_mut(url) {
            found = true;
            match &outcome {
                Ok(classification) => {
                    result.classification = Some(classification.clone());
                    result.error = None;
                }
                Err(e) => result.error = Some(e.clone()),
            }
            result.is_processing = false;
        }

        if !found {
            log::warn!("Classified {} but it is no longer in the result list", url);
        }
    }

    pub fn release(&mut self, url: &str) {
        for result in self.copies_mut(url) {
            result.is_processing = false;
        }
    }

    pub fn toggle_expanded(&mut self, url: &str) -> Result<bool, ScoutError> {
        let expanded = !self
            .find(url)
            .ok_or_else(|| ScoutError::UnknownResult {
                url: url.to_string(),
            })?
            .is_expanded;
        for result in self.copies_mut(url) {
            result.is_expanded = expanded;
        }

        Ok(expanded)
    }
}
