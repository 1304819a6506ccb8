use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{
    configuration::DEFAULT_HARVEST_CAP,
    domain::{QueryStats, SearchResult},
    error::{Result, ScoutError},
};

use super::{search, SearchApi, SearchRequest};

#[derive(Debug, Clone, Copy)]
pub struct HarvestLimits {
    /// Hard ceiling on accumulated results.
    pub cap: usize,
    /// Pages the user agreed to fetch. `None` means as many as the cap allows.
    pub max_pages: Option<u32>,
}

impl Default for HarvestLimits {
    fn default() -> Self {
        HarvestLimits {
            cap: DEFAULT_HARVEST_CAP,
            max_pages: None,
        }
    }
}

impl HarvestLimits {
    /// Pages that fit under the cap at this page size, further limited by
    /// what the user confirmed.
    pub fn page_ceiling(&self, page_size: u32) -> u32 {
        let by_cap = match page_size {
            0 => 0,
            size => u32::try_from(self.cap.div_ceil(size as usize)).unwrap_or(u32::MAX),
        };
        match self.max_pages {
            Some(requested) => requested.min(by_cap),
            None => by_cap,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestOutcome {
    pub results: Vec<SearchResult>,
    pub pages_fetched: u32,
    pub total_available: u64,
    /// More results existed than the cap allowed.
    pub truncated: bool,
    /// Set when a later page failed and harvesting stopped early.
    pub stopped_by_error: Option<String>,
    pub query_stats: Vec<QueryStats>,
}

/// Fetches consecutive pages starting at page 1 and concatenates them.
///
/// Stops when there is no next page, the cap or page ceiling is reached, or a
/// page fails. A failure after the first page keeps what was collected.
pub async fn harvest_all(
    api: &dyn SearchApi,
    request: &SearchRequest,
    limits: HarvestLimits,
    cancel: &CancellationToken,
) -> Result<HarvestOutcome> {
    let page_ceiling = limits.page_ceiling(request.page_size);
    if page_ceiling == 0 || limits.cap == 0 {
        return Err(ScoutError::InputValidation(
            "nothing to harvest with the given limits".to_string(),
        ));
    }

    let mut outcome = HarvestOutcome {
        results: vec![],
        pages_fetched: 0,
        total_available: 0,
        truncated: false,
        stopped_by_error: None,
        query_stats: vec![],
    };

    for page in 1..=page_ceiling {
        let response = match search(api, &request.for_page(page), cancel).await {
            Ok(response) => response,
            Err(ScoutError::Cancelled) => return Err(ScoutError::Cancelled),
            Err(e) if page == 1 => return Err(e),
            Err(e) => {
                log::error!(
                    "Harvest stopped at page {} with {} results kept: {}",
                    page,
                    outcome.results.len(),
                    e
                );
                outcome.stopped_by_error = Some(e.to_string());
                break;
            }
        };

        outcome.pages_fetched = page;
        outcome.total_available = response.total_results;
        outcome.query_stats = response.query_stats;
        outcome.results.extend(response.results);

        log::info!(
            "Harvested page {}/{} | {} results so far",
            page,
            page_ceiling,
            outcome.results.len()
        );

        if outcome.results.len() >= limits.cap {
            break;
        }
        if !response.pagination.has_next {
            break;
        }
    }

    if outcome.results.len() > limits.cap {
        outcome.results.truncate(limits.cap);
    }
    outcome.truncated = outcome.total_available > outcome.results.len() as u64
        && outcome.results.len() >= limits.cap;

    Ok(outcome)
}
