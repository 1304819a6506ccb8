use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use itertools::Itertools;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    domain::{
        build_classification_prompt, normalize_url, parse_verdict, ClassificationContext,
        ClassificationMode, ClassificationOutcome, ExtractedCompany, SearchResult, SearchState,
    },
    error::{Result, ScoutError},
};

use super::{ExtractedBusiness, ExtractionApi, ExtractionRequest, JobApi, JobStartRequest, LanguageModel};

pub(crate) fn lock_state(state: &Mutex<SearchState>) -> MutexGuard<'_, SearchState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub classified: usize,
    pub companies: usize,
    /// Results the endpoint returned nothing for, marked as no data.
    pub missing: usize,
    pub busy: Vec<String>,
    pub unknown: Vec<String>,
}

pub struct Classifier {
    llm: Arc<dyn LanguageModel>,
    extraction: Arc<dyn ExtractionApi>,
    jobs: Arc<dyn JobApi>,
    inline_threshold: usize,
}

impl Classifier {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        extraction: Arc<dyn ExtractionApi>,
        jobs: Arc<dyn JobApi>,
        inline_threshold: usize,
    ) -> Self {
        Classifier {
            llm,
            extraction,
            jobs,
            inline_threshold,
        }
    }

    pub fn mode_for(&self, result_count: usize, force_background: bool) -> ClassificationMode {
        ClassificationMode::select(result_count, force_background, self.inline_threshold)
    }

    /// Asks the model about one result.
    ///
    /// The result is marked processing for the duration of the call, a second
    /// call for the same URL gets `Busy`.
    pub async fn classify_one(
        &self,
        state: &Mutex<SearchState>,
        url: &str,
        context: Option<&ClassificationContext>,
    ) -> Result<ClassificationOutcome> {
        let result = lock_state(state).claim(url)?;

        let outcome = self.classify_result(&result, context).await;
        if let Err(ref e) = outcome {
            log::error!("Classifying {} failed: {}", url, e);
        }

        lock_state(state).finish(url, outcome.as_ref().cloned().map_err(|e| e.to_string()));
        outcome
    }

    async fn classify_result(
        &self,
        result: &SearchResult,
        context: Option<&ClassificationContext>,
    ) -> Result<ClassificationOutcome> {
        let prompt = build_classification_prompt(&result.url, context);
        let text = self.llm.complete(&prompt).await?;

        Ok(parse_verdict(&text, &result.url))
    }

    /// Classifies many results in one call to the extraction endpoint.
    ///
    /// Busy results are skipped. Every claimed result ends up with either an
    /// outcome or the batch error, never a mix.
    pub async fn classify_batch(
        &self,
        state: &Mutex<SearchState>,
        urls: &[String],
        context: &ClassificationContext,
    ) -> Result<BatchOutcome> {
        let claimed = lock_state(state).claim_many(urls);
        let mut outcome = BatchOutcome {
            busy: claimed.busy,
            unknown: claimed.unknown,
            ..Default::default()
        };
        if claimed.results.is_empty() {
            return Ok(outcome);
        }

        let request = ExtractionRequest {
            search_results: unique_by_url(&claimed.results),
            context: context.clone(),
            dry_run: true,
        };
        log::info!(
            "Classifying {} results inline for {}",
            request.search_results.len(),
            context.industry_title
        );

        match self.extraction.extract(&request).await {
            Ok(businesses) => {
                let outcomes = zip_outcomes(&claimed.results, &businesses, context);
                let mut state = lock_state(state);
                for (url, classification) in outcomes {
                    outcome.classified += 1;
                    if classification.is_company {
                        outcome.companies += 1;
                    }
                    if classification == ClassificationOutcome::no_data() {
                        outcome.missing += 1;
                    }
                    state.finish(&url, Ok(classification));
                }
                Ok(outcome)
            }
            Err(e) => {
                log::error!("Batch classification failed: {}", e);
                let mut state = lock_state(state);
                for result in claimed.results.iter() {
                    state.finish(&result.url, Err(e.to_string()));
                }
                Err(e)
            }
        }
    }

    /// Hands the results to the remote worker and returns the new job id.
    pub async fn start_background_classification(
        &self,
        state: &Mutex<SearchState>,
        urls: &[String],
        context: &ClassificationContext,
        dry_run: bool,
    ) -> Result<(String, usize)> {
        let claimed = lock_state(state).claim_many(urls);
        if claimed.results.is_empty() {
            return Err(ScoutError::InputValidation(
                "no idle results to classify".to_string(),
            ));
        }

        let job_id = Uuid::new_v4().to_string();
        let request = JobStartRequest {
            extraction: ExtractionRequest {
                search_results: unique_by_url(&claimed.results),
                context: context.clone(),
                dry_run,
            },
            job_id: job_id.clone(),
        };
        let total = request.extraction.search_results.len();

        let started = self.jobs.start(&request).await;
        {
            let mut state = lock_state(state);
            for result in claimed.results.iter() {
                state.release(&result.url);
            }
        }
        started?;

        log::info!("Started background job {} for {} results", job_id, total);
        Ok((job_id, total))
    }
}

fn unique_by_url(results: &[SearchResult]) -> Vec<SearchResult> {
    results
        .iter()
        .unique_by(|r| normalize_url(&r.url))
        .cloned()
        .collect()
}

/// Pairs every result with the business extracted from its URL, or with
/// "no data" when the endpoint skipped it.
fn zip_outcomes(
    results: &[SearchResult],
    businesses: &[ExtractedBusiness],
    context: &ClassificationContext,
) -> Vec<(String, ClassificationOutcome)> {
    let mut by_url: HashMap<String, &ExtractedBusiness> = HashMap::new();
    for business in businesses {
        for url in [&business.extracted_from, &business.website].into_iter().flatten() {
            by_url.entry(normalize_url(url)).or_insert(business);
        }
    }

    results
        .iter()
        .map(|r| {
            let outcome = match by_url.get(&normalize_url(&r.url)) {
                Some(business) => outcome_from_business(business, &r.url, context),
                None => ClassificationOutcome::no_data(),
            };
            (r.url.clone(), outcome)
        })
        .collect()
}

fn outcome_from_business(
    business: &ExtractedBusiness,
    url: &str,
    context: &ClassificationContext,
) -> ClassificationOutcome {
    let mut outcome = ClassificationOutcome::new(business.is_company_website, business.confidence);
    if let Some(name) = business.company_name.as_ref().filter(|n| !n.trim().is_empty()) {
        outcome.company_name = Some(name.clone());
        if business.is_company_website {
            outcome.extracted = Some(ExtractedCompany {
                name: name.clone(),
                website: business.website.clone().unwrap_or_else(|| url.to_string()),
                industry: Some(context.industry_title.clone()),
                location: Some(context.location_label()),
            });
        }
    }
    outcome
}
