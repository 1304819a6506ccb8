use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
};

use serde::Serialize;

use crate::{
    domain::{normalize_url, ClassificationContext, ClassificationOutcome, SearchResult},
    error::{Result, ScoutError},
};

use super::{DirectoryApi, ExtractedBusiness, ExtractionRequest};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum SaveOutcome {
    Saved { url: String, business: ExtractedBusiness },
    /// Written earlier in this session, nothing was sent.
    AlreadySaved { url: String },
    /// Not a company, nothing to write.
    Skipped { url: String },
    /// Dry run: what would have been written.
    Previewed { url: String, business: ExtractedBusiness },
}

/// Writes accepted companies to the directory, each URL at most once per
/// session.
pub struct DirectoryWriter {
    api: Arc<dyn DirectoryApi>,
    saved: Mutex<HashSet<String>>,
}

impl DirectoryWriter {
    pub fn new(api: Arc<dyn DirectoryApi>) -> Self {
        DirectoryWriter {
            api,
            saved: Mutex::new(HashSet::new()),
        }
    }

    pub fn is_saved(&self, url: &str) -> bool {
        self.saved_urls().contains(&normalize_url(url))
    }

    fn saved_urls(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.saved.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn save(
        &self,
        result: &SearchResult,
        classification: &ClassificationOutcome,
        context: &ClassificationContext,
        dry_run: bool,
    ) -> Result<SaveOutcome> {
        let url = normalize_url(&result.url);

        if !classification.is_company {
            log::info!("Not saving {}: not classified as a company", url);
            return Ok(SaveOutcome::Skipped { url });
        }

        let business = business_record(result, classification);

        if dry_run {
            return Ok(match self.is_saved(&url) {
                true => SaveOutcome::AlreadySaved { url },
                false => SaveOutcome::Previewed { url, business },
            });
        }

        // Reserve before writing so a concurrent save of the same URL is a no-op.
        if !self.saved_urls().insert(url.clone()) {
            log::info!("{} was already saved in this session", url);
            return Ok(SaveOutcome::AlreadySaved { url });
        }

        let request = ExtractionRequest {
            search_results: vec![result.clone()],
            context: context.clone(),
            dry_run: false,
        };

        match self.api.write(&request).await {
            Ok(written) => {
                log::info!("Saved {} to the directory", url);
                let business = written.into_iter().next().unwrap_or(business);
                Ok(SaveOutcome::Saved { url, business })
            }
            Err(e) => {
                log::error!("Error saving {} to the directory: {}", url, e);
                self.saved_urls().remove(&url);
                Err(e)
            }
        }
    }

    /// Looks up the result's stored classification and saves it.
    pub async fn save_classified(
        &self,
        result: &SearchResult,
        context: &ClassificationContext,
        dry_run: bool,
    ) -> Result<SaveOutcome> {
        let classification = result.classification.as_ref().ok_or_else(|| {
            ScoutError::InputValidation(format!("{} has not been classified yet", result.url))
        })?;

        self.save(result, classification, context, dry_run).await
    }
}

fn business_record(result: &SearchResult, classification: &ClassificationOutcome) -> ExtractedBusiness {
    let company_name = classification
        .company_name
        .clone()
        .or_else(|| classification.extracted.as_ref().map(|e| e.name.clone()))
        .or_else(|| Some(result.title.clone()).filter(|t| !t.trim().is_empty()));
    let website = classification
        .extracted
        .as_ref()
        .map(|e| e.website.clone())
        .unwrap_or_else(|| result.url.clone());

    ExtractedBusiness {
        is_company_website: true,
        company_name,
        website: Some(website),
        confidence: classification.confidence,
        extracted_from: Some(result.url.clone()),
        raw_data: serde_json::to_value(classification).ok(),
    }
}
