use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    configuration::Settings,
    domain::{
        BackgroundJob, ClassificationContext, ClassificationMode, ClassificationOutcome,
        LocationEntry, Recency, SearchFilters, SearchResponse, SearchState, TaxonomyEntry,
    },
    error::{Result, ScoutError},
    services::{
        classifier::lock_state, generate_queries, harvest_all, search, BatchOutcome, Classifier,
        DirectoryWriter, HarvestLimits, HarvestOutcome, JobApi, JobPoller, JobWatch, SaveOutcome,
        SearchApi, SearchCredentials, SearchRequest,
    },
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCommand {
    pub taxonomy: Option<TaxonomyEntry>,
    pub location: Option<LocationEntry>,
    /// Subset of the taxonomy's keywords. Empty means all of them.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "first_page")]
    pub page: u32,
    pub results_per_page: Option<u32>,
    #[serde(default)]
    pub filters: SearchFilters,
    #[serde(default)]
    pub recency: Recency,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestCommand {
    #[serde(flatten)]
    pub search: SearchCommand,
    /// Pages the user confirmed after seeing the estimate.
    pub max_pages: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchCommand {
    pub urls: Vec<String>,
    pub force_background: bool,
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum BatchReply {
    Inline(BatchOutcome),
    Background {
        #[serde(rename = "jobId")]
        job_id: String,
        total: usize,
    },
}

/// Fixed per-process values the session needs from the settings.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub domestic_country: String,
    pub results_per_page: u32,
    pub harvest_cap: usize,
    pub min_confidence: f32,
}

impl From<&Settings> for SessionOptions {
    fn from(settings: &Settings) -> Self {
        SessionOptions {
            domestic_country: settings.search.domestic_country.clone(),
            results_per_page: settings.search.results_per_page,
            harvest_cap: settings.search.harvest_cap,
            min_confidence: settings.classification.min_confidence,
        }
    }
}

struct InFlight {
    id: Uuid,
    cancel: CancellationToken,
}

/// The panel's state for the lifetime of the server process.
///
/// Locks are only held for short synchronous sections, never across an
/// `.await`.
pub struct Session {
    state: Mutex<SearchState>,
    context: Mutex<Option<ClassificationContext>>,
    in_flight: Mutex<Option<InFlight>>,
    jobs: Mutex<HashMap<String, JobWatch>>,
    credentials: std::result::Result<Arc<SearchCredentials>, String>,
    search_api: Arc<dyn SearchApi>,
    job_api: Arc<dyn JobApi>,
    classifier: Classifier,
    directory: DirectoryWriter,
    poller: JobPoller,
    options: SessionOptions,
    shutdown: CancellationToken,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Session {
    pub fn new(
        credentials: Result<SearchCredentials>,
        search_api: Arc<dyn SearchApi>,
        job_api: Arc<dyn JobApi>,
        classifier: Classifier,
        directory: DirectoryWriter,
        poller: JobPoller,
        options: SessionOptions,
    ) -> Self {
        let credentials = credentials.map(Arc::new).map_err(|e| match e {
            ScoutError::Configuration(message) => message,
            other => other.to_string(),
        });
        if let Err(ref message) = credentials {
            log::warn!("Search is disabled: {}", message);
        }

        Session {
            state: Mutex::new(SearchState::default()),
            context: Mutex::new(None),
            in_flight: Mutex::new(None),
            jobs: Mutex::new(HashMap::new()),
            credentials,
            search_api,
            job_api,
            classifier,
            directory,
            poller,
            options,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn snapshot(&self) -> SearchState {
        lock_state(&self.state).clone()
    }

    /// Banner text shown while search credentials are missing.
    pub fn configuration_error(&self) -> Option<&str> {
        self.credentials.as_ref().err().map(String::as_str)
    }

    fn prepare(&self, command: &SearchCommand) -> Result<(SearchRequest, ClassificationContext)> {
        let credentials = self
            .credentials
            .clone()
            .map_err(ScoutError::Configuration)?;
        let taxonomy = command.taxonomy.as_ref().ok_or_else(|| {
            ScoutError::InputValidation("select an industry before searching".to_string())
        })?;
        let location = command.location.as_ref().ok_or_else(|| {
            ScoutError::InputValidation("select a location before searching".to_string())
        })?;

        let keywords = match command.keywords.is_empty() {
            true => &taxonomy.keyword_set,
            false => &command.keywords,
        };
        let queries = generate_queries(keywords, location, &self.options.domestic_country);

        let request = SearchRequest {
            queries,
            credentials,
            page_size: command
                .results_per_page
                .unwrap_or(self.options.results_per_page),
            page: command.page,
            filters: command.filters,
            recency: command.recency,
        };
        let context = ClassificationContext::new(taxonomy, location, self.options.min_confidence);

        Ok((request, context))
    }

    /// Cancels whatever search is running and registers a new one.
    fn begin_search(&self) -> (Uuid, CancellationToken) {
        let id = Uuid::new_v4();
        let cancel = self.shutdown.child_token();
        let previous = lock(&self.in_flight).replace(InFlight {
            id,
            cancel: cancel.clone(),
        });
        if let Some(previous) = previous {
            log::info!("Cancelling search {} in favour of {}", previous.id, id);
            previous.cancel.cancel();
        }
        (id, cancel)
    }

    fn end_search(&self, id: Uuid) {
        let mut in_flight = lock(&self.in_flight);
        if in_flight.as_ref().is_some_and(|f| f.id == id) {
            *in_flight = None;
        }
    }

    /// Returns false when nothing was running.
    pub fn cancel_search(&self) -> bool {
        match lock(&self.in_flight).take() {
            Some(in_flight) => {
                log::info!("Search {} cancelled by the user", in_flight.id);
                in_flight.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn run_search(&self, command: SearchCommand) -> Result<SearchResponse> {
        let (request, context) = match self.prepare(&command) {
            Ok(prepared) => prepared,
            Err(e) => {
                // Nothing was sent, the current results stay on screen.
                lock_state(&self.state).last_error = Some(e.to_string());
                return Err(e);
            }
        };
        let (id, cancel) = self.begin_search();

        let outcome = search(self.search_api.as_ref(), &request, &cancel).await;
        self.end_search(id);

        match outcome {
            Ok(response) => {
                lock_state(&self.state).apply_response(request.queries, response.clone());
                *lock(&self.context) = Some(context);
                Ok(response)
            }
            Err(e) => {
                lock_state(&self.state).apply_failure(&e);
                Err(e)
            }
        }
    }

    pub async fn run_harvest(&self, command: HarvestCommand) -> Result<HarvestOutcome> {
        let (request, context) = match self.prepare(&command.search) {
            Ok(prepared) => prepared,
            Err(e) => {
                // Nothing was sent, the current results stay on screen.
                lock_state(&self.state).last_error = Some(e.to_string());
                return Err(e);
            }
        };
        let limits = HarvestLimits {
            cap: self.options.harvest_cap,
            max_pages: command.max_pages,
        };
        let (id, cancel) = self.begin_search();

        let outcome = harvest_all(self.search_api.as_ref(), &request, limits, &cancel).await;
        self.end_search(id);

        match outcome {
            Ok(harvest) => {
                let mut state = lock_state(&self.state);
                state.apply_harvest(request.queries, harvest.results.clone());
                state.last_error = harvest
                    .stopped_by_error
                    .as_ref()
                    .map(|e| format!("Stopped after {} pages: {}", harvest.pages_fetched, e));
                drop(state);
                *lock(&self.context) = Some(context);
                Ok(harvest)
            }
            Err(e) => {
                lock_state(&self.state).apply_failure(&e);
                Err(e)
            }
        }
    }

    pub fn toggle_expanded(&self, url: &str) -> Result<bool> {
        lock_state(&self.state).toggle_expanded(url)
    }

    fn context(&self) -> Result<ClassificationContext> {
        lock(&self.context).clone().ok_or_else(|| {
            ScoutError::InputValidation("run a search before classifying".to_string())
        })
    }

    pub async fn classify_one(&self, url: &str) -> Result<ClassificationOutcome> {
        let context = lock(&self.context).clone();
        self.classifier
            .classify_one(&self.state, url, context.as_ref())
            .await
    }

    pub async fn classify_batch(&self, command: BatchCommand) -> Result<BatchReply> {
        let context = self.context()?;
        let count = match command.urls.is_empty() {
            true => lock_state(&self.state).results.len(),
            false => command.urls.len(),
        };
        if count == 0 {
            return Err(ScoutError::InputValidation(
                "no results to classify".to_string(),
            ));
        }

        match self.classifier.mode_for(count, command.force_background) {
            ClassificationMode::Inline => {
                let outcome = self
                    .classifier
                    .classify_batch(&self.state, &command.urls, &context)
                    .await?;
                Ok(BatchReply::Inline(outcome))
            }
            ClassificationMode::Background => {
                let (job_id, total) = self
                    .classifier
                    .start_background_classification(
                        &self.state,
                        &command.urls,
                        &context,
                        command.dry_run,
                    )
                    .await?;
                let watch = self.poller.watch(
                    BackgroundJob::pending(job_id.clone(), total as u64),
                    self.shutdown.child_token(),
                );
                let mut jobs = lock(&self.jobs);
                jobs.retain(|id, watch| {
                    let keep = !watch.task.is_finished();
                    if !keep {
                        log::info!("Forgetting finished job {}", id);
                    }
                    keep
                });
                jobs.insert(job_id.clone(), watch);
                drop(jobs);
                Ok(BatchReply::Background { job_id, total })
            }
        }
    }

    pub fn job(&self, job_id: &str) -> Result<BackgroundJob> {
        lock(&self.jobs)
            .get(job_id)
            .map(JobWatch::latest)
            .ok_or_else(|| ScoutError::UnknownJob(job_id.to_string()))
    }

    pub async fn job_notifications(&self, job_id: &str) -> Result<Vec<String>> {
        if !lock(&self.jobs).contains_key(job_id) {
            return Err(ScoutError::UnknownJob(job_id.to_string()));
        }
        self.job_api.notifications(job_id).await
    }

    pub async fn save_to_directory(&self, url: &str, dry_run: bool) -> Result<SaveOutcome> {
        let context = self.context()?;
        let result = lock_state(&self.state)
            .find(url)
            .cloned()
            .ok_or_else(|| ScoutError::UnknownResult {
                url: url.to_string(),
            })?;

        self.directory
            .save_classified(&result, &context, dry_run)
            .await
    }

    /// Stops the in-flight search and every job poller.
    pub fn shutdown(&self) {
        log::info!("Shutting down the session");
        self.shutdown.cancel();
    }
}
