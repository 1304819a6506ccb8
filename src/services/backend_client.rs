use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    domain::{BackgroundJob, ClassificationContext, JobStatus, SearchResult},
    error::{Result, ScoutError},
};

/// Body shared by bulk extraction, background jobs and directory writes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRequest {
    pub search_results: Vec<SearchResult>,
    #[serde(flatten)]
    pub context: ClassificationContext,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedBusiness {
    pub is_company_website: bool,
    pub company_name: Option<String>,
    pub website: Option<String>,
    #[serde(default)]
    pub confidence: f32,
    pub extracted_from: Option<String>,
    pub raw_data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ExtractionResponse {
    success: bool,
    #[serde(default)]
    businesses: Vec<ExtractedBusiness>,
    error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStartRequest {
    #[serde(flatten)]
    pub extraction: ExtractionRequest,
    pub job_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobRecord {
    id: String,
    status: JobStatus,
    #[serde(default)]
    total_results: u64,
    #[serde(default)]
    processed_results: u64,
    #[serde(default)]
    success_count: u64,
    #[serde(default)]
    error_count: u64,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    error: Option<String>,
}

impl From<JobRecord> for BackgroundJob {
    fn from(r: JobRecord) -> Self {
        BackgroundJob {
            job_id: r.id,
            status: r.status,
            total: r.total_results,
            processed: r.processed_results,
            success_count: r.success_count,
            error_count: r.error_count,
            start_time: r.start_time,
            end_time: r.end_time,
            error: r.error,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NotificationsResponse {
    #[serde(default)]
    notifications: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct StartResponse {
    success: bool,
    error: Option<String>,
}

/// Classifies a batch of results in one synchronous call.
#[async_trait]
pub trait ExtractionApi: Send + Sync {
    async fn extract(&self, request: &ExtractionRequest) -> Result<Vec<ExtractedBusiness>>;
}

/// Remote worker that classifies large batches.
#[async_trait]
pub trait JobApi: Send + Sync {
    async fn start(&self, request: &JobStartRequest) -> Result<()>;
    async fn poll(&self, job_id: &str) -> Result<BackgroundJob>;
    async fn notifications(&self, job_id: &str) -> Result<Vec<String>>;
}

/// The business directory store.
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    async fn write(&self, request: &ExtractionRequest) -> Result<Vec<ExtractedBusiness>>;
}

/// HTTP client for the admin backend's discovery endpoints.
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(BackendClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let res = self.client.post(self.url(path)).json(body).send().await?;
        read_json(path, res).await
    }

    async fn get_json<R>(&self, path: &str, query: &[(&str, &str)]) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let res = self.client.get(self.url(path)).query(query).send().await?;
        read_json(path, res).await
    }
}

async fn read_json<R: DeserializeOwned>(path: &str, res: reqwest::Response) -> Result<R> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        log::error!("Backend /{} answered {}: {}", path, status, body);
        return Err(ScoutError::api(
            path,
            format!("HTTP {}: {}", status, body.trim()),
        ));
    }

    res.json::<R>().await.map_err(|e| {
        log::error!("Error when deserializing /{} response: {:?}", path, e);
        ScoutError::Transport(format!("invalid {} response: {}", path, e))
    })
}

fn businesses_or_error(service: &str, response: ExtractionResponse) -> Result<Vec<ExtractedBusiness>> {
    match response.success {
        true => Ok(response.businesses),
        false => Err(ScoutError::api(
            service,
            response
                .error
                .unwrap_or_else(|| format!("{} reported failure", service)),
        )),
    }
}

#[async_trait]
impl ExtractionApi for BackendClient {
    async fn extract(&self, request: &ExtractionRequest) -> Result<Vec<ExtractedBusiness>> {
        let response: ExtractionResponse = self.post_json("extract", request).await?;
        businesses_or_error("extract", response)
    }
}

#[async_trait]
impl JobApi for BackendClient {
    async fn start(&self, request: &JobStartRequest) -> Result<()> {
        let response: StartResponse = self.post_json("jobs", request).await?;
        match response.success {
            true => Ok(()),
            false => Err(ScoutError::api(
                "jobs",
                response
                    .error
                    .unwrap_or_else(|| "job could not be started".to_string()),
            )),
        }
    }

    async fn poll(&self, job_id: &str) -> Result<BackgroundJob> {
        let record: JobRecord = self.get_json("jobs", &[("jobId", job_id)]).await?;
        Ok(record.into())
    }

    async fn notifications(&self, job_id: &str) -> Result<Vec<String>> {
        let response: NotificationsResponse = self
            .get_json("jobs", &[("action", "notifications"), ("jobId", job_id)])
            .await?;
        Ok(response.notifications)
    }
}

#[async_trait]
impl DirectoryApi for BackendClient {
    async fn write(&self, request: &ExtractionRequest) -> Result<Vec<ExtractedBusiness>> {
        let response: ExtractionResponse = self.post_json("directory", request).await?;
        businesses_or_error("directory", response)
    }
}
