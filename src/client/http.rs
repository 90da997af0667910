//! HTTP implementation of the control-plane client

use crate::client::error::{ClientError, Result};
use crate::client::{ControlPlane, DeleteOutcome, PipelineConfigSummary, TaskRef, TaskSnapshot};
use crate::core::PipelineDocument;
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Envelope returned by `POST /tasks`
#[derive(Debug, Deserialize)]
struct TaskSubmission {
    #[serde(rename = "ref")]
    reference: Option<String>,
}

/// Control-plane client speaking the gate REST API
///
/// ```no_run
/// use deckhand::client::{ControlPlane, HttpControlPlane};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpControlPlane::new("http://localhost:8084")?;
/// let configs = client.list_pipeline_configs("checkout").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpControlPlane {
    base_url: Url,
    http: HttpClient,
}

impl HttpControlPlane {
    /// Create a client for the given base URL
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not http(s) or the HTTP client cannot
    /// be created.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let raw = base_url.as_ref();
        if !raw.starts_with("http://") && !raw.starts_with("https://") {
            return Err(ClientError::InvalidUrl(format!(
                "URL must start with http:// or https://, got: {}",
                raw
            )));
        }
        let base_url = Url::parse(raw).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { base_url, http })
    }

    /// Set a custom timeout for all requests
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http = HttpClient::builder().timeout(timeout).build()?;
        Ok(self)
    }

    /// Build a URL from path segments, percent-encoding each one
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            let body = response.bytes().await?;
            Ok(serde_json::from_slice(&body)?)
        } else {
            Err(Self::api_error(status, response).await)
        }
    }

    async fn api_error(status: StatusCode, response: Response) -> ClientError {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        // Try to extract error message from JSON response
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|json| {
                json["message"]
                    .as_str()
                    .or_else(|| json["error"].as_str())
                    .map(str::to_string)
            })
            .unwrap_or(body);

        ClientError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn list_pipeline_configs(&self, app: &str) -> Result<Vec<PipelineConfigSummary>> {
        let url = self.url(&["applications", app, "pipelineConfigs"])?;
        debug!("GET {}", url);
        let response = self.http.get(url).send().await?;
        self.handle_response(response).await
    }

    async fn save_pipeline(&self, document: &PipelineDocument) -> Result<()> {
        let url = self.url(&["pipelines"])?;
        debug!("POST {} ({})", url, document.name);
        let response = self.http.post(url).json(document).send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::api_error(status, response).await)
        }
    }

    async fn delete_pipeline(&self, app: &str, name: &str) -> Result<DeleteOutcome> {
        let url = self.url(&["pipelines", app, name])?;
        debug!("DELETE {}", url);
        let response = self.http.delete(url).send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(DeleteOutcome::Deleted)
        } else if status == StatusCode::NOT_FOUND || status == StatusCode::METHOD_NOT_ALLOWED {
            debug!("Delete response code {}, pipeline already absent", status.as_u16());
            Ok(DeleteOutcome::AlreadyAbsent)
        } else {
            Err(Self::api_error(status, response).await)
        }
    }

    async fn submit_task(&self, job: &Value) -> Result<TaskRef> {
        let url = self.url(&["tasks"])?;
        debug!("POST {}", url);
        let response = self.http.post(url).json(job).send().await?;

        let submission: TaskSubmission = self.handle_response(response).await?;
        submission
            .reference
            .map(|r| TaskRef::from_ref(&r))
            .ok_or_else(|| ClientError::InvalidResponse("task response has no 'ref'".to_string()))
    }

    async fn task_status(&self, task: &TaskRef) -> Result<TaskSnapshot> {
        let url = self.url(&["tasks", task.id()])?;
        debug!("GET {}", url);
        let response = self.http.get(url).send().await?;
        self.handle_response(response).await
    }
}
