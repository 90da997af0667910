//! Control-plane client

pub mod error;
pub mod http;

use crate::core::{PipelineDocument, TaskStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use error::{ClientError, Result};
pub use http::HttpControlPlane;

/// One entry from the pipeline-config listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfigSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub application: String,
}

/// Outcome of a pipeline delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Nothing to delete; the control plane said 404 or 405
    AlreadyAbsent,
}

/// Opaque reference to a submitted task
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskRef(String);

impl TaskRef {
    /// Build from the `ref` the task endpoint returns (`/tasks/{id}`)
    pub fn from_ref(reference: &str) -> Self {
        let id = reference
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(reference);
        TaskRef(id.to_string())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Point-in-time view of a task
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskSnapshot {
    pub status: TaskStatus,
    #[serde(default)]
    pub execution: Option<TaskExecution>,
}

/// Execution detail attached to a task
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TaskExecution {
    #[serde(default)]
    pub stages: Vec<Value>,
}

impl TaskSnapshot {
    pub fn new(status: TaskStatus) -> Self {
        Self {
            status,
            execution: None,
        }
    }

    pub fn with_stages(mut self, stages: Vec<Value>) -> Self {
        self.execution = Some(TaskExecution { stages });
        self
    }

    pub fn stages(&self) -> &[Value] {
        self.execution
            .as_ref()
            .map(|e| e.stages.as_slice())
            .unwrap_or(&[])
    }
}

/// REST operations deckhand needs from the control plane
///
/// Implementations must be stateless per call so one instance can be shared
/// across a whole run.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// `GET /applications/{app}/pipelineConfigs`
    async fn list_pipeline_configs(&self, app: &str) -> Result<Vec<PipelineConfigSummary>>;

    /// `POST /pipelines`
    async fn save_pipeline(&self, document: &PipelineDocument) -> Result<()>;

    /// `DELETE /pipelines/{app}/{name}`
    async fn delete_pipeline(&self, app: &str, name: &str) -> Result<DeleteOutcome>;

    /// `POST /tasks`
    async fn submit_task(&self, job: &Value) -> Result<TaskRef>;

    /// `GET /tasks/{id}`
    async fn task_status(&self, task: &TaskRef) -> Result<TaskSnapshot>;
}
