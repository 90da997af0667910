//! Task state tracking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Status of an asynchronous control-plane task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    NotStarted,
    Running,
    Succeeded,
    Terminal,
    /// Any status deckhand doesn't act on (SUSPENDED, CANCELED, ...)
    Other(String),
}

impl TaskStatus {
    pub fn parse(status: &str) -> Self {
        match status.to_uppercase().as_str() {
            "NOT_STARTED" => TaskStatus::NotStarted,
            "RUNNING" => TaskStatus::Running,
            "SUCCEEDED" => TaskStatus::Succeeded,
            "TERMINAL" => TaskStatus::Terminal,
            _ => TaskStatus::Other(status.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::NotStarted => "NOT_STARTED",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Succeeded => "SUCCEEDED",
            TaskStatus::Terminal => "TERMINAL",
            TaskStatus::Other(s) => s,
        }
    }

    /// Whether polling can stop
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Terminal)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TaskStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(TaskStatus::parse(&raw))
    }
}

/// A submitted unit of work, alive until it is terminal or times out
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: String,
    pub application: String,
    pub job_type: String,
    pub payload: Value,
    pub status: TaskStatus,
    pub attempts: usize,
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        application: impl Into<String>,
        job_type: impl Into<String>,
        payload: Value,
        timeout: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            application: application.into(),
            job_type: job_type.into(),
            payload,
            status: TaskStatus::NotStarted,
            attempts: 0,
            timeout,
            submitted_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Record the status seen by one poll
    pub fn record_poll(&mut self, status: TaskStatus) {
        self.attempts += 1;
        if status.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        self.status = status;
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }
}
