//! Task submission and completion tracking

use crate::client::{ClientError, ControlPlane, TaskRef};
use crate::core::{settings::Settings, Task, TaskStatus};
use crate::execution::retry::{retry, RetryPolicy};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Error types for task tracking
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The control plane reported TERMINAL
    #[error("Task {task_id} failed: {}", format_errors(.errors))]
    Terminal { task_id: String, errors: Vec<String> },

    /// Attempts ran out before the task reached a terminal state
    #[error("Task {task_id} still {last_status} after {attempts} poll(s) ({timeout_secs}s timeout)")]
    Inconclusive {
        task_id: String,
        attempts: usize,
        timeout_secs: u64,
        last_status: TaskStatus,
    },
}

fn format_errors(errors: &[String]) -> String {
    if errors.is_empty() {
        "no failure detail reported".to_string()
    } else {
        errors.join("; ")
    }
}

/// Events emitted while a task is tracked
#[derive(Debug, Clone)]
pub enum TrackerEvent {
    Submitted {
        task_id: String,
        job_type: String,
        timeout: Duration,
    },
    Polled {
        task_id: String,
        attempt: usize,
        max_attempts: usize,
        status: TaskStatus,
    },
    Finished {
        task_id: String,
        status: TaskStatus,
    },
}

/// Type for tracker event handlers
pub type TrackerEventHandler = Arc<dyn Fn(TrackerEvent) + Send + Sync>;

/// Outcome of one poll, as seen by the retry loop
enum PollOutcome {
    /// Not terminal yet; spend another attempt
    Pending(TaskStatus),
    Failed(TaskError),
}

impl fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollOutcome::Pending(status) => write!(f, "task is {}", status),
            PollOutcome::Failed(e) => write!(f, "{}", e),
        }
    }
}

/// Number of polls that fit in `timeout` at interval `wait`
///
/// `ceil(timeout / wait)`, at least one. A zero `wait` polls back to back,
/// once per second of timeout.
pub fn max_attempts(timeout: Duration, wait: Duration) -> usize {
    let attempts = if wait.is_zero() {
        timeout.as_secs() as u128
    } else {
        timeout.as_millis().div_ceil(wait.as_millis())
    };
    usize::try_from(attempts.max(1)).unwrap_or(usize::MAX)
}

/// Pull `(environment, job type)` out of a job document
///
/// Reads `job[0].credentials` and `job[0].type`.
pub fn job_key(payload: &Value) -> (Option<&str>, Option<&str>) {
    let job = &payload["job"][0];
    (job["credentials"].as_str(), job["type"].as_str())
}

/// Application a job document belongs to
pub fn job_application(payload: &Value) -> Option<&str> {
    payload["application"]
        .as_str()
        .or_else(|| payload["job"][0]["application"].as_str())
        .or_else(|| payload["job"][0]["application"]["name"].as_str())
}

/// Failure detail from the stages of a TERMINAL task
///
/// Prefers each stage's `context.exception.details.errors`; otherwise falls
/// back to the messages of its `kato.tasks` exceptions.
pub fn failure_details(stages: &[Value]) -> Vec<String> {
    let mut details = Vec::new();

    for stage in stages {
        if stage["status"].as_str() == Some("SUCCEEDED") {
            continue;
        }
        let context = &stage["context"];

        if let Some(errors) = context["exception"]["details"]["errors"].as_array() {
            details.extend(errors.iter().map(|e| match e {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }));
            continue;
        }

        if let Some(tasks) = context["kato.tasks"].as_array() {
            details.extend(
                tasks
                    .iter()
                    .filter_map(|t| t["exception"]["message"].as_str())
                    .map(str::to_string),
            );
        }
    }

    details
}

/// Submits jobs to the control plane and waits for them to finish
///
/// Each tracker owns its own polling state; the settings are shared
/// read-only, so independent trackers can run side by side.
pub struct TaskTracker<C> {
    client: Arc<C>,
    settings: Arc<Settings>,
    handlers: Vec<TrackerEventHandler>,
}

impl<C: ControlPlane> TaskTracker<C> {
    pub fn new(client: Arc<C>, settings: Arc<Settings>) -> Self {
        Self {
            client,
            settings,
            handlers: Vec::new(),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(TrackerEvent) + Send + Sync + 'static,
    {
        self.handlers.push(Arc::new(handler));
    }

    fn emit(&self, event: TrackerEvent) {
        for handler in &self.handlers {
            handler(event.clone());
        }
    }

    /// Post a job; fails immediately on any non-2xx answer
    pub async fn submit(&self, payload: &Value) -> Result<TaskRef, TaskError> {
        let task = self.client.submit_task(payload).await?;
        info!("Submitted task {}", task);
        Ok(task)
    }

    /// Poll a task every `wait` until it is terminal or `timeout` is spent
    pub async fn poll(
        &self,
        task: &TaskRef,
        timeout: Duration,
        wait: Duration,
    ) -> Result<TaskStatus, TaskError> {
        self.poll_counted(task, timeout, wait).await.0
    }

    async fn poll_counted(
        &self,
        task: &TaskRef,
        timeout: Duration,
        wait: Duration,
    ) -> (Result<TaskStatus, TaskError>, usize) {
        let max_attempts = max_attempts(timeout, wait);
        let policy = RetryPolicy::fixed(u32::try_from(max_attempts).unwrap_or(u32::MAX), wait);
        let mut attempt = 0usize;

        let result = retry(
            &policy,
            || {
                attempt += 1;
                let current = attempt;
                async move {
                    let snapshot = match self.client.task_status(task).await {
                        Ok(snapshot) => snapshot,
                        Err(e) => return Err(PollOutcome::Failed(e.into())),
                    };

                    debug!(
                        "Task {} is {} (attempt {}/{})",
                        task, snapshot.status, current, max_attempts
                    );
                    self.emit(TrackerEvent::Polled {
                        task_id: task.id().to_string(),
                        attempt: current,
                        max_attempts,
                        status: snapshot.status.clone(),
                    });

                    match snapshot.status {
                        TaskStatus::Succeeded => Ok(TaskStatus::Succeeded),
                        TaskStatus::Terminal => Err(PollOutcome::Failed(TaskError::Terminal {
                            task_id: task.id().to_string(),
                            errors: failure_details(snapshot.stages()),
                        })),
                        other => Err(PollOutcome::Pending(other)),
                    }
                }
            },
            |outcome: &PollOutcome| matches!(outcome, PollOutcome::Pending(_)),
        )
        .await;

        let result = match result {
            Ok(status) => Ok(status),
            Err(PollOutcome::Failed(e)) => Err(e),
            Err(PollOutcome::Pending(last_status)) => {
                warn!("Task {} did not finish within {:?}", task, timeout);
                Err(TaskError::Inconclusive {
                    task_id: task.id().to_string(),
                    attempts: attempt,
                    timeout_secs: timeout.as_secs(),
                    last_status,
                })
            }
        };

        (result, attempt)
    }

    /// Submit a job and wait for it with the timeout configured for its
    /// environment and job type
    pub async fn submit_and_wait(&self, payload: &Value) -> Result<Task, TaskError> {
        let (env, job_type) = job_key(payload);
        let timeout = self.settings.task_timeout(env, job_type);
        let job_type = job_type.unwrap_or("unknown");
        debug!("Task {} will time out after {:?}", job_type, timeout);

        let task_ref = self.submit(payload).await?;
        let mut task = Task::new(
            task_ref.id(),
            job_application(payload).unwrap_or_default(),
            job_type,
            payload.clone(),
            timeout,
        );
        self.emit(TrackerEvent::Submitted {
            task_id: task.id.clone(),
            job_type: task.job_type.clone(),
            timeout,
        });

        let (result, attempts) = self
            .poll_counted(&task_ref, timeout, self.settings.poll_interval())
            .await;

        let status = match &result {
            Ok(status) => status.clone(),
            Err(TaskError::Terminal { .. }) => TaskStatus::Terminal,
            Err(TaskError::Inconclusive { last_status, .. }) => last_status.clone(),
            Err(TaskError::Client(_)) => task.status.clone(),
        };
        task.attempts = attempts.saturating_sub(1);
        task.record_poll(status.clone());
        self.emit(TrackerEvent::Finished {
            task_id: task.id.clone(),
            status,
        });

        result.map(|_| task)
    }
}
