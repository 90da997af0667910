//! Process-wide settings, loaded once and shared read-only

use crate::execution::retry::RetryPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Per-environment, per-job-type task timeouts in seconds
pub type TaskTimeouts = HashMap<String, HashMap<String, u64>>;

/// Settings shared by every component of a run
///
/// Built once at startup and handed out as `Arc<Settings>`; nothing mutates
/// it afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Control-plane API base URL
    pub gate_url: String,

    /// Directory holding template overrides
    pub templates_dir: Option<PathBuf>,

    /// Timeout used when no task_timeouts entry matches
    pub default_task_timeout_secs: u64,

    /// Interval between task status polls
    pub task_poll_interval_secs: u64,

    /// Timeouts keyed by environment, then job type
    pub task_timeouts: TaskTimeouts,

    /// Retry applied to inventory lookups and pipeline listing
    pub inventory_retry: RetrySettings,

    /// Timeout for a single HTTP request
    pub http_timeout_secs: u64,
}

/// Fixed-delay retry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1000,
        }
    }
}

impl RetrySettings {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.max_attempts, Duration::from_millis(self.delay_ms))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gate_url: "http://localhost:8084".to_string(),
            templates_dir: None,
            default_task_timeout_secs: 120,
            task_poll_interval_secs: 2,
            task_timeouts: HashMap::new(),
            inventory_retry: RetrySettings::default(),
            http_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Load settings from an explicit file, the default location, or defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => {
                    debug!("No settings file found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    /// Default settings location (`<config dir>/deckhand/deckhand.yaml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("deckhand").join("deckhand.yaml"))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(yaml)?;
        if settings.task_poll_interval_secs == 0 {
            anyhow::bail!("task_poll_interval_secs must be greater than zero");
        }
        Ok(settings)
    }

    pub fn with_gate_url(mut self, gate_url: impl Into<String>) -> Self {
        self.gate_url = gate_url.into();
        self
    }

    pub fn with_templates_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.templates_dir = Some(dir.into());
        self
    }

    /// Timeout budget for a job type in an environment
    pub fn task_timeout(&self, env: Option<&str>, job_type: Option<&str>) -> Duration {
        let secs = env
            .and_then(|env| self.task_timeouts.get(env))
            .and_then(|by_type| job_type.and_then(|t| by_type.get(t)))
            .copied()
            .unwrap_or(self.default_task_timeout_secs);
        Duration::from_secs(secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.task_poll_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
