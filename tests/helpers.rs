//! Test utility functions for deckhand
#![allow(dead_code)]

use async_trait::async_trait;
use deckhand::client::{
    ClientError, ControlPlane, DeleteOutcome, PipelineConfigSummary, Result, TaskRef, TaskSnapshot,
};
use deckhand::core::{config::AppConfig, settings::Settings, PipelineDocument, TaskStatus};
use deckhand::render::{render_text, RenderContext, RenderError, TemplateRenderer};
use deckhand::{ConfigInventory, Deployer, FileRenderer};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MockState {
    configs: Vec<PipelineConfigSummary>,
    saved: Vec<PipelineDocument>,
    deleted: Vec<String>,
    delete_statuses: HashMap<String, u16>,
    list_failures: usize,
    list_calls: usize,
    submitted: Vec<Value>,
    snapshots: VecDeque<TaskSnapshot>,
    polls: usize,
    next_id: usize,
}

/// In-memory control plane with scripted task progress
///
/// Saving without an id creates a pipeline config; saving with one replaces
/// it. Deleting a missing name answers already-absent, like the real 404.
#[derive(Default)]
pub struct MockControlPlane {
    state: Mutex<MockState>,
}

impl MockControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed existing pipeline configs as `(id, name)`
    pub fn with_configs(self, configs: &[(&str, &str)]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            for (id, name) in configs {
                state.configs.push(PipelineConfigSummary {
                    id: id.to_string(),
                    name: name.to_string(),
                    application: String::new(),
                });
            }
        }
        self
    }

    /// Answer DELETE for `name` with a non-2xx status
    pub fn with_delete_status(self, name: &str, status: u16) -> Self {
        self.state
            .lock()
            .unwrap()
            .delete_statuses
            .insert(name.to_string(), status);
        self
    }

    /// Fail the first `count` listings with a 503
    pub fn with_list_failures(self, count: usize) -> Self {
        self.state.lock().unwrap().list_failures = count;
        self
    }

    /// Statuses returned by successive polls; the last one repeats
    pub fn with_statuses(self, statuses: &[&str]) -> Self {
        let snapshots = statuses
            .iter()
            .map(|s| TaskSnapshot::new(TaskStatus::parse(s)))
            .collect();
        self.with_snapshots(snapshots)
    }

    pub fn with_snapshots(self, snapshots: Vec<TaskSnapshot>) -> Self {
        self.state.lock().unwrap().snapshots = snapshots.into();
        self
    }

    pub fn config_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut names: Vec<String> = state.configs.iter().map(|c| c.name.clone()).collect();
        names.sort();
        names
    }

    pub fn saved(&self) -> Vec<PipelineDocument> {
        self.state.lock().unwrap().saved.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn submitted(&self) -> Vec<Value> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn polls(&self) -> usize {
        self.state.lock().unwrap().polls
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }
}

#[async_trait]
impl ControlPlane for MockControlPlane {
    async fn list_pipeline_configs(&self, _app: &str) -> Result<Vec<PipelineConfigSummary>> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        if state.list_failures > 0 {
            state.list_failures -= 1;
            return Err(ClientError::Api {
                status: 503,
                message: "Service Unavailable".to_string(),
            });
        }
        Ok(state.configs.clone())
    }

    async fn save_pipeline(&self, document: &PipelineDocument) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.saved.push(document.clone());

        let existing = document
            .id
            .as_ref()
            .and_then(|id| state.configs.iter().position(|c| &c.id == id));
        match existing {
            Some(index) => state.configs[index].name = document.name.clone(),
            None => {
                state.next_id += 1;
                let id = format!("pipeline-{}", state.next_id);
                state.configs.push(PipelineConfigSummary {
                    id,
                    name: document.name.clone(),
                    application: document.application.clone(),
                });
            }
        }
        Ok(())
    }

    async fn delete_pipeline(&self, _app: &str, name: &str) -> Result<DeleteOutcome> {
        let mut state = self.state.lock().unwrap();
        if let Some(status) = state.delete_statuses.get(name).copied() {
            return match status {
                404 | 405 => Ok(DeleteOutcome::AlreadyAbsent),
                _ => Err(ClientError::Api {
                    status,
                    message: "Rejected".to_string(),
                }),
            };
        }

        match state.configs.iter().position(|c| c.name == name) {
            Some(index) => {
                state.configs.remove(index);
                state.deleted.push(name.to_string());
                Ok(DeleteOutcome::Deleted)
            }
            None => Ok(DeleteOutcome::AlreadyAbsent),
        }
    }

    async fn submit_task(&self, payload: &Value) -> Result<TaskRef> {
        let mut state = self.state.lock().unwrap();
        state.submitted.push(payload.clone());
        Ok(TaskRef::from_ref(&format!("/tasks/task-{}", state.submitted.len())))
    }

    async fn task_status(&self, task: &TaskRef) -> Result<TaskSnapshot> {
        let mut state = self.state.lock().unwrap();
        state.polls += 1;
        let snapshot = if state.snapshots.len() > 1 {
            state.snapshots.pop_front()
        } else {
            state.snapshots.front().cloned()
        };
        snapshot.ok_or_else(|| ClientError::Api {
            status: 404,
            message: format!("Task {} not found", task),
        })
    }
}

/// Renders every template id from one fixed block, and the wrapper from a
/// minimal document
pub struct StaticRenderer {
    block: String,
}

impl StaticRenderer {
    pub fn new(block: &str) -> Self {
        Self {
            block: block.to_string(),
        }
    }
}

impl TemplateRenderer for StaticRenderer {
    fn render(&self, template_id: &str, context: &RenderContext) -> std::result::Result<Value, RenderError> {
        if template_id == "pipeline/wrapper" {
            return render_text(
                template_id,
                r#"{"application": "{{ app }}", "name": "{{ pipeline_name }}", "stages": []}"#,
                context,
            );
        }
        render_text(template_id, &self.block, context)
    }
}

pub const CHECKOUT_YAML: &str = r#"
app: checkout
kind: lambda
owner_email: payments@example.com
triggers:
  - type: jenkins
    master: build
    job: checkout-build
pipeline:
  env: [dev, stage, prod]
envs:
  dev:
    regions: [us-east-1, us-west-2]
  stage:
    regions: [us-east-1]
  prod:
    regions: [us-east-1, us-west-2]
"#;

pub fn checkout_config() -> AppConfig {
    AppConfig::from_yaml(CHECKOUT_YAML).unwrap()
}

/// Settings that never sleep
pub fn fast_settings() -> Arc<Settings> {
    let settings = Settings::from_yaml(
        r#"
default_task_timeout_secs: 5
task_poll_interval_secs: 1
inventory_retry:
  max_attempts: 3
  delay_ms: 0
"#,
    )
    .unwrap();
    Arc::new(settings)
}

/// Deployer over the mock with the built-in templates
pub fn deployer_for(
    client: Arc<MockControlPlane>,
    config: &AppConfig,
) -> Deployer<MockControlPlane> {
    Deployer::new(
        client,
        fast_settings(),
        Arc::new(FileRenderer::builtin()),
        Arc::new(ConfigInventory::from_config(config)),
    )
}

/// `refId`s of a document's stages, in order
pub fn ref_ids(document: &PipelineDocument) -> Vec<String> {
    document.stages.iter().map(|s| s.ref_id.clone()).collect()
}

/// `requisiteStageRefIds` of a document's stages, in order
pub fn requisites(document: &PipelineDocument) -> Vec<Vec<String>> {
    document
        .stages
        .iter()
        .map(|s| s.requisite_stage_ref_ids.clone().unwrap_or_default())
        .collect()
}
