//! Deployment orchestration - config in, pipelines on the control plane out

use crate::{
    assembly::{assemble_document, BuildError, PipelineBlockBuilder},
    client::{ClientError, ControlPlane},
    core::{config::AppConfig, settings::Settings, PipelineDocument, Task},
    execution::tracker::{TaskError, TaskTracker, TrackerEvent},
    inventory::RegionInventory,
    reconcile::{onetime_name, standing_name, PipelineReconciler, ReconcileError},
    render::{RenderContext, RenderError, TemplateRenderer},
};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Error types for a deployment run
#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("Environment '{0}' is not declared in pipeline.env")]
    UnknownEnvironment(String),

    #[error("Environment '{env}' has no resources in any of its regions")]
    NoRegions { env: String },
}

/// Events that can occur during a deployment run
#[derive(Debug, Clone)]
pub enum DeployEvent {
    RunStarted {
        run_id: Uuid,
        app: String,
    },
    OrphansCleaned {
        names: Vec<String>,
    },
    RegionSkipped {
        region: String,
    },
    PipelineAssembled {
        name: String,
        stages: usize,
    },
    PipelineSaved {
        name: String,
        existing_id: Option<String>,
    },
    RunCompleted {
        run_id: Uuid,
        saved: usize,
        deleted: usize,
    },
}

/// Type for event handlers
pub type DeployEventHandler = Arc<dyn Fn(DeployEvent) + Send + Sync>;

/// A pipeline written to the control plane
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPipeline {
    pub name: String,
    /// Id the document was saved over, `None` when it was created
    pub existing_id: Option<String>,
    pub stages: usize,
}

/// Outcome of a deployment run
#[derive(Debug, Clone, Default)]
pub struct DeployReport {
    pub run_id: Uuid,
    pub deleted: Vec<String>,
    pub saved: Vec<SavedPipeline>,
}

/// Standing pipeline assembled for one region
#[derive(Debug, Clone, PartialEq)]
pub struct RegionPipeline {
    pub region: String,
    pub document: PipelineDocument,
}

/// Drives the control plane from an app configuration
pub struct Deployer<C> {
    client: Arc<C>,
    settings: Arc<Settings>,
    renderer: Arc<dyn TemplateRenderer>,
    inventory: Arc<dyn RegionInventory>,
    tracker: TaskTracker<C>,
    handlers: Vec<DeployEventHandler>,
}

impl<C: ControlPlane> Deployer<C> {
    pub fn new(
        client: Arc<C>,
        settings: Arc<Settings>,
        renderer: Arc<dyn TemplateRenderer>,
        inventory: Arc<dyn RegionInventory>,
    ) -> Self {
        let tracker = TaskTracker::new(client.clone(), settings.clone());
        Self {
            client,
            settings,
            renderer,
            inventory,
            tracker,
            handlers: Vec::new(),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(DeployEvent) + Send + Sync + 'static,
    {
        self.handlers.push(Arc::new(handler));
    }

    /// Add a handler for task-tracking events
    pub fn add_tracker_handler<F>(&mut self, handler: F)
    where
        F: Fn(TrackerEvent) + Send + Sync + 'static,
    {
        self.tracker.add_event_handler(handler);
    }

    pub fn tracker(&self) -> &TaskTracker<C> {
        &self.tracker
    }

    fn emit(&self, event: DeployEvent) {
        for handler in &self.handlers {
            handler(event.clone());
        }
    }

    fn reconciler(&self, config: &AppConfig) -> PipelineReconciler<C> {
        let reconciler = PipelineReconciler::new(self.client.clone(), config.app.clone())
            .with_list_retry(self.settings.inventory_retry.to_policy());
        match config.first_env() {
            Some(env) => reconciler.with_onetime_env(env),
            None => reconciler,
        }
    }

    fn block_builder<'a>(&'a self, config: &'a AppConfig) -> PipelineBlockBuilder<'a> {
        PipelineBlockBuilder::new(config, self.renderer.as_ref(), self.inventory.as_ref())
            .with_retry(self.settings.inventory_retry.to_policy())
    }

    fn wrapper(&self, config: &AppConfig, name: &str, region: &str) -> Result<Value, RenderError> {
        let mut context: RenderContext = config.variables_as_string_map().into_iter().collect();
        context.insert("app".to_string(), config.app.clone());
        context.insert("pipeline_name".to_string(), name.to_string());
        context.insert("region".to_string(), region.to_string());
        context.insert(
            "owner_email".to_string(),
            config.owner_email.clone().unwrap_or_default(),
        );
        self.renderer.render(config.kind.wrapper_template(), &context)
    }

    /// Assemble the standing pipeline for every declared region
    ///
    /// Regions where no environment has resources produce no document.
    /// Nothing is written to the control plane.
    pub async fn assemble_standing(
        &self,
        config: &AppConfig,
    ) -> Result<Vec<RegionPipeline>, DeployError> {
        let builder = self.block_builder(config);
        let environments = config.environments();
        let mut pipelines = Vec::new();

        for region in config.declared_regions() {
            let blocks = builder.build_region(&region, &environments).await?;
            if blocks.is_empty() {
                warn!("No environment has resources in {}, skipping", region);
                self.emit(DeployEvent::RegionSkipped {
                    region: region.clone(),
                });
                continue;
            }

            let name = standing_name(&config.app, &region);
            let wrapper = self.wrapper(config, &name, &region)?;
            let document = assemble_document(wrapper, &config.app, &name, blocks, &config.triggers)?;
            info!("Assembled {} with {} stage(s)", name, document.stages.len());
            self.emit(DeployEvent::PipelineAssembled {
                name: name.clone(),
                stages: document.stages.len(),
            });

            pipelines.push(RegionPipeline { region, document });
        }

        Ok(pipelines)
    }

    /// Assemble the one-shot pipeline for a single environment
    ///
    /// One block per region the environment deploys to, in sorted region
    /// order, with no promotion links.
    pub async fn assemble_onetime(
        &self,
        config: &AppConfig,
        env: &str,
    ) -> Result<PipelineDocument, DeployError> {
        let environment = config
            .environments()
            .into_iter()
            .find(|e| e.name == env)
            .ok_or_else(|| DeployError::UnknownEnvironment(env.to_string()))?;

        let mut regions = environment.regions.clone();
        regions.sort();
        regions.dedup();

        let builder = self.block_builder(config);
        let mut blocks = Vec::new();
        for region in &regions {
            blocks.extend(
                builder
                    .build_region(region, std::slice::from_ref(&environment))
                    .await?,
            );
        }
        if blocks.is_empty() {
            return Err(DeployError::NoRegions {
                env: env.to_string(),
            });
        }

        let name = onetime_name(config.onetime_base_name(), env);
        let first_region = regions.first().map(String::as_str).unwrap_or_default();
        let wrapper = self.wrapper(config, &name, first_region)?;
        let document = assemble_document(wrapper, &config.app, &name, blocks, &[])?;
        info!("Assembled {} with {} stage(s)", name, document.stages.len());
        self.emit(DeployEvent::PipelineAssembled {
            name,
            stages: document.stages.len(),
        });

        Ok(document)
    }

    async fn save(
        &self,
        mut document: PipelineDocument,
        existing_id: Option<String>,
    ) -> Result<SavedPipeline, DeployError> {
        document.id = existing_id.clone();
        match &existing_id {
            Some(id) => info!("Updating pipeline {} ({})", document.name, id),
            None => info!("Creating pipeline {}", document.name),
        }
        self.client.save_pipeline(&document).await?;

        self.emit(DeployEvent::PipelineSaved {
            name: document.name.clone(),
            existing_id: existing_id.clone(),
        });
        Ok(SavedPipeline {
            name: document.name,
            existing_id,
            stages: document.stages.len(),
        })
    }

    /// Reconcile and save the standing pipelines
    ///
    /// Orphans are deleted first, then each region's document is saved over
    /// the existing pipeline of the same name, if there is one.
    pub async fn deploy_standing(&self, config: &AppConfig) -> Result<DeployReport, DeployError> {
        let run_id = Uuid::new_v4();
        info!("Starting deployment run {} for {}", run_id, config.app);
        self.emit(DeployEvent::RunStarted {
            run_id,
            app: config.app.clone(),
        });

        let reconciler = self.reconciler(config);
        let deleted = reconciler.clean_orphans(&config.declared_regions()).await?;
        self.emit(DeployEvent::OrphansCleaned {
            names: deleted.clone(),
        });

        let mut saved = Vec::new();
        for pipeline in self.assemble_standing(config).await? {
            let existing_id = reconciler
                .resolve_existing_id(&pipeline.region, false)
                .await?;
            saved.push(self.save(pipeline.document, existing_id).await?);
        }

        self.finish(run_id, deleted, saved)
    }

    /// Save the one-shot pipeline for one environment
    pub async fn deploy_onetime(
        &self,
        config: &AppConfig,
        env: &str,
    ) -> Result<DeployReport, DeployError> {
        let run_id = Uuid::new_v4();
        info!("Starting one-shot run {} for {} in {}", run_id, config.app, env);
        self.emit(DeployEvent::RunStarted {
            run_id,
            app: config.app.clone(),
        });

        let document = self.assemble_onetime(config, env).await?;
        let existing_id = self
            .reconciler(config)
            .with_onetime_env(env)
            .resolve_existing_id("", true)
            .await?;
        let saved = vec![self.save(document, existing_id).await?];

        self.finish(run_id, Vec::new(), saved)
    }

    /// Delete orphaned managed pipelines only
    pub async fn clean(&self, config: &AppConfig) -> Result<Vec<String>, DeployError> {
        let deleted = self
            .reconciler(config)
            .clean_orphans(&config.declared_regions())
            .await?;
        self.emit(DeployEvent::OrphansCleaned {
            names: deleted.clone(),
        });
        Ok(deleted)
    }

    /// Make sure the application exists before pipelines reference it
    pub async fn ensure_application(&self, config: &AppConfig) -> Result<Task, DeployError> {
        let job = application_job(config);
        debug!("Ensuring application {} exists", config.app);
        Ok(self.tracker.submit_and_wait(&job).await?)
    }

    fn finish(
        &self,
        run_id: Uuid,
        deleted: Vec<String>,
        saved: Vec<SavedPipeline>,
    ) -> Result<DeployReport, DeployError> {
        info!(
            "Run {} finished: {} saved, {} deleted",
            run_id,
            saved.len(),
            deleted.len()
        );
        self.emit(DeployEvent::RunCompleted {
            run_id,
            saved: saved.len(),
            deleted: deleted.len(),
        });
        Ok(DeployReport {
            run_id,
            deleted,
            saved,
        })
    }
}

/// Job document that creates or updates the application
pub fn application_job(config: &AppConfig) -> Value {
    let mut application = json!({
        "name": config.app,
        "cloudProviders": "aws",
    });
    if let Some(email) = &config.owner_email {
        application["email"] = json!(email);
    }

    json!({
        "application": config.app,
        "description": format!("Update application: {}", config.app),
        "job": [{
            "type": "updateApplication",
            "application": application,
        }],
    })
}
