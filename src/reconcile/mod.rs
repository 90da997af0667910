//! Pipeline reconciliation
//!
//! Keeps the control plane's pipeline set equal to the declared one. The only
//! update mechanism is upsert-by-id: a document carrying an existing id
//! replaces that pipeline wholesale. Reconciliation itself only deletes;
//! creation happens when documents are saved.

pub mod naming;

use crate::client::{ClientError, ControlPlane, DeleteOutcome, PipelineConfigSummary};
use crate::execution::retry::{retry, RetryPolicy};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

pub use naming::{
    onetime_name, onetime_tag, parse_managed_name, standing_name,
    ManagedName, NotManaged,
};

/// Error types for reconciliation
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Failed to delete \"{name}\" from \"{app}\": {reason}")]
    DeletionFailed {
        app: String,
        name: String,
        reason: String,
    },
}

/// Diffs declared regions against the control plane's pipeline configs
pub struct PipelineReconciler<C> {
    client: Arc<C>,
    app: String,
    onetime_env: Option<String>,
    list_retry: RetryPolicy,
}

impl<C: ControlPlane> PipelineReconciler<C> {
    pub fn new(client: Arc<C>, app: impl Into<String>) -> Self {
        Self {
            client,
            app: app.into(),
            onetime_env: None,
            list_retry: RetryPolicy::none(),
        }
    }

    /// Environment one-shot lookups match against (the first declared one)
    pub fn with_onetime_env(mut self, env: impl Into<String>) -> Self {
        self.onetime_env = Some(env.into());
        self
    }

    /// Retry applied to the pipeline-config listing
    pub fn with_list_retry(mut self, policy: RetryPolicy) -> Self {
        self.list_retry = policy;
        self
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    async fn list_configs(&self) -> Result<Vec<PipelineConfigSummary>, ReconcileError> {
        let configs = retry(
            &self.list_retry,
            || self.client.list_pipeline_configs(&self.app),
            ClientError::is_transient,
        )
        .await?;
        debug!("{} has {} pipeline config(s)", self.app, configs.len());
        Ok(configs)
    }

    /// Id of the existing pipeline for a region, if any
    ///
    /// For one-shot runs the match is any name containing
    /// `(onetime-{env})` instead of the standing `"{app} [{region}]"`.
    pub async fn resolve_existing_id(
        &self,
        region: &str,
        onetime: bool,
    ) -> Result<Option<String>, ReconcileError> {
        let configs = self.list_configs().await?;

        let found = if onetime {
            match &self.onetime_env {
                Some(env) => {
                    let tag = onetime_tag(env);
                    configs.iter().find(|c| c.name.contains(&tag))
                }
                None => None,
            }
        } else {
            let name = standing_name(&self.app, region);
            configs.iter().find(|c| c.name == name)
        };

        match found {
            Some(config) => {
                debug!("Found existing pipeline \"{}\" ({})", config.name, config.id);
                Ok(Some(config.id.clone()))
            }
            None => Ok(None),
        }
    }

    /// Delete managed pipelines whose region is no longer declared
    ///
    /// One-shot pipelines are always deleted; names outside the managed
    /// convention are left alone. Returns the names deleted.
    pub async fn clean_orphans(
        &self,
        declared_regions: &BTreeSet<String>,
    ) -> Result<Vec<String>, ReconcileError> {
        let configs = self.list_configs().await?;
        let mut deleted = Vec::new();

        for config in configs {
            let orphan = match parse_managed_name(&config.name, &self.app) {
                Ok(ManagedName::Region(region)) => !declared_regions.contains(&region),
                Ok(ManagedName::Onetime(_)) => true,
                Err(e) => {
                    info!("{}", e);
                    continue;
                }
            };
            if !orphan {
                continue;
            }

            info!("Deleting pipeline: {}", config.name);
            if self.delete(&config.name).await? == DeleteOutcome::Deleted {
                deleted.push(config.name);
            }
        }

        Ok(deleted)
    }

    /// Delete one pipeline by name; already-absent counts as success
    ///
    /// The name is passed through unchanged; the client encodes it.
    pub async fn delete(&self, name: &str) -> Result<DeleteOutcome, ReconcileError> {
        match self.client.delete_pipeline(&self.app, name).await {
            Ok(DeleteOutcome::AlreadyAbsent) => {
                debug!("Pipeline \"{}\" missing, no delete required", name);
                Ok(DeleteOutcome::AlreadyAbsent)
            }
            Ok(outcome) => Ok(outcome),
            Err(ClientError::Api { status, message }) => Err(ReconcileError::DeletionFailed {
                app: self.app.clone(),
                name: name.to_string(),
                reason: format!("status {}: {}", status, message),
            }),
            Err(e) => Err(e.into()),
        }
    }
}
