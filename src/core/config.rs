//! Application deployment configuration from YAML

use crate::core::{
    environment::Environment,
    pipeline::{EnvironmentBlock, PipelineKind},
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

/// Top-level application configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name as known to the control plane
    pub app: String,

    /// Deployment kind shared by every environment
    #[serde(default)]
    pub kind: PipelineKind,

    /// Owner contact, exposed to templates and the application task
    #[serde(default)]
    pub owner_email: Option<String>,

    /// Variables available to every template render
    #[serde(default)]
    variables: HashMap<String, Value>,

    /// Pipeline triggers, copied verbatim into every document
    #[serde(default)]
    pub triggers: Vec<serde_json::Value>,

    /// Promotion chain
    pub pipeline: PipelineSection,

    /// Per-environment settings
    #[serde(default)]
    pub envs: BTreeMap<String, EnvConfig>,
}

/// The `pipeline:` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Environments in promotion order
    pub env: Vec<String>,

    /// Base name for one-shot pipelines (defaults to the app name)
    #[serde(default)]
    pub name: Option<String>,
}

/// Configuration for a single environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Regions the environment deploys to
    #[serde(default)]
    pub regions: Vec<String>,

    /// Variables overriding the app-level ones for this environment
    #[serde(default)]
    variables: HashMap<String, Value>,

    /// Raw stage JSON replacing the rendered block
    #[serde(default)]
    pub stages: Option<Vec<serde_json::Value>>,

    /// Subnets per region
    #[serde(default)]
    pub subnets: BTreeMap<String, Vec<String>>,

    /// Availability zones per region
    #[serde(default)]
    pub availability_zones: BTreeMap<String, Vec<String>>,
}

impl AppConfig {
    /// Load application configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse application configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the application configuration
    pub fn validate(&self) -> Result<()> {
        if self.app.trim().is_empty() {
            anyhow::bail!("Application name must not be empty");
        }
        if self.app.split_whitespace().count() != 1 {
            anyhow::bail!("Application name '{}' must be a single token", self.app);
        }

        if self.pipeline.env.is_empty() {
            anyhow::bail!("pipeline.env must list at least one environment");
        }

        let mut seen = std::collections::HashSet::new();
        for env in &self.pipeline.env {
            if !seen.insert(env) {
                anyhow::bail!("Duplicate environment in pipeline.env: {}", env);
            }
            let Some(env_config) = self.envs.get(env) else {
                anyhow::bail!("Environment '{}' has no entry under envs", env);
            };

            if self.kind == PipelineKind::Manual && env_config.stages.is_none() {
                anyhow::bail!(
                    "Environment '{}' needs a stages block for manual pipelines",
                    env
                );
            }

            if let Some(stages) = &env_config.stages {
                if let Some(index) = stages.iter().position(|s| !s.is_object()) {
                    anyhow::bail!(
                        "Environment '{}' stage {} must be a JSON object",
                        env,
                        index
                    );
                }
            }
        }

        if let Some(trigger) = self.triggers.iter().find(|t| !t.is_object()) {
            anyhow::bail!("Trigger must be an object, got: {}", trigger);
        }

        Ok(())
    }

    /// Environments in promotion order
    pub fn environments(&self) -> Vec<Environment> {
        self.pipeline
            .env
            .iter()
            .enumerate()
            .map(|(position, name)| {
                let regions = self
                    .envs
                    .get(name)
                    .map(|e| e.regions.clone())
                    .unwrap_or_default();
                Environment::new(name.clone(), position, regions)
            })
            .collect()
    }

    /// Every region any declared environment deploys to, sorted
    pub fn declared_regions(&self) -> BTreeSet<String> {
        self.pipeline
            .env
            .iter()
            .filter_map(|env| self.envs.get(env))
            .flat_map(|env| env.regions.iter().cloned())
            .collect()
    }

    pub fn env(&self, name: &str) -> Option<&EnvConfig> {
        self.envs.get(name)
    }

    /// First environment in the promotion chain
    pub fn first_env(&self) -> Option<&str> {
        self.pipeline.env.first().map(String::as_str)
    }

    /// Where an environment's stages come from
    pub fn block_for(&self, env: &str) -> Option<EnvironmentBlock> {
        if let Some(stages) = self.envs.get(env).and_then(|e| e.stages.as_ref()) {
            return Some(EnvironmentBlock::Override(stages.clone()));
        }
        self.kind.block_template().map(EnvironmentBlock::Template)
    }

    /// Base name for one-shot pipelines
    pub fn onetime_base_name(&self) -> &str {
        self.pipeline.name.as_deref().unwrap_or(&self.app)
    }

    /// App-level variables as strings
    pub fn variables_as_string_map(&self) -> HashMap<String, String> {
        to_string_map(&self.variables)
    }

    /// Variables for an environment, env-level values winning
    pub fn env_variables(&self, env: &str) -> HashMap<String, String> {
        let mut vars = self.variables_as_string_map();
        if let Some(env_config) = self.envs.get(env) {
            vars.extend(to_string_map(&env_config.variables));
        }
        vars
    }
}

fn to_string_map(values: &HashMap<String, Value>) -> HashMap<String, String> {
    values
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::Null => String::new(),
                // Fallback: convert to string
                other => serde_yaml::to_string(other)
                    .map(|s| s.trim_end().to_string())
                    .unwrap_or_default(),
            };
            (key.clone(), rendered)
        })
        .collect()
}
