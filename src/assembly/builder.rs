//! Per-environment, per-region stage block construction

use crate::assembly::BuildError;
use crate::core::{config::AppConfig, Environment, EnvironmentBlock, Region};
use crate::execution::retry::RetryPolicy;
use crate::inventory::{lookup_with_retry, RegionInventory};
use crate::render::{RenderContext, TemplateRenderer};
use serde_json::Value;
use tracing::{debug, info};

/// Instance type for ec2 blocks when the app does not set `instance_type`
pub const DEFAULT_INSTANCE_TYPE: &str = "t3.micro";

/// An environment's position in one region's promotion chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLink {
    pub env: String,
    pub previous_env: Option<String>,
    pub next_env: Option<String>,
}

/// Stage JSON rendered for one (environment, region) pair
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBlock {
    pub env: String,
    pub region: String,
    pub previous_env: Option<String>,
    pub next_env: Option<String>,
    pub stages: Vec<Value>,
}

/// Link the environments present in a region into a chain
///
/// Absent environments are skipped and the chain re-linked across them: for
/// `[dev, prod]` present out of `[dev, stage, prod]`, prod's previous
/// environment is dev.
pub fn link_chain(present: &[String]) -> Vec<ChainLink> {
    present
        .iter()
        .enumerate()
        .map(|(i, env)| ChainLink {
            env: env.clone(),
            previous_env: i.checked_sub(1).map(|p| present[p].clone()),
            next_env: present.get(i + 1).cloned(),
        })
        .collect()
}

/// Builds stage blocks for every environment present in a region
pub struct PipelineBlockBuilder<'a> {
    config: &'a AppConfig,
    renderer: &'a dyn TemplateRenderer,
    inventory: &'a dyn RegionInventory,
    retry: RetryPolicy,
}

impl<'a> PipelineBlockBuilder<'a> {
    pub fn new(
        config: &'a AppConfig,
        renderer: &'a dyn TemplateRenderer,
        inventory: &'a dyn RegionInventory,
    ) -> Self {
        Self {
            config,
            renderer,
            inventory,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Blocks for one region, in promotion order
    pub async fn build_region(
        &self,
        region: &str,
        environments: &[Environment],
    ) -> Result<Vec<RenderedBlock>, BuildError> {
        let mut present: Vec<(String, Region)> = Vec::new();

        for env in environments {
            if !env.is_declared_in(region) {
                debug!("{} is not declared for {}, skipping", env.name, region);
                continue;
            }
            match lookup_with_retry(self.inventory, &self.retry, &env.name, region).await? {
                Some(resources) => present.push((env.name.clone(), resources)),
                None => {
                    info!("No resources for {} in {}, skipping", env.name, region);
                    continue;
                }
            }
        }

        let names: Vec<String> = present.iter().map(|(name, _)| name.clone()).collect();
        let links = link_chain(&names);

        let mut blocks = Vec::with_capacity(links.len());
        for (link, (_, resources)) in links.into_iter().zip(present.iter()) {
            let stages = self.render_block(&link, resources)?;
            debug!(
                "Built {} stage(s) for {} in {} (previous: {:?}, next: {:?})",
                stages.len(),
                link.env,
                region,
                link.previous_env,
                link.next_env
            );
            blocks.push(RenderedBlock {
                env: link.env,
                region: region.to_string(),
                previous_env: link.previous_env,
                next_env: link.next_env,
                stages,
            });
        }

        Ok(blocks)
    }

    fn render_block(&self, link: &ChainLink, resources: &Region) -> Result<Vec<Value>, BuildError> {
        let block = self
            .config
            .block_for(&link.env)
            .ok_or_else(|| BuildError::NoBlock {
                env: link.env.clone(),
            })?;

        let rendered = match block {
            EnvironmentBlock::Override(stages) => return Ok(stages),
            EnvironmentBlock::Template(template_id) => self
                .renderer
                .render(template_id, &self.block_context(link, resources))?,
        };

        match rendered {
            Value::Array(stages) => Ok(stages),
            Value::Object(_) => Ok(vec![rendered]),
            _ => Err(BuildError::BlockShape {
                env: link.env.clone(),
                region: resources.name.clone(),
            }),
        }
    }

    fn block_context(&self, link: &ChainLink, resources: &Region) -> RenderContext {
        let mut context: RenderContext = self.config.env_variables(&link.env).into_iter().collect();

        context.insert("app".to_string(), self.config.app.clone());
        context.insert("env".to_string(), link.env.clone());
        context.insert("region".to_string(), resources.name.clone());
        context.insert(
            "previous_env".to_string(),
            link.previous_env.clone().unwrap_or_default(),
        );
        context.insert(
            "next_env".to_string(),
            link.next_env.clone().unwrap_or_default(),
        );
        context.insert("pipeline_kind".to_string(), self.config.kind.to_string());
        if let Some(email) = &self.config.owner_email {
            context.insert("owner_email".to_string(), email.clone());
        }

        if self.config.kind.uses_network() {
            context.insert("subnets".to_string(), resources.subnets.join(","));
            context.insert(
                "availability_zones".to_string(),
                resources.availability_zones.join(","),
            );
            context
                .entry("instance_type".to_string())
                .or_insert_with(|| DEFAULT_INSTANCE_TYPE.to_string());
        }

        context
    }
}
