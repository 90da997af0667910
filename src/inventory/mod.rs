//! Region inventory lookups
//!
//! The inventory answers whether an environment has resources in a region
//! and, if so, which subnets and zones it can use.

use crate::core::{config::AppConfig, Region};
use crate::execution::retry::{retry, RetryPolicy};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Errors raised by inventory backends
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Backend could not answer right now
    #[error("Inventory unavailable: {0}")]
    Unavailable(String),

    #[error("Inventory lookup failed: {0}")]
    Lookup(String),
}

impl InventoryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, InventoryError::Unavailable(_))
    }
}

/// Source of per-environment, per-region resources
#[async_trait]
pub trait RegionInventory: Send + Sync {
    /// Resources `env` owns in `region`, or `None` when it has no presence
    async fn lookup(&self, env: &str, region: &str) -> Result<Option<Region>, InventoryError>;
}

/// Look a region up, retrying transient failures
pub async fn lookup_with_retry(
    inventory: &dyn RegionInventory,
    policy: &RetryPolicy,
    env: &str,
    region: &str,
) -> Result<Option<Region>, InventoryError> {
    retry(
        policy,
        || inventory.lookup(env, region),
        InventoryError::is_transient,
    )
    .await
}

/// Inventory answered from the app configuration itself
#[derive(Debug, Clone, Default)]
pub struct ConfigInventory {
    regions: HashMap<(String, String), Region>,
}

impl ConfigInventory {
    pub fn from_config(config: &AppConfig) -> Self {
        let mut regions = HashMap::new();
        for (env_name, env) in &config.envs {
            for region in &env.regions {
                let resources = Region::new(region.clone())
                    .with_subnets(env.subnets.get(region).cloned().unwrap_or_default())
                    .with_availability_zones(
                        env.availability_zones.get(region).cloned().unwrap_or_default(),
                    );
                regions.insert((env_name.clone(), region.clone()), resources);
            }
        }
        debug!("Config inventory holds {} env/region pairs", regions.len());
        Self { regions }
    }

    /// Declare presence of `env` in a region
    pub fn insert(&mut self, env: impl Into<String>, region: Region) {
        self.regions.insert((env.into(), region.name.clone()), region);
    }
}

#[async_trait]
impl RegionInventory for ConfigInventory {
    async fn lookup(&self, env: &str, region: &str) -> Result<Option<Region>, InventoryError> {
        Ok(self
            .regions
            .get(&(env.to_string(), region.to_string()))
            .cloned())
    }
}
