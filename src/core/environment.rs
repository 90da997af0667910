//! Environment and region domain models

use serde::{Deserialize, Serialize};

/// A deployment environment in the promotion chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Environment name (e.g. "dev", "stage", "prod")
    pub name: String,

    /// Index in the declared promotion chain
    pub position: usize,

    /// Regions this environment is declared for
    pub regions: Vec<String>,
}

impl Environment {
    pub fn new(name: impl Into<String>, position: usize, regions: Vec<String>) -> Self {
        Self {
            name: name.into(),
            position,
            regions,
        }
    }

    /// Whether the environment is declared for the given region
    pub fn is_declared_in(&self, region: &str) -> bool {
        self.regions.iter().any(|r| r == region)
    }
}

/// Resources an environment owns in one region
///
/// Looked up from a [`RegionInventory`](crate::inventory::RegionInventory);
/// deckhand never creates or mutates these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Region name (e.g. "us-east-1")
    pub name: String,

    /// Subnet identifiers available to the environment
    #[serde(default)]
    pub subnets: Vec<String>,

    /// Availability zones covered by those subnets
    #[serde(default)]
    pub availability_zones: Vec<String>,
}

impl Region {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_subnets(mut self, subnets: Vec<String>) -> Self {
        self.subnets = subnets;
        self
    }

    pub fn with_availability_zones(mut self, zones: Vec<String>) -> Self {
        self.availability_zones = zones;
        self
    }
}
