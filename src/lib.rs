//! deckhand - keeps a continuous-delivery control plane's pipelines in line
//! with declared environments and regions

pub mod assembly;
pub mod cli;
pub mod client;
pub mod core;
pub mod execution;
pub mod inventory;
pub mod reconcile;
pub mod render;

// Re-export commonly used types
pub use crate::assembly::{BuildError, GraphError, PipelineBlockBuilder, StageGraphAssembler};
pub use crate::client::{ClientError, ControlPlane, HttpControlPlane, TaskRef, TaskSnapshot};
pub use crate::core::{config::AppConfig, settings::Settings, PipelineDocument, PipelineKind, Stage, TaskStatus};
pub use crate::execution::{DeployError, DeployEvent, Deployer, RetryPolicy, TaskError, TaskTracker};
pub use crate::inventory::{ConfigInventory, RegionInventory};
pub use crate::reconcile::{PipelineReconciler, ReconcileError};
pub use crate::render::{FileRenderer, TemplateRenderer};
