//! Pipeline document assembly
//!
//! Turns configuration into [`PipelineDocument`]s: blocks are rendered per
//! (environment, region), concatenated in promotion order under a rendered
//! wrapper, and the resulting stage list is numbered into a dependency graph.

pub mod builder;
pub mod graph;

use crate::core::{DocumentError, PipelineDocument, StageError};
use crate::inventory::InventoryError;
use crate::render::RenderError;
use serde_json::Value;
use thiserror::Error;

pub use builder::{link_chain, ChainLink, PipelineBlockBuilder, RenderedBlock};
pub use graph::{GraphError, StageGraphAssembler};

/// Error types for pipeline assembly
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Environment '{env}' has neither a stage override nor a block template")]
    NoBlock { env: String },

    #[error("Block for '{env}' in '{region}' must render to a stage object or array")]
    BlockShape { env: String, region: String },
}

/// Combine a rendered wrapper and blocks into a numbered document
pub fn assemble_document(
    wrapper: Value,
    application: &str,
    name: &str,
    blocks: Vec<RenderedBlock>,
    triggers: &[Value],
) -> Result<PipelineDocument, BuildError> {
    let mut document = PipelineDocument::from_wrapper(wrapper, application, name)?;

    for block in blocks {
        document.extend_stages(block.stages)?;
    }
    if !triggers.is_empty() {
        document.triggers = triggers.to_vec();
    }

    StageGraphAssembler::renumerate(&mut document.stages)?;
    graph::verify(&document.stages)?;

    Ok(document)
}
