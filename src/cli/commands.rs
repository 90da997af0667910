//! CLI command definitions

use clap::Args;
use std::path::PathBuf;

/// Reconcile and save standing pipelines
#[derive(Debug, Args, Clone)]
pub struct PipelineCommand {
    /// Path to app YAML file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Create or update the application before saving pipelines
    #[arg(long)]
    pub ensure_app: bool,
}

/// Save a one-shot pipeline
#[derive(Debug, Args, Clone)]
pub struct OnetimeCommand {
    /// Path to app YAML file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Environment to build the pipeline for
    #[arg(short, long)]
    pub env: String,

    /// Create or update the application before saving the pipeline
    #[arg(long)]
    pub ensure_app: bool,
}

/// Delete orphaned managed pipelines
#[derive(Debug, Args, Clone)]
pub struct CleanCommand {
    /// Path to app YAML file
    #[arg(short, long)]
    pub file: PathBuf,
}

/// Validate an app configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to app YAML file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Print assembled pipeline documents
#[derive(Debug, Args, Clone)]
pub struct RenderCommand {
    /// Path to app YAML file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Render the one-shot pipeline for this environment instead
    #[arg(long)]
    pub onetime: Option<String>,
}

/// Submit a job and wait for it
#[derive(Debug, Args, Clone)]
pub struct TaskCommand {
    /// Path to job JSON file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Override the configured timeout, in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}
