//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{
    CleanCommand, OnetimeCommand, PipelineCommand, RenderCommand, TaskCommand, ValidateCommand,
};
use std::ffi::OsString;
use std::path::PathBuf;

/// Continuous-delivery control-plane driver
#[derive(Debug, Parser, Clone)]
#[command(name = "deckhand")]
#[command(author = "Deckhand Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Keeps deployment pipelines in line with declared environments", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the settings file
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Control-plane API base URL (overrides settings)
    #[arg(long, global = true)]
    pub gate_url: Option<String>,

    /// Directory of pipeline templates (overrides settings)
    #[arg(long, global = true)]
    pub templates: Option<PathBuf>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Reconcile and save standing pipelines for every declared region
    Pipeline(PipelineCommand),

    /// Save a one-shot pipeline for a single environment
    Onetime(OnetimeCommand),

    /// Delete orphaned managed pipelines
    Clean(CleanCommand),

    /// Validate an app configuration
    Validate(ValidateCommand),

    /// Print assembled pipeline documents without saving them
    Render(RenderCommand),

    /// Submit a job document and wait for it to finish
    Task(TaskCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
