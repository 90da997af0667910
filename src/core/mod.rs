//! Core domain models for deckhand
//!
//! This module defines the fundamental data structures that represent
//! environments, stages, pipeline documents, tasks, and their configuration.

pub mod config;
pub mod environment;
pub mod pipeline;
pub mod settings;
pub mod stage;
pub mod task;

pub use environment::*;
pub use pipeline::*;
pub use stage::*;
pub use task::*;
