//! Deployment orchestration, task tracking and retry

pub mod engine;
pub mod retry;
pub mod tracker;

pub use engine::{
    application_job, DeployError, DeployEvent, DeployEventHandler, DeployReport, Deployer,
    RegionPipeline, SavedPipeline,
};
pub use retry::{retry, Backoff, RetryPolicy};
pub use tracker::{
    failure_details, max_attempts, TaskError, TaskTracker, TrackerEvent, TrackerEventHandler,
};
