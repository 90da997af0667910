//! CLI output formatting

use crate::{
    core::TaskStatus,
    execution::{DeployEvent, DeployReport, TrackerEvent},
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static TRASH: Emoji<'_, '_> = Emoji("🗑️  ", "- ");

/// Create a spinner for waiting on a task
pub fn create_spinner(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(spinner_style) =
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
    {
        spinner.set_style(spinner_style);
    }
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format a task status for display
pub fn format_task_status(status: &TaskStatus) -> String {
    match status {
        TaskStatus::NotStarted => style("NOT_STARTED").dim().to_string(),
        TaskStatus::Running => style("RUNNING").yellow().to_string(),
        TaskStatus::Succeeded => style("SUCCEEDED").green().to_string(),
        TaskStatus::Terminal => style("TERMINAL").red().to_string(),
        TaskStatus::Other(other) => style(other).blue().to_string(),
    }
}

/// Format a deployment event for display
pub fn format_deploy_event(event: &DeployEvent) -> String {
    match event {
        DeployEvent::RunStarted { run_id, app } => format!(
            "{} Deploying {} ({})",
            ROCKET,
            style(app).bold(),
            style(&run_id.to_string()[..8]).dim()
        ),
        DeployEvent::OrphansCleaned { names } => {
            if names.is_empty() {
                format!("{} No orphaned pipelines", INFO)
            } else {
                let lines: Vec<String> = names
                    .iter()
                    .map(|name| format!("  {} {}", TRASH, style(name).dim()))
                    .collect();
                format!(
                    "{} Deleted {} orphaned pipeline(s)\n{}",
                    INFO,
                    style(names.len()).cyan(),
                    lines.join("\n")
                )
            }
        }
        DeployEvent::RegionSkipped { region } => format!(
            "{} {} has no environments with resources, skipped",
            WARN,
            style(region).yellow()
        ),
        DeployEvent::PipelineAssembled { name, stages } => format!(
            "{} Assembled {} ({} stages)",
            INFO,
            style(name).bold(),
            style(stages).cyan()
        ),
        DeployEvent::PipelineSaved { name, existing_id } => match existing_id {
            Some(id) => format!(
                "{} Updated {} ({})",
                CHECK,
                style(name).green(),
                style(id).dim()
            ),
            None => format!("{} Created {}", CHECK, style(name).green()),
        },
        DeployEvent::RunCompleted {
            run_id,
            saved,
            deleted,
        } => format!(
            "{} Run ({}) {}: {} saved, {} deleted",
            INFO,
            style(&run_id.to_string()[..8]).dim(),
            style("finished").green(),
            style(saved).cyan(),
            style(deleted).cyan()
        ),
    }
}

/// Format a task-tracking event for display
pub fn format_tracker_event(event: &TrackerEvent) -> String {
    match event {
        TrackerEvent::Submitted {
            task_id,
            job_type,
            timeout,
        } => format!(
            "{} Submitted {} task {} (timeout {})",
            SPINNER,
            style(job_type).cyan(),
            style(task_id).dim(),
            format_duration(*timeout)
        ),
        TrackerEvent::Polled {
            task_id,
            attempt,
            max_attempts,
            status,
        } => format!(
            "{} {} (poll {}/{})",
            style(task_id).dim(),
            format_task_status(status),
            attempt,
            max_attempts
        ),
        TrackerEvent::Finished { task_id, status } => {
            let icon = match status {
                TaskStatus::Succeeded => CHECK,
                TaskStatus::Terminal => CROSS,
                _ => WARN,
            };
            format!(
                "{} Task {} {}",
                icon,
                style(task_id).dim(),
                format_task_status(status)
            )
        }
    }
}

/// Format a finished run
pub fn format_report(report: &DeployReport) -> String {
    let mut lines = vec![format!(
        "{} Run {}",
        INFO,
        style(&report.run_id.to_string()[..8]).dim()
    )];
    for saved in &report.saved {
        let action = if saved.existing_id.is_some() {
            "updated"
        } else {
            "created"
        };
        lines.push(format!(
            "  {} {} ({}, {} stages)",
            CHECK,
            style(&saved.name).bold(),
            action,
            saved.stages
        ));
    }
    for name in &report.deleted {
        lines.push(format!("  {} {} (deleted)", TRASH, style(name).dim()));
    }
    lines.join("\n")
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
