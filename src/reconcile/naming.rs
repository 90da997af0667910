//! Managed pipeline naming convention
//!
//! Standing pipelines are named `"{app} [{region}]"`; one-shot pipelines
//! `"{name} (onetime-{env})"`. Only names following the convention are
//! touched by orphan cleanup.

use thiserror::Error;
use tracing::debug;

/// Name does not follow the managed convention
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("\"{name}\" is not managed")]
pub struct NotManaged {
    pub name: String,
}

/// What a managed pipeline name refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagedName {
    /// Standing pipeline for a region
    Region(String),
    /// One-shot pipeline; the tag as written (e.g. `(onetime-dev)`)
    Onetime(String),
}

/// Name of the standing pipeline for a region
pub fn standing_name(app: &str, region: &str) -> String {
    format!("{} [{}]", app, region)
}

/// Name of the one-shot pipeline for an environment
pub fn onetime_name(base: &str, env: &str) -> String {
    format!("{} {}", base, onetime_tag(env))
}

/// Tag identifying one-shot pipelines for an environment
pub fn onetime_tag(env: &str) -> String {
    format!("(onetime-{})", env)
}

/// Parse a pipeline name against the managed convention for `app`
pub fn parse_managed_name(name: &str, app: &str) -> Result<ManagedName, NotManaged> {
    let not_managed = || NotManaged {
        name: name.to_string(),
    };

    let mut tokens: Vec<&str> = name.split_whitespace().collect();
    let tag = tokens.pop().ok_or_else(not_managed)?;
    let prefix = tokens;

    let inner = tag.trim_matches(|c| c == '[' || c == ']');
    if inner.contains("onetime") {
        debug!("\"{}\" is a onetime, marked for cleaning", name);
        return Ok(ManagedName::Onetime(inner.to_string()));
    }

    if !(tag.starts_with('[') && tag.ends_with(']')) || tag.len() < 3 {
        debug!("\"{}\" does not end with \"[region]\"", name);
        return Err(not_managed());
    }
    if prefix.len() != 1 || prefix[0] != app {
        return Err(not_managed());
    }

    Ok(ManagedName::Region(inner.to_string()))
}
