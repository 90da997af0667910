//! Template rendering
//!
//! Templates are JSON documents with `{{ key }}` placeholders. Placeholders
//! must sit inside JSON string literals; values are JSON-escaped on
//! substitution so the output stays valid whatever they contain. Rendering
//! fails on any placeholder the context does not supply.

pub mod directory;

use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

pub use directory::FileRenderer;

/// Values available to a template
pub type RenderContext = BTreeMap<String, String>;

/// Error types for template rendering
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template not found: {template_id}")]
    NotFound { template_id: String },

    #[error("Template '{template_id}' did not render valid JSON: {source}")]
    InvalidJson {
        template_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Template '{template_id}' uses '{{{{ {key} }}}}' but no value was supplied")]
    MissingVariable { template_id: String, key: String },

    #[error("Failed to read template '{template_id}': {source}")]
    Io {
        template_id: String,
        #[source]
        source: std::io::Error,
    },
}

/// Renders a template id plus context into a JSON document
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template_id: &str, context: &RenderContext) -> Result<Value, RenderError>;
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("placeholder pattern is valid")
    })
}

/// Placeholder keys in `template` that `context` has no value for, in order
pub fn missing_keys(template: &str, context: &RenderContext) -> Vec<String> {
    let mut missing: Vec<String> = Vec::new();
    for caps in placeholder_pattern().captures_iter(template) {
        let key = &caps[1];
        if !context.contains_key(key) && !missing.iter().any(|m| m == key) {
            missing.push(key.to_string());
        }
    }
    missing
}

/// Replace `{{ key }}` placeholders with JSON-escaped context values
///
/// Unknown placeholders are left as-is; [`render_text`] rejects them.
pub fn substitute(template: &str, context: &RenderContext) -> String {
    placeholder_pattern()
        .replace_all(template, |caps: &regex::Captures<'_>| match context.get(&caps[1]) {
            Some(value) => escape_json_fragment(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Render template text and parse the result as JSON
pub fn render_text(
    template_id: &str,
    template: &str,
    context: &RenderContext,
) -> Result<Value, RenderError> {
    if let Some(key) = missing_keys(template, context).into_iter().next() {
        return Err(RenderError::MissingVariable {
            template_id: template_id.to_string(),
            key,
        });
    }
    let rendered = substitute(template, context);
    serde_json::from_str(&rendered).map_err(|source| RenderError::InvalidJson {
        template_id: template_id.to_string(),
        source,
    })
}

fn escape_json_fragment(value: &str) -> String {
    let quoted = Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}
