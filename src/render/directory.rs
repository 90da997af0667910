//! File-backed template lookup with built-in defaults

use crate::render::{render_text, RenderContext, RenderError, TemplateRenderer};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("pipeline/wrapper", include_str!("templates/pipeline/wrapper.json")),
    ("pipeline/ec2", include_str!("templates/pipeline/ec2.json")),
    ("pipeline/lambda", include_str!("templates/pipeline/lambda.json")),
    ("pipeline/s3", include_str!("templates/pipeline/s3.json")),
];

/// Looks templates up as `<root>/<template_id>.json`, falling back to the
/// templates compiled into the binary
#[derive(Debug, Clone, Default)]
pub struct FileRenderer {
    root: Option<PathBuf>,
    use_builtin: bool,
}

impl FileRenderer {
    /// Only the built-in templates
    pub fn builtin() -> Self {
        Self {
            root: None,
            use_builtin: true,
        }
    }

    /// Templates under `root`, then the built-in ones
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            use_builtin: true,
        }
    }

    /// Templates under `root` only
    pub fn strict(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            use_builtin: false,
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    fn lookup(&self, template_id: &str) -> Result<String, RenderError> {
        if let Some(root) = &self.root {
            let path = root.join(format!("{}.json", template_id));
            match std::fs::read_to_string(&path) {
                Ok(text) => {
                    debug!("Using template {}", path.display());
                    return Ok(text);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(RenderError::Io {
                        template_id: template_id.to_string(),
                        source,
                    })
                }
            }
        }

        if self.use_builtin {
            if let Some((_, text)) = BUILTIN_TEMPLATES.iter().find(|(id, _)| *id == template_id) {
                return Ok(text.to_string());
            }
        }

        Err(RenderError::NotFound {
            template_id: template_id.to_string(),
        })
    }
}

impl TemplateRenderer for FileRenderer {
    fn render(&self, template_id: &str, context: &RenderContext) -> Result<Value, RenderError> {
        let text = self.lookup(template_id)?;
        render_text(template_id, &text, context)
    }
}
