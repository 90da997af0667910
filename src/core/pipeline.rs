//! Pipeline document domain model

use crate::core::stage::{Stage, StageError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Errors raised while reading a rendered pipeline wrapper
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Pipeline wrapper is not a JSON object")]
    NotAnObject,

    #[error("Pipeline wrapper field '{0}' has the wrong type")]
    FieldType(&'static str),

    #[error(transparent)]
    Stage(#[from] StageError),
}

/// Kind of deployment a pipeline performs
///
/// Every kind shares the same assembly, reconciliation and task tracking;
/// kinds only differ in which templates they render and which region
/// resources they feed into the render context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    /// Instance-based deploys; needs subnets and availability zones
    #[default]
    Ec2,
    /// Function deploys
    Lambda,
    /// Static bucket deploys
    S3,
    /// Hand-written stage JSON for every environment
    Manual,
}

impl PipelineKind {
    /// Template rendering the pipeline wrapper (everything but the stages)
    pub fn wrapper_template(&self) -> &'static str {
        "pipeline/wrapper"
    }

    /// Template rendering one environment's stage block
    pub fn block_template(&self) -> Option<&'static str> {
        match self {
            PipelineKind::Ec2 => Some("pipeline/ec2"),
            PipelineKind::Lambda => Some("pipeline/lambda"),
            PipelineKind::S3 => Some("pipeline/s3"),
            PipelineKind::Manual => None,
        }
    }

    /// Whether blocks need subnet/zone data in their render context
    pub fn uses_network(&self) -> bool {
        matches!(self, PipelineKind::Ec2)
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineKind::Ec2 => "ec2",
            PipelineKind::Lambda => "lambda",
            PipelineKind::S3 => "s3",
            PipelineKind::Manual => "manual",
        };
        write!(f, "{}", name)
    }
}

/// Where an environment's stage block comes from
#[derive(Debug, Clone, PartialEq)]
pub enum EnvironmentBlock {
    /// Rendered from the pipeline kind's block template
    Template(&'static str),
    /// Raw stage JSON supplied in configuration
    Override(Vec<Value>),
}

/// A fully assembled pipeline, ready to be saved to the control plane
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineDocument {
    pub application: String,

    pub name: String,

    pub stages: Vec<Stage>,

    /// Existing pipeline id; present means "replace that pipeline"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub triggers: Vec<Value>,

    /// Any other wrapper fields, passed through verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PipelineDocument {
    pub fn new(application: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            name: name.into(),
            stages: Vec::new(),
            id: None,
            triggers: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Build a document from a rendered wrapper template
    ///
    /// `application` and `name` fall back to the given values when the
    /// wrapper leaves them out. Any stages already present in the wrapper
    /// come first in emission order.
    pub fn from_wrapper(
        wrapper: Value,
        application: &str,
        name: &str,
    ) -> Result<Self, DocumentError> {
        let Value::Object(mut fields) = wrapper else {
            return Err(DocumentError::NotAnObject);
        };

        let application = match fields.remove("application") {
            Some(Value::String(s)) => s,
            None | Some(Value::Null) => application.to_string(),
            Some(_) => return Err(DocumentError::FieldType("application")),
        };
        let name = match fields.remove("name") {
            Some(Value::String(s)) => s,
            None | Some(Value::Null) => name.to_string(),
            Some(_) => return Err(DocumentError::FieldType("name")),
        };
        let triggers = match fields.remove("triggers") {
            Some(Value::Array(t)) => t,
            None | Some(Value::Null) => Vec::new(),
            Some(_) => return Err(DocumentError::FieldType("triggers")),
        };
        let stages = match fields.remove("stages") {
            Some(Value::Array(s)) => s
                .into_iter()
                .enumerate()
                .map(|(position, value)| Stage::from_json(position, value))
                .collect::<Result<Vec<_>, _>>()?,
            None | Some(Value::Null) => Vec::new(),
            Some(_) => return Err(DocumentError::FieldType("stages")),
        };
        let id = match fields.remove("id") {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        };

        Ok(Self {
            application,
            name,
            stages,
            id,
            triggers,
            extra: fields,
        })
    }

    /// Append rendered stage JSON, continuing the emission order
    pub fn extend_stages(&mut self, values: Vec<Value>) -> Result<(), StageError> {
        for value in values {
            let position = self.stages.len();
            self.stages.push(Stage::from_json(position, value)?);
        }
        Ok(())
    }

    /// Serialize into the JSON body the control plane expects
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
