//! Stage domain model

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Errors raised while reading rendered stage JSON
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Stage at position {position} is not a JSON object")]
    NotAnObject { position: usize },
}

/// A stage's role in the dependency graph
///
/// Blocks tag each stage with its lane in the `refId` field before the graph
/// is assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lane {
    /// Linear backbone of the pipeline
    Master,
    /// Parallel leaf hanging off the most recent master
    Branch,
    /// Converges several branches (not supported by the assembler)
    Merge,
    /// Anything else; passed through untouched
    Other(String),
}

impl Lane {
    /// Parse a lane tag, case-insensitively
    pub fn parse(tag: &str) -> Self {
        match tag.to_lowercase().as_str() {
            "master" => Lane::Master,
            "branch" => Lane::Branch,
            "merge" => Lane::Merge,
            _ => Lane::Other(tag.to_string()),
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lane::Master => write!(f, "master"),
            Lane::Branch => write!(f, "branch"),
            Lane::Merge => write!(f, "merge"),
            Lane::Other(tag) => write!(f, "{}", tag),
        }
    }
}

/// A single pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    /// Lane tag read from the rendered block
    pub lane: Lane,

    /// Emission order within the pipeline
    pub position: usize,

    /// Graph node id (the raw lane tag until assembled)
    pub ref_id: String,

    /// Incoming edges; `None` leaves whatever the payload carried
    pub requisite_stage_ref_ids: Option<Vec<String>>,

    /// Remaining stage fields, opaque to deckhand
    pub payload: Map<String, Value>,
}

impl Stage {
    /// Read a stage from rendered JSON
    pub fn from_json(position: usize, value: Value) -> Result<Self, StageError> {
        let Value::Object(mut payload) = value else {
            return Err(StageError::NotAnObject { position });
        };

        let tag = match payload.remove("refId") {
            Some(Value::String(tag)) => tag,
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };

        let requisite_stage_ref_ids = match payload.remove("requisiteStageRefIds") {
            Some(Value::Array(ids)) => Some(
                ids.into_iter()
                    .map(|id| match id {
                        Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            _ => None,
        };

        Ok(Stage {
            lane: Lane::parse(&tag),
            position,
            ref_id: tag,
            requisite_stage_ref_ids,
            payload,
        })
    }

    /// The stage name, if the payload carries one
    pub fn name(&self) -> Option<&str> {
        self.payload.get("name").and_then(Value::as_str)
    }

    /// Flatten back into the control-plane stage object
    pub fn to_json(&self) -> Value {
        let mut object = self.payload.clone();
        if !self.ref_id.is_empty() {
            object.insert("refId".to_string(), Value::String(self.ref_id.clone()));
        }
        if let Some(ids) = &self.requisite_stage_ref_ids {
            object.insert(
                "requisiteStageRefIds".to_string(),
                Value::Array(ids.iter().cloned().map(Value::String).collect()),
            );
        }
        Value::Object(object)
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
