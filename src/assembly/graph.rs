//! Stage graph assembly
//!
//! Rendered blocks only tag each stage with a lane; the order stages were
//! emitted in is the only structural signal. The assembler walks that order
//! once and assigns every master and branch stage its `refId` and
//! `requisiteStageRefIds`:
//!
//! - masters form a linear chain `"1", "2", ...`, each depending on the
//!   previous master;
//! - branches hang off the most recent master and are numbered
//!   `master * 100 + n` for the n-th consecutive branch, so they never depend
//!   on each other.

use crate::core::{Lane, Stage};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

/// Branch ids are `master * BRANCH_BASE + n`
pub const BRANCH_BASE: u32 = 100;

/// Error types for graph assembly
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("Stage at position {position} uses the merge lane, which is not supported")]
    MergeUnsupported { position: usize },

    #[error("More than {max} consecutive branch stages under master {master}")]
    BranchOverflow { master: u32, max: u32 },

    #[error("Duplicate refId '{ref_id}' at position {position}")]
    DuplicateRefId { ref_id: String, position: usize },

    #[error("Stage '{ref_id}' at position {position} depends on '{missing}', which is not an earlier stage")]
    ForwardReference {
        ref_id: String,
        position: usize,
        missing: String,
    },
}

/// Single-pass renumbering state
#[derive(Debug, Default)]
pub struct StageGraphAssembler {
    main_index: u32,
    branch_index: u32,
    previous_lane: Option<Lane>,
}

impl StageGraphAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `refId` and `requisiteStageRefIds` to every stage in order
    pub fn renumerate(stages: &mut [Stage]) -> Result<(), GraphError> {
        let mut assembler = Self::new();
        for stage in stages.iter_mut() {
            assembler.assign(stage)?;
        }
        Ok(())
    }

    fn assign(&mut self, stage: &mut Stage) -> Result<(), GraphError> {
        match &stage.lane {
            Lane::Master => {
                stage.requisite_stage_ref_ids = Some(if self.main_index == 0 {
                    Vec::new()
                } else {
                    vec![self.main_index.to_string()]
                });
                self.main_index += 1;
                stage.ref_id = self.main_index.to_string();
            }
            Lane::Branch => {
                if self.previous_lane == Some(Lane::Branch) {
                    self.branch_index += 1;
                } else {
                    self.branch_index = 0;
                }
                if self.branch_index >= BRANCH_BASE {
                    return Err(GraphError::BranchOverflow {
                        master: self.main_index,
                        max: BRANCH_BASE,
                    });
                }
                stage.ref_id = (self.main_index * BRANCH_BASE + self.branch_index).to_string();
                stage.requisite_stage_ref_ids = Some(vec![self.main_index.to_string()]);
            }
            Lane::Merge => {
                return Err(GraphError::MergeUnsupported {
                    position: stage.position,
                });
            }
            Lane::Other(tag) => {
                debug!(
                    "Stage at position {} has lane '{}', leaving it as-is",
                    stage.position, tag
                );
            }
        }

        self.previous_lane = Some(stage.lane.clone());
        Ok(())
    }
}

/// Check assembled stages: unique ids, edges only to earlier stages
///
/// Stages without a `refId` are not graph nodes and are not checked for
/// uniqueness.
pub fn verify(stages: &[Stage]) -> Result<(), GraphError> {
    let mut seen: HashSet<&str> = HashSet::new();

    for stage in stages {
        if let Some(requisites) = &stage.requisite_stage_ref_ids {
            if let Some(missing) = requisites.iter().find(|id| !seen.contains(id.as_str())) {
                return Err(GraphError::ForwardReference {
                    ref_id: stage.ref_id.clone(),
                    position: stage.position,
                    missing: missing.clone(),
                });
            }
        }
        if stage.ref_id.is_empty() {
            continue;
        }
        if !seen.insert(stage.ref_id.as_str()) {
            return Err(GraphError::DuplicateRefId {
                ref_id: stage.ref_id.clone(),
                position: stage.position,
            });
        }
    }

    Ok(())
}
