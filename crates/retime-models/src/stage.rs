//! Pipeline stage state machine.
//!
//! A run moves strictly forward through the stages; any non-terminal
//! stage may fail, and terminal stages accept no further transitions.

use serde::{Deserialize, Serialize};

/// Stage of a single pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Upload is being written to the scratch directory
    #[default]
    Uploading,
    /// Raising the frame rate with the interpolation engine
    Interpolating,
    /// Scaling presentation timestamps to the target duration
    Retiming,
    /// Reattaching the original audio track
    Remuxing,
    /// Final artifact is ready
    Done,
    /// A stage failed; the run was abandoned
    Failed,
}

impl PipelineStage {
    /// Get string representation of the stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Uploading => "uploading",
            PipelineStage::Interpolating => "interpolating",
            PipelineStage::Retiming => "retiming",
            PipelineStage::Remuxing => "remuxing",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }

    /// Successor on the happy path.
    pub fn next(&self) -> Option<PipelineStage> {
        match self {
            PipelineStage::Uploading => Some(PipelineStage::Interpolating),
            PipelineStage::Interpolating => Some(PipelineStage::Retiming),
            PipelineStage::Retiming => Some(PipelineStage::Remuxing),
            PipelineStage::Remuxing => Some(PipelineStage::Done),
            PipelineStage::Done | PipelineStage::Failed => None,
        }
    }

    /// Transition table.
    pub fn can_transition_to(&self, target: PipelineStage) -> bool {
        if self.is_terminal() {
            return false;
        }
        target == PipelineStage::Failed || self.next() == Some(target)
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
