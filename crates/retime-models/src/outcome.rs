//! Stage outcome.

use serde::{Deserialize, Serialize};

/// Non-failure result of a pipeline stage.
///
/// Failures travel in the `Err` arm of the stage's `Result`; this type only
/// distinguishes a clean success from one where the external tool reported
/// an error that was judged harmless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum StageOutcome {
    Success,
    SuccessWithWarning(String),
}

impl StageOutcome {
    /// Warning text, if the stage completed with one.
    pub fn warning(&self) -> Option<&str> {
        match self {
            StageOutcome::Success => None,
            StageOutcome::SuccessWithWarning(reason) => Some(reason),
        }
    }
}
