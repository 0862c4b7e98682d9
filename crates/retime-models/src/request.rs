//! Retime request types.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for one pipeline run.
///
/// Every scratch artifact of a run is prefixed with this id, so concurrent
/// requests never share a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    #[error("target_seconds must be a finite number greater than zero (got {0})")]
    InvalidTargetSeconds(f64),

    #[error("source video path is empty")]
    EmptySource,
}

/// A retime request: one uploaded video and the duration it should play for.
///
/// Immutable once accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetimeRequest {
    /// Run this request belongs to
    pub run_id: RunId,
    /// Saved upload on local disk
    pub source: PathBuf,
    /// Requested playback duration in seconds
    pub target_seconds: f64,
}

impl RetimeRequest {
    pub fn new(run_id: RunId, source: impl Into<PathBuf>, target_seconds: f64) -> Self {
        Self {
            run_id,
            source: source.into(),
            target_seconds,
        }
    }

    /// Validate the request.
    pub fn validate(&self) -> Result<(), RequestError> {
        validate_target_seconds(self.target_seconds)?;
        if self.source.as_os_str().is_empty() {
            return Err(RequestError::EmptySource);
        }
        Ok(())
    }
}

/// Check that a target duration is usable as a stretch target.
pub fn validate_target_seconds(target_seconds: f64) -> Result<f64, RequestError> {
    if target_seconds.is_finite() && target_seconds > 0.0 {
        Ok(target_seconds)
    } else {
        Err(RequestError::InvalidTargetSeconds(target_seconds))
    }
}
