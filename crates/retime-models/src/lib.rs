//! Shared data models for the retime service.
//!
//! This crate provides Serde-serializable types for:
//! - Retime requests and run identifiers
//! - The pipeline stage state machine
//! - Stage outcomes (including tolerated partial failures)

pub mod outcome;
pub mod request;
pub mod stage;

// Re-export common types
pub use outcome::StageOutcome;
pub use request::{RequestError, RetimeRequest, RunId};
pub use stage::PipelineStage;
