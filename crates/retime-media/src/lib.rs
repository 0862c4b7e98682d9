//! FFmpeg / interpolation-engine CLI orchestration for video retiming.
//!
//! This crate provides:
//! - A process runner behind the `CommandRunner` seam
//! - FFprobe duration and frame-rate inspection
//! - The interpolation, retime and audio remux stages
//! - Per-run scratch artifact naming
//! - The pipeline orchestrator that chains the stages

pub mod command;
pub mod error;
pub mod interpolate;
pub mod pipeline;
pub mod probe;
pub mod remux;
pub mod retime;
pub mod scratch;

#[cfg(test)]
pub(crate) mod testing;

pub use command::{check_tool, CommandRunner, CommandSpec, FfmpegCommand, ProcessRunner};
pub use error::{MediaError, MediaResult};
pub use interpolate::{required_exponent, InterpolationEngine, Interpolator};
pub use pipeline::{PipelineConfig, PipelineRun, RetimePipeline};
pub use probe::{parse_duration, parse_frame_rate, MediaInspector};
pub use remux::AudioRemuxer;
pub use retime::{stretch_factor, Retimer};
pub use scratch::ScratchDir;
