//! Motion interpolation stage.
//!
//! Raises a video's frame rate with an external frame-interpolation engine
//! (RIFE's `inference_video.py` CLI). The engine doubles the frame count once
//! per unit of `--exp`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use retime_models::StageOutcome;
use tracing::{info, warn};

use crate::command::{CommandRunner, CommandSpec};
use crate::error::{MediaError, MediaResult};
use crate::probe::MediaInspector;

/// How to launch the interpolation engine.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationEngine {
    /// Interpreter that runs the engine script
    pub interpreter: String,
    /// Engine entry point
    pub script: PathBuf,
    /// Directory to run in (the engine loads its model weights relative to it)
    pub working_dir: Option<PathBuf>,
}

impl Default for InterpolationEngine {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            script: PathBuf::from("inference_video.py"),
            working_dir: None,
        }
    }
}

impl InterpolationEngine {
    fn command(&self, input: &Path, output: &Path, exponent: u32) -> CommandSpec {
        CommandSpec::new(&self.interpreter)
            .path_arg(&self.script)
            .arg("--video")
            .path_arg(input)
            .arg("--output")
            .path_arg(output)
            .arg("--exp")
            .arg(exponent.to_string())
            .current_dir(self.working_dir.clone())
    }
}

/// Smallest `n >= 0` with `source_fps * 2^n >= target_fps`.
pub fn required_exponent(source_fps: f64, target_fps: f64) -> MediaResult<u32> {
    if !(source_fps.is_finite() && source_fps > 0.0) {
        return Err(MediaError::invalid_input(format!("source fps {source_fps}")));
    }
    if !(target_fps.is_finite() && target_fps > 0.0) {
        return Err(MediaError::invalid_input(format!("target fps {target_fps}")));
    }

    let exponent = (target_fps / source_fps).log2().ceil().max(0.0);
    Ok(exponent as u32)
}

/// Interpolation stage.
#[derive(Clone)]
pub struct Interpolator {
    runner: Arc<dyn CommandRunner>,
    inspector: MediaInspector,
    engine: InterpolationEngine,
}

impl Interpolator {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        inspector: MediaInspector,
        engine: InterpolationEngine,
    ) -> Self {
        Self {
            runner,
            inspector,
            engine,
        }
    }

    /// Interpolate `input` to at least `target_fps` into `output`.
    ///
    /// The engine sometimes fails only in its own audio merge step after the
    /// silent video is already written. A tool failure with `output` present
    /// on disk is therefore a `SuccessWithWarning`; any other failure propagates.
    pub async fn interpolate(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        target_fps: f64,
    ) -> MediaResult<StageOutcome> {
        let input = input.as_ref();
        let output = output.as_ref();

        let source_fps = self.inspector.frame_rate(input).await?;
        let exponent = required_exponent(source_fps, target_fps)?;
        info!(
            source_fps,
            target_fps,
            exponent,
            effective_fps = source_fps * 2f64.powi(exponent as i32),
            "Interpolating"
        );

        let cmd = self.engine.command(input, output, exponent);
        match self.runner.run(&cmd).await {
            Ok(_) => Ok(StageOutcome::Success),
            Err(err) if err.is_tool_failure() && output_exists(output).await => {
                warn!(
                    output = %output.display(),
                    error = %err,
                    "Interpolation engine audio merge failed (ignored). Video is valid."
                );
                Ok(StageOutcome::SuccessWithWarning(format!(
                    "interpolation engine reported failure but wrote {}: {}",
                    output.display(),
                    err
                )))
            }
            Err(err) => Err(err),
        }
    }
}

async fn output_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
