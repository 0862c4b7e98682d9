//! FFprobe duration and frame-rate inspection.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::command::{CommandRunner, CommandSpec};
use crate::error::{MediaError, MediaResult};

/// Reads container duration and stream frame rate through ffprobe.
///
/// Nothing is cached; every call probes the file again.
#[derive(Clone)]
pub struct MediaInspector {
    runner: Arc<dyn CommandRunner>,
    ffprobe: String,
}

impl MediaInspector {
    pub fn new(runner: Arc<dyn CommandRunner>, ffprobe: impl Into<String>) -> Self {
        Self {
            runner,
            ffprobe: ffprobe.into(),
        }
    }

    /// Container duration in seconds.
    pub async fn duration(&self, path: impl AsRef<Path>) -> MediaResult<f64> {
        let cmd = CommandSpec::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .path_arg(path);

        let out = self.runner.run(&cmd).await?;
        let duration = parse_duration(&out)?;
        debug!(duration, "Probed duration");
        Ok(duration)
    }

    /// Nominal frame rate of the first video stream.
    pub async fn frame_rate(&self, path: impl AsRef<Path>) -> MediaResult<f64> {
        let cmd = CommandSpec::new(&self.ffprobe)
            .args([
                "-v",
                "0",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=r_frame_rate",
                "-of",
                "csv=p=0",
            ])
            .path_arg(path);

        let out = self.runner.run(&cmd).await?;
        let fps = parse_frame_rate(&out)?;
        debug!(fps, "Probed frame rate");
        Ok(fps)
    }
}

/// Parse a numeric duration like `"12.345000"`.
pub fn parse_duration(output: &str) -> MediaResult<f64> {
    let trimmed = output.trim();
    let value = parse_number(trimmed, trimmed)?;
    ensure_positive(trimmed, value)
}

/// Parse a frame rate given as `"N/D"` or as a plain number.
pub fn parse_frame_rate(output: &str) -> MediaResult<f64> {
    let trimmed = output.trim();

    let value = match trimmed.split_once('/') {
        Some((num, den)) => {
            let num = parse_number(trimmed, num)?;
            let den = parse_number(trimmed, den)?;
            if den == 0.0 {
                return Err(MediaError::probe_parse(trimmed, "zero denominator"));
            }
            num / den
        }
        None => parse_number(trimmed, trimmed)?,
    };

    ensure_positive(trimmed, value)
}

fn parse_number(output: &str, part: &str) -> MediaResult<f64> {
    part.trim()
        .parse::<f64>()
        .map_err(|e| MediaError::probe_parse(output, e.to_string()))
}

fn ensure_positive(output: &str, value: f64) -> MediaResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(MediaError::probe_parse(output, "expected a positive finite number"))
    }
}
