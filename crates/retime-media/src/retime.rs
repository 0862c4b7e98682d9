//! Timestamp-scaling retime stage.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::command::{CommandRunner, FfmpegCommand};
use crate::error::{MediaError, MediaResult};
use crate::probe::MediaInspector;

/// Factor that maps `current_seconds` onto `target_seconds`.
///
/// Greater than one slows playback down, less than one speeds it up.
pub fn stretch_factor(current_seconds: f64, target_seconds: f64) -> MediaResult<f64> {
    if !(current_seconds.is_finite() && current_seconds > 0.0) {
        return Err(MediaError::invalid_input(format!(
            "current duration {current_seconds}"
        )));
    }
    if !(target_seconds.is_finite() && target_seconds > 0.0) {
        return Err(MediaError::invalid_input(format!(
            "target duration {target_seconds}"
        )));
    }
    Ok(target_seconds / current_seconds)
}

/// `setpts` filter expression for a factor.
pub fn setpts_filter(factor: f64) -> String {
    format!("setpts={}*PTS", factor)
}

/// Retime stage: rescales presentation timestamps and drops audio.
///
/// Audio is not time-scaled here; the remux stage reattaches the original.
#[derive(Clone)]
pub struct Retimer {
    runner: Arc<dyn CommandRunner>,
    inspector: MediaInspector,
    ffmpeg: String,
}

impl Retimer {
    pub fn new(runner: Arc<dyn CommandRunner>, inspector: MediaInspector, ffmpeg: impl Into<String>) -> Self {
        Self {
            runner,
            inspector,
            ffmpeg: ffmpeg.into(),
        }
    }

    pub async fn retime(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        target_seconds: f64,
    ) -> MediaResult<()> {
        let input = input.as_ref();
        let current = self.inspector.duration(input).await?;
        let factor = stretch_factor(current, target_seconds)?;
        info!(current_seconds = current, target_seconds, factor, "Retiming");

        let cmd = FfmpegCommand::new(input, output.as_ref())
            .video_filter(setpts_filter(factor))
            .no_audio()
            .into_spec(&self.ffmpeg);

        self.runner.run(&cmd).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTools;
    use tempfile::TempDir;

    #[test]
    fn test_stretch_factor() {
        assert!((stretch_factor(10.0, 15.0).unwrap() - 1.5).abs() < 1e-12);
        assert!((stretch_factor(10.0, 5.0).unwrap() - 0.5).abs() < 1e-12);
        assert!((stretch_factor(4.0, 8.0).unwrap() - 2.0).abs() < 1e-12);
        assert!(stretch_factor(0.0, 5.0).is_err());
        assert!(stretch_factor(10.0, -1.0).is_err());
    }

    #[test]
    fn test_setpts_filter() {
        assert_eq!(setpts_filter(1.5), "setpts=1.5*PTS");
        assert_eq!(setpts_filter(0.5), "setpts=0.5*PTS");
    }

    #[tokio::test]
    async fn test_retime_invocation() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("hi.mp4");
        let output = dir.path().join("stretched.mp4");
        let tools = Arc::new(FakeTools::new("96/1", "10.0"));
        let inspector = MediaInspector::new(tools.clone(), "ffprobe");

        Retimer::new(tools.clone(), inspector, "ffmpeg")
            .retime(&input, &output, 15.0)
            .await
            .unwrap();

        let calls = tools.calls_to("ffmpeg");
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].args,
            vec![
                "-y".to_string(),
                "-i".to_string(),
                input.to_string_lossy().to_string(),
                "-filter:v".to_string(),
                "setpts=1.5*PTS".to_string(),
                "-an".to_string(),
                output.to_string_lossy().to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_retime_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("stretched.mp4");
        let tools = Arc::new(FakeTools::new("96/1", "10.0").ffmpeg_fails());
        let inspector = MediaInspector::new(tools.clone(), "ffprobe");

        let err = Retimer::new(tools, inspector, "ffmpeg")
            .retime(dir.path().join("hi.mp4"), &output, 5.0)
            .await
            .unwrap_err();

        assert!(err.is_tool_failure());
    }
}
