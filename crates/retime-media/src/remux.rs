//! Audio remux stage.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::command::{CommandRunner, FfmpegCommand};
use crate::error::MediaResult;

/// Puts the original audio back on a silent retimed video.
///
/// Output is truncated to the shorter stream, so a slowed-down video keeps
/// the original-length audio followed by silence.
#[derive(Clone)]
pub struct AudioRemuxer {
    runner: Arc<dyn CommandRunner>,
    ffmpeg: String,
}

impl AudioRemuxer {
    pub fn new(runner: Arc<dyn CommandRunner>, ffmpeg: impl Into<String>) -> Self {
        Self {
            runner,
            ffmpeg: ffmpeg.into(),
        }
    }

    pub async fn merge_audio(
        &self,
        original: impl AsRef<Path>,
        silent_video: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> MediaResult<()> {
        info!(output = %output.as_ref().display(), "Merging original audio");

        let cmd = FfmpegCommand::new(silent_video, output)
            .input(original)
            .video_codec("copy")
            .audio_codec("aac")
            .shortest()
            .into_spec(&self.ffmpeg);

        self.runner.run(&cmd).await?;
        Ok(())
    }
}
