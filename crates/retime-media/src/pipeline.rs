//! Pipeline orchestrator.
//!
//! Chains interpolation, retiming and audio remux for one request. Every
//! stage waits for the previous stage's process to exit, since each one
//! reads the file the previous one wrote. Nothing is retried and nothing is
//! rolled back: a failed run just leaves its intermediate files behind.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use retime_models::{PipelineStage, RetimeRequest, RunId};
use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::command::{CommandRunner, ProcessRunner};
use crate::error::{MediaError, MediaResult};
use crate::interpolate::{InterpolationEngine, Interpolator};
use crate::probe::MediaInspector;
use crate::remux::AudioRemuxer;
use crate::retime::Retimer;
use crate::scratch::{artifact_exists, ScratchDir};

/// Metric names.
pub mod names {
    pub const STAGE_DURATION_SECONDS: &str = "retime_stage_duration_seconds";
    pub const RUNS_TOTAL: &str = "retime_runs_total";
    pub const TOLERATED_FAILURES_TOTAL: &str = "retime_tolerated_failures_total";
}

/// Pipeline configuration. Built once at startup and handed in by value.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Directory for request-scoped artifacts
    pub scratch_dir: PathBuf,
    /// Transcoder binary
    pub ffmpeg: String,
    /// Prober binary
    pub ffprobe: String,
    /// Interpolation engine launch settings
    pub engine: InterpolationEngine,
    /// Frame rate the interpolation stage aims for
    pub target_fps: f64,
    /// Per-invocation timeout; 0 disables it
    pub tool_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scratch_dir: PathBuf::from("/tmp/retime"),
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            engine: InterpolationEngine::default(),
            target_fps: 60.0,
            tool_timeout_secs: 0,
        }
    }
}

/// Record of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub run_id: RunId,
    pub stage: PipelineStage,
    pub final_path: Option<PathBuf>,
    /// Tolerated failures, in the order they happened
    pub warnings: Vec<String>,
}

impl PipelineRun {
    fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            stage: PipelineStage::Uploading,
            final_path: None,
            warnings: Vec::new(),
        }
    }

    fn transition(&mut self, to: PipelineStage) {
        debug_assert!(
            self.stage.can_transition_to(to),
            "illegal transition {} -> {}",
            self.stage,
            to
        );
        debug!(from = %self.stage, to = %to, "Stage transition");
        self.stage = to;
    }
}

/// Orchestrates the three stages.
#[derive(Clone)]
pub struct RetimePipeline {
    config: PipelineConfig,
    scratch: ScratchDir,
    interpolator: Interpolator,
    retimer: Retimer,
    remuxer: AudioRemuxer,
}

impl RetimePipeline {
    /// Create a pipeline that launches real processes.
    pub fn new(config: PipelineConfig) -> Self {
        let runner = ProcessRunner::new().with_timeout(config.tool_timeout_secs);
        Self::with_runner(config, Arc::new(runner))
    }

    /// Create a pipeline on top of any runner.
    pub fn with_runner(config: PipelineConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let inspector = MediaInspector::new(Arc::clone(&runner), config.ffprobe.clone());
        let interpolator = Interpolator::new(
            Arc::clone(&runner),
            inspector.clone(),
            config.engine.clone(),
        );
        let retimer = Retimer::new(Arc::clone(&runner), inspector, config.ffmpeg.clone());
        let remuxer = AudioRemuxer::new(runner, config.ffmpeg.clone());

        Self {
            scratch: ScratchDir::new(config.scratch_dir.clone()),
            config,
            interpolator,
            retimer,
            remuxer,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn scratch(&self) -> &ScratchDir {
        &self.scratch
    }

    /// Create the scratch directory.
    pub async fn prepare(&self) -> MediaResult<()> {
        self.scratch.ensure().await
    }

    /// Where the upload for a run should be written.
    pub fn input_path(&self, run_id: &RunId) -> PathBuf {
        self.scratch.artifact(run_id, "input.mp4")
    }

    /// Run every stage for an already-saved upload.
    pub async fn run(&self, request: &RetimeRequest) -> MediaResult<PipelineRun> {
        let span = info_span!("pipeline", run_id = %request.run_id);
        self.run_inner(request).instrument(span).await
    }

    async fn run_inner(&self, request: &RetimeRequest) -> MediaResult<PipelineRun> {
        request
            .validate()
            .map_err(|e| MediaError::invalid_input(e.to_string()))?;

        let mut run = PipelineRun::new(request.run_id.clone());
        let started = Instant::now();
        info!(
            source = %request.source.display(),
            target_seconds = request.target_seconds,
            "Pipeline started"
        );

        match self.drive(request, &mut run).await {
            Ok(final_path) => {
                run.transition(PipelineStage::Done);
                run.final_path = Some(final_path);
                counter!(names::RUNS_TOTAL, "status" => "done").increment(1);
                info!(
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    warnings = run.warnings.len(),
                    "Pipeline finished"
                );
                Ok(run)
            }
            Err(err) => {
                let failed_in = run.stage;
                run.transition(PipelineStage::Failed);
                counter!(names::RUNS_TOTAL, "status" => "failed").increment(1);
                error!(stage = %failed_in, error = %err, "Pipeline failed");
                Err(err)
            }
        }
    }

    async fn drive(&self, request: &RetimeRequest, run: &mut PipelineRun) -> MediaResult<PathBuf> {
        let run_id = &request.run_id;
        let source = request.source.as_path();
        ensure_artifact(source).await?;

        let interpolated = self.scratch.artifact(run_id, "interpolated.mp4");
        let stretched = self.scratch.artifact(run_id, "stretched.mp4");
        let final_path = self.scratch.artifact(run_id, "final.mp4");

        run.transition(PipelineStage::Interpolating);
        let outcome = timed(
            PipelineStage::Interpolating,
            self.interpolator
                .interpolate(source, &interpolated, self.config.target_fps),
        )
        .await?;
        if let Some(warning) = outcome.warning() {
            warn!(warning, "Interpolation completed with warning");
            counter!(names::TOLERATED_FAILURES_TOTAL, "stage" => "interpolating").increment(1);
            run.warnings.push(warning.to_string());
        }
        ensure_artifact(&interpolated).await?;

        run.transition(PipelineStage::Retiming);
        timed(
            PipelineStage::Retiming,
            self.retimer
                .retime(&interpolated, &stretched, request.target_seconds),
        )
        .await?;
        ensure_artifact(&stretched).await?;

        run.transition(PipelineStage::Remuxing);
        timed(
            PipelineStage::Remuxing,
            self.remuxer.merge_audio(source, &stretched, &final_path),
        )
        .await?;
        ensure_artifact(&final_path).await?;

        Ok(final_path)
    }
}

async fn ensure_artifact(path: &Path) -> MediaResult<()> {
    if artifact_exists(path).await {
        Ok(())
    } else {
        Err(MediaError::MissingArtifact(path.to_path_buf()))
    }
}

async fn timed<T, F>(stage: PipelineStage, fut: F) -> MediaResult<T>
where
    F: Future<Output = MediaResult<T>>,
{
    let start = Instant::now();
    let result = fut.await;
    let elapsed = start.elapsed().as_secs_f64();
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage.as_str()).record(elapsed);
    debug!(stage = %stage, elapsed_secs = elapsed, ok = result.is_ok(), "Stage finished");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EngineBehavior, FakeTools};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        pipeline: RetimePipeline,
        tools: Arc<FakeTools>,
    }

    async fn fixture(tools: FakeTools) -> Fixture {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig {
            scratch_dir: dir.path().join("scratch"),
            ..PipelineConfig::default()
        };
        let tools = Arc::new(tools);
        let pipeline = RetimePipeline::with_runner(config, tools.clone());
        pipeline.prepare().await.unwrap();
        Fixture {
            _dir: dir,
            pipeline,
            tools,
        }
    }

    async fn saved_request(pipeline: &RetimePipeline, target_seconds: f64) -> RetimeRequest {
        let run_id = RunId::new();
        let input = pipeline.input_path(&run_id);
        tokio::fs::write(&input, b"uploaded video").await.unwrap();
        RetimeRequest::new(run_id, input, target_seconds)
    }

    fn arg_after<'a>(args: &'a [String], flag: &str) -> &'a str {
        let i = args.iter().position(|a| a == flag).unwrap();
        &args[i + 1]
    }

    #[tokio::test]
    async fn test_end_to_end_slow_motion() {
        // 4s, 24fps source stretched to 8s.
        let fx = fixture(FakeTools::new("24/1", "4.0")).await;
        let request = saved_request(&fx.pipeline, 8.0).await;

        let run = fx.pipeline.run(&request).await.unwrap();

        assert_eq!(run.stage, PipelineStage::Done);
        assert!(run.warnings.is_empty());
        let final_path = run.final_path.unwrap();
        assert!(final_path.exists());
        assert!(final_path
            .to_string_lossy()
            .ends_with(&format!("{}_final.mp4", request.run_id)));

        let calls = fx.tools.calls();
        let programs: Vec<&str> = calls.iter().map(|c| c.program.as_str()).collect();
        assert_eq!(programs, vec!["ffprobe", "python3", "ffprobe", "ffmpeg", "ffmpeg"]);

        // Exponent 2: 24 * 4 = 96 >= 60
        assert_eq!(arg_after(&calls[1].args, "--exp"), "2");
        let interpolated = arg_after(&calls[1].args, "--output").to_string();

        // Duration is probed on the interpolated file, not the source
        assert_eq!(calls[2].args.last().unwrap(), &interpolated);

        let retime = &calls[3].args;
        assert_eq!(arg_after(retime, "-i"), interpolated);
        assert_eq!(arg_after(retime, "-filter:v"), "setpts=2*PTS");
        assert!(retime.contains(&"-an".to_string()));

        let remux = &calls[4].args;
        let inputs: Vec<&str> = remux
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == "-i")
            .map(|(i, _)| remux[i + 1].as_str())
            .collect();
        assert_eq!(inputs[0], retime.last().unwrap().as_str());
        assert_eq!(inputs[1], request.source.to_string_lossy());
        assert!(remux.contains(&"-shortest".to_string()));
        assert_eq!(arg_after(remux, "-c:a"), "aac");
        assert_eq!(arg_after(remux, "-c:v"), "copy");
    }

    #[tokio::test]
    async fn test_tolerated_engine_failure_continues() {
        let fx = fixture(FakeTools::new("30/1", "10.0").engine(EngineBehavior::FailAfterWriting)).await;
        let request = saved_request(&fx.pipeline, 5.0).await;

        let run = fx.pipeline.run(&request).await.unwrap();

        assert_eq!(run.stage, PipelineStage::Done);
        assert_eq!(run.warnings.len(), 1);
        assert_eq!(fx.tools.calls_to("ffmpeg").len(), 2);
        assert_eq!(arg_after(&fx.tools.calls_to("ffmpeg")[0].args, "-filter:v"), "setpts=0.5*PTS");
    }

    #[tokio::test]
    async fn test_engine_failure_aborts_run() {
        let fx = fixture(FakeTools::new("24/1", "4.0").engine(EngineBehavior::FailWithoutWriting)).await;
        let request = saved_request(&fx.pipeline, 8.0).await;

        let err = fx.pipeline.run(&request).await.unwrap_err();

        assert!(err.is_tool_failure());
        assert!(fx.tools.calls_to("ffmpeg").is_empty());
    }

    #[tokio::test]
    async fn test_transcoder_failure_aborts_run() {
        let fx = fixture(FakeTools::new("24/1", "4.0").ffmpeg_fails()).await;
        let request = saved_request(&fx.pipeline, 8.0).await;

        let err = fx.pipeline.run(&request).await.unwrap_err();

        assert!(err.is_tool_failure());
        // No retry: the retime stage ran once and remux never started
        assert_eq!(fx.tools.calls_to("ffmpeg").len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_target_runs_nothing() {
        let fx = fixture(FakeTools::new("24/1", "4.0")).await;
        let request = saved_request(&fx.pipeline, 0.0).await;

        let err = fx.pipeline.run(&request).await.unwrap_err();

        assert!(matches!(err, MediaError::InvalidInput(_)));
        assert!(fx.tools.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_upload_runs_nothing() {
        let fx = fixture(FakeTools::new("24/1", "4.0")).await;
        let run_id = RunId::new();
        let request = RetimeRequest::new(run_id.clone(), fx.pipeline.input_path(&run_id), 8.0);

        let err = fx.pipeline.run(&request).await.unwrap_err();

        assert!(matches!(err, MediaError::MissingArtifact(_)));
        assert!(fx.tools.calls().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_runs_use_distinct_artifacts() {
        let fx = fixture(FakeTools::new("24/1", "4.0")).await;
        let a = saved_request(&fx.pipeline, 8.0).await;
        let b = saved_request(&fx.pipeline, 2.0).await;

        let (ra, rb) = tokio::join!(fx.pipeline.run(&a), fx.pipeline.run(&b));
        let (ra, rb) = (ra.unwrap(), rb.unwrap());

        assert_ne!(ra.final_path, rb.final_path);
        assert_eq!(fx.tools.calls().len(), 10);
    }
}
