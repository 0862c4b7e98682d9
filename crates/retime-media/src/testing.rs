//! In-memory stand-ins for the external tools.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::command::{CommandRunner, CommandSpec};
use crate::error::{MediaError, MediaResult};

/// How the fake interpolation engine behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineBehavior {
    Succeed,
    /// Writes the video, then fails in its audio merge step
    FailAfterWriting,
    FailWithoutWriting,
}

/// Scripted runner that answers ffprobe queries and fakes artifact creation.
pub struct FakeTools {
    pub frame_rate: String,
    pub duration: String,
    pub engine: EngineBehavior,
    pub ffmpeg_fails: bool,
    calls: Mutex<Vec<CommandSpec>>,
}

impl FakeTools {
    pub fn new(frame_rate: &str, duration: &str) -> Self {
        Self {
            frame_rate: frame_rate.to_string(),
            duration: duration.to_string(),
            engine: EngineBehavior::Succeed,
            ffmpeg_fails: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn engine(mut self, behavior: EngineBehavior) -> Self {
        self.engine = behavior;
        self
    }

    pub fn ffmpeg_fails(mut self) -> Self {
        self.ffmpeg_fails = true;
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls whose program matches, in order.
    pub fn calls_to(&self, program: &str) -> Vec<CommandSpec> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == program)
            .collect()
    }

    fn failure(cmd: &CommandSpec) -> MediaError {
        MediaError::ExternalToolFailure {
            program: cmd.program.clone(),
            args: cmd.args.clone(),
            exit_code: Some(1),
            stdout: String::new(),
            stderr: "simulated failure".to_string(),
        }
    }

    fn write_artifact(path: &str) {
        std::fs::write(PathBuf::from(path), b"fake video").unwrap();
    }
}

fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

#[async_trait]
impl CommandRunner for FakeTools {
    async fn run(&self, cmd: &CommandSpec) -> MediaResult<String> {
        self.calls.lock().unwrap().push(cmd.clone());

        if cmd.program.ends_with("ffprobe") {
            if cmd.args.iter().any(|a| a == "format=duration") {
                return Ok(format!("{}\n", self.duration));
            }
            return Ok(format!("{}\n", self.frame_rate));
        }

        if cmd.program.ends_with("ffmpeg") {
            if self.ffmpeg_fails {
                return Err(Self::failure(cmd));
            }
            if let Some(output) = cmd.args.last() {
                Self::write_artifact(output);
            }
            return Ok(String::new());
        }

        // Anything else is the interpolation engine.
        let output = value_after(&cmd.args, "--output").map(str::to_string);
        match self.engine {
            EngineBehavior::Succeed => {
                if let Some(output) = output {
                    Self::write_artifact(&output);
                }
                Ok(String::new())
            }
            EngineBehavior::FailAfterWriting => {
                if let Some(output) = output {
                    Self::write_artifact(&output);
                }
                Err(Self::failure(cmd))
            }
            EngineBehavior::FailWithoutWriting => Err(Self::failure(cmd)),
        }
    }
}
