//! External command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::error::{MediaError, MediaResult};

/// A program plus its ordered argument list.
///
/// Argument order is part of each tool's CLI grammar and is preserved exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory for the child, if it must differ from ours
    pub current_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append a path argument.
    pub fn path_arg(self, path: impl AsRef<Path>) -> Self {
        self.arg(path_to_arg(path))
    }

    pub fn current_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.current_dir = dir;
        self
    }

    /// Shell-like rendering for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub(crate) fn path_to_arg(path: impl AsRef<Path>) -> String {
    path.as_ref().to_string_lossy().to_string()
}

/// Builder for FFmpeg transcoder invocations.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input files, in `-i` order
    inputs: Vec<PathBuf>,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after the inputs)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
}

impl FfmpegCommand {
    /// Create a new single-input FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            inputs: vec![input.as_ref().to_path_buf()],
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
        }
    }

    /// Add another input after the existing ones.
    pub fn input(mut self, input: impl AsRef<Path>) -> Self {
        self.inputs.push(input.as_ref().to_path_buf());
        self
    }

    /// Add an output argument.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Set the video filter chain (`-filter:v`).
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter:v").output_arg(filter)
    }

    /// Drop every audio stream.
    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Stop at the end of the shortest input stream.
    pub fn shortest(self) -> Self {
        self.output_arg("-shortest")
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        for input in &self.inputs {
            args.push("-i".to_string());
            args.push(path_to_arg(input));
        }

        args.extend(self.output_args.iter().cloned());
        args.push(path_to_arg(&self.output));

        args
    }

    /// Render into a runnable spec for the given ffmpeg binary.
    pub fn into_spec(self, program: impl Into<String>) -> CommandSpec {
        let args = self.build_args();
        CommandSpec::new(program).args(args)
    }
}

/// Executes external commands and returns their standard output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion. Non-zero exit is an `ExternalToolFailure`.
    async fn run(&self, cmd: &CommandSpec) -> MediaResult<String>;
}

/// Runner backed by real child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl ProcessRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self { timeout_secs: None }
    }

    /// Set timeout. Zero disables it.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = (secs > 0).then_some(secs);
        self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, cmd: &CommandSpec) -> MediaResult<String> {
        info!(program = %cmd.program, "RUNNING: {}", cmd.display());

        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &cmd.current_dir {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MediaError::ToolNotFound(cmd.program.clone())
            } else {
                MediaError::from(e)
            }
        })?;

        // Both pipes are drained concurrently until exit.
        let output = match self.timeout_secs {
            Some(secs) => {
                match tokio::time::timeout(Duration::from_secs(secs), child.wait_with_output()).await {
                    Ok(result) => result?,
                    Err(_) => {
                        // Dropping the wait future kills the child.
                        warn!(program = %cmd.program, "Timed out after {} seconds, killing process", secs);
                        return Err(MediaError::Timeout {
                            program: cmd.program.clone(),
                            secs,
                        });
                    }
                }
            }
            None => child.wait_with_output().await?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();

        if output.status.success() {
            debug!(program = %cmd.program, "Command finished");
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        error!(program = %cmd.program, "STDOUT: {}", stdout);
        error!(program = %cmd.program, "STDERR: {}", stderr);

        Err(MediaError::ExternalToolFailure {
            program: cmd.program.clone(),
            args: cmd.args.clone(),
            exit_code: output.status.code(),
            stdout,
            stderr,
        })
    }
}

/// Check that a program can be resolved.
pub fn check_tool(program: &str) -> MediaResult<PathBuf> {
    which::which(program).map_err(|_| MediaError::ToolNotFound(program.to_string()))
}
