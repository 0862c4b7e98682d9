//! API configuration.
//!
//! Loaded once at startup from an optional YAML file overlaid by `RETIME_*`
//! environment variables, then passed into the router state by value.

use std::path::{Path, PathBuf};

use retime_media::{InterpolationEngine, PipelineConfig};
use serde::Deserialize;

/// Environment variable naming the YAML config file.
pub const CONFIG_PATH_ENV: &str = "RETIME_CONFIG";

/// Config file used when `RETIME_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "api_config.yaml";

/// API server configuration.
///
/// The aliases accept the key names of the original `api_config.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    #[serde(alias = "default_port")]
    pub port: u16,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Expose `/metrics`
    pub metrics_enabled: bool,
    /// Scratch directory for request artifacts
    #[serde(alias = "tmp_dir")]
    pub scratch_dir: PathBuf,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    /// Interpreter for the interpolation engine
    #[serde(alias = "python_path")]
    pub engine_interpreter: String,
    /// Interpolation engine entry script
    #[serde(alias = "rife_script")]
    pub engine_script: PathBuf,
    /// Working directory for the engine
    #[serde(alias = "rife_workdir")]
    pub engine_workdir: Option<PathBuf>,
    /// Frame rate the interpolation stage aims for
    #[serde(alias = "default_target_fps")]
    pub target_fps: f64,
    /// Per-invocation timeout for external tools (0 = none)
    pub tool_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_body_size: 2 * 1024 * 1024 * 1024, // 2GB
            environment: "development".to_string(),
            metrics_enabled: true,
            scratch_dir: PathBuf::from("/tmp/retime"),
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            engine_interpreter: "python3".to_string(),
            engine_script: PathBuf::from("inference_video.py"),
            engine_workdir: None,
            target_fps: 60.0,
            tool_timeout_secs: 0,
        }
    }
}

impl ApiConfig {
    /// Load from the file named by `RETIME_CONFIG` (or `api_config.yaml`) and the environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    /// Load from a specific YAML file (may be absent) and the environment.
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(
                config::File::new(&path.to_string_lossy(), config::FileFormat::Yaml).required(false),
            )
            .add_source(config::Environment::with_prefix("RETIME").try_parsing(true))
            .build()?;

        let mut cfg: ApiConfig = settings.try_deserialize()?;
        cfg.validate()?;

        // Relative paths are resolved against the current directory, since the
        // engine may run from a different one.
        cfg.scratch_dir = absolutize(cfg.scratch_dir);
        cfg.engine_script = absolutize(cfg.engine_script);
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if !(self.target_fps.is_finite() && self.target_fps > 0.0) {
            return Err(config::ConfigError::Message(format!(
                "target_fps must be positive, got {}",
                self.target_fps
            )));
        }
        Ok(())
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }

    /// Pipeline settings derived from this config.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            scratch_dir: self.scratch_dir.clone(),
            ffmpeg: self.ffmpeg_path.clone(),
            ffprobe: self.ffprobe_path.clone(),
            engine: InterpolationEngine {
                interpreter: self.engine_interpreter.clone(),
                script: self.engine_script.clone(),
                working_dir: self.engine_workdir.clone(),
            },
            target_fps: self.target_fps,
            tool_timeout_secs: self.tool_timeout_secs,
        }
    }
}

fn absolutize(path: PathBuf) -> PathBuf {
    std::path::absolute(&path).unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_original_key_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("api_config.yaml");
        std::fs::write(
            &path,
            "tmp_dir: /var/tmp/retime\n\
             rife_script: /opt/rife/inference_video.py\n\
             python_path: /opt/rife/venv/bin/python\n\
             default_target_fps: 120\n\
             default_port: 9100\n",
        )
        .unwrap();

        let cfg = ApiConfig::load_from(&path).unwrap();

        assert_eq!(cfg.port, 9100);
        assert_eq!(cfg.scratch_dir, PathBuf::from("/var/tmp/retime"));
        assert_eq!(cfg.engine_interpreter, "/opt/rife/venv/bin/python");
        assert!((cfg.target_fps - 120.0).abs() < f64::EPSILON);

        let pipeline = cfg.pipeline_config();
        assert_eq!(pipeline.engine.script, PathBuf::from("/opt/rife/inference_video.py"));
        assert_eq!(pipeline.ffmpeg, "ffmpeg");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = ApiConfig::load_from(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(cfg.port, 8000);
        assert!((cfg.target_fps - 60.0).abs() < f64::EPSILON);
        assert!(cfg.engine_script.is_absolute());
        assert!(!cfg.is_production());
    }

    #[test]
    fn test_pipeline_config_maps_every_field() {
        let cfg = ApiConfig {
            scratch_dir: PathBuf::from("/srv/scratch"),
            ffprobe_path: "/usr/local/bin/ffprobe".to_string(),
            engine_workdir: Some(PathBuf::from("/opt/rife")),
            tool_timeout_secs: 900,
            target_fps: 48.0,
            ..ApiConfig::default()
        };

        let pipeline = cfg.pipeline_config();

        assert_eq!(
            pipeline,
            PipelineConfig {
                scratch_dir: PathBuf::from("/srv/scratch"),
                ffmpeg: "ffmpeg".to_string(),
                ffprobe: "/usr/local/bin/ffprobe".to_string(),
                engine: InterpolationEngine {
                    interpreter: "python3".to_string(),
                    script: PathBuf::from("inference_video.py"),
                    working_dir: Some(PathBuf::from("/opt/rife")),
                },
                target_fps: 48.0,
                tool_timeout_secs: 900,
            }
        );
    }

    #[test]
    fn test_rejects_non_positive_fps() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "default_target_fps: 0\n").unwrap();
        assert!(ApiConfig::load_from(&path).is_err());
    }
}
