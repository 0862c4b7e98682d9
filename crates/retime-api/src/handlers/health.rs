//! Health check handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use retime_media::check_tool;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub ffmpeg: CheckStatus,
    pub ffprobe: CheckStatus,
    pub engine_interpreter: CheckStatus,
    pub engine_script: CheckStatus,
    pub scratch_dir: CheckStatus,
}

impl ReadinessChecks {
    fn all_ok(&self) -> bool {
        [
            &self.ffmpeg,
            &self.ffprobe,
            &self.engine_interpreter,
            &self.engine_script,
            &self.scratch_dir,
        ]
        .iter()
        .all(|c| c.status == "ok")
    }
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CheckStatus {
    fn ok(detail: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            detail: Some(detail.into()),
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            detail: Some(msg.into()),
        }
    }

    fn tool(program: &str) -> Self {
        match check_tool(program) {
            Ok(path) => Self::ok(path.display().to_string()),
            Err(e) => Self::error(e.to_string()),
        }
    }

    fn path(path: &std::path::Path, want_dir: bool) -> Self {
        let found = if want_dir { path.is_dir() } else { path.is_file() };
        if found {
            Self::ok(path.display().to_string())
        } else {
            Self::error(format!("{} not found", path.display()))
        }
    }
}

/// Readiness check endpoint (readiness probe).
/// Checks that every external tool and the scratch directory are in place.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let config = state.pipeline.config();

    let checks = ReadinessChecks {
        ffmpeg: CheckStatus::tool(&config.ffmpeg),
        ffprobe: CheckStatus::tool(&config.ffprobe),
        engine_interpreter: CheckStatus::tool(&config.engine.interpreter),
        engine_script: CheckStatus::path(&config.engine.script, false),
        scratch_dir: CheckStatus::path(state.pipeline.scratch().root(), true),
    };

    let all_ok = checks.all_ok();
    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks,
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
