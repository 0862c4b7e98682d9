//! Axum HTTP API server.
//!
//! This crate provides:
//! - `POST /retime` multipart upload that runs the retime pipeline
//! - Liveness and readiness probes
//! - Prometheus metrics
//! - Config loading from YAML plus environment

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
