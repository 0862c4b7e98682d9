//! Application state.

use std::sync::Arc;

use retime_media::{MediaResult, RetimePipeline};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<RetimePipeline>,
}

impl AppState {
    /// Create new application state backed by real external tools.
    pub async fn new(config: ApiConfig) -> MediaResult<Self> {
        let pipeline = RetimePipeline::new(config.pipeline_config());
        Self::with_pipeline(config, pipeline).await
    }

    /// Create state around an existing pipeline.
    pub async fn with_pipeline(config: ApiConfig, pipeline: RetimePipeline) -> MediaResult<Self> {
        pipeline.prepare().await?;
        Ok(Self {
            config,
            pipeline: Arc::new(pipeline),
        })
    }
}
