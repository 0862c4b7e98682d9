//! Video retime handler.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::multipart::Field;
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use retime_models::request::validate_target_seconds;
use retime_models::{RetimeRequest, RunId};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{info, warn, Instrument};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Suggested download name for the result.
pub const RESULT_FILENAME: &str = "retimed.mp4";

/// `POST /retime` with multipart fields `file` and `target_seconds`.
///
/// Responds with the retimed MP4 once the whole pipeline has finished.
pub async fn retime_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let run_id = RunId::new();
    let input_path = state.pipeline.input_path(&run_id);

    let mut upload_bytes: Option<u64> = None;
    let mut target_seconds: Option<f64> = None;

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                upload_bytes = Some(save_upload(&mut field, &input_path).await?);
            }
            "target_seconds" => {
                let text = field.text().await?;
                target_seconds = Some(parse_target_seconds(&text)?);
            }
            other => {
                warn!(field = other, "Ignoring unknown form field");
            }
        }
    }

    let target_seconds =
        target_seconds.ok_or_else(|| ApiError::bad_request("target_seconds field is required"))?;
    let upload_bytes = upload_bytes.ok_or_else(|| ApiError::bad_request("file field is required"))?;
    if upload_bytes == 0 {
        return Err(ApiError::bad_request("uploaded file is empty"));
    }

    info!(run_id = %run_id, upload_bytes, target_seconds, "Retime request accepted");

    let request = RetimeRequest::new(run_id, input_path, target_seconds);
    request.validate()?;

    // Runs on its own task so a client disconnect does not abort it.
    let pipeline = Arc::clone(&state.pipeline);
    let run = tokio::spawn(async move { pipeline.run(&request).await }.in_current_span())
        .await
        .map_err(|e| ApiError::internal(format!("pipeline task failed: {e}")))??;

    let final_path = run
        .final_path
        .ok_or_else(|| ApiError::internal("pipeline finished without an output file"))?;

    video_response(&final_path).await
}

/// Parse the `target_seconds` form value.
pub fn parse_target_seconds(text: &str) -> ApiResult<f64> {
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("target_seconds is not a number: {text:?}")))?;
    Ok(validate_target_seconds(value)?)
}

/// Stream an upload field to disk; returns the byte count.
async fn save_upload(field: &mut Field<'_>, path: &Path) -> ApiResult<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;

    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(written)
}

async fn video_response(path: &Path) -> ApiResult<Response> {
    let file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", RESULT_FILENAME),
        )
        .header(header::CONTENT_LENGTH, len)
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| ApiError::internal(e.to_string()))
}
