//! API error types.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use retime_media::MediaError;
use retime_models::RequestError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(#[from] RequestError),

    #[error("Upload error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Pipeline error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Multipart(e) => e.status(),
            ApiError::Media(MediaError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::Media(_) | ApiError::Io(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Generic detail sent in place of server-side error text in production.
pub const GENERIC_DETAIL: &str = "An internal error occurred";

/// Response extension set on error responses whose detail is internal text.
#[derive(Debug, Clone, Copy)]
pub struct InternalDetail;

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

/// JSON error body with the given status.
pub(crate) fn detail_response(status: StatusCode, detail: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if !status.is_server_error() {
            return detail_response(status, self.to_string());
        }

        error!(status = %status, error = %self, "Request failed");
        let mut response = detail_response(status, self.to_string());
        response.extensions_mut().insert(InternalDetail);
        response
    }
}
