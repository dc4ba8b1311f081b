//! HTTP error mapping
//!
//! Translates the extraction error taxonomy into response codes with short
//! human-readable messages. Causes are logged here, once, before the
//! response leaves the handler.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{error, warn};

use crate::types::ErrorResponse;
use doc_extract_common::ExtractError;

/// Errors a request handler can produce
#[derive(Debug, Error)]
pub enum ApiError {
    /// Pipeline failure, already categorized
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// The multipart upload itself was malformed
    #[error("Invalid upload: {0}")]
    BadUpload(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            ApiError::BadUpload(cause) => {
                warn!("Rejected upload: {cause}");
                (StatusCode::BAD_REQUEST, "bad_request", cause.clone())
            }
            ApiError::Extract(err) => match err {
                ExtractError::RejectedType(content_type) => {
                    warn!("Rejected content type: {content_type}");
                    (
                        StatusCode::BAD_REQUEST,
                        "rejected_type",
                        format!(
                            "Content type '{content_type}' is not allowed. Accepted: PDF, PNG, JPG, DOC, DOCX"
                        ),
                    )
                }
                ExtractError::UnsupportedFormat(content_type) => {
                    warn!("Unsupported format requested: {content_type}");
                    (
                        StatusCode::NOT_IMPLEMENTED,
                        "not_implemented",
                        "DOC/DOCX is not supported yet - only PDF and images".to_string(),
                    )
                }
                ExtractError::Decode(cause) => {
                    error!("Decode failure: {cause}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "decode_failure",
                        err.to_string(),
                    )
                }
                ExtractError::Engine(cause) => {
                    error!("Engine failure: {cause}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "engine_failure",
                        err.to_string(),
                    )
                }
            },
        };

        let body = Json(ErrorResponse {
            error: kind.to_string(),
            message,
        });

        (status, body).into_response()
    }
}
