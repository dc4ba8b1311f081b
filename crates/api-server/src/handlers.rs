//! HTTP request handlers

use axum::{
    extract::{Multipart, State},
    Json,
};
use tracing::info;

use crate::{error::ApiError, types::StatusResponse, ApiState};
use doc_extract_common::{Document, DocumentResult, ExtractError};

/// Status endpoint
pub async fn status(State(state): State<ApiState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "online".to_string(),
        engine: state.orchestrator.engine_name().to_string(),
        device_used: state.device,
    })
}

/// Extract text from an uploaded document
///
/// Expects a multipart form with one `file` part carrying the payload, its
/// declared content type and an optional filename. The pipeline is
/// CPU/accelerator bound, so it runs on the blocking pool.
pub async fn extract_text(
    State(state): State<ApiState>,
    mut multipart: Multipart,
) -> Result<Json<DocumentResult>, ApiError> {
    let document = read_file_part(&mut multipart).await?;
    info!(
        "Extraction request: filename={:?}, content_type={}, {} bytes",
        document.filename,
        document.content_type,
        document.bytes.len()
    );

    let orchestrator = state.orchestrator.clone();
    let result = tokio::task::spawn_blocking(move || orchestrator.process(document))
        .await
        .map_err(|e| ApiError::Extract(ExtractError::Engine(format!("processing task failed: {e}"))))??;

    Ok(Json(result))
}

/// Pull the `file` part out of the multipart body
async fn read_file_part(multipart: &mut Multipart) -> Result<Document, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadUpload(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadUpload("file part is missing a content type".to_string()))?;
        let filename = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadUpload(format!("failed to read upload: {e}")))?;

        return Ok(Document::new(bytes.to_vec(), content_type, filename));
    }

    Err(ApiError::BadUpload(
        "missing 'file' part in multipart body".to_string(),
    ))
}
