use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::domain::upload::gateway::{
    MSG_BAD_CONTENT_TYPE, MSG_NO_FILE, MSG_PROCESSING, MSG_TOO_LARGE,
};
use crate::error::{PortalError, PortalResult};
use crate::transport::http::types::{AppState, UploadResponse};

fn malformed(e: MultipartError) -> PortalError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return PortalError::PayloadTooLarge(MSG_TOO_LARGE.to_string());
    }
    PortalError::Validation {
        message: MSG_PROCESSING.to_string(),
        details: Some(e.body_text()),
    }
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data", description = "Single `file` field, at most 10 MiB"),
    responses(
        (status = 200, description = "File stored; content identifier returned", body = UploadResponse),
        (status = 400, description = "Not multipart, or no `file` field", body = ErrorResponse),
        (status = 413, description = "File larger than 10 MiB", body = ErrorResponse),
        (status = 500, description = "Missing storage identity, space setup or upload failure", body = ErrorResponse)
    )
)]
pub async fn upload_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> PortalResult<Json<UploadResponse>> {
    let gateway = state.portal.uploads();
    gateway.check_configured()?;

    let mut multipart = multipart.map_err(|rejection| PortalError::Validation {
        message: MSG_BAD_CONTENT_TYPE.to_string(),
        details: Some(rejection.body_text()),
    })?;

    while let Some(mut field) = multipart.next_field().await.map_err(malformed)? {
        if field.name() != Some("file") {
            continue;
        }
        let mut staged = gateway.stage()?;
        while let Some(chunk) = field.chunk().await.map_err(malformed)? {
            staged.write_chunk(&chunk).await?;
        }
        let cid = gateway.store(staged).await?;
        return Ok(Json(UploadResponse { cid }));
    }

    Err(PortalError::validation(MSG_NO_FILE))
}
