use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::Value as JsonValue;

use crate::domain::aggregate::MSG_MISSING_EQUIPMENT_ID;
use crate::error::{PortalError, PortalResult};
use crate::transport::http::types::{AppState, GenerateHashRequest, GenerateHashResponse};

#[utoipa::path(
    post,
    path = "/hash-generation",
    request_body = GenerateHashRequest,
    responses(
        (status = 200, description = "Fingerprint of the equipment's document set", body = GenerateHashResponse),
        (status = 400, description = "Missing or malformed equipmentId", body = ErrorResponse),
        (status = 404, description = "Equipment has no documents", body = ErrorResponse),
        (status = 500, description = "Missing salt, ledger failure or no usable content identifiers", body = ErrorResponse)
    )
)]
pub async fn generate_final_hash_handler(
    State(state): State<AppState>,
    request: Result<Json<GenerateHashRequest>, JsonRejection>,
) -> PortalResult<Json<GenerateHashResponse>> {
    state.portal.aggregator().check_configured()?;

    let equipment_id = match request {
        Ok(Json(body)) => body.equipment_id,
        Err(rejection) => {
            return Err(PortalError::Validation {
                message: MSG_MISSING_EQUIPMENT_ID.to_string(),
                details: Some(rejection.body_text()),
            })
        }
    };

    let fingerprint = state
        .portal
        .generate_final_hash(equipment_id.as_ref().and_then(JsonValue::as_str))
        .await?;
    Ok(Json(GenerateHashResponse {
        final_hash: fingerprint.to_string(),
    }))
}
