use crate::transport::http::types::{AppState, HealthResponse};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy (ledger node reachable)", body = HealthResponse),
        (status = 503, description = "Service is unhealthy (ledger node unreachable)", body = HealthResponse)
    )
)]
pub async fn healthcheck_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.portal.ledger_height().await {
        Ok(height) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
                block_number: Some(height),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!("ledger health probe failed: {:#}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy".to_string(),
                    block_number: None,
                    error: Some(format!("Ledger ping failed: {}", e)),
                }),
            )
        }
    }
}
