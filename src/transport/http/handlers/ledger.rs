//! Read-only views of the ledger's plants, equipment, documents and actors.

use axum::extract::{Path, State};
use axum::Json;

use crate::domain::model::{Actor, Document, Equipment, Plant};
use crate::error::PortalResult;
use crate::transport::http::types::AppState;

#[utoipa::path(
    get,
    path = "/plants",
    responses(
        (status = 200, description = "All registered plants", body = [Plant]),
        (status = 500, description = "Ledger read failed", body = ErrorResponse)
    )
)]
pub async fn list_plants_handler(State(state): State<AppState>) -> PortalResult<Json<Vec<Plant>>> {
    Ok(Json(state.portal.plants().await?))
}

#[utoipa::path(
    get,
    path = "/plants/{id}/equipment",
    params(("id" = String, Path, description = "Plant id (base-10)")),
    responses(
        (status = 200, description = "Equipment registered at the plant", body = [Equipment]),
        (status = 400, description = "Malformed plant id", body = ErrorResponse),
        (status = 500, description = "Ledger read failed", body = ErrorResponse)
    )
)]
pub async fn plant_equipment_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> PortalResult<Json<Vec<Equipment>>> {
    Ok(Json(state.portal.plant_equipment(&id).await?))
}

#[utoipa::path(
    get,
    path = "/plants/{id}/documents",
    params(("id" = String, Path, description = "Plant id (base-10)")),
    responses(
        (status = 200, description = "Documents of every equipment at the plant", body = [Document]),
        (status = 400, description = "Malformed plant id", body = ErrorResponse),
        (status = 500, description = "Ledger read failed", body = ErrorResponse)
    )
)]
pub async fn plant_documents_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> PortalResult<Json<Vec<Document>>> {
    Ok(Json(state.portal.plant_documents(&id).await?))
}

#[utoipa::path(
    get,
    path = "/plants/{id}/actors",
    params(("id" = String, Path, description = "Plant id (base-10)")),
    responses(
        (status = 200, description = "Actors and their ledger roles", body = [Actor]),
        (status = 400, description = "Malformed plant id", body = ErrorResponse),
        (status = 500, description = "Ledger read failed", body = ErrorResponse)
    )
)]
pub async fn plant_actors_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> PortalResult<Json<Vec<Actor>>> {
    Ok(Json(state.portal.plant_actors(&id).await?))
}

#[utoipa::path(
    get,
    path = "/equipment/{id}/documents",
    params(("id" = String, Path, description = "Equipment id (base-10)")),
    responses(
        (status = 200, description = "All documents attached to the equipment", body = [Document]),
        (status = 400, description = "Malformed equipment id", body = ErrorResponse),
        (status = 500, description = "Ledger read failed", body = ErrorResponse)
    )
)]
pub async fn equipment_documents_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> PortalResult<Json<Vec<Document>>> {
    Ok(Json(state.portal.equipment_documents(&id).await?))
}
