use crate::domain::model::{
    Actor, CertificationStep, Document, DocumentStatus, DocumentType, Equipment, EquipmentStatus,
    Plant,
};
use crate::domain::roles::{AccessDecision, Role, Section};
use crate::domain::upload::MAX_UPLOAD_BYTES;
use crate::transport::http::handlers::{hash, health, ledger, roles, upload};
use crate::transport::http::types::{
    AppState, ErrorResponse, GenerateHashRequest, GenerateHashResponse, HealthResponse,
    RoleResponse, UploadForm, UploadResponse,
};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck_handler,
        hash::generate_final_hash_handler,
        upload::upload_handler,
        roles::account_role_handler,
        roles::account_access_handler,
        ledger::list_plants_handler,
        ledger::plant_equipment_handler,
        ledger::plant_documents_handler,
        ledger::plant_actors_handler,
        ledger::equipment_documents_handler
    ),
    components(schemas(
        ErrorResponse,
        GenerateHashRequest,
        GenerateHashResponse,
        UploadForm,
        UploadResponse,
        HealthResponse,
        RoleResponse,
        AccessDecision,
        Role,
        Section,
        Plant,
        Equipment,
        Document,
        Actor,
        CertificationStep,
        DocumentType,
        DocumentStatus,
        EquipmentStatus
    ))
)]
pub struct ApiDoc;

/// Body limit of the upload route: the largest file plus room for multipart framing.
pub const MAX_UPLOAD_REQUEST_BYTES: usize = MAX_UPLOAD_BYTES as usize + 64 * 1024;

pub fn create_router(app_state: AppState) -> Router {
    // The file field is held to MAX_UPLOAD_BYTES while streaming; the route limit bounds
    // the whole request, other fields included.
    let uploads = post(upload::upload_handler)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_REQUEST_BYTES));

    Router::new()
        .route("/health", get(health::healthcheck_handler))
        .route("/hash-generation", post(hash::generate_final_hash_handler))
        .route("/api/generate-final-hash", post(hash::generate_final_hash_handler))
        .route("/upload", uploads.clone())
        .route("/api/upload", uploads)
        .route("/accounts/:address/role", get(roles::account_role_handler))
        .route(
            "/accounts/:address/access/:section",
            get(roles::account_access_handler),
        )
        .route("/plants", get(ledger::list_plants_handler))
        .route("/plants/:id/equipment", get(ledger::plant_equipment_handler))
        .route("/plants/:id/documents", get(ledger::plant_documents_handler))
        .route("/plants/:id/actors", get(ledger::plant_actors_handler))
        .route(
            "/equipment/:id/documents",
            get(ledger::equipment_documents_handler),
        )
        .with_state(app_state)
}
