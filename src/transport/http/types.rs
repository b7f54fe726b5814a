use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::app::portal_service::PortalService;
use crate::domain::roles::{Role, Section};

#[derive(Clone)]
pub struct AppState {
    pub portal: Arc<PortalService>,
}

/// Error body of every failing route.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateHashRequest {
    /// Equipment id as a base-10 string. Any other JSON type is rejected.
    #[serde(default)]
    #[schema(value_type = String, example = "42")]
    pub equipment_id: Option<JsonValue>,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateHashResponse {
    #[schema(example = "0x68c30db2aff2621c22dc1a609ab33dd003ed3ef0922c2807c8aa4cc3d768632d")]
    pub final_hash: String,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct UploadResponse {
    pub cid: String,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct RoleResponse {
    pub account: String,
    pub role: Role,
    pub sections: Vec<Section>,
}

/// Multipart body of the upload route (OpenAPI only).
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}
