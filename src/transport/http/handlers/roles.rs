use axum::extract::{Path, State};
use axum::Json;

use crate::domain::model::{parse_address, Address};
use crate::domain::roles::{AccessDecision, Section};
use crate::error::{PortalError, PortalResult};
use crate::transport::http::types::{AppState, RoleResponse};

fn account_param(raw: &str) -> PortalResult<Address> {
    parse_address(raw).map_err(|reason| PortalError::Validation {
        message: "Invalid account address.".to_string(),
        details: Some(reason),
    })
}

#[utoipa::path(
    get,
    path = "/accounts/{address}/role",
    params(
        ("address" = String, Path, description = "0x-prefixed account address")
    ),
    responses(
        (status = 200, description = "Resolved role and the sections it opens", body = RoleResponse),
        (status = 400, description = "Malformed address", body = ErrorResponse),
        (status = 500, description = "A role probe failed", body = ErrorResponse)
    )
)]
pub async fn account_role_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> PortalResult<Json<RoleResponse>> {
    let account = account_param(&address)?;
    let role = state.portal.account_role(account).await?;
    Ok(Json(RoleResponse {
        account: format!("{:?}", account),
        role,
        sections: role.sections(),
    }))
}

#[utoipa::path(
    get,
    path = "/accounts/{address}/access/{section}",
    params(
        ("address" = String, Path, description = "0x-prefixed account address"),
        ("section" = String, Path, description = "Portal section, e.g. `documents` or `certification-requests`")
    ),
    responses(
        (status = 200, description = "Access decision", body = AccessDecision),
        (status = 400, description = "Malformed address or unknown section", body = ErrorResponse),
        (status = 500, description = "A role probe failed", body = ErrorResponse)
    )
)]
pub async fn account_access_handler(
    State(state): State<AppState>,
    Path((address, section)): Path<(String, String)>,
) -> PortalResult<Json<AccessDecision>> {
    let account = account_param(&address)?;
    let section: Section = section.parse().map_err(|reason| PortalError::Validation {
        message: "Unknown portal section.".to_string(),
        details: Some(reason),
    })?;
    let decision = state.portal.check_access(Some(account), section).await?;
    Ok(Json(decision))
}
