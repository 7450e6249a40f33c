use crate::api::require_admin;
use crate::api::usergrants::pick_org;
use crate::errors::ApiError;
use crate::openapi::GRANTS_TAG;
use crate::session::PortalWorkspace;
use crate::state::AppState;
use axum::{
    extract::{Extension, Json, State},
    response::{IntoResponse, Response},
};
use http::StatusCode;
use portal_core::MutationOutcome;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct UpdateGrantRequest {
    pub user_id: String,
    pub grant_id: String,
    /// Replaces every role key of the grant
    #[serde(alias = "roleKeys")]
    pub roles: Vec<String>,
    pub org_id: Option<String>,
}

#[utoipa::path(
    put,
    path = "/api/usergrants/update",
    tag = GRANTS_TAG,
    request_body = UpdateGrantRequest,
    params(
        ("Authorization" = String, Header, description = "Bearer access token of the signed-in user"),
    ),
    responses(
        (status = 200, description = "Grant updated; carries the refetched listing", body = MutationOutcome),
        (status = 400, description = "Missing field or no roles"),
        (status = 403, description = "Caller is not an administrator of the organization"),
        (status = 404, description = "Grant does not exist")
    )
)]
pub(crate) async fn update_grant_handler(
    State(state): State<AppState>,
    Extension(workspace): Extension<Arc<PortalWorkspace>>,
    Json(request): Json<UpdateGrantRequest>,
) -> Response {
    let requested = pick_org(&[request.org_id.as_deref(), state.config.zitadel.default_org()]);
    let organization = match require_admin(&state, &workspace, requested).await {
        Ok(organization) => organization,
        Err(err) => return ApiError::from(err).into_response(),
    };

    let result = workspace
        .grants()
        .update_grant(
            request.user_id.trim(),
            request.grant_id.trim(),
            &request.roles,
            &organization.id,
        )
        .await;

    match result {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => {
            log::error!("Failed to update grant {}: {err}", request.grant_id);
            ApiError::from(err).into_response()
        }
    }
}
