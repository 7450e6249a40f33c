use crate::errors::ApiError;
use crate::openapi::ORGS_TAG;
use crate::session::PortalWorkspace;
use crate::state::AppState;
use axum::{
    extract::{Extension, Json},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use http::StatusCode;
use portal_core::Organization;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SelectOrganization {
    pub org_id: String,
}

#[utoipa::path(
    get,
    path = "/api/orgs",
    tag = ORGS_TAG,
    params(
        ("Authorization" = String, Header, description = "Bearer access token of the signed-in user"),
    ),
    responses(
        (status = 200, description = "Organizations the user is scoped to", body = [Organization]),
        (status = 401, description = "Missing or rejected access token"),
        (status = 502, description = "ZITADEL returned an error")
    )
)]
pub(crate) async fn list_orgs_handler(
    Extension(workspace): Extension<Arc<PortalWorkspace>>,
) -> Response {
    match workspace.reload_organizations().await {
        Ok(organizations) => (StatusCode::OK, Json(organizations)).into_response(),
        Err(err) => {
            log::error!("Failed to load organizations: {err}");
            ApiError::from(err).into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/orgs/current",
    tag = ORGS_TAG,
    params(
        ("Authorization" = String, Header, description = "Bearer access token of the signed-in user"),
    ),
    responses(
        (status = 200, description = "Current organization, or null before the list is loaded", body = Option<Organization>),
        (status = 401, description = "Missing access token")
    )
)]
pub(crate) async fn current_org_handler(
    Extension(workspace): Extension<Arc<PortalWorkspace>>,
) -> Response {
    (StatusCode::OK, Json(workspace.current_org().await)).into_response()
}

#[utoipa::path(
    put,
    path = "/api/orgs/current",
    tag = ORGS_TAG,
    request_body = SelectOrganization,
    params(
        ("Authorization" = String, Header, description = "Bearer access token of the signed-in user"),
    ),
    responses(
        (status = 200, description = "Organization switched", body = Organization),
        (status = 401, description = "Missing or rejected access token"),
        (status = 404, description = "Organization is not among the user's organizations")
    )
)]
pub(crate) async fn select_org_handler(
    Extension(workspace): Extension<Arc<PortalWorkspace>>,
    Json(request): Json<SelectOrganization>,
) -> Response {
    let org_id = request.org_id.trim();
    if org_id.is_empty() {
        return ApiError::bad_request("Missing orgId").into_response();
    }
    match workspace.select(org_id).await {
        Ok(organization) => (StatusCode::OK, Json(organization)).into_response(),
        Err(err) => {
            log::warn!("Failed to switch to organization {org_id}: {err}");
            ApiError::from(err).into_response()
        }
    }
}

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orgs", get(list_orgs_handler))
        .route(
            "/api/orgs/current",
            get(current_org_handler).put(select_org_handler),
        )
}
