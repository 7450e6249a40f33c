use crate::api::require_admin;
use crate::errors::ApiError;
use crate::openapi::USERS_TAG;
use crate::session::PortalWorkspace;
use crate::state::AppState;
use axum::{
    extract::{Extension, Json, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use http::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams, Default)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub(crate) struct OrgUsersQuery {
    /// Organization to list, defaults to the configured organization and then
    /// the current selection
    pub org_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/orgusers",
    tag = USERS_TAG,
    params(
        OrgUsersQuery,
        ("Authorization" = String, Header, description = "Bearer access token of the signed-in user"),
    ),
    responses(
        (status = 200, description = "Users of the organization", body = [Object]),
        (status = 401, description = "Missing or rejected access token"),
        (status = 403, description = "Caller is not an administrator of the organization"),
        (status = 502, description = "ZITADEL returned an error")
    )
)]
pub(crate) async fn org_users_handler(
    State(state): State<AppState>,
    Extension(workspace): Extension<Arc<PortalWorkspace>>,
    Query(query): Query<OrgUsersQuery>,
) -> Response {
    let requested = query
        .org_id
        .as_deref()
        .filter(|org| !org.trim().is_empty())
        .or(state.config.zitadel.default_org());

    let organization = match require_admin(&state, &workspace, requested).await {
        Ok(organization) => organization,
        Err(err) => return ApiError::from(err).into_response(),
    };

    match state.zitadel.org_users(&organization.id).await {
        Ok(users) => (StatusCode::OK, Json(users)).into_response(),
        Err(err) => {
            log::error!("Failed to list users of organization {}: {err}", organization.id);
            ApiError::from(err).into_response()
        }
    }
}

pub(super) fn router() -> Router<AppState> {
    Router::new().route("/api/orgusers", get(org_users_handler))
}
