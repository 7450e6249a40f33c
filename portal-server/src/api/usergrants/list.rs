use crate::api::require_admin;
use crate::api::usergrants::{org_header, pick_org};
use crate::errors::ApiError;
use crate::openapi::GRANTS_TAG;
use crate::session::PortalWorkspace;
use crate::state::AppState;
use axum::{
    extract::{Extension, Json, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use portal_core::GrantListing;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams, Default)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub(crate) struct ListGrantsQuery {
    /// Used when the `orgid` header is absent
    pub org_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/usergrants",
    tag = GRANTS_TAG,
    params(
        ListGrantsQuery,
        ("Authorization" = String, Header, description = "Bearer access token of the signed-in user"),
        ("orgid" = Option<String>, Header, description = "Organization whose grants to list"),
    ),
    responses(
        (status = 200, description = "User grants of the organization", body = GrantListing),
        (status = 401, description = "Missing or rejected access token"),
        (status = 403, description = "Caller is not an administrator of the organization"),
        (status = 502, description = "ZITADEL failed; the body carries an empty result and the error", body = GrantListing)
    )
)]
pub(crate) async fn list_grants_handler(
    State(state): State<AppState>,
    Extension(workspace): Extension<Arc<PortalWorkspace>>,
    headers: HeaderMap,
    Query(query): Query<ListGrantsQuery>,
) -> Response {
    let requested = pick_org(&[org_header(&headers), query.org_id.as_deref()]);
    let organization = match require_admin(&state, &workspace, requested).await {
        Ok(organization) => organization,
        Err(err) => return ApiError::from(err).into_response(),
    };

    let listing = workspace.grants().list_grants(&organization.id).await;
    if let Some(error) = listing.error {
        // The console expects the listing shape even on failure
        return (StatusCode::BAD_GATEWAY, Json(GrantListing::failed(error))).into_response();
    }
    (StatusCode::OK, Json(listing)).into_response()
}
