use crate::errors::ApiError;
use crate::headers::{presets, ClientCacheControl};
use crate::openapi::GRANTS_TAG;
use crate::session::PortalWorkspace;
use crate::state::AppState;
use axum::{
    extract::{Extension, Json, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use http::StatusCode;
use portal_core::ProjectRoles;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams, Default)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub(crate) struct ProjectRolesQuery {
    pub project_id: Option<String>,
    /// Organization owning the project, defaults to the current selection
    pub org_id: Option<String>,
}

/// Role keys of a project. When ZITADEL cannot list them the configured
/// fallback roles are returned with `fallback: true` and must not be cached.
#[utoipa::path(
    get,
    path = "/api/projectroles",
    tag = GRANTS_TAG,
    params(
        ProjectRolesQuery,
        ("Authorization" = String, Header, description = "Bearer access token of the signed-in user"),
        ("Cache-Control" = Option<String>, Header, description = "no-cache forces a fresh read from ZITADEL"),
    ),
    responses(
        (status = 200, description = "Role keys of the project", body = ProjectRoles),
        (status = 400, description = "Missing projectId"),
        (status = 401, description = "Missing or rejected access token")
    )
)]
pub(crate) async fn project_roles_handler(
    State(state): State<AppState>,
    Extension(workspace): Extension<Arc<PortalWorkspace>>,
    headers: HeaderMap,
    Query(query): Query<ProjectRolesQuery>,
) -> Response {
    let project_id = query.project_id.as_deref().unwrap_or_default().trim();
    if project_id.is_empty() {
        return ApiError::bad_request("Missing projectId").into_response();
    }

    let org_id = match query.org_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        Some(org_id) => org_id.to_string(),
        None => match workspace.use_org(None).await {
            Ok(Some(organization)) => organization.id,
            Ok(None) => match state.config.zitadel.default_org() {
                Some(org_id) => org_id.to_string(),
                None => return ApiError::bad_request("Missing orgId").into_response(),
            },
            Err(err) => return ApiError::from(err).into_response(),
        },
    };

    let cache_control = ClientCacheControl::from_headers(&headers);
    if !cache_control.should_use_cache() {
        state
            .platform
            .invalidate_project_roles(&org_id, project_id)
            .await;
    }

    match workspace
        .grants()
        .list_project_roles(project_id, &org_id)
        .await
    {
        Ok(roles) => {
            let cache_headers = if roles.fallback || cache_control.no_store {
                presets::no_cache()
            } else {
                presets::private_cache(state.config.cache.ttl)
            };
            let mut response = (StatusCode::OK, Json(roles)).into_response();
            cache_headers.apply(&mut response);
            response
        }
        Err(err) => ApiError::from(err).into_response(),
    }
}

pub(super) fn router() -> Router<AppState> {
    Router::new().route("/api/projectroles", get(project_roles_handler))
}
