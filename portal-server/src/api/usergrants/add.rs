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
pub(crate) struct AddGrantRequest {
    pub user_id: String,
    pub project_id: String,
    /// Set when the project was granted to the organization by another one
    pub project_grant_id: Option<String>,
    #[serde(alias = "roleKeys")]
    pub roles: Vec<String>,
    /// Defaults to the configured organization, then the current selection
    pub org_id: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/usergrants/add",
    tag = GRANTS_TAG,
    request_body = AddGrantRequest,
    params(
        ("Authorization" = String, Header, description = "Bearer access token of the signed-in user"),
    ),
    responses(
        (status = 200, description = "Grant created; carries the refetched listing", body = MutationOutcome),
        (status = 400, description = "Missing field or no roles"),
        (status = 403, description = "Caller is not an administrator of the organization"),
        (status = 409, description = "The user already holds a grant on the project")
    )
)]
pub(crate) async fn add_grant_handler(
    State(state): State<AppState>,
    Extension(workspace): Extension<Arc<PortalWorkspace>>,
    Json(request): Json<AddGrantRequest>,
) -> Response {
    let requested = pick_org(&[request.org_id.as_deref(), state.config.zitadel.default_org()]);
    let organization = match require_admin(&state, &workspace, requested).await {
        Ok(organization) => organization,
        Err(err) => return ApiError::from(err).into_response(),
    };

    let result = workspace
        .grants()
        .add_grant(
            request.user_id.trim(),
            request.project_id.trim(),
            request.project_grant_id.as_deref().map(str::trim),
            &request.roles,
            &organization.id,
        )
        .await;

    match result {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => {
            log::error!(
                "Failed to grant project {} to user {}: {err}",
                request.project_id,
                request.user_id
            );
            ApiError::from(err).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::api::usergrants::test_support::{admin_fixture, mock_grant_search};
    use http::{Method, StatusCode};
    use portal_core::MutationOutcome;
    use serde_json::json;

    #[tokio::test]
    async fn test_add_grant_refetches() {
        let fixture = admin_fixture().await;
        mock_grant_search(&fixture, 2).await;
        fixture
            .add_zitadel_mock(
                Method::POST,
                "/management/v1/users/u3/grants",
                json!({ "userGrantId": "g3" }),
                StatusCode::OK,
                1,
            )
            .await;

        // Loads the list so the duplicate check has something to look at
        fixture.get("/api/usergrants").await.assert_ok();

        let response = fixture
            .post(
                "/api/usergrants/add",
                &json!({
                    "userId": "u3",
                    "projectId": "project-1",
                    "projectGrantId": "pg-1",
                    "roles": ["reader"],
                    "orgId": "org-1"
                }),
            )
            .await;
        response.assert_ok();
        let outcome: MutationOutcome = response.json_as();
        assert_eq!(outcome.grant_id.as_deref(), Some("g3"));
        assert_eq!(outcome.listing.total_result, 1);
    }

    #[tokio::test]
    async fn test_duplicate_is_rejected_locally() {
        let fixture = admin_fixture().await;
        mock_grant_search(&fixture, 1).await;
        fixture
            .add_zitadel_mock(
                Method::POST,
                "/management/v1/users/u1/grants",
                json!({}),
                StatusCode::OK,
                0,
            )
            .await;

        fixture.get("/api/usergrants").await.assert_ok();

        fixture
            .post(
                "/api/usergrants/add",
                &json!({
                    "userId": "u1",
                    "projectId": "project-1",
                    "roleKeys": ["admin"],
                    "orgId": "org-1"
                }),
            )
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_empty_roles_never_reach_zitadel() {
        let fixture = admin_fixture().await;
        fixture
            .add_zitadel_mock(
                Method::POST,
                "/management/v1/users/u3/grants",
                json!({}),
                StatusCode::OK,
                0,
            )
            .await;

        let response = fixture
            .post(
                "/api/usergrants/add",
                &json!({ "userId": "u3", "projectId": "project-1", "roles": [] }),
            )
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json,
            json!({ "error": "Validation error: At least one role is required" })
        );
    }

    #[tokio::test]
    async fn test_missing_user() {
        let fixture = admin_fixture().await;
        let response = fixture
            .post(
                "/api/usergrants/add",
                &json!({ "projectId": "project-1", "roles": ["reader"] }),
            )
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json,
            json!({ "error": "Validation error: Missing userId" })
        );
    }
}
