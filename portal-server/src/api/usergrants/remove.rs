use crate::api::require_admin;
use crate::api::usergrants::pick_org;
use crate::errors::ApiError;
use crate::openapi::GRANTS_TAG;
use crate::session::PortalWorkspace;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Extension, Json, Query, State},
    response::{IntoResponse, Response},
};
use http::StatusCode;
use portal_core::MutationOutcome;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

/// Identifies the grant to remove. Each field may come from the JSON body or
/// the query string; the body wins.
#[derive(Debug, Serialize, Deserialize, ToSchema, IntoParams, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
#[into_params(parameter_in = Query)]
pub(crate) struct RemoveGrantRequest {
    pub user_id: Option<String>,
    pub grant_id: Option<String>,
    pub org_id: Option<String>,
}

impl RemoveGrantRequest {
    fn or(self, other: RemoveGrantRequest) -> Self {
        fn present(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }
        Self {
            user_id: present(self.user_id).or(present(other.user_id)),
            grant_id: present(self.grant_id).or(present(other.grant_id)),
            org_id: present(self.org_id).or(present(other.org_id)),
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/usergrants/remove",
    tag = GRANTS_TAG,
    request_body(content = RemoveGrantRequest, description = "Optional, the query string fills missing fields"),
    params(
        RemoveGrantRequest,
        ("Authorization" = String, Header, description = "Bearer access token of the signed-in user"),
    ),
    responses(
        (status = 200, description = "Grant removed; carries the refetched listing", body = MutationOutcome),
        (status = 400, description = "Missing userId or grantId"),
        (status = 403, description = "Caller is not an administrator of the organization"),
        (status = 404, description = "Grant does not exist")
    )
)]
pub(crate) async fn remove_grant_handler(
    State(state): State<AppState>,
    Extension(workspace): Extension<Arc<PortalWorkspace>>,
    Query(query): Query<RemoveGrantRequest>,
    body: Bytes,
) -> Response {
    let from_body = if body.iter().all(u8::is_ascii_whitespace) {
        RemoveGrantRequest::default()
    } else {
        match serde_json::from_slice::<RemoveGrantRequest>(&body) {
            Ok(request) => request,
            Err(err) => {
                return ApiError::bad_request(format!("Invalid request body: {err}")).into_response()
            }
        }
    };
    let request = from_body.or(query);

    let requested = pick_org(&[request.org_id.as_deref(), state.config.zitadel.default_org()]);
    let organization = match require_admin(&state, &workspace, requested).await {
        Ok(organization) => organization,
        Err(err) => return ApiError::from(err).into_response(),
    };

    let user_id = request.user_id.as_deref().unwrap_or_default();
    let grant_id = request.grant_id.as_deref().unwrap_or_default();
    match workspace
        .grants()
        .remove_grant(user_id.trim(), grant_id.trim(), &organization.id)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => {
            log::error!("Failed to remove grant {grant_id} of user {user_id}: {err}");
            ApiError::from(err).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::usergrants::test_support::{admin_fixture, mock_grant_search};
    use axum::body::Body;
    use http::{Method, StatusCode};
    use serde_json::json;
    use wiremock::{matchers, Mock, ResponseTemplate};

    const GRANT_PATH: &str = "/management/v1/users/u1/grants/g1";

    #[test]
    fn test_body_wins_over_query() {
        let body = RemoveGrantRequest {
            user_id: Some("u1".into()),
            grant_id: Some(" ".into()),
            org_id: None,
        };
        let query = RemoveGrantRequest {
            user_id: Some("u9".into()),
            grant_id: Some("g1".into()),
            org_id: Some("org-1".into()),
        };
        let merged = body.or(query);
        assert_eq!(merged.user_id.as_deref(), Some("u1"));
        assert_eq!(merged.grant_id.as_deref(), Some("g1"));
        assert_eq!(merged.org_id.as_deref(), Some("org-1"));
    }

    #[tokio::test]
    async fn test_remove_with_body() {
        let fixture = admin_fixture().await;
        mock_grant_search(&fixture, 1).await;
        fixture
            .add_zitadel_mock(Method::DELETE, GRANT_PATH, json!({}), StatusCode::OK, 1)
            .await;

        let response = fixture
            .delete(
                "/api/usergrants/remove",
                &json!({ "userId": "u1", "grantId": "g1", "orgId": "org-1" }),
            )
            .await;
        response.assert_ok();
        assert_eq!(response.json["grantId"], "g1");
    }

    #[tokio::test]
    async fn test_remove_with_query() {
        let fixture = admin_fixture().await;
        mock_grant_search(&fixture, 1).await;
        fixture
            .add_zitadel_mock(Method::DELETE, GRANT_PATH, json!({}), StatusCode::OK, 1)
            .await;

        let request = fixture
            .request_builder(
                Method::DELETE,
                "/api/usergrants/remove?userId=u1&grantId=g1&orgId=org-1",
            )
            .body(Body::empty())
            .expect("Failed to build request");
        fixture.send(request).await.assert_ok();
    }

    #[tokio::test]
    async fn test_remove_twice_is_not_found() {
        let fixture = admin_fixture().await;
        mock_grant_search(&fixture, 1).await;
        Mock::given(matchers::method("DELETE"))
            .and(matchers::path(GRANT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .up_to_n_times(1)
            .expect(1)
            .mount(&fixture.zitadel_mock)
            .await;
        fixture
            .add_zitadel_mock(
                Method::DELETE,
                GRANT_PATH,
                json!({ "message": "not found" }),
                StatusCode::NOT_FOUND,
                1,
            )
            .await;

        let body = json!({ "userId": "u1", "grantId": "g1" });
        fixture
            .delete("/api/usergrants/remove", &body)
            .await
            .assert_ok();
        fixture
            .delete("/api/usergrants/remove", &body)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_revoked_token_cannot_remove() {
        let fixture = admin_fixture().await;
        mock_grant_search(&fixture, 1).await;
        fixture
            .get_with_headers("/api/usergrants", &[("orgid", "org-1")])
            .await
            .assert_ok();

        // The user signs out; ZITADEL stops accepting the token
        Mock::given(matchers::method("GET"))
            .and(matchers::path("/oidc/v1/userinfo"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "invalid_token" })))
            .with_priority(1)
            .mount(&fixture.zitadel_mock)
            .await;
        fixture
            .add_zitadel_mock(Method::DELETE, GRANT_PATH, json!({}), StatusCode::OK, 0)
            .await;

        let response = fixture
            .delete("/api/usergrants/remove", &json!({ "userId": "u1", "grantId": "g1" }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json, json!({ "error": "Authentication required" }));
        assert_eq!(fixture.state.sessions.len().await, 0);
    }

    #[tokio::test]
    async fn test_remove_missing_grant_id() {
        let fixture = admin_fixture().await;
        fixture
            .delete("/api/usergrants/remove", &json!({ "userId": "u1" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
