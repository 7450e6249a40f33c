use crate::errors::ApiError;
use crate::openapi::ACCOUNT_TAG;
use crate::session::PortalWorkspace;
use crate::state::AppState;
use axum::{
    extract::{Extension, Json},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use http::StatusCode;
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/api/userinfo",
    tag = ACCOUNT_TAG,
    params(
        ("Authorization" = String, Header, description = "Bearer access token of the signed-in user"),
    ),
    responses(
        (status = 200, description = "Userinfo claims as returned by ZITADEL", body = Object),
        (status = 401, description = "Missing or rejected access token")
    )
)]
pub(crate) async fn userinfo_handler(
    Extension(workspace): Extension<Arc<PortalWorkspace>>,
) -> Response {
    match workspace.user_info().await {
        Ok(claims) => (StatusCode::OK, Json(claims)).into_response(),
        Err(err) => {
            log::error!("Failed to load userinfo: {err}");
            ApiError::from(err).into_response()
        }
    }
}

pub(super) fn router() -> Router<AppState> {
    Router::new().route("/api/userinfo", get(userinfo_handler))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::TestFixture;
    use http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_userinfo_passthrough() {
        let fixture = TestFixture::new().await;
        fixture.sign_in(&[("org-1", "Acme")], &[("admin", "org-1")]).await;

        let response = fixture.get("/api/userinfo").await;
        response.assert_ok();
        assert_eq!(response.json["sub"], "user-1");
        assert_eq!(response.json["email"], "ada@acme.example.com");
    }

    #[tokio::test]
    async fn test_expired_token() {
        let fixture = TestFixture::new().await;
        fixture
            .add_zitadel_mock(
                Method::GET,
                "/oidc/v1/userinfo",
                json!({ "error": "invalid_token" }),
                StatusCode::UNAUTHORIZED,
                1,
            )
            .await;

        let response = fixture.get("/api/userinfo").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json, json!({ "error": "Authentication required" }));
    }
}
