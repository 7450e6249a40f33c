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
use portal_core::AccessView;
use std::sync::Arc;

/// Current organization, the roles held there and the console sections
/// they unlock
#[utoipa::path(
    get,
    path = "/api/access",
    tag = ACCOUNT_TAG,
    params(
        ("Authorization" = String, Header, description = "Bearer access token of the signed-in user"),
    ),
    responses(
        (status = 200, description = "Access of the signed-in user", body = AccessView),
        (status = 401, description = "Missing or rejected access token"),
        (status = 502, description = "ZITADEL returned an error")
    )
)]
pub(crate) async fn access_handler(Extension(workspace): Extension<Arc<PortalWorkspace>>) -> Response {
    match workspace.access().await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => {
            log::error!("Failed to derive access: {err}");
            ApiError::from(err).into_response()
        }
    }
}

pub(super) fn router() -> Router<AppState> {
    Router::new().route("/api/access", get(access_handler))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::TestFixture;
    use portal_core::AccessView;
    use serde_json::json;

    #[tokio::test]
    async fn test_access_follows_selection() {
        let fixture = TestFixture::new().await;
        fixture
            .sign_in(
                &[("org-1", "Acme"), ("org-2", "Globex")],
                &[("admin", "org-1"), ("reader", "org-2")],
            )
            .await;

        let view: AccessView = fixture.get("/api/access").await.assert_ok().json_as();
        assert_eq!(view.organization.map(|org| org.id), Some("org-1".to_string()));
        assert_eq!(view.roles, vec!["admin"]);
        assert!(view.sections.iter().all(|section| section.allowed));

        fixture
            .put("/api/orgs/current", &json!({ "orgId": "org-2" }))
            .await
            .assert_ok();

        let view: AccessView = fixture.get("/api/access").await.assert_ok().json_as();
        assert_eq!(view.roles, vec!["reader"]);
        let authorizations = view
            .sections
            .iter()
            .find(|section| section.name == "Authorizations")
            .unwrap();
        assert!(!authorizations.allowed);
    }

    #[tokio::test]
    async fn test_access_without_roles() {
        let fixture = TestFixture::new().await;
        fixture.sign_in(&[("org-1", "Acme")], &[]).await;

        let view: AccessView = fixture.get("/api/access").await.assert_ok().json_as();
        assert!(view.roles.is_empty());
        assert!(view.sections.iter().all(|section| !section.allowed));
    }
}
