use crate::errors::ApiError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use log::{debug, warn};

/// Resolve the caller's workspace from the bearer token and hand it to the
/// handler as a request extension
pub(super) async fn authentication_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = match request.headers().get(http::header::AUTHORIZATION) {
        Some(header) => header,
        None => {
            warn!("Missing Authorization header");
            return ApiError::unauthenticated().into_response();
        }
    };

    let access_token = match auth_header.to_str() {
        Ok(header_str) if header_str.to_lowercase().starts_with("bearer ") => {
            header_str[7..].trim().to_string()
        }
        Ok(_) => {
            warn!("Invalid Authorization header format, missing 'Bearer ' prefix");
            return ApiError::unauthenticated().into_response();
        }
        Err(e) => {
            warn!("Failed to parse Authorization header to string: {e}");
            return ApiError::unauthenticated().into_response();
        }
    };

    if access_token.is_empty() {
        warn!("Empty bearer token");
        return ApiError::unauthenticated().into_response();
    }

    let workspace = state.sessions.workspace_for(&access_token).await;
    request.extensions_mut().insert(workspace);

    let response = next.run(request).await;

    // ZITADEL rejected the token: start from a clean workspace on next sign-in
    if response.status() == StatusCode::UNAUTHORIZED {
        debug!("Dropping the workspace of a rejected session");
        state.sessions.forget(&access_token).await;
    }
    response
}

#[cfg(test)]
mod tests {
    use crate::test_utils::TestFixture;
    use axum::body::Body;
    use http::{Method, Request, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_authorization_header() {
        let fixture = TestFixture::new().await;
        let request = Request::builder()
            .method(Method::GET)
            .uri("/api/orgs")
            .body(Body::empty())
            .expect("Failed to build request");

        let response = fixture.send(request).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json, json!({ "error": "Authentication required" }));
    }

    #[tokio::test]
    async fn test_invalid_authorization_format() {
        let fixture = TestFixture::new().await;
        let request = Request::builder()
            .method(Method::GET)
            .uri("/api/orgs")
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .expect("Failed to build request");

        fixture
            .send(request)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_rejected_token_is_forgotten() {
        let fixture = TestFixture::new().await;
        fixture
            .add_zitadel_mock(
                Method::POST,
                "/auth/v1/global/projectorgs/_search",
                json!({}),
                StatusCode::UNAUTHORIZED,
                1,
            )
            .await;

        let before = fixture.state.sessions.workspace_for(TestFixture::ACCESS_TOKEN).await;
        fixture
            .get("/api/orgs")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        let after = fixture.state.sessions.workspace_for(TestFixture::ACCESS_TOKEN).await;
        assert!(!std::sync::Arc::ptr_eq(&before, &after));
    }
}
