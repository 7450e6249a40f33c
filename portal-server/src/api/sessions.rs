use crate::errors::ApiError;
use crate::openapi::ACCOUNT_TAG;
use crate::session::PortalWorkspace;
use crate::state::AppState;
use axum::{
    extract::{Extension, Json, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use http::StatusCode;
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/api/sessions",
    tag = ACCOUNT_TAG,
    params(
        ("Authorization" = String, Header, description = "Bearer access token of the signed-in user"),
    ),
    responses(
        (status = 200, description = "Sessions of the signed-in user", body = [Object]),
        (status = 401, description = "Missing or rejected access token"),
        (status = 502, description = "ZITADEL returned an error")
    )
)]
pub(crate) async fn sessions_handler(
    State(state): State<AppState>,
    Extension(workspace): Extension<Arc<PortalWorkspace>>,
) -> Response {
    let session = workspace.session();
    if !session.is_active() {
        return ApiError::unauthenticated().into_response();
    }
    match state.zitadel.my_sessions(session.access_token()).await {
        Ok(sessions) => (StatusCode::OK, Json(sessions)).into_response(),
        Err(err) => {
            log::error!("Failed to load sessions: {err}");
            ApiError::from(err).into_response()
        }
    }
}

pub(super) fn router() -> Router<AppState> {
    Router::new().route("/api/sessions", get(sessions_handler))
}
