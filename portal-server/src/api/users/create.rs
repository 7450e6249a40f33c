use crate::api::require_admin;
use crate::errors::ApiError;
use crate::openapi::USERS_TAG;
use crate::session::PortalWorkspace;
use crate::state::AppState;
use crate::zitadel::{models::NewUser, CreatedUser};
use axum::{
    extract::{Extension, Json, State},
    response::{IntoResponse, Response},
};
use http::StatusCode;
use portal_core::PortalError;
use std::sync::Arc;

fn validate(user: &NewUser) -> Result<(), PortalError> {
    let fields = [
        ("username", &user.username),
        ("givenName", &user.given_name),
        ("familyName", &user.family_name),
        ("email", &user.email),
        ("orgId", &user.org_id),
    ];
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        return Err(PortalError::validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }
    if !user.email.contains('@') {
        return Err(PortalError::validation("Invalid email address"));
    }
    Ok(())
}

/// Create a human user in an organization and mail them an invitation code
#[utoipa::path(
    post,
    path = "/api/users/create",
    tag = USERS_TAG,
    request_body = NewUser,
    params(
        ("Authorization" = String, Header, description = "Bearer access token of the signed-in user"),
    ),
    responses(
        (status = 200, description = "User created; invitationSent reports whether the e-mail went out", body = CreatedUser),
        (status = 400, description = "Missing or invalid field"),
        (status = 403, description = "Caller is not an administrator of the organization"),
        (status = 502, description = "ZITADEL rejected the user")
    )
)]
pub(crate) async fn create_user_handler(
    State(state): State<AppState>,
    Extension(workspace): Extension<Arc<PortalWorkspace>>,
    Json(user): Json<NewUser>,
) -> Response {
    if let Err(err) = validate(&user) {
        return ApiError::from(err).into_response();
    }
    if let Err(err) = require_admin(&state, &workspace, Some(user.org_id.as_str())).await {
        return ApiError::from(err).into_response();
    }

    match state.zitadel.create_user(&user).await {
        Ok(created) => {
            log::info!(
                "Created user {} in organization {}",
                created.user_id,
                user.org_id.trim()
            );
            (StatusCode::OK, Json(created)).into_response()
        }
        Err(err) => {
            log::error!("Failed to create user {}: {err}", user.username.trim());
            ApiError::from(err).into_response()
        }
    }
}
