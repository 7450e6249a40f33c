use crate::errors::ApiError;
use crate::openapi::USERS_TAG;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use http::{header::LOCATION, StatusCode};
use serde::Deserialize;
use url::Url;
use utoipa::IntoParams;

/// Parameters of the link in the invitation e-mail
#[derive(Debug, Deserialize, IntoParams, Default)]
#[serde(default)]
#[into_params(parameter_in = Query)]
pub(crate) struct InviteQuery {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub code: String,
    #[serde(rename = "orgID")]
    pub org_id: String,
}

impl InviteQuery {
    fn is_complete(&self) -> bool {
        [&self.user_id, &self.code, &self.org_id]
            .iter()
            .all(|value| !value.trim().is_empty())
    }
}

/// ZITADEL console URL with the login name pre-filled
fn console_url(public_base: &str, login_hint: &str) -> Result<Url, url::ParseError> {
    Url::parse_with_params(
        &format!("{public_base}/ui/console/users/me"),
        &[("login_hint", login_hint)],
    )
}

/// Verify the invitation code and send the new user to the ZITADEL console.
///
/// A code ZITADEL reports as invalid was most likely used by an earlier
/// click on the same link, so the redirect still happens.
#[utoipa::path(
    get,
    path = "/api/users/invite",
    tag = USERS_TAG,
    params(InviteQuery),
    responses(
        (status = 302, description = "Redirect to the ZITADEL console with login_hint"),
        (status = 400, description = "Missing parameter, expired code or user without a login name"),
        (status = 404, description = "User does not exist")
    )
)]
pub(crate) async fn invite_handler(
    State(state): State<AppState>,
    Query(query): Query<InviteQuery>,
) -> Response {
    if !query.is_complete() {
        return ApiError::bad_request("Missing required parameters: userID, code, or orgID")
            .into_response();
    }
    let user_id = query.user_id.trim();

    if let Err(err) = state
        .zitadel
        .verify_invite_code(user_id, query.code.trim())
        .await
    {
        log::warn!("Invitation of user {user_id} could not be verified: {err}");
        return ApiError::from(err).into_response();
    }

    let login_hint = match state.zitadel.login_hint(user_id).await {
        Ok(login_hint) => login_hint,
        Err(err) => {
            log::error!("Failed to look up user {user_id}: {err}");
            return ApiError::from(err).into_response();
        }
    };

    match console_url(state.config.zitadel.public_base(), &login_hint) {
        Ok(url) => {
            log::info!("Invitation of user {user_id} accepted, redirecting to the console");
            (StatusCode::FOUND, [(LOCATION, url.to_string())]).into_response()
        }
        Err(err) => {
            log::error!("Invalid public ZITADEL URL: {err}");
            ApiError::new("Invalid public ZITADEL URL", StatusCode::INTERNAL_SERVER_ERROR)
                .into_response()
        }
    }
}
