pub mod create;
pub mod invite;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;

/// User administration, behind the session check
pub(in crate::api) fn router() -> Router<AppState> {
    Router::new().route("/api/users/create", post(create::create_user_handler))
}

/// The invitation link is opened from an e-mail, before the user has a session
pub(in crate::api) fn public_router() -> Router<AppState> {
    Router::new().route("/api/users/invite", get(invite::invite_handler))
}
