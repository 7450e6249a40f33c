pub mod add;
pub mod list;
pub mod remove;
pub mod update;

use crate::state::AppState;
use axum::http::HeaderMap;
use axum::routing::{delete, get, post, put};
use axum::Router;

/// Header the console uses to name the organization of a grant listing
pub(crate) const ORG_ID_HEADER: &str = "orgid";

/// Combines all user grant routes into a single router
pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/api/usergrants", get(list::list_grants_handler))
        .route("/api/usergrants/add", post(add::add_grant_handler))
        .route("/api/usergrants/update", put(update::update_grant_handler))
        .route("/api/usergrants/remove", delete(remove::remove_grant_handler))
}

/// First non-blank organization id among `candidates`
pub(crate) fn pick_org<'a>(candidates: &[Option<&'a str>]) -> Option<&'a str> {
    candidates
        .iter()
        .flatten()
        .map(|org| org.trim())
        .find(|org| !org.is_empty())
}

pub(crate) fn org_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(ORG_ID_HEADER).and_then(|value| value.to_str().ok())
}
