mod authn_middleware;
pub(crate) mod access;
pub(crate) mod health;
pub(crate) mod orgs;
pub(crate) mod orgusers;
pub(crate) mod projectroles;
pub(crate) mod sessions;
pub(crate) mod usergrants;
pub(crate) mod userinfo;
pub(crate) mod users;

use crate::api::authn_middleware::authentication_middleware;
use crate::session::PortalWorkspace;
use crate::state::AppState;
use axum::{middleware, Router};
use portal_core::{Organization, PortalError, Requirement};

/// Combines all API routes into a single router
pub(super) fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(users::public_router())
        .merge(protected_routes(state))
}

/// Routes that act on behalf of a signed-in user
fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(orgs::router())
        .merge(access::router())
        .merge(userinfo::router())
        .merge(sessions::router())
        .merge(orgusers::router())
        .merge(projectroles::router())
        .merge(usergrants::router())
        .merge(users::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            authentication_middleware,
        ))
}

/// Switch to the requested organization (or keep the current one) and check
/// the caller holds the administration role there.
///
/// An organization the caller is not scoped to is reported as a denial.
pub(crate) async fn require_admin(
    state: &AppState,
    workspace: &PortalWorkspace,
    org_id: Option<&str>,
) -> Result<Organization, PortalError> {
    match workspace.use_org(org_id).await {
        Ok(_) => {}
        Err(PortalError::NotFound(what)) => {
            log::warn!("Denying access to {what}: not among the caller's organizations");
            return Err(PortalError::Unauthorized);
        }
        Err(err) => return Err(err),
    }
    workspace
        .require(&Requirement::role(state.config.roles.admin_role.as_str()))
        .await
}
