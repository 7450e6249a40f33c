use crate::api::{
    access, health, orgs, orgusers, projectroles, sessions, usergrants, userinfo, users,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

pub(crate) const HEALTH_TAG: &str = "Health API";
pub(crate) const ORGS_TAG: &str = "Organizations API";
pub(crate) const ACCOUNT_TAG: &str = "Account API";
pub(crate) const GRANTS_TAG: &str = "User Grants API";
pub(crate) const USERS_TAG: &str = "Users API";

struct BearerToken;

impl Modify for BearerToken {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    tags(
        (name = HEALTH_TAG, description = "Health check endpoints"),
        (name = ORGS_TAG, description = "Organizations of the signed-in user and the current selection"),
        (name = ACCOUNT_TAG, description = "Profile, sessions and the access view of the signed-in user"),
        (name = GRANTS_TAG, description = "Project role grants within the selected organization"),
        (name = USERS_TAG, description = "User administration and invitations"),
    ),
    paths(
        health::health_check,
        health::ready_check,
        orgs::list_orgs_handler,
        orgs::current_org_handler,
        orgs::select_org_handler,
        access::access_handler,
        userinfo::userinfo_handler,
        sessions::sessions_handler,
        orgusers::org_users_handler,
        projectroles::project_roles_handler,
        usergrants::list::list_grants_handler,
        usergrants::add::add_grant_handler,
        usergrants::update::update_grant_handler,
        usergrants::remove::remove_grant_handler,
        users::create::create_user_handler,
        users::invite::invite_handler,
    ),
    modifiers(&BearerToken),
    info(
        title = "ZITADEL Portal API",
        description = "Organization, role and grant management on top of ZITADEL",
        version = "0.1.0"
    )
)]
pub(crate) struct ApiDoc;
