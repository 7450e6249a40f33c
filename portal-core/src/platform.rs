use crate::error::PortalError;
use crate::grants::{Grant, NewGrant};
use crate::org::Organization;
use async_trait::async_trait;
use serde_json::Value;

/// Calls the portal makes against the identity platform.
///
/// Methods taking an `access_token` run with the end user's credential and
/// only read the user's own data. The others are administrative and run with
/// the implementation's service-account credential, which never leaves it.
#[async_trait]
pub trait IdentityPlatform: Send + Sync {
    /// Decoded userinfo claims of the token's owner
    async fn user_info(&self, access_token: &str) -> Result<Value, PortalError>;

    /// Organizations the token's owner is scoped to
    async fn project_orgs(&self, access_token: &str) -> Result<Vec<Organization>, PortalError>;

    /// All user grants of `org_id`
    async fn search_grants(&self, org_id: &str) -> Result<Vec<Grant>, PortalError>;

    /// Create a grant and return its id
    async fn add_grant(&self, org_id: &str, grant: &NewGrant) -> Result<String, PortalError>;

    /// Replace the role keys of a grant
    async fn update_grant(
        &self,
        org_id: &str,
        user_id: &str,
        grant_id: &str,
        role_keys: &[String],
    ) -> Result<(), PortalError>;

    async fn remove_grant(
        &self,
        org_id: &str,
        user_id: &str,
        grant_id: &str,
    ) -> Result<(), PortalError>;

    /// Role keys defined on a project
    async fn project_roles(&self, org_id: &str, project_id: &str)
    -> Result<Vec<String>, PortalError>;
}
