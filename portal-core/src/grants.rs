//! User grant management scoped to one organization at a time.
//!
//! The manager keeps the last fetched grant list of its scope. Every
//! successful mutation is followed by a refetch before the mutation is
//! reported as complete, and responses that arrive after the scope moved on
//! (organization switch) or after a newer fetch was committed are dropped.

use crate::error::PortalError;
use crate::platform::IdentityPlatform;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Roles offered when the identity platform cannot list a project's roles
pub const DEFAULT_PROJECT_ROLES: &[&str] = &["admin", "reader"];

/// A user's authorization on a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    pub user_id: String,
    pub grant_id: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_grant_id: Option<String>,
    pub organization_id: String,
    #[serde(default)]
    pub role_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
}

impl Grant {
    fn binds(&self, user_id: &str, project_id: &str) -> bool {
        self.user_id == user_id && self.project_id == project_id
    }
}

/// Payload for creating a grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGrant {
    pub user_id: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_grant_id: Option<String>,
    pub role_keys: Vec<String>,
}

/// Grant list as shown to the console.
///
/// An empty `result` with no `error` means the organization has no grants;
/// an `error` means the list could not be fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct GrantListing {
    pub result: Vec<Grant>,
    pub total_result: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GrantListing {
    pub fn ok(grants: Vec<Grant>) -> Self {
        Self {
            total_result: grants.len(),
            result: grants,
            error: None,
        }
    }

    pub fn failed<S: Into<String>>(error: S) -> Self {
        Self {
            result: Vec::new(),
            total_result: 0,
            error: Some(error.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Result of a successful mutation, carrying the list refetched after it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_id: Option<String>,
    #[serde(flatten)]
    pub listing: GrantListing,
}

/// Role keys available on a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ProjectRoles {
    pub roles: Vec<String>,
    /// Set when the roles are the built-in defaults because the lookup failed
    pub fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Scope {
    org_id: String,
    generation: u64,
}

#[derive(Debug, Default)]
struct GrantState {
    scope: Option<Scope>,
    grants: Vec<Grant>,
    loaded: bool,
    /// Set when the committed list is known to be outdated
    stale: bool,
    issued: u64,
    committed: u64,
}

/// Ticket handed out when a fetch starts. `scope` is the scope the
/// requested organization had at that moment, if it was the current one.
struct FetchTicket {
    org_id: String,
    scope: Option<Scope>,
    seq: u64,
}

pub struct GrantManager<P: ?Sized> {
    platform: Arc<P>,
    fallback_roles: Vec<String>,
    state: RwLock<GrantState>,
    mutations: Mutex<()>,
}

impl<P: IdentityPlatform + ?Sized> GrantManager<P> {
    pub fn new(platform: Arc<P>) -> Self {
        Self {
            platform,
            fallback_roles: DEFAULT_PROJECT_ROLES.iter().map(|r| r.to_string()).collect(),
            state: RwLock::new(GrantState::default()),
            mutations: Mutex::new(()),
        }
    }

    pub fn with_fallback_roles(mut self, roles: Vec<String>) -> Self {
        self.fallback_roles = roles;
        self
    }

    /// Point the manager at a new organization selection, discarding the list
    /// held for the previous one
    pub async fn rescope(&self, org_id: &str, generation: u64) {
        let scope = Scope {
            org_id: org_id.to_string(),
            generation,
        };
        let mut state = self.state.write().await;
        if state.scope.as_ref() == Some(&scope) {
            return;
        }
        debug!("Rescoping grant list to organization {org_id} (generation {generation})");
        state.scope = Some(scope);
        state.grants.clear();
        state.loaded = false;
        state.stale = false;
        state.committed = state.issued;
    }

    /// Fetch the grants of `org_id`. Failures are reported inside the listing
    /// and leave the previously committed list untouched.
    pub async fn list_grants(&self, org_id: &str) -> GrantListing {
        match self.fetch(org_id).await {
            Ok(grants) => GrantListing::ok(grants),
            Err(err) => {
                warn!("Failed to list grants for organization {org_id}: {err}");
                GrantListing::failed(err.to_string())
            }
        }
    }

    /// Fetch only if no list is committed for `org_id` yet
    pub async fn ensure_loaded(&self, org_id: &str) -> GrantListing {
        {
            let state = self.state.read().await;
            if state.loaded && !state.stale && Self::scoped_to(&state, org_id) {
                return GrantListing::ok(state.grants.clone());
            }
        }
        self.list_grants(org_id).await
    }

    /// The committed list, as last fetched
    pub async fn snapshot(&self) -> GrantListing {
        let state = self.state.read().await;
        GrantListing::ok(state.grants.clone())
    }

    pub async fn is_stale(&self) -> bool {
        self.state.read().await.stale
    }

    pub async fn add_grant(
        &self,
        user_id: &str,
        project_id: &str,
        project_grant_id: Option<&str>,
        role_keys: &[String],
        org_id: &str,
    ) -> Result<MutationOutcome, PortalError> {
        require("userId", user_id)?;
        require("projectId", project_id)?;
        require("orgId", org_id)?;
        require_roles(role_keys)?;

        let _guard = self.mutations.lock().await;

        if self.holds_grant(org_id, user_id, project_id).await {
            info!("Rejecting duplicate grant for user {user_id} on project {project_id}");
            return Err(PortalError::DuplicateGrant {
                user_id: user_id.to_string(),
                project_id: project_id.to_string(),
            });
        }

        let grant = NewGrant {
            user_id: user_id.to_string(),
            project_id: project_id.to_string(),
            project_grant_id: project_grant_id
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            role_keys: role_keys.to_vec(),
        };
        let grant_id = self.platform.add_grant(org_id, &grant).await?;
        info!("Created grant {grant_id} for user {user_id} on project {project_id}");

        let listing = self.refetch(org_id).await;
        Ok(MutationOutcome {
            grant_id: Some(grant_id),
            listing,
        })
    }

    /// Replace the role keys of an existing grant
    pub async fn update_grant(
        &self,
        user_id: &str,
        grant_id: &str,
        role_keys: &[String],
        org_id: &str,
    ) -> Result<MutationOutcome, PortalError> {
        require("userId", user_id)?;
        require("grantId", grant_id)?;
        require("orgId", org_id)?;
        require_roles(role_keys)?;

        let _guard = self.mutations.lock().await;
        self.platform
            .update_grant(org_id, user_id, grant_id, role_keys)
            .await?;
        info!("Updated grant {grant_id} of user {user_id} with roles {role_keys:?}");

        let listing = self.refetch(org_id).await;
        Ok(MutationOutcome {
            grant_id: Some(grant_id.to_string()),
            listing,
        })
    }

    pub async fn remove_grant(
        &self,
        user_id: &str,
        grant_id: &str,
        org_id: &str,
    ) -> Result<MutationOutcome, PortalError> {
        require("userId", user_id)?;
        require("grantId", grant_id)?;
        require("orgId", org_id)?;

        let _guard = self.mutations.lock().await;
        self.platform.remove_grant(org_id, user_id, grant_id).await?;
        info!("Removed grant {grant_id} of user {user_id}");

        let listing = self.refetch(org_id).await;
        Ok(MutationOutcome {
            grant_id: Some(grant_id.to_string()),
            listing,
        })
    }

    /// Role keys defined on a project, or the fallback set when the lookup
    /// fails
    pub async fn list_project_roles(
        &self,
        project_id: &str,
        org_id: &str,
    ) -> Result<ProjectRoles, PortalError> {
        require("projectId", project_id)?;

        match self.platform.project_roles(org_id, project_id).await {
            Ok(roles) => Ok(ProjectRoles {
                roles,
                fallback: false,
            }),
            Err(err) => {
                warn!(
                    "Failed to load roles of project {project_id}, using defaults {:?}: {err}",
                    self.fallback_roles
                );
                Ok(ProjectRoles {
                    roles: self.fallback_roles.clone(),
                    fallback: true,
                })
            }
        }
    }

    async fn refetch(&self, org_id: &str) -> GrantListing {
        {
            let mut state = self.state.write().await;
            if Self::scoped_to(&state, org_id) {
                state.stale = true;
            }
        }
        self.list_grants(org_id).await
    }

    async fn fetch(&self, org_id: &str) -> Result<Vec<Grant>, PortalError> {
        let ticket = self.issue(org_id).await;
        let grants = self.platform.search_grants(org_id).await?;
        self.commit(ticket, &grants).await;
        Ok(grants)
    }

    async fn issue(&self, org_id: &str) -> FetchTicket {
        let mut state = self.state.write().await;
        if state.scope.is_none() {
            state.scope = Some(Scope {
                org_id: org_id.to_string(),
                generation: 0,
            });
        }
        state.issued += 1;
        FetchTicket {
            org_id: org_id.to_string(),
            scope: state.scope.clone().filter(|scope| scope.org_id == org_id),
            seq: state.issued,
        }
    }

    async fn commit(&self, ticket: FetchTicket, grants: &[Grant]) {
        let mut state = self.state.write().await;
        let org_id = &ticket.org_id;
        if ticket.scope.is_none() || state.scope != ticket.scope {
            debug!("Dropping grant list of organization {org_id}: not the current scope");
            return;
        }
        if ticket.seq <= state.committed {
            debug!("Dropping grant list of organization {org_id}: a newer list is committed");
            return;
        }
        state.grants = grants.to_vec();
        state.loaded = true;
        state.stale = false;
        state.committed = ticket.seq;
    }

    async fn holds_grant(&self, org_id: &str, user_id: &str, project_id: &str) -> bool {
        let state = self.state.read().await;
        state.loaded
            && Self::scoped_to(&state, org_id)
            && state.grants.iter().any(|g| g.binds(user_id, project_id))
    }

    fn scoped_to(state: &GrantState, org_id: &str) -> bool {
        state.scope.as_ref().is_some_and(|s| s.org_id == org_id)
    }
}

fn require(field: &str, value: &str) -> Result<(), PortalError> {
    if value.trim().is_empty() {
        return Err(PortalError::validation(format!("Missing {field}")));
    }
    Ok(())
}

fn require_roles(role_keys: &[String]) -> Result<(), PortalError> {
    if role_keys.iter().all(|role| role.trim().is_empty()) {
        return Err(PortalError::validation("At least one role is required"));
    }
    Ok(())
}
