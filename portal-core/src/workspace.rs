//! Per-session view model tying the organization selection, the role gate and
//! the grant manager together.
//!
//! Every distinct organization selection starts a new generation. Roles shown
//! by the access view are derived at most once per generation, the grant
//! manager is rescoped on each switch, and anything fetched for an older
//! generation is discarded. Gated operations re-read the claims with the
//! user's token on every call, so a revoked or expired token stops them.

use crate::claims::{Profile, RoleClaims, ScopedRoles, derive_role_map};
use crate::error::PortalError;
use crate::gate::{Requirement, SectionAccess, authorize_scoped, section_access};
use crate::grants::GrantManager;
use crate::org::{OrgSelector, Organization, Selection};
use crate::platform::IdentityPlatform;
use crate::session::Session;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// What the signed-in user may see in the current organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AccessView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    pub organization: Option<Organization>,
    pub roles: Vec<String>,
    pub sections: Vec<SectionAccess>,
}

#[derive(Debug, Clone)]
struct DerivedRoles {
    generation: u64,
    roles: ScopedRoles,
}

pub struct Workspace<P: ?Sized> {
    session: Session,
    platform: Arc<P>,
    selector: RwLock<OrgSelector>,
    roles: RwLock<Option<DerivedRoles>>,
    profile: RwLock<Option<Profile>>,
    derivation: Mutex<()>,
    grants: GrantManager<P>,
}

impl<P: IdentityPlatform + ?Sized> Workspace<P> {
    pub fn new(session: Session, platform: Arc<P>) -> Self {
        Self {
            session,
            grants: GrantManager::new(platform.clone()),
            platform,
            selector: RwLock::new(OrgSelector::new()),
            roles: RwLock::new(None),
            profile: RwLock::new(None),
            derivation: Mutex::new(()),
        }
    }

    pub fn with_fallback_roles(mut self, roles: Vec<String>) -> Self {
        self.grants = self.grants.with_fallback_roles(roles);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn grants(&self) -> &GrantManager<P> {
        &self.grants
    }

    /// Organizations of the signed-in user, fetched on first use
    pub async fn organizations(&self) -> Result<Vec<Organization>, PortalError> {
        {
            let selector = self.selector.read().await;
            if selector.is_loaded() {
                return Ok(selector.organizations().to_vec());
            }
        }
        self.reload_organizations().await
    }

    /// Refetch the organization list. The selection is kept when the current
    /// organization is still listed.
    pub async fn reload_organizations(&self) -> Result<Vec<Organization>, PortalError> {
        let token = self.active_token()?;
        let organizations = self.platform.project_orgs(token).await?;
        debug!("Loaded {} organizations", organizations.len());

        let (changed, selection) = {
            let mut selector = self.selector.write().await;
            let changed = selector.load(organizations.clone());
            (changed, selector.selection())
        };
        match (changed, selection) {
            (Some(selection), _) => self.on_selection(&selection).await,
            (None, None) => *self.roles.write().await = None,
            (None, Some(_)) => {}
        }
        Ok(organizations)
    }

    /// Make `org_id` the current organization
    pub async fn select(&self, org_id: &str) -> Result<Organization, PortalError> {
        self.organizations().await?;
        let changed = self.selector.write().await.select(org_id)?;
        match changed {
            Some(selection) => {
                info!("Switched to organization {}", selection.organization.id);
                self.on_selection(&selection).await;
                Ok(selection.organization)
            }
            None => self
                .current_org()
                .await
                .ok_or_else(|| PortalError::not_found(format!("organization {org_id}"))),
        }
    }

    /// Switch to `org_id` when given and non-empty, then return the current
    /// organization
    pub async fn use_org(&self, org_id: Option<&str>) -> Result<Option<Organization>, PortalError> {
        match org_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(org_id) => self.select(org_id).await.map(Some),
            None => {
                self.organizations().await?;
                Ok(self.current_org().await)
            }
        }
    }

    pub async fn current_org(&self) -> Option<Organization> {
        self.selector.read().await.current().cloned()
    }

    /// Roles for the current organization, derived once per selection
    pub async fn roles(&self) -> Result<Option<ScopedRoles>, PortalError> {
        let Some(selection) = self.selector.read().await.selection() else {
            return Ok(None);
        };
        if let Some(roles) = self.derived_for(&selection).await {
            return Ok(Some(roles));
        }

        let _guard = self.derivation.lock().await;
        if let Some(roles) = self.derived_for(&selection).await {
            return Ok(Some(roles));
        }
        self.derive(&selection).await
    }

    /// Read the claims again with the user's token and store the roles they
    /// grant in `selection`. Returns `None` when the selection changed while
    /// the claims were fetched.
    async fn derive(&self, selection: &Selection) -> Result<Option<ScopedRoles>, PortalError> {
        let claims = self.role_claims().await?;
        let roles = claims.scoped(&selection.organization.id);

        let selector = self.selector.read().await;
        if !selector.is_current(selection) {
            debug!(
                "Discarding roles derived for organization {}: selection changed",
                selection.organization.id
            );
            return Ok(None);
        }
        *self.roles.write().await = Some(DerivedRoles {
            generation: selection.generation,
            roles: roles.clone(),
        });
        Ok(Some(roles))
    }

    pub async fn access(&self) -> Result<AccessView, PortalError> {
        self.organizations().await?;
        let organization = self.current_org().await;
        let roles = self.roles().await?;
        let org_id = organization.as_ref().map(|org| org.id.as_str());

        Ok(AccessView {
            profile: self.profile().await?,
            sections: section_access(roles.as_ref(), org_id),
            roles: roles
                .as_ref()
                .map(|r| r.roles.as_slice().to_vec())
                .unwrap_or_default(),
            organization,
        })
    }

    /// Check `requirement` against the current organization and return it.
    ///
    /// The claims are fetched with the user's token on every call; a token
    /// the identity platform no longer accepts fails with `Unauthenticated`.
    pub async fn require(&self, requirement: &Requirement) -> Result<Organization, PortalError> {
        self.active_token()?;
        self.organizations().await?;
        let selection = self
            .selector
            .read()
            .await
            .selection()
            .ok_or(PortalError::Unauthorized)?;
        let organization = selection.organization.clone();

        let roles = {
            let _guard = self.derivation.lock().await;
            self.derive(&selection).await?
        };
        if roles.is_none() {
            debug!("Denied {requirement:?}: organization {} is no longer selected", organization.id);
            return Err(PortalError::Unauthorized);
        }

        if authorize_scoped(roles.as_ref(), Some(organization.id.as_str()), requirement) {
            Ok(organization)
        } else {
            debug!("Denied {requirement:?} in organization {}", organization.id);
            Err(PortalError::Unauthorized)
        }
    }

    /// Raw userinfo claims of the signed-in user
    pub async fn user_info(&self) -> Result<Value, PortalError> {
        let token = self.active_token()?;
        self.platform.user_info(token).await
    }

    /// Profile of the signed-in user, as of the last claims read
    pub async fn profile(&self) -> Result<Option<Profile>, PortalError> {
        if let Some(profile) = self.profile.read().await.clone() {
            return Ok(Some(profile));
        }
        let profile = Profile::from_claims(&self.user_info().await?);
        *self.profile.write().await = profile.clone();
        Ok(profile)
    }

    async fn role_claims(&self) -> Result<RoleClaims, PortalError> {
        let user_info = self.user_info().await?;
        *self.profile.write().await = Profile::from_claims(&user_info);
        match derive_role_map(&user_info) {
            Ok(claims) => Ok(claims),
            Err(PortalError::NoRolesClaim) => {
                debug!("Userinfo carries no role claim, treating as no roles");
                Ok(RoleClaims::default())
            }
            Err(err) => Err(err),
        }
    }

    async fn derived_for(&self, selection: &Selection) -> Option<ScopedRoles> {
        self.roles
            .read()
            .await
            .as_ref()
            .filter(|derived| {
                derived.generation == selection.generation
                    && derived.roles.belongs_to(&selection.organization.id)
            })
            .map(|derived| derived.roles.clone())
    }

    async fn on_selection(&self, selection: &Selection) {
        *self.roles.write().await = None;
        self.grants
            .rescope(&selection.organization.id, selection.generation)
            .await;
    }

    fn active_token(&self) -> Result<&str, PortalError> {
        if self.session.is_active() {
            Ok(self.session.access_token())
        } else {
            Err(PortalError::Unauthenticated)
        }
    }
}
