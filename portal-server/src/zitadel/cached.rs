use crate::cache::{Cache, CacheBackend};
use crate::zitadel::ZitadelClient;
use async_trait::async_trait;
use log::{debug, warn};
use portal_core::{Grant, IdentityPlatform, NewGrant, Organization, PortalError};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// [`ZitadelClient`] with a read-through cache for project role keys, the
/// only platform answer that is the same for every session.
#[derive(Clone)]
pub struct CachedPlatform {
    zitadel: Arc<ZitadelClient>,
    cache: Arc<Cache>,
}

impl CachedPlatform {
    pub fn new(zitadel: Arc<ZitadelClient>, cache: Arc<Cache>) -> Self {
        Self { zitadel, cache }
    }

    pub fn zitadel(&self) -> &ZitadelClient {
        &self.zitadel
    }

    /// Drop the cached role keys so the next read goes to ZITADEL
    pub async fn invalidate_project_roles(&self, org_id: &str, project_id: &str) {
        let cache_key = project_roles_cache_key(org_id, project_id);
        if let Err(err) = self.cache.delete(&cache_key).await {
            warn!("Failed to invalidate {cache_key}: {err}");
        }
    }
}

fn project_roles_cache_key(org_id: &str, project_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(org_id.as_bytes());
    hasher.update(b"/");
    hasher.update(project_id.as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    format!("portal:project_roles:{}", &hash[..16])
}

#[async_trait]
impl IdentityPlatform for CachedPlatform {
    async fn user_info(&self, access_token: &str) -> Result<Value, PortalError> {
        self.zitadel.user_info(access_token).await
    }

    async fn project_orgs(&self, access_token: &str) -> Result<Vec<Organization>, PortalError> {
        self.zitadel.project_orgs(access_token).await
    }

    async fn search_grants(&self, org_id: &str) -> Result<Vec<Grant>, PortalError> {
        self.zitadel.search_grants(org_id).await
    }

    async fn add_grant(&self, org_id: &str, grant: &NewGrant) -> Result<String, PortalError> {
        self.zitadel.add_grant(org_id, grant).await
    }

    async fn update_grant(
        &self,
        org_id: &str,
        user_id: &str,
        grant_id: &str,
        role_keys: &[String],
    ) -> Result<(), PortalError> {
        self.zitadel
            .update_grant(org_id, user_id, grant_id, role_keys)
            .await
    }

    async fn remove_grant(
        &self,
        org_id: &str,
        user_id: &str,
        grant_id: &str,
    ) -> Result<(), PortalError> {
        self.zitadel.remove_grant(org_id, user_id, grant_id).await
    }

    async fn project_roles(
        &self,
        org_id: &str,
        project_id: &str,
    ) -> Result<Vec<String>, PortalError> {
        let cache_key = project_roles_cache_key(org_id, project_id);

        match self.cache.get::<Vec<String>>(&cache_key).await {
            Ok(Some(roles)) => {
                debug!("Cache hit for key: {cache_key}");
                return Ok(roles);
            }
            Ok(None) => debug!("Cache miss for key: {cache_key}"),
            Err(err) => warn!("Cache error for key {cache_key}: {err}"),
        }

        let roles = self.zitadel.project_roles(org_id, project_id).await?;

        // An empty answer is not cached so a newly configured project shows up
        if !roles.is_empty() {
            if let Err(err) = self.cache.set(&cache_key, &roles).await {
                warn!("Failed to cache result for {cache_key}: {err}");
            }
        }
        Ok(roles)
    }
}
