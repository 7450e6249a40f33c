use crate::zitadel::cached::CachedPlatform;
use log::debug;
use moka::future::Cache as MokaCache;
use portal_core::{Session, Workspace};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

pub type PortalWorkspace = Workspace<CachedPlatform>;

/// Per-session workspaces keyed by a digest of the access token.
///
/// A workspace holds the organization selection, derived roles and grant
/// list of one browser session. Idle sessions are evicted after the
/// configured timeout.
#[derive(Clone)]
pub struct SessionRegistry {
    workspaces: MokaCache<String, Arc<PortalWorkspace>>,
    platform: Arc<CachedPlatform>,
    fallback_roles: Vec<String>,
}

impl SessionRegistry {
    pub fn new(
        platform: Arc<CachedPlatform>,
        idle_timeout: Duration,
        max_sessions: u64,
        fallback_roles: Vec<String>,
    ) -> Self {
        let workspaces = MokaCache::builder()
            .time_to_idle(idle_timeout)
            .max_capacity(max_sessions)
            .build();
        Self {
            workspaces,
            platform,
            fallback_roles,
        }
    }

    /// Workspace of the session owning `access_token`, created on first use
    pub async fn workspace_for(&self, access_token: &str) -> Arc<PortalWorkspace> {
        let key = session_key(access_token);
        self.workspaces
            .get_with(key, async {
                debug!("Starting a new portal session");
                Arc::new(
                    Workspace::new(Session::new(access_token), self.platform.clone())
                        .with_fallback_roles(self.fallback_roles.clone()),
                )
            })
            .await
    }

    /// Drop the workspace of a session whose token ZITADEL rejected
    pub async fn forget(&self, access_token: &str) {
        self.workspaces.invalidate(&session_key(access_token)).await;
    }

    #[cfg(test)]
    pub async fn len(&self) -> u64 {
        self.workspaces.run_pending_tasks().await;
        self.workspaces.entry_count()
    }
}

fn session_key(access_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(access_token.as_bytes());
    format!("{:x}", hasher.finalize())
}
