use crate::error::PortalError;
use crate::grants::{Grant, NewGrant};
use crate::org::Organization;
use crate::platform::IdentityPlatform;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::{Notify, watch};

/// In-memory identity platform for tests and local development.
///
/// Grants live in a plain list, failures can be injected for the next call of
/// a kind, and single calls can be held open to exercise interleavings.
#[derive(Debug, Default)]
pub struct MockPlatform {
    store: Mutex<Store>,
    calls: AtomicUsize,
    searches: AtomicUsize,
    user_infos: AtomicUsize,
    search_hold: Hold,
    user_info_hold: Hold,
}

#[derive(Debug, Default)]
struct Store {
    organizations: Vec<Organization>,
    user_info: HashMap<String, Value>,
    grants: Vec<Grant>,
    project_roles: HashMap<String, Vec<String>>,
    next_grant: u64,
    search_failure: Option<PortalError>,
    mutation_failure: Option<PortalError>,
    user_info_failure: Option<PortalError>,
}

/// Keeps one call waiting until released
pub struct HoldGate {
    release: watch::Sender<bool>,
}

impl HoldGate {
    pub fn release(&self) {
        let _ = self.release.send(true);
    }
}

#[derive(Debug, Default)]
struct Hold {
    armed: Mutex<Option<watch::Receiver<bool>>>,
    reached: Notify,
}

impl Hold {
    fn arm(&self) -> HoldGate {
        let (release, receiver) = watch::channel(false);
        *lock(&self.armed) = Some(receiver);
        HoldGate { release }
    }

    async fn pass(&self) {
        let armed = lock(&self.armed).take();
        if let Some(mut receiver) = armed {
            self.reached.notify_one();
            let _ = receiver.wait_for(|released| *released).await;
        }
    }

    async fn reached(&self) {
        self.reached.notified().await;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant fixture with the given ids and roles
    pub fn grant(
        user_id: &str,
        project_id: &str,
        grant_id: &str,
        org_id: &str,
        roles: &[&str],
    ) -> Grant {
        Grant {
            user_id: user_id.to_string(),
            grant_id: grant_id.to_string(),
            project_id: project_id.to_string(),
            project_grant_id: None,
            organization_id: org_id.to_string(),
            role_keys: roles.iter().map(|r| r.to_string()).collect(),
            display_name: None,
            email: None,
            user_name: None,
            org_name: None,
            project_name: None,
        }
    }

    pub fn seed_organizations(&self, organizations: Vec<Organization>) {
        lock(&self.store).organizations = organizations;
    }

    /// Claims returned by `user_info` for `access_token`
    pub fn seed_user_info(&self, access_token: &str, claims: Value) {
        lock(&self.store)
            .user_info
            .insert(access_token.to_string(), claims);
    }

    pub fn seed_grant(&self, grant: Grant) {
        lock(&self.store).grants.push(grant);
    }

    pub fn seed_project_roles(&self, project_id: &str, roles: &[&str]) {
        lock(&self.store).project_roles.insert(
            project_id.to_string(),
            roles.iter().map(|r| r.to_string()).collect(),
        );
    }

    pub fn fail_next_search(&self, error: PortalError) {
        lock(&self.store).search_failure = Some(error);
    }

    pub fn fail_next_mutation(&self, error: PortalError) {
        lock(&self.store).mutation_failure = Some(error);
    }

    pub fn fail_next_user_info(&self, error: PortalError) {
        lock(&self.store).user_info_failure = Some(error);
    }

    /// Hold the next grant search open until the gate is released
    pub fn hold_searches(&self) -> HoldGate {
        self.search_hold.arm()
    }

    pub async fn wait_for_held_search(&self) {
        self.search_hold.reached().await
    }

    /// Hold the next userinfo call open until the gate is released
    pub fn hold_user_info(&self) -> HoldGate {
        self.user_info_hold.arm()
    }

    pub async fn wait_for_held_user_info(&self) {
        self.user_info_hold.reached().await
    }

    /// Total number of calls of any kind
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn user_info_count(&self) -> usize {
        self.user_infos.load(Ordering::SeqCst)
    }

    pub fn grants(&self) -> Vec<Grant> {
        lock(&self.store).grants.clone()
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn take_mutation_failure(&self) -> Result<(), PortalError> {
        match lock(&self.store).mutation_failure.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl IdentityPlatform for MockPlatform {
    async fn user_info(&self, access_token: &str) -> Result<Value, PortalError> {
        self.record();
        self.user_infos.fetch_add(1, Ordering::SeqCst);
        self.user_info_hold.pass().await;

        let mut store = lock(&self.store);
        if let Some(error) = store.user_info_failure.take() {
            return Err(error);
        }
        store
            .user_info
            .get(access_token)
            .cloned()
            .ok_or(PortalError::Unauthenticated)
    }

    async fn project_orgs(&self, access_token: &str) -> Result<Vec<Organization>, PortalError> {
        self.record();
        if access_token.is_empty() {
            return Err(PortalError::Unauthenticated);
        }
        Ok(lock(&self.store).organizations.clone())
    }

    async fn search_grants(&self, org_id: &str) -> Result<Vec<Grant>, PortalError> {
        self.record();
        self.searches.fetch_add(1, Ordering::SeqCst);
        // Snapshot before holding so a held search answers with the state it saw
        let snapshot = {
            let mut store = lock(&self.store);
            if let Some(error) = store.search_failure.take() {
                return Err(error);
            }
            store
                .grants
                .iter()
                .filter(|grant| grant.organization_id == org_id)
                .cloned()
                .collect()
        };
        self.search_hold.pass().await;
        Ok(snapshot)
    }

    async fn add_grant(&self, org_id: &str, grant: &NewGrant) -> Result<String, PortalError> {
        self.record();
        self.take_mutation_failure()?;

        let mut store = lock(&self.store);
        let exists = store.grants.iter().any(|g| {
            g.organization_id == org_id
                && g.user_id == grant.user_id
                && g.project_id == grant.project_id
        });
        if exists {
            return Err(PortalError::DuplicateGrant {
                user_id: grant.user_id.clone(),
                project_id: grant.project_id.clone(),
            });
        }

        store.next_grant += 1;
        let grant_id = format!("grant-{}", store.next_grant);
        let mut created = Self::grant(&grant.user_id, &grant.project_id, &grant_id, org_id, &[]);
        created.project_grant_id = grant.project_grant_id.clone();
        created.role_keys = grant.role_keys.clone();
        store.grants.push(created);
        Ok(grant_id)
    }

    async fn update_grant(
        &self,
        org_id: &str,
        user_id: &str,
        grant_id: &str,
        role_keys: &[String],
    ) -> Result<(), PortalError> {
        self.record();
        self.take_mutation_failure()?;

        let mut store = lock(&self.store);
        let grant = store
            .grants
            .iter_mut()
            .find(|g| g.organization_id == org_id && g.user_id == user_id && g.grant_id == grant_id)
            .ok_or_else(|| PortalError::not_found(format!("grant {grant_id}")))?;
        grant.role_keys = role_keys.to_vec();
        Ok(())
    }

    async fn remove_grant(
        &self,
        org_id: &str,
        user_id: &str,
        grant_id: &str,
    ) -> Result<(), PortalError> {
        self.record();
        self.take_mutation_failure()?;

        let mut store = lock(&self.store);
        let before = store.grants.len();
        store.grants.retain(|g| {
            !(g.organization_id == org_id && g.user_id == user_id && g.grant_id == grant_id)
        });
        if store.grants.len() == before {
            return Err(PortalError::not_found(format!("grant {grant_id}")));
        }
        Ok(())
    }

    async fn project_roles(
        &self,
        _org_id: &str,
        project_id: &str,
    ) -> Result<Vec<String>, PortalError> {
        self.record();
        lock(&self.store)
            .project_roles
            .get(project_id)
            .cloned()
            .ok_or_else(|| PortalError::not_found(format!("project {project_id}")))
    }
}
