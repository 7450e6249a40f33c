use log::LevelFilter;
use portal_core::{
    MockPlatform, Organization, PortalError, ROLES_CLAIM, Requirement, Session, Workspace,
};
use serde_json::json;
use std::sync::Arc;

fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

/// Platform with two organizations where the user is admin of the first and
/// reader of the second
fn platform() -> Arc<MockPlatform> {
    init_logging();
    let platform = Arc::new(MockPlatform::new());
    platform.seed_organizations(vec![
        Organization::new("org-1", "Acme"),
        Organization::new("org-2", "Globex"),
    ]);
    platform.seed_user_info(
        "token",
        json!({
            "sub": "u-admin",
            ROLES_CLAIM: {
                "admin": { "org-1": true },
                "reader": { "org-2": true }
            }
        }),
    );
    platform.seed_project_roles("p1", &["admin", "reader"]);
    platform.seed_grant(MockPlatform::grant("u1", "p1", "g1", "org-1", &["reader"]));
    platform.seed_grant(MockPlatform::grant("u2", "p1", "g2", "org-2", &["admin"]));
    platform
}

fn workspace(platform: &Arc<MockPlatform>) -> Arc<Workspace<MockPlatform>> {
    Arc::new(Workspace::new(Session::new("token"), platform.clone()))
}

fn roles(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

#[tokio::test]
async fn test_admin_grant_lifecycle() {
    let platform = platform();
    let workspace = workspace(&platform);

    let org = workspace.require(&Requirement::role("admin")).await.unwrap();
    let grants = workspace.grants();

    let listing = grants.list_grants(&org.id).await;
    assert_eq!(listing.total_result, 1);

    let added = grants
        .add_grant("u3", "p1", Some("pg1"), &roles(&["reader"]), &org.id)
        .await
        .unwrap();
    let grant_id = added.grant_id.unwrap();
    assert_eq!(added.listing.total_result, 2);

    let updated = grants
        .update_grant("u3", &grant_id, &roles(&["admin", "reader"]), &org.id)
        .await
        .unwrap();
    let grant = updated
        .listing
        .result
        .iter()
        .find(|g| g.grant_id == grant_id)
        .unwrap();
    assert_eq!(grant.role_keys, roles(&["admin", "reader"]));

    let removed = grants.remove_grant("u3", &grant_id, &org.id).await.unwrap();
    assert!(removed.listing.result.iter().all(|g| g.grant_id != grant_id));

    let again = grants.remove_grant("u3", &grant_id, &org.id).await;
    assert!(matches!(again, Err(PortalError::NotFound(_))));
}

#[tokio::test]
async fn test_empty_roles_rejected_without_network() {
    let platform = platform();
    let workspace = workspace(&platform);
    let calls = platform.call_count();

    let result = workspace
        .grants()
        .add_grant("u1", "p1", Some("pg1"), &[], "org-1")
        .await;
    assert!(matches!(result, Err(PortalError::Validation(_))));
    assert_eq!(platform.call_count(), calls);
}

#[tokio::test]
async fn test_duplicate_grant_rejected() {
    let platform = platform();
    let workspace = workspace(&platform);
    let org = workspace.require(&Requirement::role("admin")).await.unwrap();
    workspace.grants().ensure_loaded(&org.id).await;

    let result = workspace
        .grants()
        .add_grant("u1", "p1", Some("pg1"), &roles(&["admin"]), &org.id)
        .await;
    assert!(matches!(result, Err(PortalError::DuplicateGrant { .. })));
    assert_eq!(platform.grants().len(), 2);
}

#[tokio::test]
async fn test_switching_org_rederives_roles() {
    let platform = platform();
    let workspace = workspace(&platform);
    let admin = Requirement::role("admin");

    assert!(workspace.require(&admin).await.is_ok());
    workspace.select("org-2").await.unwrap();
    assert_eq!(workspace.require(&admin).await, Err(PortalError::Unauthorized));

    let access = workspace.access().await.unwrap();
    assert_eq!(access.roles, roles(&["reader"]));
    assert_eq!(platform.user_info_count(), 2);
}

#[tokio::test]
async fn test_roles_for_previous_selection_are_discarded() {
    let platform = platform();
    let workspace = workspace(&platform);
    workspace.organizations().await.unwrap();

    let gate = platform.hold_user_info();
    let slow = {
        let workspace = workspace.clone();
        tokio::spawn(async move { workspace.roles().await })
    };
    platform.wait_for_held_user_info().await;

    // The switch completes while the derivation for org-1 is still in flight
    workspace.select("org-2").await.unwrap();
    gate.release();

    let stale = slow.await.unwrap().unwrap();
    assert!(stale.is_none(), "roles for org-1 must not be reported");

    let current = workspace.roles().await.unwrap().unwrap();
    assert!(current.belongs_to("org-2"));
    assert!(!current.roles.contains("admin"));
}

#[tokio::test]
async fn test_grant_list_follows_selection() {
    let platform = platform();
    let workspace = workspace(&platform);
    let org = workspace.use_org(None).await.unwrap().unwrap();
    workspace.grants().list_grants(&org.id).await;
    assert_eq!(workspace.grants().snapshot().await.result[0].grant_id, "g1");

    workspace.select("org-2").await.unwrap();
    assert!(workspace.grants().snapshot().await.result.is_empty());

    let listing = workspace.grants().list_grants("org-2").await;
    assert_eq!(listing.result[0].grant_id, "g2");
}

#[tokio::test]
async fn test_project_roles_with_fallback() {
    let platform = platform();
    let workspace = workspace(&platform);

    let known = workspace
        .grants()
        .list_project_roles("p1", "org-1")
        .await
        .unwrap();
    assert!(!known.fallback);

    let unknown = workspace
        .grants()
        .list_project_roles("p-missing", "org-1")
        .await
        .unwrap();
    assert!(unknown.fallback);
    assert_eq!(unknown.roles, roles(&["admin", "reader"]));
}
