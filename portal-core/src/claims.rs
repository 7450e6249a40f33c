//! Role claims carried by ZITADEL userinfo and ID token responses.
//!
//! The roles claim is a nested map `role -> organization id -> value`. Only an
//! explicit JSON `true` grants the role for that organization; anything else,
//! including a missing role or organization key, is treated as not granted.

use crate::error::PortalError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Claim key under which ZITADEL publishes project roles
pub const ROLES_CLAIM: &str = "urn:zitadel:iam:org:project:roles";

/// Role claim map: role name -> organization id -> granted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(transparent)]
pub struct RoleClaims(BTreeMap<String, BTreeMap<String, bool>>);

impl RoleClaims {
    pub fn new(map: BTreeMap<String, BTreeMap<String, bool>>) -> Self {
        Self(map)
    }

    /// True iff `role` is explicitly granted for `org_id`
    pub fn holds(&self, role: &str, org_id: &str) -> bool {
        self.0
            .get(role)
            .and_then(|orgs| orgs.get(org_id))
            .copied()
            .unwrap_or(false)
    }

    /// True if at least one role is granted for `org_id`
    pub fn holds_any(&self, org_id: &str) -> bool {
        self.0
            .values()
            .any(|orgs| orgs.get(org_id).copied().unwrap_or(false))
    }

    /// Roles granted for `org_id`, sorted and without duplicates
    pub fn roles_for(&self, org_id: &str) -> NormalizedRoles {
        NormalizedRoles(
            self.0
                .iter()
                .filter(|(_, orgs)| orgs.get(org_id).copied().unwrap_or(false))
                .map(|(role, _)| role.clone())
                .collect(),
        )
    }

    /// Derive the roles for `org_id` and tag them with that organization
    pub fn scoped(&self, org_id: &str) -> ScopedRoles {
        ScopedRoles {
            org_id: org_id.to_string(),
            roles: self.roles_for(org_id),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Ordered, duplicate-free role names held for one organization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(transparent)]
pub struct NormalizedRoles(Vec<String>);

impl NormalizedRoles {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut roles: Vec<String> = names.into_iter().map(Into::into).collect();
        roles.sort();
        roles.dedup();
        Self(roles)
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.iter().any(|r| r == role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Roles derived for a specific organization.
///
/// The `org_id` tag records which organization the roles were derived for, so
/// a gate evaluated after an organization switch can detect that the roles
/// are stale instead of silently trusting them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ScopedRoles {
    pub org_id: String,
    pub roles: NormalizedRoles,
}

impl ScopedRoles {
    pub fn belongs_to(&self, org_id: &str) -> bool {
        self.org_id == org_id
    }
}

/// Extract the role claim map from a decoded claims object
pub fn derive_role_map(claims: &Value) -> Result<RoleClaims, PortalError> {
    let roles = claims
        .get(ROLES_CLAIM)
        .and_then(Value::as_object)
        .ok_or(PortalError::NoRolesClaim)?;

    let mut map = BTreeMap::new();
    for (role, orgs) in roles {
        let orgs = orgs.as_object().ok_or(PortalError::NoRolesClaim)?;
        let granted = orgs
            .iter()
            .map(|(org_id, value)| (org_id.clone(), value.as_bool() == Some(true)))
            .collect();
        map.insert(role.clone(), granted);
    }

    Ok(RoleClaims(map))
}

/// Profile fields of the signed-in user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Profile {
    /// Build a profile from standard OIDC claims. Returns `None` without a `sub`.
    pub fn from_claims(claims: &Value) -> Option<Self> {
        let text = |key: &str| claims.get(key).and_then(Value::as_str).map(str::to_string);
        Some(Self {
            id: text("sub")?,
            name: text("name"),
            first_name: text("given_name"),
            last_name: text("family_name"),
            email: text("email"),
            login_name: text("preferred_username"),
            image: text("picture"),
        })
    }
}
