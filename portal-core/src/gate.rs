//! Role gate: pure, synchronous decisions over already fetched claims.
//!
//! Nothing here performs I/O. Callers must re-derive the claims whenever the
//! selected organization changes; [`authorize_scoped`] refuses roles that were
//! derived for a different organization.

use crate::claims::{NormalizedRoles, RoleClaims, ScopedRoles};
use crate::session::Session;
use serde::{Deserialize, Serialize};

/// Capability attached to a guarded region
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Any role granted for the active organization
    AnyRole,
    /// One specific role
    Role(String),
    /// At least one of the listed roles
    OneOf(Vec<String>),
}

impl Requirement {
    pub fn role<S: Into<String>>(role: S) -> Self {
        Self::Role(role.into())
    }

    /// Evaluate against roles already scoped to the active organization
    pub fn is_met_by(&self, roles: &NormalizedRoles) -> bool {
        match self {
            Self::AnyRole => !roles.is_empty(),
            Self::Role(role) => roles.contains(role),
            Self::OneOf(candidates) => candidates.iter().any(|role| roles.contains(role)),
        }
    }
}

/// Decide whether the claims grant `required_role` (or any role when `None`
/// or empty) for `current_org`.
///
/// Denies when there are no claims or no organization is selected.
pub fn authorize(
    claims: Option<&RoleClaims>,
    current_org: Option<&str>,
    required_role: Option<&str>,
) -> bool {
    let (Some(claims), Some(org_id)) = (claims, current_org.filter(|org| !org.is_empty())) else {
        return false;
    };
    match required_role.filter(|role| !role.is_empty()) {
        Some(role) => claims.holds(role, org_id),
        None => claims.holds_any(org_id),
    }
}

/// [`authorize`] preceded by a session check: no active session always denies
pub fn authorize_session(
    session: Option<&Session>,
    claims: Option<&RoleClaims>,
    current_org: Option<&str>,
    required_role: Option<&str>,
) -> bool {
    match session {
        Some(session) if session.is_active() => authorize(claims, current_org, required_role),
        _ => false,
    }
}

/// Evaluate a requirement against roles tagged with their organization.
/// Roles derived for another organization never authorize.
pub fn authorize_scoped(
    roles: Option<&ScopedRoles>,
    current_org: Option<&str>,
    requirement: &Requirement,
) -> bool {
    match (roles, current_org) {
        (Some(roles), Some(org_id)) if roles.belongs_to(org_id) => {
            requirement.is_met_by(&roles.roles)
        }
        _ => false,
    }
}

/// A role-gated area of the console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub name: &'static str,
    pub description: &'static str,
    /// Any one of these roles unlocks the section
    pub roles: &'static [&'static str],
}

impl Section {
    pub fn requirement(&self) -> Requirement {
        Requirement::OneOf(self.roles.iter().map(|r| r.to_string()).collect())
    }
}

pub const GRANTED_PROJECTS: Section = Section {
    name: "Granted Projects",
    description: "You need to have reader role to view granted projects",
    roles: &["reader", "admin"],
};

pub const AUTHORIZATIONS: Section = Section {
    name: "Authorizations",
    description: "You need to have admin role to view user grants",
    roles: &["admin"],
};

pub const SECTIONS: &[Section] = &[GRANTED_PROJECTS, AUTHORIZATIONS];

/// A section and whether the current roles unlock it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SectionAccess {
    pub name: String,
    pub description: String,
    pub roles: Vec<String>,
    pub allowed: bool,
}

pub fn section_access(roles: Option<&ScopedRoles>, current_org: Option<&str>) -> Vec<SectionAccess> {
    SECTIONS
        .iter()
        .map(|section| SectionAccess {
            name: section.name.to_string(),
            description: section.description.to_string(),
            roles: section.roles.iter().map(|r| r.to_string()).collect(),
            allowed: authorize_scoped(roles, current_org, &section.requirement()),
        })
        .collect()
}
