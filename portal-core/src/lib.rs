//! # portal-core
//!
//! View model of the ZITADEL organization portal: which organization the
//! signed-in user is working in, what their roles there allow, and the user
//! grants of that organization.
//!
//! ## Components
//!
//! - **Claims:** Reads the ZITADEL role claim into an organization-scoped role map.
//! - **Organizations:** Holds the organization list and the single current selection.
//! - **Gate:** Pure role checks over already fetched claims.
//! - **Grants:** Lists and mutates user grants, refetching after every change.
//! - **Workspace:** Per-session state combining the above over an [`IdentityPlatform`].

pub mod claims;
pub mod error;
pub mod gate;
pub mod grants;
pub mod mock_platform;
pub mod org;
pub mod platform;
pub mod session;
pub mod workspace;

pub use claims::{NormalizedRoles, Profile, ROLES_CLAIM, RoleClaims, ScopedRoles, derive_role_map};
pub use error::PortalError;
pub use gate::{Requirement, Section, SectionAccess, authorize, authorize_scoped, authorize_session};
pub use grants::{
    DEFAULT_PROJECT_ROLES, Grant, GrantListing, GrantManager, MutationOutcome, NewGrant,
    ProjectRoles,
};
pub use mock_platform::MockPlatform;
pub use org::{OrgSelector, Organization, Selection};
pub use platform::IdentityPlatform;
pub use session::Session;
pub use workspace::{AccessView, Workspace};
