use thiserror::Error;

/// Errors surfaced by the portal view model and its identity platform calls
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortalError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("You don't have access to this organization")]
    Unauthorized,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User {user_id} already has a grant on project {project_id}")]
    DuplicateGrant { user_id: String, project_id: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Identity platform responded with status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Failed to reach identity platform: {0}")]
    Transport(String),

    #[error("Token carries no role claim")]
    NoRolesClaim,
}

impl PortalError {
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found<S: Into<String>>(what: S) -> Self {
        Self::NotFound(what.into())
    }

    /// Whether the failure happened before or outside the identity platform's
    /// own decision (network, DNS, timeouts)
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
