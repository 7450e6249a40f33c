use confique::Config;

#[derive(Debug, Config, Clone)]
pub struct RolesConfig {
    /// Roles offered when a project's roles cannot be listed
    /// Comma-separated list (default: "admin,reader")
    #[config(env = "PORTAL_ROLES_FALLBACK", default = "admin,reader")]
    pub fallback: String,

    /// Role required for grant and user administration (default: "admin")
    #[config(env = "PORTAL_ROLES_ADMIN_ROLE", default = "admin")]
    pub admin_role: String,
}

impl RolesConfig {
    /// Get fallback roles as a vector
    pub fn get_fallback_roles(&self) -> Vec<String> {
        self.fallback
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
