pub(crate) use crate::config::cache::{CacheConfig, CacheStore};
use crate::config::roles::RolesConfig;
use crate::config::session::SessionConfig;
pub(crate) use crate::config::zitadel::ZitadelConfig;
use confique::Config;

pub mod cache;
pub mod roles;
pub mod session;
pub mod zitadel;

/// Optional configuration file, read after the environment
const CONFIG_FILE: &str = "portal.toml";

/// Main configuration structure for the portal server
#[derive(Debug, Config, Clone)]
pub struct PortalConfig {
    /// The port the portal server will listen to (default: 3000)
    #[config(env = "PORTAL_PORT", default = 3000)]
    pub port: u16,

    /// ZITADEL instance configuration
    #[config(nested)]
    pub zitadel: ZitadelConfig,

    /// Cache configuration
    #[config(nested)]
    pub cache: CacheConfig,

    /// Browser session configuration
    #[config(nested)]
    pub session: SessionConfig,

    /// Role names used by the gate and the project role fallback
    #[config(nested)]
    pub roles: RolesConfig,
}

impl PortalConfig {
    /// Load the configuration from `PORTAL_*` environment variables, then
    /// `portal.toml` if present, then the defaults
    pub fn new() -> Result<Self, String> {
        Self::builder()
            .env()
            .file(CONFIG_FILE)
            .load()
            .map_err(|e| e.to_string())
    }

    #[cfg(test)]
    pub fn for_test_with_mock(zitadel_mock: &wiremock::MockServer) -> Self {
        Self {
            port: 0, // Let the OS choose a port
            zitadel: ZitadelConfig {
                api_url: zitadel_mock.uri(),
                public_url: "https://portal.example.com".to_string(),
                service_account_token: "service-token".to_string(),
                org_id: String::new(),
                project_id: "project-1".to_string(),
                client_timeout: 5,
                application_name: "Portal Web".to_string(),
            },
            cache: CacheConfig {
                ttl: 60,
                store: CacheStore::InMemory,
                memory: cache::InMemoryConfig { capacity: 1 },
                redis: cache::RedisConfig { url: String::new() },
            },
            session: SessionConfig {
                idle_timeout: 60,
                max_sessions: 100,
            },
            roles: RolesConfig {
                fallback: "admin,reader".to_string(),
                admin_role: "admin".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // No sources: every value comes from the declared defaults
        let config = PortalConfig::builder().load().unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.zitadel.api_url, "http://localhost:8080");
        assert_eq!(config.zitadel.public_url, "");
        assert_eq!(config.zitadel.client_timeout, 10);
        assert_eq!(config.zitadel.application_name, "Portal Web");
        assert_eq!(config.cache.ttl, 3600);
        assert_eq!(config.cache.store, CacheStore::InMemory);
        assert_eq!(config.cache.memory.capacity, 16);
        assert_eq!(config.cache.redis.url, "");
        assert_eq!(config.session.idle_timeout, 1800);
        assert_eq!(config.session.max_sessions, 10000);
        assert_eq!(config.roles.get_fallback_roles(), vec!["admin", "reader"]);
        assert_eq!(config.roles.admin_role, "admin");
    }

    #[test]
    fn test_env_config() {
        std::env::set_var("PORTAL_PORT", "4100");
        std::env::set_var("PORTAL_ZITADEL_API_URL", "https://zitadel.example.com");
        std::env::set_var("PORTAL_ZITADEL_PROJECT_ID", "project-9");
        std::env::set_var("PORTAL_CACHE_STORE", "redis");
        std::env::set_var("PORTAL_CACHE_REDIS_URL", "redis://localhost:6379");
        std::env::set_var("PORTAL_ROLES_FALLBACK", "viewer");

        let config = PortalConfig::builder().env().load().unwrap();
        assert_eq!(config.port, 4100);
        assert_eq!(config.zitadel.api_url, "https://zitadel.example.com");
        assert_eq!(config.zitadel.project_id, "project-9");
        assert_eq!(config.cache.store, CacheStore::Redis);
        assert_eq!(config.cache.redis.url, "redis://localhost:6379");
        assert_eq!(config.roles.get_fallback_roles(), vec!["viewer"]);

        for name in [
            "PORTAL_PORT",
            "PORTAL_ZITADEL_API_URL",
            "PORTAL_ZITADEL_PROJECT_ID",
            "PORTAL_CACHE_STORE",
            "PORTAL_CACHE_REDIS_URL",
            "PORTAL_ROLES_FALLBACK",
        ] {
            std::env::remove_var(name);
        }
    }
}
