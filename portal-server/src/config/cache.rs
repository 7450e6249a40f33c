use confique::Config;
use serde::Deserialize;

/// Specifies which cache store implementation to use
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(try_from = "String")]
pub enum CacheStore {
    #[default]
    InMemory,
    Redis,
    None,
}

impl TryFrom<String> for CacheStore {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "in-memory" | "memory" => Ok(Self::InMemory),
            "redis" => Ok(Self::Redis),
            "none" | "" => Ok(Self::None),
            other => Err(format!(
                "unknown cache store '{other}', expected 'in-memory', 'redis' or 'none'"
            )),
        }
    }
}

/// Configuration for the project role cache
#[derive(Debug, Config, Clone)]
pub struct CacheConfig {
    /// Cache TTL in seconds (default: 1 hour)
    #[config(env = "PORTAL_CACHE_TTL", default = 3600)]
    pub ttl: u32,

    /// Cache store type: "in-memory" (default), "redis" or "none"
    #[config(env = "PORTAL_CACHE_STORE", default = "in-memory")]
    pub store: CacheStore,

    /// In-memory cache specific configuration
    #[config(nested)]
    pub memory: InMemoryConfig,

    /// Redis cache specific configuration
    #[config(nested)]
    pub redis: RedisConfig,
}

/// In-memory cache configuration options
#[derive(Debug, Config, Clone)]
pub struct InMemoryConfig {
    /// Maximum capacity in MiB (default: 16 MiB)
    #[config(env = "PORTAL_CACHE_MEMORY_CAPACITY", default = 16)]
    pub capacity: usize,
}

/// Redis cache configuration options
#[derive(Debug, Config, Clone)]
pub struct RedisConfig {
    /// Redis connection string
    #[config(env = "PORTAL_CACHE_REDIS_URL", default = "")]
    pub url: String,
}
