use crate::config::{CacheConfig, CacheStore};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub mod memory;
pub mod null;
pub mod redis;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to serialize value: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Failed to parse value: {0}")]
    Deserialization(String),
    #[error("Redis error: {0}")]
    Redis(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Shared store for responses that are identical for every session, such as
/// the role keys of a project.
///
/// Values are stored as JSON so every backend holds the same representation.
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    /// Store a value with the configured TTL
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T)
        -> Result<(), CacheError>;

    async fn get<T: DeserializeOwned + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError>;

    /// Ok when the backend can serve requests. For Redis this pings the server.
    async fn health_check(&self) -> Result<(), String>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Cache backend selected at startup from `PORTAL_CACHE_STORE`
#[derive(Clone)]
pub enum Cache {
    /// Process-local cache using Moka
    InMemory(memory::InMemoryCache),
    /// Cache shared between portal replicas
    Redis(redis::RedisCache),
    /// Caching disabled
    Null(null::NullCache),
}

#[async_trait::async_trait]
impl CacheBackend for Cache {
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), CacheError> {
        match self {
            Self::InMemory(cache) => cache.set(key, value).await,
            Self::Redis(cache) => cache.set(key, value).await,
            Self::Null(cache) => cache.set(key, value).await,
        }
    }

    async fn get<T: DeserializeOwned + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError> {
        match self {
            Self::InMemory(cache) => cache.get(key).await,
            Self::Redis(cache) => cache.get(key).await,
            Self::Null(cache) => cache.get(key).await,
        }
    }

    async fn health_check(&self) -> Result<(), String> {
        match self {
            Self::InMemory(cache) => cache.health_check().await,
            Self::Redis(cache) => cache.health_check().await,
            Self::Null(cache) => cache.health_check().await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match self {
            Self::InMemory(cache) => cache.delete(key).await,
            Self::Redis(cache) => cache.delete(key).await,
            Self::Null(cache) => cache.delete(key).await,
        }
    }
}

/// Build the configured cache backend. A Redis store without a URL is a
/// configuration error rather than a silent fallback.
pub async fn create_cache(config: &CacheConfig) -> Result<Cache, CacheError> {
    match config.store {
        CacheStore::InMemory => {
            let cache = memory::InMemoryCache::new(config.ttl as u64, config.memory.capacity)
                .map_err(CacheError::Config)?;
            Ok(Cache::InMemory(cache))
        }
        CacheStore::Redis => {
            if config.redis.url.is_empty() {
                return Err(CacheError::Config(
                    "PORTAL_CACHE_REDIS_URL is required for the redis cache store".to_string(),
                ));
            }
            let cache = redis::RedisCache::new(&config.redis.url, config.ttl as u64)
                .await
                .map_err(CacheError::Config)?;
            Ok(Cache::Redis(cache))
        }
        CacheStore::None => Ok(Cache::Null(null::NullCache::new())),
    }
}
