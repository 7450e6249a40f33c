use super::{CacheBackend, CacheError};
use async_trait::async_trait;
use log::{error, info};
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};

/// Cache shared between portal replicas. Entries expire server-side via `SETEX`.
#[derive(Clone)]
pub struct RedisCache {
    conn_manager: ConnectionManager,
    ttl_secs: u64,
}

impl RedisCache {
    /// Connect and verify the server answers before the portal starts serving
    pub async fn new(redis_url: &str, ttl_secs: u64) -> Result<Self, String> {
        let client =
            Client::open(redis_url).map_err(|err| format!("Invalid Redis URL: {err}"))?;

        let conn_manager = ConnectionManager::new(client)
            .await
            .map_err(|err| format!("Failed to create Redis connection manager: {err}"))?;

        let mut conn = conn_manager.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|err| format!("Failed to ping Redis: {err}"))?;

        info!("Connected to Redis cache");
        Ok(Self {
            conn_manager,
            ttl_secs,
        })
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), CacheError> {
        let serialized = serde_json::to_string(value)?;
        let mut conn = self.conn_manager.clone();

        conn.set_ex::<_, _, ()>(key, serialized, self.ttl_secs)
            .await
            .map_err(|err| {
                error!("Redis error while setting key {key}: {err}");
                CacheError::Redis(err.to_string())
            })
    }

    async fn get<T: DeserializeOwned + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError> {
        let mut conn = self.conn_manager.clone();

        let result: Option<String> = match conn.get(key).await {
            Ok(value) => value,
            Err(err) if err.kind() == redis::ErrorKind::TypeError => return Ok(None),
            Err(err) => {
                error!("Redis error while getting key {key}: {err}");
                return Err(CacheError::Redis(err.to_string()));
            }
        };

        result
            .map(|value| {
                serde_json::from_str(&value).map_err(|e| CacheError::Deserialization(e.to_string()))
            })
            .transpose()
    }

    async fn health_check(&self) -> Result<(), String> {
        let mut conn = self.conn_manager.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| format!("Redis health check failed: {err}"))
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn_manager.clone();
        conn.del::<_, ()>(key).await.map_err(|err| {
            error!("Redis error while deleting key {key}: {err}");
            CacheError::Redis(err.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redis_test::server::RedisServer;
    use std::time::Duration;

    fn get_redis_url(server: &RedisServer) -> String {
        match &server.addr {
            redis::ConnectionAddr::Tcp(host, port) => format!("redis://{host}:{port}/"),
            _ => "redis://127.0.0.1:6379/".to_string(),
        }
    }

    #[tokio::test]
    #[ignore = "requires a redis-server binary"]
    async fn test_redis_cache_operations() {
        let server = RedisServer::new();
        let cache = RedisCache::new(&get_redis_url(&server), 1).await.unwrap();

        let roles = vec!["admin".to_string(), "reader".to_string()];
        cache.set("portal:project_roles:p1", &roles).await.unwrap();
        let cached: Vec<String> = cache.get("portal:project_roles:p1").await.unwrap().unwrap();
        assert_eq!(cached, roles);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(cache
            .get::<Vec<String>>("portal:project_roles:p1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    #[ignore = "requires a redis-server binary"]
    async fn test_redis_health_check() {
        let server = RedisServer::new();
        let cache = RedisCache::new(&get_redis_url(&server), 1).await.unwrap();
        assert!(cache.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_url() {
        assert!(RedisCache::new("not a url", 1).await.is_err());
    }
}
