use crate::{
    cache::{create_cache, Cache, CacheBackend},
    config::PortalConfig,
    session::SessionRegistry,
    zitadel::{cached::CachedPlatform, ZitadelClient},
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PortalConfig>,
    pub cache: Arc<Cache>,
    pub zitadel: Arc<ZitadelClient>,
    pub platform: Arc<CachedPlatform>,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub async fn new(config: PortalConfig) -> Result<Self, std::io::Error> {
        let cache = create_cache(&config.cache).await.map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to create cache: {e}"),
            )
        })?;
        Self::with_cache(config, cache)
    }

    fn with_cache(config: PortalConfig, cache: Cache) -> Result<Self, std::io::Error> {
        let http_client = ZitadelClient::create_http_client(config.zitadel.client_timeout)
            .map_err(|e| {
                std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Failed to create ZITADEL client: {e}"),
                )
            })?;

        let cache = Arc::new(cache);
        let zitadel = Arc::new(ZitadelClient::new(
            http_client,
            Arc::new(config.zitadel.clone()),
        ));
        let platform = Arc::new(CachedPlatform::new(zitadel.clone(), cache.clone()));
        let sessions = SessionRegistry::new(
            platform.clone(),
            Duration::from_secs(config.session.idle_timeout),
            config.session.max_sessions,
            config.roles.get_fallback_roles(),
        );

        Ok(Self {
            config: Arc::new(config),
            cache,
            zitadel,
            platform,
            sessions,
        })
    }

    #[cfg(test)]
    pub(crate) fn for_testing(config: PortalConfig) -> Self {
        use crate::cache::memory::InMemoryCache;

        let cache = Cache::InMemory(
            InMemoryCache::new(config.cache.ttl as u64, config.cache.memory.capacity)
                .expect("Failed to create test cache"),
        );
        Self::with_cache(config, cache).expect("Failed to create test state")
    }

    /// Check the cache and the ZITADEL instance
    pub async fn health_check(&self) -> Result<(), String> {
        self.cache.health_check().await?;
        self.zitadel.health().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confique::Config;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_health_check_follows_zitadel() {
        let server = MockServer::start().await;
        let state = AppState::for_testing(PortalConfig::for_test_with_mock(&server));
        assert!(state.health_check().await.is_err());

        Mock::given(method("GET"))
            .and(path("/debug/healthz"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        assert!(state.health_check().await.is_ok());
    }

    #[test]
    fn test_app_state_clone() {
        let server_uri = "http://localhost:1";
        let mut config = PortalConfig::builder().load().unwrap();
        config.zitadel.api_url = server_uri.to_string();

        let state = AppState::for_testing(config);
        let state2 = state.clone();

        assert_eq!(Arc::as_ptr(&state.config), Arc::as_ptr(&state2.config));
        assert_eq!(Arc::as_ptr(&state.cache), Arc::as_ptr(&state2.cache));
    }
}
