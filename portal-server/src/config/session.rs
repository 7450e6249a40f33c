use confique::Config;

/// Browser session configuration
#[derive(Debug, Config, Clone)]
pub struct SessionConfig {
    /// Seconds of inactivity before a session's state is dropped (default: 30 minutes)
    #[config(env = "PORTAL_SESSION_IDLE_TIMEOUT", default = 1800)]
    pub idle_timeout: u64,

    /// Maximum number of concurrently tracked sessions
    #[config(env = "PORTAL_SESSION_MAX_SESSIONS", default = 10000)]
    pub max_sessions: u64,
}
