//! ZITADEL instance configuration

use confique::Config;
use std::fmt;

#[derive(Config, Clone)]
pub struct ZitadelConfig {
    /// Base URL of the ZITADEL API (default: http://localhost:8080)
    #[config(env = "PORTAL_ZITADEL_API_URL", default = "http://localhost:8080")]
    pub api_url: String,

    /// Browser-facing ZITADEL URL used for redirects (default: api_url)
    #[config(env = "PORTAL_ZITADEL_PUBLIC_URL", default = "")]
    pub public_url: String,

    /// Service account token for administrative calls. Never sent to the browser.
    #[config(env = "PORTAL_ZITADEL_SERVICE_ACCOUNT_TOKEN", default = "")]
    pub service_account_token: String,

    /// Organization used when a request names none
    #[config(env = "PORTAL_ZITADEL_ORG_ID", default = "")]
    pub org_id: String,

    /// Project whose grants and roles the portal manages
    #[config(env = "PORTAL_ZITADEL_PROJECT_ID", default = "")]
    pub project_id: String,

    /// Request timeout in seconds (default: 10)
    #[config(env = "PORTAL_ZITADEL_CLIENT_TIMEOUT", default = 10)]
    pub client_timeout: u64,

    /// Application name shown in invitation e-mails
    #[config(env = "PORTAL_ZITADEL_APPLICATION_NAME", default = "Portal Web")]
    pub application_name: String,
}

impl ZitadelConfig {
    /// Absolute API URL for `path`
    pub fn get_url(&self, path: &str) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), path)
    }

    /// Base URL the browser is redirected to
    pub fn public_base(&self) -> &str {
        let base = if self.public_url.is_empty() {
            &self.api_url
        } else {
            &self.public_url
        };
        base.trim_end_matches('/')
    }

    /// Organization to fall back to when a request carries none
    pub fn default_org(&self) -> Option<&str> {
        Some(self.org_id.as_str()).filter(|org| !org.is_empty())
    }
}

impl fmt::Debug for ZitadelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZitadelConfig")
            .field("api_url", &self.api_url)
            .field("public_url", &self.public_url)
            .field("service_account_token", &"<redacted>")
            .field("org_id", &self.org_id)
            .field("project_id", &self.project_id)
            .field("client_timeout", &self.client_timeout)
            .field("application_name", &self.application_name)
            .finish()
    }
}
