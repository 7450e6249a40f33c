//! ZITADEL REST API client.
//!
//! Calls that read the signed-in user's own data carry the user's access
//! token. Administrative calls carry the service account token, which never
//! leaves this module.

pub mod cached;
pub mod models;

use crate::config::ZitadelConfig;
use async_trait::async_trait;
use log::{debug, error, warn};
use models::{
    AddHumanUser, AddUserGrant, AddUserGrantResponse, GetUserResponse, ListQuery, NewUser,
    ProjectOrg, ProjectRole, ProjectRoleSearch, SearchResult, SendCode, SendInviteCode,
    UpdateUserGrant, UserGrant, UserGrantSearch, UserSearch, VerifyInviteCode,
};
use portal_core::{Grant, IdentityPlatform, NewGrant, Organization, PortalError};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Organization context header of the management API
const ORG_HEADER: &str = "x-zitadel-org";
/// Organization context header used by the console for grant mutations
const ORG_ID_HEADER: &str = "x-zitadel-orgid";

/// Errors that can occur during ZITADEL API operations
#[derive(Debug, Error)]
pub enum ZitadelError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Access token was rejected")]
    Unauthenticated,
    #[error("{0} not found")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("API response error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl From<ZitadelError> for PortalError {
    fn from(err: ZitadelError) -> Self {
        match err {
            ZitadelError::Http(err) => PortalError::Transport(err.to_string()),
            ZitadelError::Unauthenticated => PortalError::Unauthenticated,
            ZitadelError::NotFound(what) => PortalError::NotFound(what),
            ZitadelError::Conflict(body) => PortalError::Upstream { status: 409, body },
            ZitadelError::Api { status, body } => PortalError::Upstream { status, body },
            ZitadelError::Parse(message) => PortalError::Upstream {
                status: StatusCode::BAD_GATEWAY.as_u16(),
                body: message,
            },
        }
    }
}

/// Whose credential a request carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Credential {
    User,
    Service,
}

/// Result of creating a user, as reported to the console
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedUser {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub details: Option<Value>,
    pub invitation_sent: bool,
}

#[derive(Clone)]
pub struct ZitadelClient {
    client: Client,
    config: Arc<ZitadelConfig>,
}

impl ZitadelClient {
    pub fn new(client: Client, config: Arc<ZitadelConfig>) -> Self {
        Self { client, config }
    }

    /// HTTP client with the timeouts and pool sizing used for ZITADEL
    pub fn create_http_client(timeout: u64) -> Result<Client, reqwest::Error> {
        Client::builder()
            .timeout(Duration::from_secs(timeout))
            .connect_timeout(Duration::from_secs(2))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
    }

    pub fn config(&self) -> &ZitadelConfig {
        &self.config
    }

    /// Liveness of the ZITADEL instance, used by the readiness probe
    pub async fn health(&self) -> Result<(), String> {
        let url = self.config.get_url("/debug/healthz");
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => Err(format!("ZITADEL health check returned {}", response.status())),
            Err(err) => Err(format!("ZITADEL is unreachable: {err}")),
        }
    }

    /// Sessions of the signed-in user
    pub async fn my_sessions(&self, access_token: &str) -> Result<Vec<Value>, PortalError> {
        let request = self.user_request(Method::POST, "/auth/v1/users/me/sessions/_search", access_token);
        let response: SearchResult<Value> = self.send(request, Credential::User, "sessions").await?;
        Ok(response.result)
    }

    /// Users of `org_id`
    pub async fn org_users(&self, org_id: &str) -> Result<Vec<Value>, PortalError> {
        let request = self
            .service_request(Method::POST, "/v2/users")
            .json(&UserSearch::in_organization(org_id));
        let response: SearchResult<Value> = self.send(request, Credential::Service, "users").await?;
        Ok(response.result)
    }

    /// Create a human user and ask ZITADEL to mail an invitation code. A
    /// failed invitation does not undo the creation.
    pub async fn create_user(&self, user: &NewUser) -> Result<CreatedUser, PortalError> {
        let request = self
            .service_request(Method::POST, "/v2/users/human")
            .json(&AddHumanUser::from(user));
        let mut created: Value = self.send(request, Credential::Service, "user").await?;

        let user_id = created
            .get("userId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                PortalError::from(ZitadelError::Parse("user creation returned no userId".into()))
            })?;
        let details = created.get_mut("details").map(Value::take);

        let invitation_sent = match self.send_invite_code(&user_id).await {
            Ok(()) => true,
            Err(err) => {
                warn!("User {user_id} was created but the invitation could not be sent: {err}");
                false
            }
        };

        Ok(CreatedUser {
            user_id,
            details,
            invitation_sent,
        })
    }

    async fn send_invite_code(&self, user_id: &str) -> Result<(), PortalError> {
        let body = SendInviteCode {
            send_code: SendCode {
                application_name: self.config.application_name.clone(),
            },
        };
        let request = self
            .service_request(Method::POST, &format!("/v2/users/{user_id}/invite_code"))
            .json(&body);
        self.send::<Value>(request, Credential::Service, "user")
            .await
            .map(|_| ())
    }

    /// Verify an invitation code. A code ZITADEL reports as invalid has
    /// usually been used already and is accepted.
    pub async fn verify_invite_code(&self, user_id: &str, code: &str) -> Result<(), PortalError> {
        let request = self
            .service_request(Method::POST, &format!("/v2/users/{user_id}/invite_code/verify"))
            .json(&VerifyInviteCode {
                verification_code: code.to_string(),
            });
        match self.send::<Value>(request, Credential::Service, "user").await {
            Ok(_) => Ok(()),
            Err(PortalError::Upstream { status: 400, body }) if body.contains("Code is invalid") => {
                debug!("Invitation code of user {user_id} already used, continuing");
                Ok(())
            }
            Err(PortalError::Upstream { status, .. }) if status < 500 => Err(
                PortalError::validation("Invalid or expired invitation code"),
            ),
            Err(err) => Err(err),
        }
    }

    /// Name to pre-fill on the ZITADEL login page for `user_id`
    pub async fn login_hint(&self, user_id: &str) -> Result<String, PortalError> {
        let request = self.service_request(Method::GET, &format!("/v2/users/{user_id}"));
        let response: GetUserResponse = self.send(request, Credential::Service, "user").await?;
        response
            .user
            .as_ref()
            .and_then(|user| user.login_hint())
            .map(str::to_string)
            .ok_or_else(|| PortalError::validation("Username not found for user"))
    }

    fn user_request(&self, method: Method, path: &str, access_token: &str) -> RequestBuilder {
        let url = self.config.get_url(path);
        debug!("{method} {url} with user token");
        self.client.request(method, url).bearer_auth(access_token)
    }

    fn service_request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.config.get_url(path);
        debug!("{method} {url} with service account token");
        self.client
            .request(method, url)
            .bearer_auth(&self.config.service_account_token)
    }

    /// Send a request and parse the JSON response. An empty body parses as
    /// `null`.
    async fn send<R: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        credential: Credential,
        resource: &str,
    ) -> Result<R, PortalError> {
        let response = request.send().await.map_err(|err| {
            error!("Failed to reach ZITADEL: {err}");
            ZitadelError::Http(err)
        })?;

        let status = response.status();
        let body = response.text().await.map_err(ZitadelError::Http)?;

        if !status.is_success() {
            return Err(Self::status_error(status, body, credential, resource).into());
        }

        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(body)
            .map_err(|err| ZitadelError::Parse(format!("{resource}: {err}")).into())
    }

    fn status_error(
        status: StatusCode,
        body: String,
        credential: Credential,
        resource: &str,
    ) -> ZitadelError {
        match status {
            // A rejected service token is a deployment problem, not an expired session
            StatusCode::UNAUTHORIZED if credential == Credential::User => {
                warn!("ZITADEL rejected the user's access token");
                ZitadelError::Unauthenticated
            }
            StatusCode::NOT_FOUND => ZitadelError::NotFound(resource.to_string()),
            StatusCode::CONFLICT => ZitadelError::Conflict(body),
            _ => {
                error!("ZITADEL API error {status}: {body}");
                ZitadelError::Api {
                    status: status.as_u16(),
                    body,
                }
            }
        }
    }

    /// Organization header for management searches: the configured service
    /// organization if any, else the organization being searched
    fn search_org<'a>(&'a self, org_id: &'a str) -> &'a str {
        self.config.default_org().unwrap_or(org_id)
    }
}

#[async_trait]
impl IdentityPlatform for ZitadelClient {
    async fn user_info(&self, access_token: &str) -> Result<Value, PortalError> {
        let request = self.user_request(Method::GET, "/oidc/v1/userinfo", access_token);
        self.send(request, Credential::User, "userinfo").await
    }

    async fn project_orgs(&self, access_token: &str) -> Result<Vec<Organization>, PortalError> {
        let request = self.user_request(Method::POST, "/auth/v1/global/projectorgs/_search", access_token);
        let response: SearchResult<ProjectOrg> =
            self.send(request, Credential::User, "organizations").await?;
        Ok(response.result.into_iter().map(Organization::from).collect())
    }

    async fn search_grants(&self, org_id: &str) -> Result<Vec<Grant>, PortalError> {
        let project_id = Some(self.config.project_id.as_str()).filter(|id| !id.is_empty());
        let request = self
            .service_request(Method::POST, "/management/v1/users/grants/_search")
            .header(ORG_HEADER, self.search_org(org_id))
            .json(&UserGrantSearch::for_project(project_id));
        let response: SearchResult<UserGrant> =
            self.send(request, Credential::Service, "user grants").await?;

        Ok(response
            .result
            .into_iter()
            .filter(|grant| grant.org_id == org_id)
            .map(Grant::from)
            .collect())
    }

    async fn add_grant(&self, org_id: &str, grant: &NewGrant) -> Result<String, PortalError> {
        let body = AddUserGrant {
            project_id: grant.project_id.clone(),
            project_grant_id: grant.project_grant_id.clone(),
            role_keys: grant.role_keys.clone(),
        };
        let request = self
            .service_request(
                Method::POST,
                &format!("/management/v1/users/{}/grants", grant.user_id),
            )
            .header(ORG_ID_HEADER, org_id)
            .json(&body);

        match self
            .send::<AddUserGrantResponse>(request, Credential::Service, "user")
            .await
        {
            Ok(response) => Ok(response.user_grant_id),
            Err(PortalError::Upstream { status: 409, .. }) => Err(PortalError::DuplicateGrant {
                user_id: grant.user_id.clone(),
                project_id: grant.project_id.clone(),
            }),
            Err(err) => Err(err),
        }
    }

    async fn update_grant(
        &self,
        org_id: &str,
        user_id: &str,
        grant_id: &str,
        role_keys: &[String],
    ) -> Result<(), PortalError> {
        let request = self
            .service_request(
                Method::PUT,
                &format!("/management/v1/users/{user_id}/grants/{grant_id}"),
            )
            .header(ORG_ID_HEADER, org_id)
            .json(&UpdateUserGrant {
                role_keys: role_keys.to_vec(),
            });
        self.send::<Value>(request, Credential::Service, &format!("grant {grant_id}"))
            .await
            .map(|_| ())
    }

    async fn remove_grant(
        &self,
        org_id: &str,
        user_id: &str,
        grant_id: &str,
    ) -> Result<(), PortalError> {
        let request = self
            .service_request(
                Method::DELETE,
                &format!("/management/v1/users/{user_id}/grants/{grant_id}"),
            )
            .header(ORG_ID_HEADER, org_id);
        self.send::<Value>(request, Credential::Service, &format!("grant {grant_id}"))
            .await
            .map(|_| ())
    }

    async fn project_roles(
        &self,
        org_id: &str,
        project_id: &str,
    ) -> Result<Vec<String>, PortalError> {
        let request = self
            .service_request(
                Method::POST,
                &format!("/management/v1/projects/{project_id}/roles/_search"),
            )
            .header(ORG_HEADER, org_id)
            .json(&ProjectRoleSearch {
                query: ListQuery::default(),
            });
        let response: SearchResult<ProjectRole> = self
            .send(request, Credential::Service, &format!("project {project_id}"))
            .await?;
        Ok(response.result.into_iter().map(|role| role.key).collect())
    }
}
