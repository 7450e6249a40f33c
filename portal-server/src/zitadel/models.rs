//! Request and response bodies of the ZITADEL REST API

use portal_core::{Grant, Organization};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Page size used for every search the portal issues
pub const SEARCH_LIMIT: u32 = 100;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
    pub limit: u32,
    pub asc: bool,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            offset: None,
            limit: SEARCH_LIMIT,
            asc: true,
        }
    }
}

/// Generic `{ result: [...] }` search response
#[derive(Debug, Deserialize, Clone)]
pub struct SearchResult<T> {
    #[serde(default = "Vec::new")]
    pub result: Vec<T>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProjectOrg {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl From<ProjectOrg> for Organization {
    fn from(org: ProjectOrg) -> Self {
        Organization::new(org.id, org.name)
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum UserGrantQuery {
    ProjectIdQuery {
        #[serde(rename = "projectId")]
        project_id: String,
    },
    WithGrantedQuery {
        #[serde(rename = "withGranted")]
        with_granted: bool,
    },
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct UserGrantSearch {
    pub query: ListQuery,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<UserGrantQuery>,
}

impl UserGrantSearch {
    /// All grants, optionally restricted to one project, including grants
    /// given to other organizations
    pub fn for_project(project_id: Option<&str>) -> Self {
        let mut queries = Vec::new();
        if let Some(project_id) = project_id {
            queries.push(UserGrantQuery::ProjectIdQuery {
                project_id: project_id.to_string(),
            });
        }
        queries.push(UserGrantQuery::WithGrantedQuery { with_granted: true });
        Self {
            query: ListQuery::default(),
            queries,
        }
    }
}

/// User grant as returned by the management API
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UserGrant {
    pub id: String,
    pub user_id: String,
    pub project_id: String,
    pub project_grant_id: Option<String>,
    pub org_id: String,
    pub role_keys: Vec<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub user_name: Option<String>,
    pub org_name: Option<String>,
    pub project_name: Option<String>,
}

impl From<UserGrant> for Grant {
    fn from(grant: UserGrant) -> Self {
        Grant {
            user_id: grant.user_id,
            grant_id: grant.id,
            project_id: grant.project_id,
            project_grant_id: grant.project_grant_id.filter(|id| !id.is_empty()),
            organization_id: grant.org_id,
            role_keys: grant.role_keys,
            display_name: grant.display_name,
            email: grant.email,
            user_name: grant.user_name,
            org_name: grant.org_name,
            project_name: grant.project_name,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddUserGrant {
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_grant_id: Option<String>,
    pub role_keys: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AddUserGrantResponse {
    pub user_grant_id: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserGrant {
    pub role_keys: Vec<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ProjectRoleSearch {
    pub query: ListQuery,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProjectRole {
    pub key: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationIdQuery {
    pub organization_id: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub organization_id_query: OrganizationIdQuery,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSearch {
    pub query: ListQuery,
    pub sorting_column: &'static str,
    pub queries: Vec<UserQuery>,
}

impl UserSearch {
    pub fn in_organization(org_id: &str) -> Self {
        Self {
            query: ListQuery {
                offset: Some("0".to_string()),
                ..ListQuery::default()
            },
            sorting_column: "USER_FIELD_NAME_USER_NAME",
            queries: vec![UserQuery {
                organization_id_query: OrganizationIdQuery {
                    organization_id: org_id.to_string(),
                },
            }],
        }
    }
}

/// Form submitted by the console to create a human user
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct NewUser {
    pub username: String,
    pub given_name: String,
    pub family_name: String,
    pub email: String,
    pub org_id: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationRef {
    pub org_id: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HumanProfile {
    pub given_name: String,
    pub family_name: String,
    pub display_name: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HumanEmail {
    pub email: String,
    /// Empty object: ZITADEL returns the verification code instead of mailing it
    pub return_code: Value,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AddHumanUser {
    pub username: String,
    pub organization: OrganizationRef,
    pub profile: HumanProfile,
    pub email: HumanEmail,
}

impl From<&NewUser> for AddHumanUser {
    fn from(user: &NewUser) -> Self {
        let given_name = user.given_name.trim().to_string();
        let family_name = user.family_name.trim().to_string();
        Self {
            username: user.username.trim().to_string(),
            organization: OrganizationRef {
                org_id: user.org_id.trim().to_string(),
            },
            profile: HumanProfile {
                display_name: format!("{given_name} {family_name}"),
                given_name,
                family_name,
            },
            email: HumanEmail {
                email: user.email.trim().to_string(),
                return_code: Value::Object(Default::default()),
            },
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SendInviteCode {
    pub send_code: SendCode,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SendCode {
    pub application_name: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerifyInviteCode {
    pub verification_code: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UserDetails {
    pub username: Option<String>,
    pub preferred_login_name: Option<String>,
}

impl UserDetails {
    /// Name to pre-fill on the login page
    pub fn login_hint(&self) -> Option<&str> {
        self.username
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self.preferred_login_name.as_deref())
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct GetUserResponse {
    pub user: Option<UserDetails>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_grant_search_body() {
        let body = serde_json::to_value(UserGrantSearch::for_project(Some("p1"))).unwrap();
        assert_eq!(
            body,
            json!({
                "query": { "limit": 100, "asc": true },
                "queries": [
                    { "projectIdQuery": { "projectId": "p1" } },
                    { "withGrantedQuery": { "withGranted": true } }
                ]
            })
        );
    }

    #[test]
    fn test_user_search_body() {
        let body = serde_json::to_value(UserSearch::in_organization("org-1")).unwrap();
        assert_eq!(
            body,
            json!({
                "query": { "offset": "0", "limit": 100, "asc": true },
                "sortingColumn": "USER_FIELD_NAME_USER_NAME",
                "queries": [ { "organizationIdQuery": { "organizationId": "org-1" } } ]
            })
        );
    }

    #[test]
    fn test_user_grant_conversion() {
        let grant: UserGrant = serde_json::from_value(json!({
            "id": "g1",
            "userId": "u1",
            "projectId": "p1",
            "projectGrantId": "",
            "orgId": "org-1",
            "roleKeys": ["reader"],
            "displayName": "Ada Lovelace",
            "state": "USER_GRANT_STATE_ACTIVE"
        }))
        .unwrap();
        let grant = Grant::from(grant);
        assert_eq!(grant.grant_id, "g1");
        assert_eq!(grant.organization_id, "org-1");
        assert_eq!(grant.project_grant_id, None);
        assert_eq!(grant.display_name.as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn test_human_user_body() {
        let user = NewUser {
            username: " ada ".into(),
            given_name: "Ada".into(),
            family_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            org_id: "org-1".into(),
        };
        let body = serde_json::to_value(AddHumanUser::from(&user)).unwrap();
        assert_eq!(
            body,
            json!({
                "username": "ada",
                "organization": { "orgId": "org-1" },
                "profile": {
                    "givenName": "Ada",
                    "familyName": "Lovelace",
                    "displayName": "Ada Lovelace"
                },
                "email": { "email": "ada@example.com", "returnCode": {} }
            })
        );
    }

    #[test]
    fn test_login_hint() {
        let details = UserDetails {
            username: Some(String::new()),
            preferred_login_name: Some("ada@acme.example.com".into()),
        };
        assert_eq!(details.login_hint(), Some("ada@acme.example.com"));
        assert_eq!(UserDetails::default().login_hint(), None);
    }
}
