use crate::config::PortalConfig;
use crate::create_app;
use crate::state::AppState;
use axum::body::Body;
use axum::Router;
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use log::LevelFilter;
use portal_core::ROLES_CLAIM;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Map, Value};
use tower::ServiceExt;
use wiremock::matchers;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;

/// Test fixture running the portal router against a mock ZITADEL API.
///
/// Requests carry [`TestFixture::ACCESS_TOKEN`] as the signed-in user's
/// token. Mock the user's organizations and role claims with
/// [`TestFixture::sign_in`] before calling routes that need them.
///
/// # Examples
///
/// ```rust
/// #[tokio::test]
/// async fn test_endpoint() {
///     let fixture = TestFixture::new().await;
///     fixture.sign_in(&[("org-1", "Acme")], &[("admin", "org-1")]).await;
///
///     let response = fixture.get("/api/access").await;
///     response.assert_ok();
/// }
/// ```
pub struct TestFixture {
    /// The application router
    pub app: Router,
    /// State shared with the router
    pub state: AppState,
    pub config: PortalConfig,
    /// Mock server standing in for ZITADEL
    pub zitadel_mock: MockServer,
}

impl TestFixture {
    pub const ACCESS_TOKEN: &'static str = "user-token";

    pub async fn new() -> Self {
        let _ = env_logger::builder()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .try_init();

        let zitadel_mock = MockServer::start().await;
        let config = PortalConfig::for_test_with_mock(&zitadel_mock);

        let state = AppState::for_testing(config.clone());
        let app = create_app(state.clone()).await;

        Self {
            app,
            state,
            config,
            zitadel_mock,
        }
    }

    /// Mock the organizations of the signed-in user and the role claim
    /// returned by userinfo. `roles` lists `(role, org_id)` pairs.
    pub async fn sign_in(&self, organizations: &[(&str, &str)], roles: &[(&str, &str)]) {
        let result: Vec<Value> = organizations
            .iter()
            .map(|(id, name)| json!({ "id": id, "name": name }))
            .collect();
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/auth/v1/global/projectorgs/_search"))
            .and(matchers::header(
                "authorization",
                format!("Bearer {}", Self::ACCESS_TOKEN).as_str(),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": result })))
            .mount(&self.zitadel_mock)
            .await;

        let mut claim = Map::new();
        for (role, org_id) in roles {
            let entry = claim
                .entry(role.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(orgs) = entry {
                orgs.insert(org_id.to_string(), Value::Bool(true));
            }
        }
        Mock::given(matchers::method("GET"))
            .and(matchers::path("/oidc/v1/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sub": "user-1",
                "name": "Ada Lovelace",
                "email": "ada@acme.example.com",
                ROLES_CLAIM: claim,
            })))
            .mount(&self.zitadel_mock)
            .await;
    }

    /// Request builder with the signed-in user's bearer token and a JSON
    /// content type
    pub fn request_builder(&self, method: Method, uri: impl AsRef<str>) -> http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri.as_ref())
            .header("Authorization", format!("Bearer {}", Self::ACCESS_TOKEN))
            .header("Content-Type", "application/json")
    }

    pub async fn get(&self, uri: impl AsRef<str>) -> TestResponse {
        self.get_with_headers(uri, &[]).await
    }

    pub async fn get_with_headers(
        &self,
        uri: impl AsRef<str>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = self.request_builder(Method::GET, uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::empty()).expect("Failed to build request");
        self.send(request).await
    }

    pub async fn post<T: Serialize>(&self, uri: impl AsRef<str>, body: &T) -> TestResponse {
        self.send_json(Method::POST, uri, body).await
    }

    pub async fn put<T: Serialize>(&self, uri: impl AsRef<str>, body: &T) -> TestResponse {
        self.send_json(Method::PUT, uri, body).await
    }

    pub async fn delete<T: Serialize>(&self, uri: impl AsRef<str>, body: &T) -> TestResponse {
        self.send_json(Method::DELETE, uri, body).await
    }

    async fn send_json<T: Serialize>(
        &self,
        method: Method,
        uri: impl AsRef<str>,
        body: &T,
    ) -> TestResponse {
        let json_body = serde_json::to_vec(body).expect("Failed to serialize body to JSON");
        let request = self
            .request_builder(method, uri)
            .body(Body::from(json_body))
            .expect("Failed to build request");
        self.send(request).await
    }

    /// Send a request through the router. Non-JSON bodies are reported as
    /// an empty object; the `location` header is kept for redirects.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let location = response
            .headers()
            .get(http::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let cache_control = response
            .headers()
            .get(http::header::CACHE_CONTROL)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        let json = if !body.is_empty() {
            serde_json::from_slice(&body).unwrap_or_else(|_| json!({}))
        } else {
            json!({})
        };

        TestResponse {
            status,
            json,
            location,
            cache_control,
        }
    }

    /// Mount a ZITADEL route answering `response_body` with `status_code`,
    /// expected to be called `expected_calls` times
    pub async fn add_zitadel_mock(
        &self,
        method: Method,
        path: impl Into<String>,
        response_body: impl Serialize,
        status_code: StatusCode,
        expected_calls: u64,
    ) {
        Mock::given(matchers::method(method.as_str()))
            .and(matchers::path(path.into()))
            .respond_with(ResponseTemplate::new(status_code.as_u16()).set_body_json(response_body))
            .expect(expected_calls)
            .mount(&self.zitadel_mock)
            .await;
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    /// Response body as JSON (if present and valid JSON)
    pub json: Value,
    pub location: Option<String>,
    pub cache_control: Option<String>,
}

impl TestResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {} but got {} with body: {}",
            expected,
            self.status,
            serde_json::to_string_pretty(&self.json).unwrap_or_default()
        );
        self
    }

    pub fn assert_ok(&self) -> &Self {
        self.assert_status(StatusCode::OK)
    }

    pub fn json_as<T: DeserializeOwned>(&self) -> T {
        serde_json::from_value(self.json.clone()).expect("Failed to deserialize response JSON")
    }
}
