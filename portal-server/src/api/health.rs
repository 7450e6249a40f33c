use crate::openapi::HEALTH_TAG;
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Basic health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Health {
    status: &'static str,
    details: Option<Value>,
    #[serde(skip)]
    status_code: StatusCode,
}

impl IntoResponse for Health {
    fn into_response(self) -> Response {
        let mut body = serde_json::json!({
            "status": self.status
        });

        if let Some(Value::Object(obj)) = self.details {
            for (key, value) in obj {
                body[key] = value;
            }
        }

        (self.status_code, axum::Json(body)).into_response()
    }
}

/// Liveness: the process is serving requests
#[utoipa::path(
    get,
    path = "/health",
    tag = HEALTH_TAG,
    responses(
        (status = 200, description = "Service is healthy", body = Health)
    )
)]
pub(crate) async fn health_check() -> impl IntoResponse {
    Health {
        status: "ok",
        details: None,
        status_code: StatusCode::OK,
    }
}

/// Readiness: the cache answers and ZITADEL is reachable
#[utoipa::path(
    get,
    path = "/ready",
    tag = HEALTH_TAG,
    responses(
        (status = 200, description = "Service is ready", body = Health),
        (status = 503, description = "Service is not ready", body = Health)
    )
)]
pub(crate) async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.health_check().await {
        Ok(()) => Health {
            status: "ok",
            details: Some(serde_json::json!({
                "cache_status": "healthy",
                "zitadel_status": "healthy"
            })),
            status_code: StatusCode::OK,
        },
        Err(err) => {
            warn!("Readiness check failed: {err}");
            Health {
                status: "error",
                details: Some(serde_json::json!({ "error": err })),
                status_code: StatusCode::SERVICE_UNAVAILABLE,
            }
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
}
