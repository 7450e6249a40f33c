use axum::response::IntoResponse;
use axum::Json;
use http::StatusCode;
use log::warn;
use portal_core::PortalError;
use serde_json::json;

/// Error response of the portal API, rendered as `{"error": ...}`
#[derive(Debug, Clone)]
pub struct ApiError {
    pub error: String,
    pub status_code: StatusCode,
}

impl ApiError {
    pub fn new<S: ToString>(error: S, status_code: StatusCode) -> Self {
        Self {
            error: error.to_string(),
            status_code,
        }
    }

    /// Bad Request (400)
    pub fn bad_request<S: ToString>(error: S) -> Self {
        Self::new(error, StatusCode::BAD_REQUEST)
    }

    /// Unauthorized (401), the browser has to sign in again
    pub fn unauthenticated() -> Self {
        Self::new(PortalError::Unauthenticated, StatusCode::UNAUTHORIZED)
    }
}

impl From<PortalError> for ApiError {
    fn from(err: PortalError) -> Self {
        let status_code = match &err {
            PortalError::Unauthenticated => StatusCode::UNAUTHORIZED,
            PortalError::Unauthorized | PortalError::NoRolesClaim => StatusCode::FORBIDDEN,
            PortalError::Validation(_) => StatusCode::BAD_REQUEST,
            PortalError::DuplicateGrant { .. } => StatusCode::CONFLICT,
            PortalError::NotFound(_) => StatusCode::NOT_FOUND,
            PortalError::Upstream { status, .. } => {
                warn!("ZITADEL responded with status {status}");
                StatusCode::BAD_GATEWAY
            }
            PortalError::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self::new(err, status_code)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = json!({
            "error": self.error,
        });
        (self.status_code, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (PortalError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (PortalError::Unauthorized, StatusCode::FORBIDDEN),
            (PortalError::NoRolesClaim, StatusCode::FORBIDDEN),
            (PortalError::validation("Missing userId"), StatusCode::BAD_REQUEST),
            (
                PortalError::DuplicateGrant {
                    user_id: "u1".into(),
                    project_id: "p1".into(),
                },
                StatusCode::CONFLICT,
            ),
            (PortalError::not_found("grant g1"), StatusCode::NOT_FOUND),
            (
                PortalError::Upstream {
                    status: 500,
                    body: "boom".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                PortalError::Transport("connection refused".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status_code, expected);
        }
    }

    #[test]
    fn test_message_is_kept() {
        let err = ApiError::from(PortalError::validation("Missing userId"));
        assert_eq!(err.error, "Validation error: Missing userId");
    }
}
