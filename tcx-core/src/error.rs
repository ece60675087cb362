use axum::response::{IntoResponse, Response};
use axum::{http::StatusCode, Json};

/// The one class of error the core ever surfaces to a caller (§7): a domain
/// or authentication failure. Context-shaping errors (malformed headers,
/// cache faults) are contained internally and never reach this type.
#[derive(Debug)]
pub enum CoreError {
    /// `require_auth = true` and the token was absent, invalid, or expired.
    AuthenticationFailed(String),
    Internal(String),
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::AuthenticationFailed(msg) => write!(f, "Authentication failed: {msg}"),
            CoreError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CoreError::AuthenticationFailed(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            CoreError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn authentication_failed_maps_to_401() {
        let resp = CoreError::AuthenticationFailed("expired".into()).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn internal_maps_to_500() {
        let resp = CoreError::Internal("boom".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
