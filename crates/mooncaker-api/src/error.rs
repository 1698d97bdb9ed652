use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mooncaker_core::{CommandError, KeyError};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

/// Errors returned by the admin API.
///
/// Rendered as `{"error": "<message>"}` with the matching status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Command(String),

    #[error("service is shutting down")]
    Unavailable,

    #[error("failed to deliver message: {0}")]
    Delivery(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::InvalidRequest(_) | ApiError::Command(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Delivery(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CommandError> for ApiError {
    fn from(e: CommandError) -> Self {
        match e {
            CommandError::Key(KeyError::Closed) => ApiError::Unavailable,
            other => ApiError::Command(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            ApiError::Internal(_) => error!(error = %self, "admin api internal error"),
            ApiError::Delivery(_) | ApiError::Unavailable => {
                warn!(error = %self, "admin api request failed")
            }
            _ => info!(status = status.as_u16(), error = %self, "admin api request rejected"),
        }

        let message = match &self {
            ApiError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(ApiError::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Command("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Delivery("x".into()).status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn closed_key_store_maps_to_unavailable() {
        let err = ApiError::from(CommandError::Key(KeyError::Closed));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let err = ApiError::from(CommandError::Unknown("reboot".into()));
        assert!(matches!(err, ApiError::Command(msg) if msg.contains("reboot")));
    }
}
