use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use pawgate::PawgateError;
use pawgate_core::error::AuthError;
use serde_json::json;
use thiserror::Error;

pub const CONFIGURATION_ERROR_MESSAGE: &str = "Server configuration error";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not authenticated")]
    Unauthorized,

    #[error("Too many failed login attempts, try again in {retry_after} seconds")]
    Locked { retry_after: u64 },

    #[error("Too many login requests, try again in {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    #[error("Server configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<PawgateError> for ApiError {
    fn from(err: PawgateError) -> Self {
        match err {
            PawgateError::Auth(AuthError::InvalidCredentials) => ApiError::InvalidCredentials,
            PawgateError::Auth(AuthError::Unauthenticated) => ApiError::Unauthorized,
            PawgateError::Auth(AuthError::AccountLocked { retry_after }) => {
                ApiError::Locked { retry_after }
            }
            PawgateError::Auth(AuthError::RateLimited { retry_after }) => {
                ApiError::RateLimited { retry_after }
            }
            PawgateError::Validation(msg) => ApiError::BadRequest(msg),
            PawgateError::Configuration(msg) => ApiError::Configuration(msg),
            PawgateError::Storage(msg) => ApiError::InternalError(msg),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Locked { .. } => StatusCode::LOCKED,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Configuration(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn retry_after(&self) -> Option<u64> {
        match self {
            ApiError::Locked { retry_after } | ApiError::RateLimited { retry_after } => {
                Some(*retry_after)
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Server-side details stay in the log.
        let error_message = match &self {
            ApiError::Configuration(msg) => {
                tracing::error!(error = %msg, "Admin login is misconfigured");
                CONFIGURATION_ERROR_MESSAGE.to_string()
            }
            ApiError::InternalError(msg) => {
                tracing::error!(error = %msg, "Admin API request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({
            "error": error_message,
            "code": status.as_u16()
        });

        let Some(retry_after) = self.retry_after() else {
            return (status, Json(body)).into_response();
        };

        body["retryAfter"] = json!(retry_after);
        let mut response = (status, Json(body)).into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        response
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_locked_response_carries_retry_after() {
        let response = ApiError::Locked { retry_after: 1800 }.into_response();
        assert_eq!(response.status(), StatusCode::LOCKED);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1800");

        let body = body_json(response).await;
        assert_eq!(body["code"], 423);
        assert_eq!(body["retryAfter"], 1800);
    }

    #[tokio::test]
    async fn test_internal_details_are_not_exposed() {
        let response = ApiError::InternalError("disk on fire".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal server error");
        assert!(body.get("retryAfter").is_none());
    }

    #[tokio::test]
    async fn test_configuration_error_message() {
        let error: ApiError = PawgateError::Configuration("missing".to_string()).into();
        let body = body_json(error.into_response()).await;
        assert_eq!(body["error"], "Server configuration error");
        assert_eq!(body["code"], 500);
    }
}
