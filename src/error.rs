use axum::http::header::RETRY_AFTER;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

/// API error types
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing authorization header. Provide 'Authorization: Bearer <token>'")]
    MissingAuth,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Content fingerprint mismatch. Expected: {expected}, Got: {given}")]
    FingerprintMismatch { expected: String, given: String },

    #[error("Content too large: max {0} characters allowed")]
    ContentTooLarge(usize),

    #[error("Translation rate limit exceeded. Try again in {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    #[error("Translation service temporarily unavailable. Please try again")]
    BackendUnavailable,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Get HTTP status code for this error
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingAuth | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::FingerprintMismatch { .. } => StatusCode::BAD_REQUEST,
            ApiError::ContentTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::BackendUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Storage(_) | ApiError::Internal(_) | ApiError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get error code string
    fn error_code(&self) -> &'static str {
        match self {
            ApiError::MissingAuth => "AUTH_MISSING",
            ApiError::InvalidToken => "AUTH_INVALID",
            ApiError::FingerprintMismatch { .. } => "FINGERPRINT_MISMATCH",
            ApiError::ContentTooLarge(_) => "CONTENT_TOO_LARGE",
            ApiError::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            ApiError::BackendUnavailable => "BACKEND_UNAVAILABLE",
            ApiError::Storage(_) => "STORAGE_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::Config(_) => "CONFIG_ERROR",
            ApiError::NotFound => "NOT_FOUND",
        }
    }

    /// Structured details for errors where the message alone is not enough
    /// for the caller to act on.
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::FingerprintMismatch { expected, given } => Some(json!({
                "expected_fingerprint": expected,
                "given_fingerprint": given,
            })),
            ApiError::RateLimited { retry_after } => Some(json!({
                "retry_after_seconds": retry_after,
            })),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code().to_string();
        // Storage and internal errors carry connection strings and SQL in
        // their sources; log the full chain but keep the response terse.
        let message = match &self {
            ApiError::Storage(detail) | ApiError::Internal(detail) => {
                tracing::error!(error = %detail, code = %error_code, "internal failure");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                code: error_code,
                message,
                details: self.details(),
            },
        });

        let mut response = (status, body).into_response();

        if let ApiError::RateLimited { retry_after } = self {
            if let Ok(value) = retry_after.to_string().parse() {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }

        response
    }
}

impl From<std::net::AddrParseError> for ApiError {
    fn from(err: std::net::AddrParseError) -> Self {
        ApiError::Config(format!("Invalid address: {err}"))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Internal(format!("IO error: {err}"))
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(format!("JSON error: {err}"))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(ApiError::MissingAuth.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::FingerprintMismatch {
                expected: "a".into(),
                given: "b".into()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::RateLimited { retry_after: 60 }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::BackendUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::ContentTooLarge(5000).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn rate_limited_sets_retry_after_header() {
        let response = ApiError::RateLimited { retry_after: 1800 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(RETRY_AFTER).unwrap().to_str().unwrap(),
            "1800"
        );
    }

    #[test]
    fn mismatch_details_include_both_digests() {
        let err = ApiError::FingerprintMismatch {
            expected: "aaaa".into(),
            given: "bbbb".into(),
        };
        let details = err.details().unwrap();
        assert_eq!(details["expected_fingerprint"], "aaaa");
        assert_eq!(details["given_fingerprint"], "bbbb");
    }
}
