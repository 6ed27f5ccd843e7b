//! Relay error types with WebSocket close code and HTTP status mapping.
//!
//! [`RelayError`] is the central error type for the relay. Admission
//! failures map to a WebSocket close code sent to the rejected peer; the
//! REST surface maps every variant to an HTTP status and a structured
//! JSON error body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Close code sent when admission is denied.
pub const CLOSE_ADMISSION_DENIED: u16 = 4001;
/// Close code sent when the auth service could not be reached.
pub const CLOSE_AUTH_UNREACHABLE: u16 = 4002;
/// Close code sent to a session displaced by a newer one.
pub const CLOSE_SESSION_REPLACED: u16 = 4003;
/// Close code sent when no `login` event arrived in time.
pub const CLOSE_LOGIN_TIMEOUT: u16 = 4004;

/// Structured JSON error response body.
///
/// ```json
/// {
///   "error": {
///     "code": 3000,
///     "message": "internal error: roster unavailable"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Relay error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category   | HTTP Status               |
/// |-----------|------------|---------------------------|
/// | 1000–1999 | Validation | 400 Bad Request           |
/// | 2000–2999 | Admission  | 401 / 502                 |
/// | 3000–3999 | Server     | 500 / 503                 |
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Empty identifier or failed token validation.
    #[error("admission denied: {0}")]
    AdmissionDenied(String),

    /// The external token check could not be completed.
    #[error("auth service unreachable: {0}")]
    AuthServiceUnreachable(String),

    /// An inbound payload did not decode into the expected shape.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// The outbound side of a connection is gone.
    #[error("connection closed")]
    ConnectionClosed,

    /// The connection's outbound queue is full; the event was dropped.
    #[error("outbound queue full")]
    Backpressure,

    /// Invalid process configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::MalformedMessage(_) => 1001,
            Self::Config(_) => 1002,
            Self::AdmissionDenied(_) => 2001,
            Self::AuthServiceUnreachable(_) => 2002,
            Self::ConnectionClosed => 3001,
            Self::Backpressure => 3002,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedMessage(_) | Self::Config(_) => StatusCode::BAD_REQUEST,
            Self::AdmissionDenied(_) => StatusCode::UNAUTHORIZED,
            Self::AuthServiceUnreachable(_) => StatusCode::BAD_GATEWAY,
            Self::Backpressure => StatusCode::SERVICE_UNAVAILABLE,
            Self::ConnectionClosed | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the WebSocket close code used when this error ends a
    /// connection.
    #[must_use]
    pub const fn close_code(&self) -> u16 {
        match self {
            Self::AuthServiceUnreachable(_) => CLOSE_AUTH_UNREACHABLE,
            Self::AdmissionDenied(_) => CLOSE_ADMISSION_DENIED,
            // 1011: internal error (RFC 6455)
            _ => 1011,
        }
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedMessage(err.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn admission_errors_map_to_application_close_codes() {
        let denied = RelayError::AdmissionDenied("empty client".to_string());
        assert_eq!(denied.close_code(), CLOSE_ADMISSION_DENIED);

        let unreachable = RelayError::AuthServiceUnreachable("timeout".to_string());
        assert_eq!(unreachable.close_code(), CLOSE_AUTH_UNREACHABLE);
        assert_eq!(unreachable.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn serde_errors_become_malformed_message() {
        let err = serde_json::from_str::<serde_json::Value>("{not json")
            .map_err(RelayError::from)
            .err();
        let Some(err) = err else {
            panic!("expected a decode error");
        };
        assert_eq!(err.error_code(), 1001);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn backpressure_is_a_server_side_condition() {
        let err = RelayError::Backpressure;
        assert_eq!(err.error_code(), 3002);
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.close_code(), 1011);
    }

    #[test]
    fn into_response_sets_status() {
        let response = RelayError::Internal("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
