//! HTTP token check: `GET {API}/api/v1/token/check`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::TokenValidator;
use crate::error::RelayError;

/// Path of the token check endpoint, relative to the auth service base URL.
pub const TOKEN_CHECK_PATH: &str = "/api/v1/token/check";

/// Validates tokens by calling the auth service with
/// `Authorization: Bearer <token>`. Only an exact `200 OK` admits.
#[derive(Debug, Clone)]
pub struct HttpTokenValidator {
    client: reqwest::Client,
    check_url: String,
}

impl HttpTokenValidator {
    /// Creates a validator for the auth service at `api_base`, bounding
    /// every check by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] if the HTTP client cannot be built.
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Config(format!("auth client: {e}")))?;
        Ok(Self {
            client,
            check_url: format!("{}{TOKEN_CHECK_PATH}", api_base.trim_end_matches('/')),
        })
    }

    /// Full URL of the token check endpoint.
    #[must_use]
    pub fn check_url(&self) -> &str {
        &self.check_url
    }
}

#[async_trait]
impl TokenValidator for HttpTokenValidator {
    async fn validate(&self, token: &str) -> Result<(), RelayError> {
        if token.is_empty() {
            return Err(RelayError::AdmissionDenied("missing token".to_string()));
        }

        let response = self
            .client
            .get(&self.check_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %self.check_url, error = %e, "token check failed");
                RelayError::AuthServiceUnreachable(e.to_string())
            })?;

        let status = response.status();
        tracing::debug!(%status, "token check");
        if status == StatusCode::OK {
            Ok(())
        } else {
            Err(RelayError::AdmissionDenied(format!(
                "token rejected ({status})"
            )))
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::get;

    /// Serves a token check that accepts `Bearer good`, answers `204` for
    /// `Bearer empty` and stalls on `Bearer slow`.
    async fn spawn_auth_service() -> String {
        async fn check(headers: HeaderMap) -> AxumStatus {
            match headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
            {
                Some("Bearer good") => AxumStatus::OK,
                Some("Bearer empty") => AxumStatus::NO_CONTENT,
                Some("Bearer slow") => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    AxumStatus::OK
                }
                _ => AxumStatus::UNAUTHORIZED,
            }
        }

        let app = Router::new().route(TOKEN_CHECK_PATH, get(check));
        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind auth service");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("local addr");
        };
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    fn validator(base: &str, timeout_ms: u64) -> HttpTokenValidator {
        let Ok(v) = HttpTokenValidator::new(base, Duration::from_millis(timeout_ms)) else {
            panic!("client builds");
        };
        v
    }

    #[test]
    fn check_url_joins_base() {
        let v = validator("http://auth.local/", 100);
        assert_eq!(v.check_url(), "http://auth.local/api/v1/token/check");
    }

    #[tokio::test]
    async fn accepts_only_exact_200() {
        let base = spawn_auth_service().await;
        let v = validator(&base, 2_000);

        assert!(v.validate("good").await.is_ok());
        assert!(matches!(
            v.validate("empty").await,
            Err(RelayError::AdmissionDenied(_))
        ));
        assert!(matches!(
            v.validate("bad").await,
            Err(RelayError::AdmissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn empty_token_is_denied_without_a_call() {
        let v = validator("http://127.0.0.1:1", 100);
        assert!(matches!(
            v.validate("").await,
            Err(RelayError::AdmissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn timeout_fails_closed() {
        let base = spawn_auth_service().await;
        let v = validator(&base, 200);
        assert!(matches!(
            v.validate("slow").await,
            Err(RelayError::AuthServiceUnreachable(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_service_fails_closed() {
        // Port 1 is reserved and refuses connections on loopback.
        let v = validator("http://127.0.0.1:1", 500);
        assert!(matches!(
            v.validate("good").await,
            Err(RelayError::AuthServiceUnreachable(_))
        ));
    }
}
