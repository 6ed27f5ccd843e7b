//! User token validation against the external auth service.
//!
//! [`TokenValidator`] is the seam the admission controller calls; the
//! production implementation is [`HttpTokenValidator`].

pub mod http;

pub use http::HttpTokenValidator;

use std::fmt;

use async_trait::async_trait;

use crate::error::RelayError;

/// Checks a bearer token presented by a connecting user.
///
/// Implementations are fail-closed: anything other than a positive
/// answer is an error.
#[async_trait]
pub trait TokenValidator: Send + Sync + fmt::Debug {
    /// Validates `token`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::AdmissionDenied`] if the token is rejected and
    /// [`RelayError::AuthServiceUnreachable`] if the check could not be
    /// completed.
    async fn validate(&self, token: &str) -> Result<(), RelayError>;
}
