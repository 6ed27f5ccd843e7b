//! Logical client identity and population namespace.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Identifier a peer declares at handshake time (field `client`).
///
/// Opaque and unvalidated beyond non-emptiness. It is not bound to the
/// connection in any cryptographic sense; a peer can claim any value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Parses a declared identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::AdmissionDenied`] if `raw` is empty.
    pub fn parse(raw: &str) -> Result<Self, RelayError> {
        if raw.is_empty() {
            return Err(RelayError::AdmissionDenied("missing client".to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ClientId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// One of the two connection populations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Human-facing clients; token-gated, receive the agent roster.
    User,
    /// Agents; appear in the roster while connected.
    Agent,
}

impl Namespace {
    /// Returns the population messages from this namespace are routed to.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::User => Self::Agent,
            Self::Agent => Self::User,
        }
    }

    /// Returns the namespace name as used in routes and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn empty_identifier_is_rejected() {
        let result = ClientId::parse("");
        assert!(matches!(result, Err(RelayError::AdmissionDenied(_))));
    }

    #[test]
    fn identifier_is_opaque() {
        let Ok(id) = ClientId::parse(" weird id/with:chars ") else {
            panic!("non-empty identifiers are accepted verbatim");
        };
        assert_eq!(id.as_str(), " weird id/with:chars ");
    }

    #[test]
    fn opposite_namespace() {
        assert_eq!(Namespace::User.opposite(), Namespace::Agent);
        assert_eq!(Namespace::Agent.opposite(), Namespace::User);
    }

    #[test]
    fn borrow_allows_str_lookup() {
        use std::collections::HashMap;
        let Ok(id) = ClientId::parse("agent1") else {
            panic!("valid id");
        };
        let mut map = HashMap::new();
        map.insert(id, 1);
        assert_eq!(map.get("agent1"), Some(&1));
    }
}
