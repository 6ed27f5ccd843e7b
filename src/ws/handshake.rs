//! Handshake identity: `client` and `token` from headers or query string.

use axum::http::HeaderMap;
use serde::Deserialize;

/// Identity fields presented when the connection was opened.
///
/// Headers (`Client`, `Token`) take precedence over query parameters
/// (`?client=..&token=..`); browsers cannot set WebSocket headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Handshake {
    /// Declared client identifier.
    pub client: Option<String>,
    /// Bearer token.
    pub token: Option<String>,
}

impl Handshake {
    /// Overlays header values onto the query-string handshake.
    #[must_use]
    pub fn merge(headers: &HeaderMap, query: Self) -> Self {
        Self {
            client: header(headers, "client").or(query.client),
            token: header(headers, "token").or(query.token),
        }
    }

    /// Returns `(client, token)` if a non-empty client was declared.
    ///
    /// `None` means the peer is expected to identify itself with a
    /// `login` event.
    #[must_use]
    pub fn identity(self) -> Option<(String, Option<String>)> {
        match self.client {
            Some(client) if !client.is_empty() => Some((client, self.token)),
            _ => None,
        }
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn headers_win_over_query() {
        let mut headers = HeaderMap::new();
        headers.insert("Client", HeaderValue::from_static("from-header"));
        let query = Handshake {
            client: Some("from-query".to_string()),
            token: Some("query-token".to_string()),
        };

        let merged = Handshake::merge(&headers, query);
        assert_eq!(merged.client.as_deref(), Some("from-header"));
        assert_eq!(merged.token.as_deref(), Some("query-token"));
    }

    #[test]
    fn empty_client_defers_to_login() {
        let handshake = Handshake {
            client: Some(String::new()),
            token: Some("t".to_string()),
        };
        assert_eq!(handshake.identity(), None);
        assert_eq!(Handshake::default().identity(), None);
    }

    #[test]
    fn identity_carries_token() {
        let handshake = Handshake {
            client: Some("userA".to_string()),
            token: Some("t".to_string()),
        };
        assert_eq!(
            handshake.identity(),
            Some(("userA".to_string(), Some("t".to_string())))
        );
    }
}
