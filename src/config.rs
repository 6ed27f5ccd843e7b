//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::RelayError;

/// What happens to the existing connection when an identifier reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionConflictPolicy {
    /// Notify and close the displaced connection.
    #[default]
    ClosePrevious,
    /// Leave the displaced connection open; it is no longer routable.
    KeepPrevious,
}

impl FromStr for SessionConflictPolicy {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "close_previous" => Ok(Self::ClosePrevious),
            "keep_previous" => Ok(Self::KeepPrevious),
            other => Err(RelayError::Config(format!(
                "unknown session conflict policy: {other}"
            ))),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Admission rules applied by the relay service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdmissionPolicy {
    /// Agents must present a non-empty token.
    pub agent_token_required: bool,
    /// Reconnect handling.
    pub session_conflict: SessionConflictPolicy,
}

/// Per-connection transport limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long a connection without handshake identity may take to send
    /// its `login` event.
    pub login_timeout: Duration,
    /// Interval between server pings.
    pub ping_interval: Duration,
    /// A peer that sends nothing within this long after a ping is dropped.
    pub pong_timeout: Duration,
    /// Outbound frames buffered per connection before emits are dropped.
    pub outbound_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            login_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(25),
            pong_timeout: Duration::from_secs(20),
            outbound_capacity: 256,
        }
    }
}

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Base URL of the auth service (`API`). Empty rejects every user.
    pub auth_api_base: String,

    /// Upper bound on one token check.
    pub auth_timeout: Duration,

    /// Transport limits applied to every WebSocket session.
    pub session: SessionConfig,

    /// Admission rules.
    pub admission: AdmissionPolicy,

    /// Log output format.
    pub log_format: LogFormat,
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file,
    /// then reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] if the listen address or the session
    /// conflict policy cannot be parsed.
    pub fn from_env() -> Result<Self, RelayError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] if the listen address or the session
    /// conflict policy cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RelayError> {
        let listen_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{port}"),
            None => lookup("LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        };
        let listen_addr: SocketAddr = listen_addr
            .parse()
            .map_err(|e| RelayError::Config(format!("listen address {listen_addr}: {e}")))?;

        let auth_api_base = lookup("API").unwrap_or_default();
        let auth_timeout = Duration::from_millis(parse_value(&lookup, "AUTH_TIMEOUT_MS", 5_000));
        let defaults = SessionConfig::default();
        let session = SessionConfig {
            login_timeout: parse_secs(&lookup, "LOGIN_TIMEOUT_SECS", defaults.login_timeout),
            ping_interval: parse_secs(&lookup, "PING_INTERVAL_SECS", defaults.ping_interval),
            pong_timeout: parse_secs(&lookup, "PONG_TIMEOUT_SECS", defaults.pong_timeout),
            outbound_capacity: parse_value(
                &lookup,
                "OUTBOUND_QUEUE_CAPACITY",
                defaults.outbound_capacity,
            )
            .max(1),
        };

        let session_conflict = match lookup("SESSION_CONFLICT_POLICY") {
            Some(raw) => raw.parse()?,
            None => SessionConflictPolicy::default(),
        };
        let admission = AdmissionPolicy {
            agent_token_required: parse_bool(&lookup, "AGENT_TOKEN_REQUIRED", false),
            session_conflict,
        };

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            Some("json") | Some("JSON") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            listen_addr,
            auth_api_base,
            auth_timeout,
            session,
            admission,
            log_format,
        })
    }
}

/// Parses a whole number of seconds; zero falls back to `default`.
fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Duration {
    match parse_value(lookup, key, 0u64) {
        0 => default,
        secs => Duration::from_secs(secs),
    }
}

/// Parses a variable as `T`, returning `default` on missing or invalid
/// values.
fn parse_value<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses a variable as a boolean. Accepts `"true"`, `"1"`, `"false"`,
/// `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    match lookup(key).map(|v| v.to_ascii_lowercase()).as_deref() {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
}
