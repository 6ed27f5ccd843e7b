//! Relay payloads and the named events carried over a connection.
//!
//! Every frame on the wire is one named event:
//! `{"event": "<name>", "data": <payload>}`. [`ClientEvent`] covers what a
//! peer may send, [`ServerEvent`] what the relay emits.

use serde::{Deserialize, Serialize};

use super::Roster;
use super::client_id::ClientId;
use crate::error::RelayError;

/// Opaque command document. Forwarded verbatim, key order preserved.
pub type CommandInfo = serde_json::Map<String, serde_json::Value>;

/// Addressed command message (`msg` event).
///
/// `from` as received is untrusted; the router overwrites it with the
/// sender's authenticated identity before forwarding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayMessage {
    /// Sender identity (stamped by the relay).
    #[serde(default)]
    pub from: String,
    /// Recipient identity in the opposite population.
    #[serde(default)]
    pub to: String,
    /// Free-form command discriminator.
    #[serde(default)]
    pub command_type: String,
    /// Opaque command payload.
    #[serde(default)]
    pub command_info: CommandInfo,
}

/// Media-carrying message (`audio` event).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioMessage {
    /// Sender identity (stamped by the relay).
    #[serde(default)]
    pub from: String,
    /// Recipient identity in the opposite population.
    #[serde(default)]
    pub to: String,
    /// Encoded media chunk.
    #[serde(default)]
    pub data: String,
}

/// Identity sent in a `login` event when the handshake carried none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoginPayload {
    /// Declared client identifier.
    #[serde(default)]
    pub client: String,
    /// Bearer token (users only).
    #[serde(default)]
    pub token: Option<String>,
}

/// Events a connected peer may send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Late identity declaration.
    Login(LoginPayload),
    /// Command message to a peer in the other population.
    Msg(RelayMessage),
    /// Media chunk to a peer in the other population.
    Audio(AudioMessage),
}

impl ClientEvent {
    /// Decodes one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MalformedMessage`] if the frame is not a known
    /// event or its payload does not match the event's shape.
    pub fn decode(text: &str) -> Result<Self, RelayError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Events the relay emits to a connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Current agent roster.
    ListAgents(Roster),
    /// Forwarded command message.
    Msg(RelayMessage),
    /// Forwarded media chunk.
    Audio(AudioMessage),
    /// Human-readable notice, sent before a forced close.
    Notify(String),
}

impl ServerEvent {
    /// Returns the event name as it appears on the wire.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ListAgents(_) => "list_agents",
            Self::Msg(_) => "msg",
            Self::Audio(_) => "audio",
            Self::Notify(_) => "notify",
        }
    }

    /// Encodes the event as a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Internal`] if serialization fails.
    pub fn encode(&self) -> Result<String, RelayError> {
        serde_json::to_string(self).map_err(|e| RelayError::Internal(e.to_string()))
    }
}

/// Addressed payloads the router can forward.
pub trait Routable {
    /// Recipient identifier as sent by the peer.
    fn recipient(&self) -> &str;

    /// Overwrites the sender with the authenticated identity.
    fn stamp_sender(&mut self, sender: &ClientId);

    /// Wraps the payload in the event it arrived on.
    fn into_event(self) -> ServerEvent;
}

impl Routable for RelayMessage {
    fn recipient(&self) -> &str {
        &self.to
    }

    fn stamp_sender(&mut self, sender: &ClientId) {
        self.from = sender.to_string();
    }

    fn into_event(self) -> ServerEvent {
        ServerEvent::Msg(self)
    }
}

impl Routable for AudioMessage {
    fn recipient(&self) -> &str {
        &self.to
    }

    fn stamp_sender(&mut self, sender: &ClientId) {
        self.from = sender.to_string();
    }

    fn into_event(self) -> ServerEvent {
        ServerEvent::Audio(self)
    }
}
