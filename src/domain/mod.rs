//! Domain layer: identities, registries, roster, and relay payloads.
//!
//! This module contains the transport-agnostic model of the relay: who
//! a peer claims to be, which connection currently holds each
//! identifier, what the agent roster looks like, and the named events
//! exchanged with peers.

pub mod client_id;
pub mod client_registry;
pub mod connection;
pub mod connection_id;
pub mod message;
pub mod roster;

pub use client_id::{ClientId, Namespace};
pub use client_registry::{ClientRegistry, RegistryEntry};
pub use connection::Connection;
pub use connection_id::ConnectionId;
pub use message::{AudioMessage, ClientEvent, CommandInfo, RelayMessage, ServerEvent};
pub use roster::Roster;
