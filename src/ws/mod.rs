//! WebSocket layer: handshake, per-connection session loop, upgrades.
//!
//! `/user` and `/agent` each accept WebSocket connections. Every text
//! frame carries one named event, `{"event": "...", "data": ...}`.

pub mod connection;
pub mod handler;
pub mod handshake;

pub use connection::WsConnection;
pub use handshake::Handshake;
