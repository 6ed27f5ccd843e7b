//! # agent-relay
//!
//! Real-time relay between two populations of WebSocket clients, users
//! and agents. Messages are addressed by client identifier and forwarded
//! to the single live connection holding that identifier in the other
//! population. Users are admitted after an external token check and
//! receive a live roster of connected agents.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket /user, /agent; HTTP)
//!     │
//!     ├── WS Sessions (ws/)
//!     ├── REST Handlers (api/)
//!     │
//!     ├── RelayService (service/)
//!     │     ├── admission ── TokenValidator (auth/) ── auth service
//!     │     ├── routing
//!     │     └── roster broadcast
//!     │
//!     └── ClientRegistry ×2, Roster (domain/)
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod service;
pub mod ws;
