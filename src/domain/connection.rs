//! Connection handle seam between the relay core and the transport.
//!
//! The transport owns each socket. The core only sees an
//! `Arc<dyn Connection>` it can emit events on or force-close.

use std::fmt;

use super::ConnectionId;
use super::message::ServerEvent;
use crate::error::RelayError;

/// One live duplex connection as seen by the relay core.
///
/// Implementations must not block: `emit` queues the event for the
/// transport and returns immediately.
pub trait Connection: Send + Sync + fmt::Debug {
    /// Identifier of this physical connection.
    fn id(&self) -> ConnectionId;

    /// Queues `event` for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ConnectionClosed`] if the transport side is
    /// gone.
    fn emit(&self, event: &ServerEvent) -> Result<(), RelayError>;

    /// Forcibly closes the connection with a WebSocket close code.
    fn close(&self, code: u16, reason: &str);
}
