//! WebSocket session: admission, read loop, heartbeat, and outbound writer.
//!
//! Each accepted socket is split. A writer task owns the sink and drains a
//! bounded mpsc queue; emits from the relay core use `try_send`, so they
//! never block and a peer that stops reading loses events instead of
//! growing the queue. Close requests travel on a watch channel, so a full
//! queue never holds back a forced close. The session task resolves the
//! peer's identity, asks the relay to admit it, dispatches inbound events
//! and pings the peer until the socket ends, the peer misses its pong
//! deadline, or the connection is force-closed, then reports the
//! disconnect.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::handshake::Handshake;
use crate::app_state::AppState;
use crate::domain::{ClientEvent, ClientId, Connection, ConnectionId, Namespace, ServerEvent};
use crate::error::{CLOSE_LOGIN_TIMEOUT, RelayError};
use crate::service::RelayService;

/// Normal closure (RFC 6455).
const CLOSE_NORMAL: u16 = 1000;
/// Going away (RFC 6455), sent to peers that missed their pong deadline.
const CLOSE_GOING_AWAY: u16 = 1001;

/// Close code and reason requested for a connection.
type CloseRequest = (u16, String);

/// Frames queued for the writer task.
#[derive(Debug)]
enum Outbound {
    Text(String),
    Ping,
}

/// [`Connection`] backed by a WebSocket writer task.
#[derive(Debug)]
pub struct WsConnection {
    id: ConnectionId,
    outbound: mpsc::Sender<Outbound>,
    closing: watch::Sender<Option<CloseRequest>>,
}

impl WsConnection {
    fn new(
        outbound: mpsc::Sender<Outbound>,
        closing: watch::Sender<Option<CloseRequest>>,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            outbound,
            closing,
        }
    }

    /// Queues a ping. Returns `false` if the queue is full or gone.
    fn ping(&self) -> bool {
        self.outbound.try_send(Outbound::Ping).is_ok()
    }
}

impl Connection for WsConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn emit(&self, event: &ServerEvent) -> Result<(), RelayError> {
        if self.closing.borrow().is_some() {
            return Err(RelayError::ConnectionClosed);
        }
        let text = event.encode()?;
        match self.outbound.try_send(Outbound::Text(text)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    conn_id = %self.id,
                    event = event.name(),
                    "outbound queue full, dropping event"
                );
                Err(RelayError::Backpressure)
            }
            Err(TrySendError::Closed(_)) => Err(RelayError::ConnectionClosed),
        }
    }

    fn close(&self, code: u16, reason: &str) {
        // First close wins.
        self.closing.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            *state = Some((code, reason.to_string()));
            true
        });
    }
}

/// Runs one WebSocket session in `namespace` to completion.
pub async fn run_session(
    socket: WebSocket,
    namespace: Namespace,
    handshake: Handshake,
    state: AppState,
) {
    let limits = state.session;
    let (ws_tx, mut ws_rx) = socket.split();
    let (tx, rx) = mpsc::channel(limits.outbound_capacity);
    let (closing_tx, mut closing_rx) = watch::channel(None);
    let writer = tokio::spawn(writer_task(ws_tx, rx, closing_tx.subscribe()));

    let connection = Arc::new(WsConnection::new(tx, closing_tx));
    let conn_id = connection.id();

    let identity = match handshake.identity() {
        Some(identity) => Some(identity),
        None => await_login(&mut ws_rx, limits.login_timeout).await,
    };
    let Some((declared, token)) = identity else {
        tracing::warn!(%namespace, %conn_id, "no client identity before login timeout");
        let _ = connection.emit(&ServerEvent::Notify("missing client".to_string()));
        connection.close(CLOSE_LOGIN_TIMEOUT, "login timeout");
        finish_writer(writer, limits.pong_timeout).await;
        return;
    };

    let handle: Arc<dyn Connection> = Arc::clone(&connection) as Arc<dyn Connection>;
    let admitted = state
        .relay
        .admit(namespace, handle, &declared, token.as_deref())
        .await;
    let Ok(client) = admitted else {
        // The relay already notified and closed the connection.
        finish_writer(writer, limits.pong_timeout).await;
        return;
    };

    let mut heartbeat = tokio::time::interval_at(
        Instant::now() + limits.ping_interval,
        limits.ping_interval,
    );
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ping_sent: Option<Instant> = None;

    loop {
        tokio::select! {
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(%client, error = %e, "ws read error");
                    break;
                }
                Some(Ok(frame)) => {
                    // Any inbound frame proves the peer is alive.
                    ping_sent = None;
                    if let Message::Text(text) = frame {
                        dispatch(&state.relay, namespace, &client, text.as_str()).await;
                    }
                }
            },
            _ = heartbeat.tick() => {
                if ping_sent.is_some_and(|sent| sent.elapsed() >= limits.pong_timeout) {
                    tracing::warn!(%client, %namespace, %conn_id, "pong deadline missed");
                    connection.close(CLOSE_GOING_AWAY, "pong timeout");
                    break;
                }
                if ping_sent.is_none() {
                    let _ = connection.ping();
                    ping_sent = Some(Instant::now());
                }
            }
            _ = closing_rx.changed() => break,
        }
    }

    state.relay.handle_disconnect(namespace, &client, conn_id).await;
    connection.close(CLOSE_NORMAL, "");
    drop(connection);
    finish_writer(writer, limits.pong_timeout).await;
    tracing::debug!(%client, %namespace, %conn_id, "ws session ended");
}

/// Routes one inbound frame. Malformed frames are dropped; the
/// connection stays open.
async fn dispatch(relay: &RelayService, namespace: Namespace, client: &ClientId, text: &str) {
    match ClientEvent::decode(text) {
        Ok(ClientEvent::Msg(msg)) => {
            relay.route_message(namespace, client, msg).await;
        }
        Ok(ClientEvent::Audio(audio)) => {
            relay.route_audio(namespace, client, audio).await;
        }
        Ok(ClientEvent::Login(_)) => {
            tracing::debug!(%client, "login after admission ignored");
        }
        Err(e) => {
            tracing::debug!(%client, %namespace, error = %e, "dropping malformed frame");
        }
    }
}

/// Waits for a `login` event carrying the peer's identity.
async fn await_login(
    ws_rx: &mut SplitStream<WebSocket>,
    wait: Duration,
) -> Option<(String, Option<String>)> {
    let login = async {
        while let Some(Ok(frame)) = ws_rx.next().await {
            let Message::Text(text) = frame else {
                continue;
            };
            match ClientEvent::decode(text.as_str()) {
                Ok(ClientEvent::Login(login)) => return Some((login.client, login.token)),
                Ok(_) => tracing::debug!("event before login ignored"),
                Err(e) => tracing::debug!(error = %e, "malformed frame before login"),
            }
        }
        None
    };
    tokio::time::timeout(wait, login).await.ok().flatten()
}

/// Drains the outbound queue into the socket. Once a close is requested,
/// frames already queued are flushed ahead of the Close frame.
async fn writer_task(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Outbound>,
    mut closing: watch::Receiver<Option<CloseRequest>>,
) {
    loop {
        tokio::select! {
            biased;
            _ = closing.changed() => break,
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if write_frame(&mut sink, frame).await.is_err() {
                        return;
                    }
                }
                None => break,
            },
        }
    }

    while let Ok(frame) = outbound.try_recv() {
        if write_frame(&mut sink, frame).await.is_err() {
            return;
        }
    }
    let request = closing.borrow().clone();
    if let Some((code, reason)) = request {
        let close = CloseFrame {
            code,
            reason: reason.into(),
        };
        let _ = sink.send(Message::Close(Some(close))).await;
    }
}

async fn write_frame(
    sink: &mut SplitSink<WebSocket, Message>,
    frame: Outbound,
) -> Result<(), axum::Error> {
    let message = match frame {
        Outbound::Text(text) => Message::text(text),
        Outbound::Ping => Message::Ping(Bytes::new()),
    };
    sink.send(message).await
}

/// Gives the writer `grace` to flush, then aborts it; a dead peer must
/// not pin the task.
async fn finish_writer(mut writer: JoinHandle<()>, grace: Duration) {
    if tokio::time::timeout(grace, &mut writer).await.is_err() {
        writer.abort();
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn connection(
        capacity: usize,
    ) -> (
        WsConnection,
        mpsc::Receiver<Outbound>,
        watch::Receiver<Option<CloseRequest>>,
    ) {
        let (tx, rx) = mpsc::channel(capacity);
        let (closing_tx, closing_rx) = watch::channel(None);
        (WsConnection::new(tx, closing_tx), rx, closing_rx)
    }

    fn notify(text: &str) -> ServerEvent {
        ServerEvent::Notify(text.to_string())
    }

    #[tokio::test]
    async fn emit_queues_encoded_event() {
        let (conn, mut rx, _closing) = connection(8);

        assert!(conn.emit(&notify("hi")).is_ok());
        let Some(Outbound::Text(text)) = rx.recv().await else {
            panic!("text frame queued");
        };
        assert_eq!(text, r#"{"event":"notify","data":"hi"}"#);
    }

    #[tokio::test]
    async fn full_queue_drops_events_instead_of_buffering() {
        let (conn, mut rx, _closing) = connection(2);
        let payload = "x".repeat(64 * 1024);

        assert!(conn.emit(&notify(&payload)).is_ok());
        assert!(conn.emit(&notify(&payload)).is_ok());
        for _ in 0..100 {
            assert!(matches!(
                conn.emit(&notify(&payload)),
                Err(RelayError::Backpressure)
            ));
        }
        assert!(!conn.ping());

        // The peer catches up; delivery resumes.
        assert!(rx.recv().await.is_some());
        assert!(conn.emit(&notify("again")).is_ok());
        assert!(rx.recv().await.is_some());
        let Some(Outbound::Text(text)) = rx.recv().await else {
            panic!("latest event queued");
        };
        assert!(text.contains("again"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn close_with_full_queue_still_signals_reader_and_writer() {
        let (conn, _rx, mut closing) = connection(1);
        assert!(conn.emit(&notify("fills the queue")).is_ok());

        conn.close(4003, "session replaced");
        assert!(closing.changed().await.is_ok());
        assert_eq!(
            *closing.borrow(),
            Some((4003, "session replaced".to_string()))
        );
    }

    #[tokio::test]
    async fn first_close_wins() {
        let (conn, _rx, closing) = connection(4);
        conn.close(4003, "session replaced");
        conn.close(1000, "");
        assert_eq!(closing.borrow().as_ref().map(|(code, _)| *code), Some(4003));
    }

    #[tokio::test]
    async fn emit_after_close_reports_closed() {
        let (conn, _rx, _closing) = connection(4);
        conn.close(1000, "");
        assert!(matches!(
            conn.emit(&notify("late")),
            Err(RelayError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn emit_after_writer_exit_reports_closed() {
        let (conn, rx, _closing) = connection(4);
        drop(rx);

        assert!(matches!(
            conn.emit(&notify("late")),
            Err(RelayError::ConnectionClosed)
        ));
        assert!(!conn.ping());
    }

    #[tokio::test]
    async fn ping_queues_ping_frame() {
        let (conn, mut rx, _closing) = connection(4);
        assert!(conn.ping());
        assert!(matches!(rx.recv().await, Some(Outbound::Ping)));
    }
}
