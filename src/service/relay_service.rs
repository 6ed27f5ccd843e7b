//! Relay service: admission, routing, roster broadcast, and disconnects.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use utoipa::ToSchema;

use crate::auth::TokenValidator;
use crate::config::{AdmissionPolicy, SessionConflictPolicy};
use crate::domain::message::Routable;
use crate::domain::{
    AudioMessage, ClientId, ClientRegistry, Connection, ConnectionId, Namespace, RelayMessage,
    Roster, ServerEvent,
};
use crate::error::{CLOSE_SESSION_REPLACED, RelayError};

/// Result of one routing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Handed to the recipient's connection.
    Delivered,
    /// No live recipient; the message is discarded silently.
    Dropped,
}

/// Connection counts per population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct RelayStats {
    /// Registered users.
    pub users: usize,
    /// Registered agents.
    pub agents: usize,
}

/// Core of the relay, constructed once at startup and shared by every
/// connection handler.
///
/// Owns the user and agent registries; the agent roster is derived from
/// the agent registry, so the two never disagree. Roster fan-out is
/// serialized by a broadcast gate so each user sees snapshots in mutation
/// order, while registry locks are released before any event is emitted.
#[derive(Debug)]
pub struct RelayService {
    users: ClientRegistry,
    agents: ClientRegistry,
    validator: Arc<dyn TokenValidator>,
    policy: AdmissionPolicy,
    roster_gate: Mutex<()>,
}

impl RelayService {
    /// Creates a relay with empty registries.
    #[must_use]
    pub fn new(validator: Arc<dyn TokenValidator>, policy: AdmissionPolicy) -> Self {
        Self {
            users: ClientRegistry::new(Namespace::User),
            agents: ClientRegistry::new(Namespace::Agent),
            validator,
            policy,
            roster_gate: Mutex::new(()),
        }
    }

    /// Returns the registry for `namespace`.
    #[must_use]
    pub fn registry(&self, namespace: Namespace) -> &ClientRegistry {
        match namespace {
            Namespace::User => &self.users,
            Namespace::Agent => &self.agents,
        }
    }

    /// Admits a connection into `namespace`.
    ///
    /// # Errors
    ///
    /// See [`Self::admit_user`] and [`Self::admit_agent`].
    pub async fn admit(
        &self,
        namespace: Namespace,
        connection: Arc<dyn Connection>,
        declared_id: &str,
        token: Option<&str>,
    ) -> Result<ClientId, RelayError> {
        match namespace {
            Namespace::User => self.admit_user(connection, declared_id, token).await,
            Namespace::Agent => self.admit_agent(connection, declared_id, token).await,
        }
    }

    /// Admits a user after validating its bearer token.
    ///
    /// The token check runs before any lock is taken. On success the user
    /// is registered and immediately receives the current roster. On
    /// failure the connection is notified and closed.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::AdmissionDenied`] for an empty identifier or a
    /// missing or rejected token, and [`RelayError::AuthServiceUnreachable`]
    /// if the token check could not complete.
    pub async fn admit_user(
        &self,
        connection: Arc<dyn Connection>,
        declared_id: &str,
        token: Option<&str>,
    ) -> Result<ClientId, RelayError> {
        let client = match self.check_user(declared_id, token).await {
            Ok(client) => client,
            Err(err) => {
                reject(connection.as_ref(), Namespace::User, declared_id, &err);
                return Err(err);
            }
        };

        let displaced = {
            let _gate = self.roster_gate.lock().await;
            let displaced = self
                .users
                .register(client.clone(), Arc::clone(&connection))
                .await;
            let roster = self.agents.roster().await;
            if let Err(e) = connection.emit(&ServerEvent::ListAgents(roster)) {
                tracing::debug!(%client, error = %e, "initial roster not delivered");
            }
            displaced
        };
        self.resolve_conflict(Namespace::User, &client, displaced);

        tracing::info!(%client, conn_id = %connection.id(), "user connected");
        Ok(client)
    }

    /// Admits an agent and broadcasts the updated roster to every user.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::AdmissionDenied`] for an empty identifier, or a
    /// missing token when the policy requires agent tokens.
    pub async fn admit_agent(
        &self,
        connection: Arc<dyn Connection>,
        declared_id: &str,
        token: Option<&str>,
    ) -> Result<ClientId, RelayError> {
        let client = match self.check_agent(declared_id, token) {
            Ok(client) => client,
            Err(err) => {
                reject(connection.as_ref(), Namespace::Agent, declared_id, &err);
                return Err(err);
            }
        };

        let displaced = {
            let _gate = self.roster_gate.lock().await;
            let displaced = self
                .agents
                .register(client.clone(), Arc::clone(&connection))
                .await;
            self.fan_out_roster().await;
            displaced
        };
        self.resolve_conflict(Namespace::Agent, &client, displaced);

        tracing::info!(%client, conn_id = %connection.id(), "agent connected");
        Ok(client)
    }

    /// Forwards a `msg` from `sender` to the opposite population.
    pub async fn route_message(
        &self,
        from: Namespace,
        sender: &ClientId,
        msg: RelayMessage,
    ) -> RouteOutcome {
        self.route(from, sender, msg).await
    }

    /// Forwards an `audio` chunk. Only agents may send audio; audio from a
    /// user is dropped.
    pub async fn route_audio(
        &self,
        from: Namespace,
        sender: &ClientId,
        audio: AudioMessage,
    ) -> RouteOutcome {
        if from != Namespace::Agent {
            tracing::debug!(%sender, namespace = %from, "audio accepted from agents only");
            return RouteOutcome::Dropped;
        }
        self.route(from, sender, audio).await
    }

    async fn route<M: Routable>(
        &self,
        from: Namespace,
        sender: &ClientId,
        mut msg: M,
    ) -> RouteOutcome {
        let destination = self.registry(from.opposite());
        let Some(recipient) = destination.get(msg.recipient()).await else {
            tracing::debug!(%sender, to = msg.recipient(), namespace = %from, "recipient offline");
            return RouteOutcome::Dropped;
        };

        msg.stamp_sender(sender);
        let event = msg.into_event();
        match recipient.emit(&event) {
            Ok(()) => {
                tracing::debug!(
                    %sender,
                    event = event.name(),
                    conn_id = %recipient.id(),
                    "relayed"
                );
                RouteOutcome::Delivered
            }
            Err(e) => {
                tracing::debug!(%sender, error = %e, "recipient connection gone");
                RouteOutcome::Dropped
            }
        }
    }

    /// Handles a transport-level disconnect of `connection_id`, which was
    /// admitted as `client` in `namespace`.
    ///
    /// Idempotent: if `client` is no longer bound to this connection
    /// (already removed, or taken over by a newer session) nothing
    /// happens. Returns `true` if a registry entry was removed.
    pub async fn handle_disconnect(
        &self,
        namespace: Namespace,
        client: &ClientId,
        connection_id: ConnectionId,
    ) -> bool {
        let removed = match namespace {
            Namespace::User => self.users.remove_if(client.as_str(), connection_id).await,
            Namespace::Agent => {
                let _gate = self.roster_gate.lock().await;
                let removed = self.agents.remove_if(client.as_str(), connection_id).await;
                if removed {
                    self.fan_out_roster().await;
                }
                removed
            }
        };

        if removed {
            tracing::info!(%client, %namespace, %connection_id, "client disconnected");
        } else {
            tracing::debug!(%client, %namespace, %connection_id, "stale disconnect ignored");
        }
        removed
    }

    /// Emits the current roster to every registered user. Returns the
    /// number of users it was handed to.
    pub async fn broadcast_roster(&self) -> usize {
        let _gate = self.roster_gate.lock().await;
        self.fan_out_roster().await
    }

    /// Current roster snapshot.
    pub async fn roster(&self) -> Roster {
        self.agents.roster().await
    }

    /// Current connection counts.
    pub async fn stats(&self) -> RelayStats {
        RelayStats {
            users: self.users.len().await,
            agents: self.agents.len().await,
        }
    }

    /// Snapshot-then-iterate fan-out. Caller holds the broadcast gate.
    async fn fan_out_roster(&self) -> usize {
        let roster = self.agents.roster().await;
        let users = self.users.connections().await;
        let event = ServerEvent::ListAgents(roster);

        let mut delivered = 0usize;
        for (client, connection) in &users {
            match connection.emit(&event) {
                Ok(()) => delivered = delivered.saturating_add(1),
                Err(e) => tracing::debug!(%client, error = %e, "roster not delivered"),
            }
        }
        tracing::debug!(recipients = delivered, "roster broadcast");
        delivered
    }

    async fn check_user(
        &self,
        declared_id: &str,
        token: Option<&str>,
    ) -> Result<ClientId, RelayError> {
        let client = ClientId::parse(declared_id)?;
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| RelayError::AdmissionDenied("missing token".to_string()))?;
        self.validator.validate(token).await?;
        Ok(client)
    }

    fn check_agent(&self, declared_id: &str, token: Option<&str>) -> Result<ClientId, RelayError> {
        let client = ClientId::parse(declared_id)?;
        if self.policy.agent_token_required && token.is_none_or(str::is_empty) {
            return Err(RelayError::AdmissionDenied("missing token".to_string()));
        }
        Ok(client)
    }

    fn resolve_conflict(
        &self,
        namespace: Namespace,
        client: &ClientId,
        displaced: Option<Arc<dyn Connection>>,
    ) {
        let Some(previous) = displaced else {
            return;
        };
        match self.policy.session_conflict {
            SessionConflictPolicy::ClosePrevious => {
                tracing::info!(
                    %client,
                    %namespace,
                    conn_id = %previous.id(),
                    "closing replaced session"
                );
                let _ = previous.emit(&ServerEvent::Notify(format!(
                    "session {client} replaced by a newer connection"
                )));
                previous.close(CLOSE_SESSION_REPLACED, "session replaced");
            }
            SessionConflictPolicy::KeepPrevious => {
                tracing::info!(
                    %client,
                    %namespace,
                    conn_id = %previous.id(),
                    "replaced session left open"
                );
            }
        }
    }
}

/// Notifies and closes a connection that failed admission.
fn reject(
    connection: &dyn Connection,
    namespace: Namespace,
    declared_id: &str,
    err: &RelayError,
) {
    tracing::warn!(client = declared_id, %namespace, error = %err, "admission rejected");
    let _ = connection.emit(&ServerEvent::Notify(format!(
        "{err} (client \"{declared_id}\")"
    )));
    connection.close(err.close_code(), "admission rejected");
}
