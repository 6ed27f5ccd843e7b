//! Concurrent client-identifier → connection mapping, one per population.
//!
//! [`ClientRegistry`] keeps at most one live connection per identifier in
//! a `RwLock<HashMap<...>>`. Reads (routing lookups, fan-out snapshots)
//! run concurrently; writes (admission, disconnect) are serialized, which
//! linearizes all mutations on a given identifier.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::client_id::{ClientId, Namespace};
use super::connection::Connection;
use super::{ConnectionId, Roster};

/// Registered connection plus the moment it was admitted.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    /// The live connection handle.
    pub connection: Arc<dyn Connection>,
    /// Admission time.
    pub connected_at: DateTime<Utc>,
}

/// Identifier → connection registry for one namespace.
///
/// # Concurrency
///
/// - Lookups never wait on each other.
/// - Every mutation takes the write lock for a single map operation; no
///   lock is held while events are emitted.
#[derive(Debug)]
pub struct ClientRegistry {
    namespace: Namespace,
    entries: RwLock<HashMap<ClientId, RegistryEntry>>,
}

impl ClientRegistry {
    /// Creates an empty registry for `namespace`.
    #[must_use]
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Namespace this registry serves.
    #[must_use]
    pub const fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Registers `connection` under `client`, last-connect-wins.
    ///
    /// Returns the displaced connection if the identifier was held by a
    /// different connection. The displaced handle is not closed here.
    pub async fn register(
        &self,
        client: ClientId,
        connection: Arc<dyn Connection>,
    ) -> Option<Arc<dyn Connection>> {
        let new_id = connection.id();
        let entry = RegistryEntry {
            connection,
            connected_at: Utc::now(),
        };
        let previous = self.entries.write().await.insert(client, entry);
        previous
            .map(|p| p.connection)
            .filter(|conn| conn.id() != new_id)
    }

    /// Looks up the live connection for `client`.
    pub async fn get(&self, client: &str) -> Option<Arc<dyn Connection>> {
        self.entries
            .read()
            .await
            .get(client)
            .map(|entry| Arc::clone(&entry.connection))
    }

    /// Removes `client` only if it is still bound to `connection_id`.
    ///
    /// Returns `true` if an entry was removed. A stale or repeated
    /// disconnect for a connection that has since been replaced is a no-op.
    pub async fn remove_if(&self, client: &str, connection_id: ConnectionId) -> bool {
        let mut map = self.entries.write().await;
        match map.get(client) {
            Some(entry) if entry.connection.id() == connection_id => {
                map.remove(client);
                true
            }
            _ => false,
        }
    }

    /// Snapshot of every registered connection, for fan-out outside the lock.
    pub async fn connections(&self) -> Vec<(ClientId, Arc<dyn Connection>)> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(id, entry)| (id.clone(), Arc::clone(&entry.connection)))
            .collect()
    }

    /// Roster snapshot of this registry, taken under a single read lock.
    pub async fn roster(&self) -> Roster {
        let map = self.entries.read().await;
        Roster::from_entries(map.iter().map(|(id, entry)| (id, entry.connected_at)))
    }

    /// Returns `true` if `client` is registered.
    pub async fn contains(&self, client: &str) -> bool {
        self.entries.read().await.contains_key(client)
    }

    /// Number of registered clients.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if no client is registered.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
