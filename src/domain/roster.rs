//! Presence roster: connected agents and when they connected.

use std::collections::BTreeMap;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::client_id::ClientId;

/// Textual pattern of roster timestamps (`YYYY.MM.DD HH:MM:SS`, local time).
pub const ROSTER_TIME_FORMAT: &str = "%Y.%m.%d %H:%M:%S";

/// Formats a connection timestamp the way the roster publishes it.
#[must_use]
pub fn format_connected_at(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format(ROSTER_TIME_FORMAT).to_string()
}

/// Immutable snapshot of the agent roster, serialized as a JSON object
/// mapping agent identifier to connection timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct Roster(BTreeMap<ClientId, String>);

impl Roster {
    /// Builds a snapshot from `(agent, connected_at)` pairs.
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = (&'a ClientId, DateTime<Utc>)>,
    ) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(id, at)| (id.clone(), format_connected_at(at)))
                .collect(),
        )
    }

    /// Returns `true` if `agent` is in the snapshot.
    #[must_use]
    pub fn contains(&self, agent: &str) -> bool {
        self.0.contains_key(agent)
    }

    /// Returns the formatted connection time of `agent`.
    #[must_use]
    pub fn connected_at(&self, agent: &str) -> Option<&str> {
        self.0.get(agent).map(String::as_str)
    }

    /// Number of agents in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no agents are connected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
