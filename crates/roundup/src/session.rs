//! Sealed sessions: immutable snapshots of one complete multi-party
//! interaction on a channel.
//!
//! A session is created exactly once, at the instant its channel transitions
//! to fully idle, and is never mutated afterwards. Downstream stages
//! (timeline, layout, graph building) treat it as read-only input.

use crate::id::ContentId;
use crate::recording::Recording;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A connection's contribution to a sealed session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConnection {
    pub id: String,
    pub device_id: String,
    pub user_id: String,
    pub tag: Option<String>,
    pub recordings: Vec<Recording>,
}

/// A client's contribution to a sealed session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClient {
    pub id: String,
    pub connections: Vec<SessionConnection>,
}

/// An immutable, fully-resolved recording of one multi-party interaction.
///
/// `id` is the hash of the sorted completed-recording id list, so the same
/// set of recordings always seals to the same session id regardless of when
/// or how often the log is reprocessed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: ContentId,
    pub application_id: String,
    pub channel_id: String,
    pub started: DateTime<Utc>,
    pub stopped: DateTime<Utc>,
    pub clients: Vec<SessionClient>,
}

impl Session {
    /// Seal a session from the completed clients of a channel.
    ///
    /// Returns `None` when no client contributed a completed recording.
    pub fn seal(
        application_id: &str,
        channel_id: &str,
        clients: Vec<SessionClient>,
    ) -> Option<Self> {
        let clients: Vec<SessionClient> = clients
            .into_iter()
            .filter(|c| c.connections.iter().any(|conn| !conn.recordings.is_empty()))
            .collect();

        let mut recording_ids: Vec<String> = clients
            .iter()
            .flat_map(|c| &c.connections)
            .flat_map(|conn| &conn.recordings)
            .map(|r| r.id().into_inner())
            .collect();
        if recording_ids.is_empty() {
            return None;
        }
        recording_ids.sort();

        let started = clients
            .iter()
            .flat_map(|c| &c.connections)
            .flat_map(|conn| &conn.recordings)
            .map(|r| r.start())
            .min()?;
        let stopped = clients
            .iter()
            .flat_map(|c| &c.connections)
            .flat_map(|conn| &conn.recordings)
            .map(|r| r.stop())
            .max()?;

        Some(Self {
            id: ContentId::from_parts(&recording_ids),
            application_id: application_id.to_string(),
            channel_id: channel_id.to_string(),
            started,
            stopped,
            clients,
        })
    }

    /// All completed recordings in client/connection map order.
    pub fn recordings(&self) -> impl Iterator<Item = &Recording> {
        self.clients
            .iter()
            .flat_map(|c| &c.connections)
            .flat_map(|conn| &conn.recordings)
    }

    /// Look up the connection that produced a recording.
    pub fn connection(&self, connection_id: &str) -> Option<&SessionConnection> {
        self.clients
            .iter()
            .flat_map(|c| &c.connections)
            .find(|conn| conn.id == connection_id)
    }

    /// Parent client of a connection, resolved by id.
    pub fn client_of(&self, connection_id: &str) -> Option<&SessionClient> {
        self.clients
            .iter()
            .find(|c| c.connections.iter().any(|conn| conn.id == connection_id))
    }

    pub fn duration(&self) -> Duration {
        self.stopped - self.started
    }
}
