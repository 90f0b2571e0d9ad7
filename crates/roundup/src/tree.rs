//! The aggregation tree: Application -> Channel -> Client -> Connection.
//!
//! Ownership runs strictly downward through ordered maps keyed by id;
//! reverse navigation is an id lookup against the parent's map, never an
//! embedded reference. The whole tree is owned exclusively by the
//! aggregator until a session seals, at which point the session snapshot is
//! immutable and safe to hand downstream.

use crate::event::{Event, EventKind};
use crate::recording::{Recording, RecordingUpdate};
use crate::session::{Session, SessionClient, SessionConnection};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A media connection: zero-or-one active recording plus the ordered list
/// of completed ones.
#[derive(Debug, Clone, Default)]
pub struct Connection {
    pub id: String,
    pub device_id: String,
    pub user_id: String,
    pub tag: Option<String>,
    active: Option<Recording>,
    completed: Vec<Recording>,
}

impl Connection {
    fn new(event: &Event) -> Self {
        Self {
            id: event.connection_id.clone(),
            device_id: event.device_id.clone(),
            user_id: event.user_id.clone(),
            tag: event.data.connection_tag.clone(),
            active: None,
            completed: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_completed(&self) -> bool {
        self.active.is_none() && !self.completed.is_empty()
    }

    pub fn completed_recordings(&self) -> &[Recording] {
        &self.completed
    }

    fn start(&mut self, event: &Event) {
        if self.active.is_some() {
            // Protocol violation from a crash-prone writer; keep the
            // recording already in flight.
            warn!(
                connection = %self.id,
                at = %event.timestamp,
                "start while a recording is active, ignoring"
            );
            return;
        }
        if let Some(tag) = &event.data.connection_tag {
            self.tag = Some(tag.clone());
        }
        self.active = Some(Recording::open(event));
    }

    fn update(&mut self, event: &Event) {
        match self.active.as_mut() {
            Some(recording) => recording.updates.push(RecordingUpdate::from_event(event)),
            None => warn!(
                connection = %self.id,
                at = %event.timestamp,
                "update without an active recording, ignoring"
            ),
        }
    }

    fn stop(&mut self, event: &Event) {
        match self.active.take() {
            Some(mut recording) => {
                recording.finalize(event.timestamp, &event.data);
                if let Some(tag) = &recording.connection_tag {
                    self.tag = Some(tag.clone());
                }
                self.completed.push(recording);
            }
            None => warn!(
                connection = %self.id,
                at = %event.timestamp,
                "stop without an active recording, ignoring"
            ),
        }
    }
}

/// A client and its connections.
#[derive(Debug, Clone, Default)]
pub struct Client {
    pub id: String,
    connections: BTreeMap<String, Connection>,
}

impl Client {
    pub fn is_active(&self) -> bool {
        self.connections.values().any(Connection::is_active)
    }

    pub fn is_completed(&self) -> bool {
        !self.is_active() && self.connections.values().any(Connection::is_completed)
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }
}

/// A channel: the unit that seals sessions.
///
/// Channel identity persists across sessions; sealing snapshots the current
/// completed clients and clears the live map so the next session starts
/// clean.
#[derive(Debug, Clone, Default)]
pub struct Channel {
    pub id: String,
    clients: BTreeMap<String, Client>,
    completed_sessions: Vec<Session>,
    had_active: bool,
}

impl Channel {
    pub fn is_active(&self) -> bool {
        self.clients.values().any(Client::is_active)
    }

    pub fn is_completed(&self) -> bool {
        !self.is_active() && self.clients.values().any(Client::is_completed)
    }

    pub fn clients(&self) -> impl Iterator<Item = &Client> {
        self.clients.values()
    }

    pub fn completed_sessions(&self) -> &[Session] {
        &self.completed_sessions
    }

    /// Seal a session if this channel just transitioned to fully idle.
    fn maybe_seal(&mut self, application_id: &str) {
        let active_now = self.is_active();
        if self.had_active && !active_now {
            let clients = std::mem::take(&mut self.clients);
            let snapshot: Vec<SessionClient> = clients
                .into_values()
                .map(|client| SessionClient {
                    id: client.id,
                    connections: client
                        .connections
                        .into_values()
                        .map(|conn| SessionConnection {
                            id: conn.id,
                            device_id: conn.device_id,
                            user_id: conn.user_id,
                            tag: conn.tag,
                            recordings: conn.completed,
                        })
                        .collect(),
                })
                .collect();

            match Session::seal(application_id, &self.id, snapshot) {
                Some(session) => {
                    debug!(
                        channel = %self.id,
                        session = %session.id,
                        clients = session.clients.len(),
                        "sealed session"
                    );
                    self.completed_sessions.push(session);
                }
                None => debug!(channel = %self.id, "channel went idle with nothing completed"),
            }
        }
        self.had_active = active_now;
    }
}

/// An application and its channels.
#[derive(Debug, Clone, Default)]
pub struct Application {
    pub id: String,
    channels: BTreeMap<String, Channel>,
}

impl Application {
    pub fn is_active(&self) -> bool {
        self.channels.values().any(Channel::is_active)
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }
}

/// Folds an ordered event stream into the entity tree and seals sessions.
///
/// The caller must feed events in non-decreasing timestamp order;
/// out-of-order delivery is a precondition violation, not detected here.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    applications: BTreeMap<String, Application>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one event into the tree.
    ///
    /// Returns false when the event carries no routable channel / client /
    /// connection id; such events are ignored, not errors. Protocol
    /// violations (double start, orphan update or stop) are logged and
    /// swallowed, and still count as routed.
    pub fn route(&mut self, event: &Event) -> bool {
        if !event.is_routable() {
            debug!(kind = ?event.kind, at = %event.timestamp, "unroutable event, skipping");
            return false;
        }

        let application = self
            .applications
            .entry(event.application_id.clone())
            .or_insert_with(|| Application {
                id: event.application_id.clone(),
                ..Default::default()
            });
        let channel = application
            .channels
            .entry(event.channel_id.clone())
            .or_insert_with(|| Channel {
                id: event.channel_id.clone(),
                ..Default::default()
            });
        let client = channel
            .clients
            .entry(event.client_id.clone())
            .or_insert_with(|| Client {
                id: event.client_id.clone(),
                ..Default::default()
            });
        let connection = client
            .connections
            .entry(event.connection_id.clone())
            .or_insert_with(|| Connection::new(event));

        match event.kind {
            EventKind::Start => connection.start(event),
            EventKind::Update => connection.update(event),
            EventKind::Stop => connection.stop(event),
        }

        channel.maybe_seal(&event.application_id);
        true
    }

    pub fn applications(&self) -> impl Iterator<Item = &Application> {
        self.applications.values()
    }

    pub fn application(&self, id: &str) -> Option<&Application> {
        self.applications.get(id)
    }

    pub fn channel(&self, application_id: &str, channel_id: &str) -> Option<&Channel> {
        self.applications.get(application_id)?.channels.get(channel_id)
    }

    /// All sealed sessions across the tree, in seal order per channel.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.applications
            .values()
            .flat_map(|a| a.channels.values())
            .flat_map(|c| c.completed_sessions.iter())
    }

    /// Consume the aggregator, keeping only the sealed sessions.
    pub fn into_sessions(self) -> Vec<Session> {
        self.applications
            .into_values()
            .flat_map(|a| a.channels.into_values())
            .flat_map(|c| c.completed_sessions)
            .collect()
    }
}
