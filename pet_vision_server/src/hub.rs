// THEORY:
// The `hub` is the single writer of the server's activity state. It holds the
// latest event of every connected detection source and a bounded history of
// every event it accepted, and it answers each change with a fresh snapshot.
//
// Key architectural principles:
// 1.  **Owned Aggregate**: `ActivityHub` is a plain struct with synchronous
//     methods. All of its state lives in one place.
// 2.  **Actor Serialization**: in the server, one task owns the hub and drains an
//     `mpsc` command queue. Commands are applied strictly in arrival order, so
//     broadcasts leave in ingestion order and no lock is needed.
// 3.  **History Outlives Sources**: a disconnect removes the source's current
//     state but never touches history.

use pet_vision::{ActivityEvent, ActivityReport, ActivitySnapshot, BoundedHistory, SourceId};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, warn};

/// How many history entries a snapshot carries.
pub const SNAPSHOT_HISTORY_LEN: usize = 100;

#[derive(Debug, Error, PartialEq)]
pub enum HubError {
    #[error("invalid activity event from source {source_id}: {reason}")]
    InvalidEvent { source_id: SourceId, reason: &'static str },
    #[error("activity hub is no longer running")]
    Closed,
}

/// Latest event per source plus a bounded global history.
#[derive(Debug)]
pub struct ActivityHub {
    source_states: BTreeMap<SourceId, ActivityEvent>,
    history: BoundedHistory<ActivityEvent>,
}

impl ActivityHub {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            source_states: BTreeMap::new(),
            history: BoundedHistory::new(history_capacity),
        }
    }

    /// Stores the event as the source's current state and appends it to history.
    /// Returns the snapshot to broadcast to every listener.
    pub fn on_activity_event(
        &mut self,
        source_id: SourceId,
        report: ActivityReport,
    ) -> Result<ActivitySnapshot, HubError> {
        report
            .validate()
            .map_err(|reason| HubError::InvalidEvent { source_id, reason })?;
        let event = ActivityEvent::new(source_id, report);
        self.source_states.insert(source_id, event.clone());
        self.history.push(event);
        Ok(self.snapshot())
    }

    /// Forgets the source's current state. History is kept.
    pub fn on_source_disconnect(&mut self, source_id: SourceId) -> ActivitySnapshot {
        self.source_states.remove(&source_id);
        self.snapshot()
    }

    pub fn snapshot(&self) -> ActivitySnapshot {
        ActivitySnapshot {
            current: self.source_states.values().cloned().collect(),
            history: self.history.tail(SNAPSHOT_HISTORY_LEN).cloned().collect(),
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

enum HubCommand {
    Ingest { source_id: SourceId, report: ActivityReport },
    RequestSnapshot { reply: oneshot::Sender<ActivitySnapshot> },
    Disconnect { source_id: SourceId },
}

/// Cloneable handle to the hub actor.
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::UnboundedSender<HubCommand>,
    updates: broadcast::Sender<ActivitySnapshot>,
    next_source: Arc<AtomicU64>,
}

impl HubHandle {
    /// Spawns the actor task. It exits once every handle has been dropped.
    pub fn spawn(history_capacity: usize, listener_capacity: usize) -> (Self, tokio::task::JoinHandle<()>) {
        let (commands, mut command_rx) = mpsc::unbounded_channel::<HubCommand>();
        let (updates, _) = broadcast::channel::<ActivitySnapshot>(listener_capacity.max(1));
        let broadcaster = updates.clone();

        let actor = tokio::spawn(async move {
            let mut hub = ActivityHub::new(history_capacity);
            while let Some(command) = command_rx.recv().await {
                match command {
                    HubCommand::Ingest { source_id, report } => match hub.on_activity_event(source_id, report) {
                        Ok(snapshot) => {
                            debug!(source_id, history = hub.history_len(), "activity ingested");
                            let _ = broadcaster.send(snapshot);
                        }
                        Err(e) => warn!(error = %e, "dropping activity event"),
                    },
                    HubCommand::RequestSnapshot { reply } => {
                        let _ = reply.send(hub.snapshot());
                    }
                    HubCommand::Disconnect { source_id } => {
                        let _ = broadcaster.send(hub.on_source_disconnect(source_id));
                    }
                }
            }
        });

        let handle = Self {
            commands,
            updates,
            next_source: Arc::new(AtomicU64::new(1)),
        };
        (handle, actor)
    }

    /// Allocates the identity of a new connection.
    pub fn register_source(&self) -> SourceId {
        self.next_source.fetch_add(1, Ordering::Relaxed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ActivitySnapshot> {
        self.updates.subscribe()
    }

    pub fn ingest(&self, source_id: SourceId, report: ActivityReport) -> Result<(), HubError> {
        self.send(HubCommand::Ingest { source_id, report })
    }

    pub fn disconnect(&self, source_id: SourceId) -> Result<(), HubError> {
        self.send(HubCommand::Disconnect { source_id })
    }

    /// The current `{current, history}` view, for a single requester.
    pub async fn snapshot(&self) -> Result<ActivitySnapshot, HubError> {
        let (reply, response) = oneshot::channel();
        self.send(HubCommand::RequestSnapshot { reply })?;
        response.await.map_err(|_| HubError::Closed)
    }

    fn send(&self, command: HubCommand) -> Result<(), HubError> {
        self.commands.send(command).map_err(|_| HubError::Closed)
    }
}
