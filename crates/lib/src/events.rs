//! Change notifications for successful mutations.
//!
//! The core fires a globally visible event after every successful write so
//! other editors can refresh. Broadcasting is strictly best-effort: a failed
//! publish is logged and swallowed, and must never fail or roll back the
//! underlying write.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::content::Id;

/// What a change notification announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A version mismatch was detected and a conflict record created.
    ConflictDetected,
    /// A shared content field changed.
    ContentUpdated,
    /// A container's structure changed (placement, removal).
    StructureUpdated,
    /// A reorder batch was fully applied.
    ReorderApplied,
}

/// A globally visible change notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Id,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub container_id: Id,
    pub actor_id: String,
    /// RFC3339 timestamp from the injected clock.
    pub timestamp: String,
    pub payload: serde_json::Value,
}

/// Failure to hand an event to the notification channel.
///
/// Deliberately not part of the crate error enum: broadcast failures are
/// never propagated past [`publish_best_effort`].
#[derive(Debug, Error)]
#[error("Broadcast failed: {reason}")]
pub struct BroadcastError {
    pub reason: String,
}

/// Event broadcaster collaborator consumed by the core.
///
/// Called after every successful mutation. Implementations deliver to
/// whatever fan-out mechanism the host application uses (websockets,
/// pub/sub); the core only requires that `publish` not block for long.
pub trait Broadcaster: Send + Sync {
    fn publish(&self, event: Event) -> Result<(), BroadcastError>;
}

/// Publishes an event, logging and swallowing any failure.
pub fn publish_best_effort(broadcaster: &dyn Broadcaster, event: Event) {
    let kind = event.kind;
    if let Err(err) = broadcaster.publish(event) {
        tracing::warn!(?kind, %err, "event broadcast failed; change is already persisted");
    }
}

/// Broadcaster backed by an unbounded tokio channel.
///
/// The receiving half is handed to whatever task fans events out to
/// connected editors.
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    sender: mpsc::UnboundedSender<Event>,
}

impl ChannelBroadcaster {
    /// Creates the broadcaster and the receiver for the fan-out task.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn publish(&self, event: Event) -> Result<(), BroadcastError> {
        self.sender.send(event).map_err(|_| BroadcastError {
            reason: "event channel closed".to_string(),
        })
    }
}

/// Broadcaster that records every event in memory.
///
/// Used by tests and by the standalone binary when no fan-out is wired.
#[derive(Debug, Default)]
pub struct MemoryBroadcaster {
    events: Mutex<Vec<Event>>,
}

impl MemoryBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events published so far, in order.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Events of one kind, in order.
    pub fn events_of_kind(&self, kind: EventKind) -> Vec<Event> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }
}

impl Broadcaster for MemoryBroadcaster {
    fn publish(&self, event: Event) -> Result<(), BroadcastError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}
