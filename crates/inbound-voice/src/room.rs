use crate::caller::{caller_id_from_room, caller_number_from_metadata};
use crate::history::ConversationHistory;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tracing::info;

/// Default capacity for the per-room event broadcast channel.
const DEFAULT_ROOM_EVENT_CAPACITY: usize = 64;

/// Room-level notifications delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    ParticipantConnected { identity: String },
    ParticipantDisconnected { identity: String },
    /// The room was closed; no further events follow.
    Closed,
}

/// The call room the agent serves.
///
/// Signaling and media are handled by the room SDK; this type carries what
/// the agent needs from it: the room name and metadata, the conversation
/// history, and a subscribable stream of participant events.
#[derive(Debug)]
pub struct CallRoom {
    name: String,
    metadata: Option<String>,
    history: ConversationHistory,
    events: broadcast::Sender<RoomEvent>,
    closed: AtomicBool,
}

impl CallRoom {
    pub fn new(name: impl Into<String>, metadata: Option<String>) -> Self {
        let (events, _) = broadcast::channel(DEFAULT_ROOM_EVENT_CAPACITY);
        Self {
            name: name.into(),
            metadata,
            history: ConversationHistory::new(),
            events,
            closed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> Option<&str> {
        self.metadata.as_deref()
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Caller identifier derived from the room name.
    pub fn caller_id(&self) -> String {
        caller_id_from_room(&self.name)
    }

    /// Caller number from the room metadata, if present and well-formed.
    pub fn caller_number(&self) -> Option<String> {
        let metadata = self.metadata.as_deref()?;
        match caller_number_from_metadata(metadata) {
            Ok(number) => number,
            Err(e) => {
                tracing::warn!(room = %self.name, "error loading caller info: {}", e);
                None
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn participant_connected(&self, identity: impl Into<String>) {
        let identity = identity.into();
        info!(room = %self.name, participant = %identity, "participant connected");
        self.publish(RoomEvent::ParticipantConnected { identity });
    }

    pub fn participant_disconnected(&self, identity: impl Into<String>) {
        let identity = identity.into();
        info!(room = %self.name, participant = %identity, "participant disconnected");
        self.publish(RoomEvent::ParticipantDisconnected { identity });
    }

    /// Closes the room. Only the first call publishes [`RoomEvent::Closed`].
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(room = %self.name, "room closed");
        self.publish(RoomEvent::Closed);
    }

    fn publish(&self, event: RoomEvent) {
        if self.is_closed() && event != RoomEvent::Closed {
            tracing::debug!(room = %self.name, ?event, "dropping event for closed room");
            return;
        }
        // No subscribers is fine: nobody is listening for this room yet.
        let _ = self.events.send(event);
    }
}
