//! Turns "participant disconnected" room events into a summary tool call.

use inbound_tools::{ToolArgs, ToolGateway};
use inbound_types::SUMMARY_TOOL_NAME;
use inbound_voice::{caller_id_from_room, CallRoom, ConversationHistory, RoomEvent};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

/// How long [`DisconnectReactor::run`] waits for in-flight summary calls after
/// the room closes.
const SUMMARY_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct DisconnectReactor {
    gateway: ToolGateway,
    room_name: String,
    history: ConversationHistory,
}

impl DisconnectReactor {
    pub fn new(
        gateway: ToolGateway,
        room_name: impl Into<String>,
        history: ConversationHistory,
    ) -> Self {
        Self {
            gateway,
            room_name: room_name.into(),
            history,
        }
    }

    pub fn for_room(gateway: ToolGateway, room: &CallRoom) -> Self {
        Self::new(gateway, room.name(), room.history().clone())
    }

    /// Arguments of the summary call for the history as it is right now.
    pub fn summary_request(&self) -> ToolArgs {
        let mut args = ToolArgs::new();
        args.insert(
            "phone_number".to_string(),
            Value::String(caller_id_from_room(&self.room_name)),
        );
        args.insert(
            "transcript".to_string(),
            Value::String(self.history.transcript()),
        );
        args
    }

    /// Handles one disconnect notification.
    ///
    /// The summary is built synchronously; the tool call runs on a detached
    /// task so the caller never waits for it. Failures are logged and dropped.
    /// The returned handle may be ignored.
    pub fn on_participant_disconnected(&self, identity: &str) -> JoinHandle<()> {
        let args = self.summary_request();
        let gateway = self.gateway.clone();
        let room = self.room_name.clone();
        let identity = identity.to_string();

        tokio::spawn(async move {
            match gateway.call_tool(SUMMARY_TOOL_NAME, args).await {
                Ok(_) => tracing::info!(room = %room, participant = %identity, "call summary sent"),
                Err(e) => tracing::warn!(
                    room = %room,
                    participant = %identity,
                    error = %e,
                    "failed to send call summary"
                ),
            }
        })
    }

    /// Dispatches room events until the room closes, then waits (bounded) for
    /// summary calls that are still in flight. Returns the number of summaries
    /// fired.
    pub async fn run(self, mut events: broadcast::Receiver<RoomEvent>) -> usize {
        let mut in_flight = Vec::new();

        loop {
            match events.recv().await {
                Ok(RoomEvent::ParticipantDisconnected { identity }) => {
                    in_flight.push(self.on_participant_disconnected(&identity));
                }
                Ok(RoomEvent::ParticipantConnected { .. }) => {}
                Ok(RoomEvent::Closed) | Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(room = %self.room_name, skipped, "room event receiver lagged");
                }
            }
        }

        let fired = in_flight.len();
        let drain = async {
            for handle in in_flight {
                if let Err(e) = handle.await {
                    tracing::error!("summary task join error: {}", e);
                }
            }
        };
        if tokio::time::timeout(SUMMARY_DRAIN_TIMEOUT, drain).await.is_err() {
            tracing::warn!(room = %self.room_name, "summary calls still running after room closed");
        }

        fired
    }
}
