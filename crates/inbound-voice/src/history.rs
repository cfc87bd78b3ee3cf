use inbound_types::{ChatMessage, ChatRole};
use std::sync::{Arc, PoisonError, RwLock};

/// Ordered conversation history of a call, shared between the speech pipeline
/// (writer) and anything that reads it.
///
/// Uses `std::sync::RwLock`: every lock is a short push or clone and never
/// spans an `.await` point.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    entries: Arc<RwLock<Vec<ChatMessage>>>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, message: ChatMessage) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }

    pub fn record(&self, role: ChatRole, content: impl Into<String>) {
        self.push(ChatMessage::new(role, content));
    }

    /// Returns a copy of the history at this moment.
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Renders the current history as a transcript.
    pub fn transcript(&self) -> String {
        build_transcript(&self.snapshot())
    }
}

/// Joins entries into one line per entry, `"<role>: <content>"`, in order.
pub fn build_transcript(entries: &[ChatMessage]) -> String {
    entries
        .iter()
        .map(ChatMessage::transcript_line)
        .collect::<Vec<_>>()
        .join("\n")
}
