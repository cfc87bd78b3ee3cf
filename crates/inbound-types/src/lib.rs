//! Shared types and constants for the inbound call agent.
//!
//! This crate provides the value types passed between the tool-session core,
//! the call-room layer and the agent binary: conversation roles and messages,
//! the lifecycle state of a tool session, and the well-known names that the
//! crates agree on.
//!
//! Nothing here performs I/O. Keeping these definitions in one leaf crate
//! lets `inbound-tools` and `inbound-voice` stay independent of each other.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Name of the tool invoked with the call summary when a participant leaves.
pub const SUMMARY_TOOL_NAME: &str = "send-summary-to-user";

/// Placeholder caller identifier used when a room name does not carry one.
pub const UNKNOWN_CALLER: &str = "unknown";

/// Speaker role of a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions given to the language model.
    System,
    /// The caller.
    User,
    /// The agent.
    Assistant,
    /// Output of a tool invocation.
    Tool,
}

impl ChatRole {
    /// Returns the label used when rendering transcripts.
    pub fn label(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when parsing an unknown role label.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown chat role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for ChatRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "tool" => Ok(Self::Tool),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// A single entry of the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    /// Renders the entry as one transcript line, `"<role>: <content>"`.
    pub fn transcript_line(&self) -> String {
        format!("{}: {}", self.role, self.content)
    }
}

/// Lifecycle state of a tool session.
///
/// Transitions are `Starting -> Ready -> Closed` on the success path and
/// `Starting -> Failed` or `Starting -> Closed` otherwise. `Failed` and
/// `Closed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// The connection is being opened and initialized.
    Starting,
    /// The session is initialized and accepting calls.
    Ready,
    /// Opening or initializing the session failed.
    Failed,
    /// The session was shut down.
    Closed,
}

impl SessionState {
    /// Returns `true` if no further transitions can occur.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Closed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Closed => "closed",
        }
    }
}
