use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// Opening or initializing the connection failed. Terminal for the session.
    #[error("Tool server connection failed: {0}")]
    Connection(String),

    /// The session never initialized; every caller of the gateway sees this.
    #[error("Tool session unavailable: the session never initialized")]
    Unavailable,

    #[error("Tool session is closed")]
    Closed,

    /// A single call failed on an otherwise healthy session.
    #[error("Tool call '{tool}' failed: {reason}")]
    Call { tool: String, reason: String },
}

impl ToolError {
    /// Returns `true` for errors that affect the whole session rather than one call.
    pub fn is_session_level(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Unavailable | Self::Closed)
    }
}
