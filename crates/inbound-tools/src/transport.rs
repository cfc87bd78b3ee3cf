//! Transport seam between the session supervisor and a concrete tool server
//! connection.

use crate::error::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Arguments passed to a tool invocation.
pub type ToolArgs = serde_json::Map<String, Value>;

/// Arguments used to fill a prompt template.
pub type PromptArgs = HashMap<String, String>;

/// A tool advertised by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "inputSchema")]
    pub input_schema: Value,
}

/// An open, initialized connection to a tool server.
///
/// Implementations may assume they are only used between a successful
/// [`ToolConnector::open`] and [`ToolTransport::close`]; the supervisor
/// enforces that ordering.
#[async_trait]
pub trait ToolTransport: Send + Sync + 'static {
    /// Invokes a named tool and returns its text output.
    async fn call_tool(&self, name: &str, args: ToolArgs) -> Result<String, ToolError>;

    /// Fetches a named prompt template and returns the rendered text.
    async fn get_prompt(&self, name: &str, args: Option<PromptArgs>) -> Result<String, ToolError>;

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError>;

    /// Releases the connection. Calling it more than once must be harmless.
    async fn close(&self) -> Result<(), ToolError>;
}

/// Opens transports. Opening includes the protocol handshake, so a returned
/// transport is ready for calls.
#[async_trait]
pub trait ToolConnector: Send + Sync + 'static {
    async fn open(&self) -> Result<Arc<dyn ToolTransport>, ToolError>;

    /// Human readable endpoint used in log fields.
    fn endpoint(&self) -> &str;
}
