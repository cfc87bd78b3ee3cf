//! Tool-session core for the inbound call agent.
//!
//! A call keeps one session open to a remote tool server for its whole
//! lifetime. The session is opened in the background by a supervisor task,
//! published through a one-shot readiness gate, and used concurrently by any
//! number of callers through [`ToolGateway`]. Shutting the session down closes
//! the connection before [`ToolSession::shutdown`] returns.
//!
//! The production transport speaks MCP over Streamable HTTP ([`http`]); other
//! transports plug in through [`ToolConnector`] and [`ToolTransport`].

pub mod error;
pub mod gate;
pub mod gateway;
pub mod http;
pub mod supervisor;
pub mod transport;

pub use error::ToolError;
pub use gate::{readiness_gate, GateWaiter, ReadinessGate};
pub use gateway::{ToolGateway, ToolSession};
pub use http::{HttpConnector, HttpToolTransport, HttpTransportConfig};
pub use inbound_types::SessionState;
pub use supervisor::SupervisorHandle;
pub use transport::{PromptArgs, ToolArgs, ToolConnector, ToolDescriptor, ToolTransport};
