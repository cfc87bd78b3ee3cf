use crate::error::ToolError;
use crate::gate::{readiness_gate, GateWaiter};
use crate::supervisor::{self, SupervisorHandle};
use crate::transport::{PromptArgs, ToolArgs, ToolConnector, ToolDescriptor, ToolTransport};
use inbound_types::SessionState;
use std::sync::Arc;
use tokio::sync::watch;

/// A tool session bound to the lifetime of its owner.
///
/// Starting a session spawns the supervisor, which opens the connection in
/// the background. Callers obtain [`ToolGateway`] handles and may issue calls
/// right away; the calls wait until the session is ready or has failed.
#[derive(Debug)]
pub struct ToolSession {
    gateway: ToolGateway,
    supervisor: SupervisorHandle,
}

impl ToolSession {
    /// Starts a session using the given connector. Must be called from within
    /// a tokio runtime.
    pub fn start<C: ToolConnector>(connector: C) -> Self {
        Self::start_shared(Arc::new(connector))
    }

    pub fn start_shared(connector: Arc<dyn ToolConnector>) -> Self {
        let (gate, ready) = readiness_gate();
        let (state_tx, state_rx) = watch::channel(SessionState::Starting);
        let supervisor = supervisor::spawn(connector, gate, state_tx);

        Self {
            gateway: ToolGateway {
                ready,
                state: state_rx,
            },
            supervisor,
        }
    }

    pub fn gateway(&self) -> ToolGateway {
        self.gateway.clone()
    }

    pub fn state(&self) -> SessionState {
        self.gateway.state()
    }

    /// Cancels the supervisor and waits until the connection is closed.
    pub async fn shutdown(self) {
        self.supervisor.shutdown().await;
    }
}

/// Cloneable facade over a tool session.
#[derive(Clone)]
pub struct ToolGateway {
    ready: GateWaiter<Arc<dyn ToolTransport>>,
    state: watch::Receiver<SessionState>,
}

impl std::fmt::Debug for ToolGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolGateway")
            .field("state", &self.state())
            .finish()
    }
}

impl ToolGateway {
    /// Current lifecycle state of the underlying session.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Waits until the session is ready.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Unavailable`] if the session never initialized and
    /// [`ToolError::Closed`] if it has already been shut down.
    pub async fn ready(&self) -> Result<(), ToolError> {
        self.session().await.map(|_| ())
    }

    /// Invokes a tool on the session and returns its text output.
    pub async fn call_tool(&self, name: &str, args: ToolArgs) -> Result<String, ToolError> {
        let transport = self.session().await?;
        tracing::debug!(tool = name, "calling tool");

        transport
            .call_tool(name, args)
            .await
            .inspect_err(|e| log_failure(e, name, "tool call failed"))
    }

    /// Fetches a prompt template from the session.
    pub async fn get_prompt(
        &self,
        name: &str,
        args: Option<PromptArgs>,
    ) -> Result<String, ToolError> {
        let transport = self.session().await?;
        tracing::debug!(prompt = name, "fetching prompt");

        transport
            .get_prompt(name, args)
            .await
            .inspect_err(|e| log_failure(e, name, "prompt fetch failed"))
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        let transport = self.session().await?;
        transport
            .list_tools()
            .await
            .inspect_err(|e| log_failure(e, "tools/list", "listing tools failed"))
    }

    async fn session(&self) -> Result<Arc<dyn ToolTransport>, ToolError> {
        let transport = self.ready.wait().await.ok_or(ToolError::Unavailable)?;
        // The gate keeps its resolution forever; liveness is tracked separately.
        if self.state() == SessionState::Closed {
            return Err(ToolError::Closed);
        }
        Ok(transport)
    }
}

/// Per-call failures are expected traffic; losing the session is not.
fn log_failure(error: &ToolError, target: &str, message: &str) {
    if error.is_session_level() {
        tracing::error!(tool = target, error = %error, "{}: tool session lost", message);
    } else {
        tracing::warn!(tool = target, error = %error, "{}", message);
    }
}
