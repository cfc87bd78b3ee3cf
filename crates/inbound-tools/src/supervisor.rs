//! Background task owning the lifetime of one tool server connection.

use crate::error::ToolError;
use crate::gate::ReadinessGate;
use crate::transport::{ToolConnector, ToolTransport};
use inbound_types::SessionState;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

/// How long a cancelled supervisor waits for an in-flight open to finish so
/// it can be closed.
const CANCELLED_OPEN_GRACE: Duration = Duration::from_secs(10);

/// Owner handle for a running supervisor.
///
/// Dropping the handle signals cancellation; [`SupervisorHandle::shutdown`]
/// additionally waits until the connection has been closed.
#[derive(Debug)]
pub struct SupervisorHandle {
    cancel: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SupervisorHandle {
    /// Cancels the supervisor and waits for it to release the connection.
    pub async fn shutdown(mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("tool session supervisor join error: {}", e);
            }
        }
    }
}

impl Drop for SupervisorHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}

/// Spawns the supervisor task onto the current tokio runtime.
pub(crate) fn spawn(
    connector: Arc<dyn ToolConnector>,
    gate: ReadinessGate<Arc<dyn ToolTransport>>,
    state: watch::Sender<SessionState>,
) -> SupervisorHandle {
    let (cancel_tx, cancel_rx) = oneshot::channel();
    let task = tokio::spawn(supervise(connector, gate, state, cancel_rx));

    SupervisorHandle {
        cancel: Some(cancel_tx),
        task: Some(task),
    }
}

async fn supervise(
    connector: Arc<dyn ToolConnector>,
    gate: ReadinessGate<Arc<dyn ToolTransport>>,
    state: watch::Sender<SessionState>,
    mut cancel: oneshot::Receiver<()>,
) {
    let endpoint = connector.endpoint().to_string();
    tracing::info!(endpoint = %endpoint, "opening tool session");

    let open = connector.open();
    tokio::pin!(open);

    let opened = tokio::select! {
        biased;
        _ = &mut cancel => {
            tracing::info!(endpoint = %endpoint, "tool session cancelled before it became ready");
            state.send_replace(SessionState::Closed);
            gate.resolve(None);
            release_cancelled_open(&endpoint, open).await;
            return;
        }
        result = &mut open => result,
    };

    let transport = match opened {
        Ok(transport) => transport,
        Err(e) => {
            tracing::error!(endpoint = %endpoint, error = %e, "failed to open tool session");
            state.send_replace(SessionState::Failed);
            gate.resolve(None);
            return;
        }
    };

    state.send_replace(SessionState::Ready);
    gate.resolve(Some(Arc::clone(&transport)));
    tracing::info!(endpoint = %endpoint, "tool session ready");

    // Either an explicit cancel or the handle being dropped ends the idle phase.
    let _ = cancel.await;

    state.send_replace(SessionState::Closed);
    close_transport(&endpoint, transport.as_ref()).await;
}

/// Lets an open that was interrupted by cancellation finish, then closes
/// whatever it produced. The handshake may already have created state on the
/// server, so dropping the open future would leak it.
async fn release_cancelled_open(
    endpoint: &str,
    open: impl Future<Output = Result<Arc<dyn ToolTransport>, ToolError>>,
) {
    match tokio::time::timeout(CANCELLED_OPEN_GRACE, open).await {
        Ok(Ok(transport)) => close_transport(endpoint, transport.as_ref()).await,
        Ok(Err(e)) => {
            tracing::debug!(endpoint = %endpoint, error = %e, "cancelled tool session failed to open")
        }
        Err(_) => tracing::warn!(
            endpoint = %endpoint,
            "cancelled tool session still opening after {:?}, abandoning it",
            CANCELLED_OPEN_GRACE
        ),
    }
}

async fn close_transport(endpoint: &str, transport: &dyn ToolTransport) {
    match transport.close().await {
        Ok(()) => tracing::info!(endpoint = %endpoint, "tool session closed"),
        Err(e) => {
            tracing::warn!(endpoint = %endpoint, error = %e, "error while closing tool session")
        }
    }
}
