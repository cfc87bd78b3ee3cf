//! One-shot readiness signal shared between the session supervisor and every
//! gateway caller.
//!
//! The gate starts pending and is resolved exactly once, either with a value
//! (the session is ready) or with `None` (the session will never be ready).
//! Waiters that arrive before or after the resolution all observe the same
//! outcome. Waiting suspends on a `watch` channel; there is no polling.

use std::fmt;
use tokio::sync::watch;

/// Writer half of the gate. Held by the supervisor.
pub struct ReadinessGate<T> {
    tx: watch::Sender<Option<Option<T>>>,
}

/// Reader half of the gate. Cheap to clone.
pub struct GateWaiter<T> {
    rx: watch::Receiver<Option<Option<T>>>,
}

/// Creates a pending gate and its first waiter.
pub fn readiness_gate<T: Clone>() -> (ReadinessGate<T>, GateWaiter<T>) {
    let (tx, rx) = watch::channel(None);
    (ReadinessGate { tx }, GateWaiter { rx })
}

impl<T: Clone> ReadinessGate<T> {
    /// Resolves the gate. The first call wins; later calls leave the stored
    /// resolution untouched and return `false`.
    pub fn resolve(&self, value: Option<T>) -> bool {
        let mut value = Some(value);
        let resolved = self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = value.take();
            true
        });

        if !resolved {
            tracing::warn!("readiness gate already resolved, ignoring second resolution");
        }
        resolved
    }

    pub fn is_resolved(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn waiter(&self) -> GateWaiter<T> {
        GateWaiter {
            rx: self.tx.subscribe(),
        }
    }
}

impl<T: Clone> GateWaiter<T> {
    /// Waits until the gate is resolved and returns the carried value, or
    /// `None` if the gate resolved without one.
    ///
    /// If the writer is dropped while the gate is still pending, the session
    /// can never become ready and `None` is returned.
    pub async fn wait(&self) -> Option<T> {
        let mut rx = self.rx.clone();
        let resolved = match rx.wait_for(Option::is_some).await {
            Ok(resolved) => Some(resolved.clone()),
            Err(_) => None,
        };
        match resolved {
            Some(outcome) => outcome.flatten(),
            None => rx.borrow().clone().flatten(),
        }
    }

    /// Returns the resolution without waiting: `None` while pending,
    /// `Some(resolution)` afterwards.
    pub fn peek(&self) -> Option<Option<T>> {
        self.rx.borrow().clone()
    }
}

impl<T> Clone for GateWaiter<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

fn describe<T>(slot: &Option<Option<T>>) -> &'static str {
    match slot {
        None => "pending",
        Some(Some(_)) => "ready",
        Some(None) => "failed",
    }
}

impl<T> fmt::Debug for ReadinessGate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadinessGate")
            .field("state", &describe(&self.tx.borrow()))
            .finish()
    }
}

impl<T> fmt::Debug for GateWaiter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateWaiter")
            .field("state", &describe(&self.rx.borrow()))
            .finish()
    }
}
