//! Inbound call agent library logic.
//!
//! Wires the tool-session core into a call: configuration loading, the
//! per-call entrypoint, the disconnect reactor that sends call summaries, the
//! speech pipeline seam, and the HTTP endpoints (health, call join tokens).

pub mod call;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod reactor;

pub use call::{run_call, CallContext, CallReport};
pub use error::AgentError;
pub use pipeline::{LoggingPipeline, ReplyGenerator};
pub use reactor::DisconnectReactor;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use inbound_tools::{SessionState, ToolGateway};
use inbound_voice::VoiceService;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Tool gateways of the calls currently running, keyed by room name.
///
/// Uses `std::sync::RwLock` intentionally: all lock acquisitions are brief
/// HashMap operations that never span `.await` points.
#[derive(Debug, Clone, Default)]
pub struct CallRegistry {
    calls: Arc<RwLock<HashMap<String, ToolGateway>>>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, room: &str, gateway: ToolGateway) {
        self.calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(room.to_string(), gateway);
    }

    pub fn remove(&self, room: &str) {
        self.calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(room);
    }

    pub fn contains(&self, room: &str) -> bool {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(room)
    }

    pub fn len(&self) -> usize {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Room names with the state of their tool session, sorted by room.
    pub fn snapshot(&self) -> Vec<(String, SessionState)> {
        let calls = self.calls.read().unwrap_or_else(PoisonError::into_inner);
        let mut entries: Vec<_> = calls
            .iter()
            .map(|(room, gateway)| (room.clone(), gateway.state()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

/// Application state shared across request handlers.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub calls: CallRegistry,
    pub voice: Arc<VoiceService>,
}

/// Health check handler.
///
/// Reports the tool session state of each active call. The status is
/// `degraded` while any active call has lost its tool session.
async fn health(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.calls.snapshot();
    let degraded = snapshot.iter().any(|(_, session)| session.is_terminal());
    let calls: Vec<Value> = snapshot
        .into_iter()
        .map(|(room, session)| json!({ "room": room, "tool_session": session.as_str() }))
        .collect();

    Json(json!({
        "status": if degraded { "degraded" } else { "ok" },
        "version": env!("CARGO_PKG_VERSION"),
        "calls": calls,
    }))
}

#[derive(Debug, Deserialize)]
pub struct JoinCallRequest {
    /// Participant identity, e.g. the SIP participant of the caller.
    pub identity: String,
    /// Display name; defaults to the identity.
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JoinCallResponse {
    pub token: String,
    pub url: String,
}

/// POST /calls/{room}/join
///
/// Issues a LiveKit join token for a room with an active call.
async fn join_call(
    State(state): State<AppState>,
    Path(room): Path<String>,
    Json(request): Json<JoinCallRequest>,
) -> Result<Json<JoinCallResponse>, (StatusCode, String)> {
    if !state.voice.is_enabled() {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "LiveKit is not configured".to_string(),
        ));
    }
    if request.identity.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "identity is required".to_string()));
    }
    if !state.calls.contains(&room) {
        return Err((StatusCode::NOT_FOUND, "No active call in room".to_string()));
    }

    let name = request.name.as_deref().unwrap_or(&request.identity);
    let token = state
        .voice
        .generate_join_token(&room, &request.identity, name)
        .map_err(|e| {
            tracing::error!(room = %room, "failed to generate LiveKit token: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to generate join token".to_string(),
            )
        })?;

    tracing::info!(room = %room, participant = %request.identity, "issued join token");
    Ok(Json(JoinCallResponse {
        token,
        url: state.voice.get_url().to_string(),
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/calls/{room}/join", post(join_call))
        .with_state(state)
}
