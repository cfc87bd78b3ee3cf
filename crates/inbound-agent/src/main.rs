//! Inbound agent binary: serves one call room with a tool session attached.
//!
//! Starts structured logging, the HTTP endpoints, and the call entrypoint,
//! and shuts everything down in order on SIGTERM/SIGINT.

use inbound_agent::config::{self, Config};
use inbound_agent::{app, run_call, AppState, CallContext, CallRegistry, LoggingPipeline};
use inbound_tools::HttpConnector;
use inbound_voice::{CallRoom, VoiceService};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("INBOUND_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration");

    init_tracing(&config);

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    let connector = HttpConnector::new(config.tools.transport_config())
        .expect("failed to configure tool server connection, set MCP_SERVER_URL");

    let voice = Arc::new(VoiceService::new(config.livekit.clone()));
    if voice.is_enabled() {
        tracing::info!(
            url = voice.get_url(),
            agent = voice.agent_name(),
            "LiveKit configured, serving join tokens"
        );
    } else {
        tracing::warn!("LiveKit URL not configured, join tokens disabled");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    // HTTP endpoints
    let registry = CallRegistry::new();
    let addr = SocketAddr::new(config.server.host, config.server.port);
    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind HTTP listener");
    tracing::info!(%addr, "HTTP endpoints listening");

    let server = tokio::spawn({
        let state = AppState {
            calls: registry.clone(),
            voice,
        };
        let shutdown = wait_for_shutdown(shutdown_rx.clone());
        async move {
            if let Err(e) = axum::serve(listener, app(state))
                .with_graceful_shutdown(shutdown)
                .await
            {
                tracing::error!("HTTP server error: {}", e);
            }
        }
    });

    let room = Arc::new(CallRoom::new(
        config.agent.room_name.clone(),
        config.agent.room_metadata.clone(),
    ));
    let pipeline = Arc::new(LoggingPipeline::new(
        config.pipeline.clone(),
        room.history().clone(),
    ));

    let report = run_call(
        CallContext {
            room,
            connector: Arc::new(connector),
            pipeline,
            agent: config.agent.clone(),
            registry,
        },
        wait_for_shutdown(shutdown_rx),
    )
    .await;

    tracing::info!(
        caller_id = %report.caller_id,
        greeted = report.greeting.is_some(),
        summaries = report.summaries,
        "call ended"
    );

    if let Err(e) = server.await {
        tracing::error!("HTTP server join error: {}", e);
    }

    tracing::info!("inbound agent shut down");
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
