//! Per-call entrypoint: owns the tool session for the lifetime of one call.

use crate::config::AgentConfig;
use crate::pipeline::ReplyGenerator;
use crate::reactor::DisconnectReactor;
use crate::CallRegistry;
use inbound_tools::{PromptArgs, ToolConnector, ToolGateway, ToolSession};
use inbound_voice::CallRoom;
use std::future::Future;
use std::sync::Arc;

/// Everything a call needs. The tool session is created from `connector`
/// when the call starts and shut down when it ends.
pub struct CallContext {
    pub room: Arc<CallRoom>,
    pub connector: Arc<dyn ToolConnector>,
    pub pipeline: Arc<dyn ReplyGenerator>,
    pub agent: AgentConfig,
    pub registry: CallRegistry,
}

/// What happened during a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallReport {
    pub caller_id: String,
    /// Instructions used for the opening reply, if one was generated.
    pub greeting: Option<String>,
    /// Number of summary calls fired by the disconnect reactor.
    pub summaries: usize,
}

/// Runs one call until the room closes or `shutdown` completes.
///
/// The tool session opens in the background while the pipeline starts. Once
/// the session is ready (or known to be unavailable) the agent greets the
/// caller; a shutdown before that point skips the greeting. Disconnect notifications trigger summary calls through the same
/// session. On exit the room is closed, pending summaries get a bounded
/// amount of time to finish, and the tool session is shut down before this
/// function returns.
pub async fn run_call(ctx: CallContext, shutdown: impl Future<Output = ()>) -> CallReport {
    let CallContext {
        room,
        connector,
        pipeline,
        agent,
        registry,
    } = ctx;

    let caller_id = room.caller_id();
    match room.caller_number() {
        Some(number) => tracing::info!(room = %room.name(), caller_id = %caller_id, caller_number = %number, "call started"),
        None => tracing::info!(room = %room.name(), caller_id = %caller_id, "call started"),
    }

    let session = ToolSession::start_shared(connector);
    let gateway = session.gateway();
    registry.insert(room.name(), gateway.clone());

    // Subscribe before anything can disconnect so no event is missed.
    let reactor = DisconnectReactor::for_room(gateway.clone(), &room);
    let mut reactor_task = tokio::spawn(reactor.run(room.subscribe()));

    let opening = async {
        if let Err(e) = pipeline.start(&agent.instructions).await {
            tracing::error!(room = %room.name(), error = %e, "failed to start speech pipeline");
        }
        greet(&gateway, pipeline.as_ref(), &agent, &caller_id).await
    };

    tokio::pin!(shutdown);
    let mut stopping = false;
    let greeting = tokio::select! {
        greeting = opening => greeting,
        () = &mut shutdown => {
            stopping = true;
            None
        }
    };

    let summaries = if stopping {
        tracing::info!(room = %room.name(), "shutdown requested before greeting, closing room");
        room.close();
        join_reactor(&mut reactor_task).await
    } else {
        tokio::select! {
            () = &mut shutdown => {
                tracing::info!(room = %room.name(), "shutdown requested, closing room");
                room.close();
                join_reactor(&mut reactor_task).await
            }
            result = &mut reactor_task => reactor_result(result),
        }
    };

    registry.remove(room.name());
    session.shutdown().await;
    tracing::info!(room = %room.name(), summaries, "call finished");

    CallReport {
        caller_id,
        greeting,
        summaries,
    }
}

async fn join_reactor(task: &mut tokio::task::JoinHandle<usize>) -> usize {
    reactor_result(task.await)
}

fn reactor_result(result: Result<usize, tokio::task::JoinError>) -> usize {
    result.unwrap_or_else(|e| {
        tracing::error!("disconnect reactor join error: {}", e);
        0
    })
}

/// Issues the opening reply once the tool session has settled.
///
/// With `greeting_prompt` configured the prompt text fetched from the tool
/// server is used; any failure falls back to the static greeting so the
/// caller is always greeted.
async fn greet(
    gateway: &ToolGateway,
    pipeline: &dyn ReplyGenerator,
    agent: &AgentConfig,
    caller_id: &str,
) -> Option<String> {
    let instructions = match gateway.ready().await {
        Ok(()) => match &agent.greeting_prompt {
            Some(prompt) => {
                let mut args = PromptArgs::new();
                args.insert("caller".to_string(), caller_id.to_string());
                match gateway.get_prompt(prompt, Some(args)).await {
                    Ok(text) if !text.trim().is_empty() => text,
                    Ok(_) => {
                        tracing::warn!(prompt = %prompt, "greeting prompt is empty, using default greeting");
                        agent.greeting.clone()
                    }
                    Err(e) => {
                        tracing::warn!(prompt = %prompt, error = %e, "failed to fetch greeting prompt, using default greeting");
                        agent.greeting.clone()
                    }
                }
            }
            None => agent.greeting.clone(),
        },
        Err(e) => {
            tracing::warn!(error = %e, "tool session not available, greeting without tools");
            agent.greeting.clone()
        }
    };

    match pipeline.generate_reply(&instructions).await {
        Ok(()) => Some(instructions),
        Err(e) => {
            tracing::error!(error = %e, "failed to generate greeting");
            None
        }
    }
}
