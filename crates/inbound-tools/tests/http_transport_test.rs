//! Tests for the Streamable HTTP transport against an in-process stub server.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use inbound_tools::{
    HttpConnector, HttpTransportConfig, PromptArgs, SessionState, ToolArgs, ToolConnector,
    ToolError, ToolSession, ToolTransport,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

const STUB_SESSION: &str = "stub-session";

#[derive(Default)]
struct StubState {
    /// (method, session header) for every POST received.
    requests: Mutex<Vec<(String, Option<String>)>>,
    initializes: AtomicUsize,
    deletes: AtomicUsize,
    /// Delay before acknowledging `notifications/initialized`.
    initialized_delay: Duration,
}

impl StubState {
    fn methods(&self) -> Vec<(String, Option<String>)> {
        self.requests.lock().unwrap().clone()
    }
}

fn reply(id: &Value, result: Value) -> Json<Value> {
    Json(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
}

async fn handle_post(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let method = body["method"].as_str().unwrap_or_default().to_string();
    let session = headers
        .get("mcp-session-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state
        .requests
        .lock()
        .unwrap()
        .push((method.clone(), session));

    let id = body["id"].clone();
    let params = &body["params"];

    match method.as_str() {
        "initialize" => {
            state.initializes.fetch_add(1, Ordering::SeqCst);
            (
                [("mcp-session-id", STUB_SESSION)],
                reply(
                    &id,
                    json!({
                        "protocolVersion": "2025-03-26",
                        "capabilities": { "tools": {}, "prompts": {} },
                        "serverInfo": { "name": "stub", "version": "0.0.1" }
                    }),
                ),
            )
                .into_response()
        }
        "notifications/initialized" => {
            tokio::time::sleep(state.initialized_delay).await;
            StatusCode::ACCEPTED.into_response()
        }
        "tools/call" => match params["name"].as_str() {
            Some("fail") => reply(
                &id,
                json!({ "content": [{ "type": "text", "text": "no such caller" }], "isError": true }),
            )
            .into_response(),
            Some("streamed") => {
                let message = json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": { "content": [{ "type": "text", "text": "from stream" }] }
                });
                (
                    [(header::CONTENT_TYPE, "text/event-stream")],
                    format!("event: message\ndata: {}\n\n", message),
                )
                    .into_response()
            }
            Some("slow") => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                reply(&id, json!({ "content": [] })).into_response()
            }
            Some("missing") => Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32602, "message": "Unknown tool" }
            }))
            .into_response(),
            _ => reply(
                &id,
                json!({ "content": [
                    { "type": "text", "text": params["arguments"].to_string() },
                    { "type": "text", "text": "done" }
                ] }),
            )
            .into_response(),
        },
        "prompts/get" => {
            let caller = params["arguments"]["caller"].as_str().unwrap_or("anyone");
            reply(
                &id,
                json!({
                    "description": "greeting",
                    "messages": [
                        { "role": "user", "content": { "type": "text", "text": format!("Greet {}", caller) } }
                    ]
                }),
            )
            .into_response()
        }
        "tools/list" => reply(
            &id,
            json!({ "tools": [
                { "name": "send-summary-to-user", "description": "Sends a summary", "inputSchema": { "type": "object" } },
                { "name": "lookup", "inputSchema": { "type": "object" } }
            ] }),
        )
        .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn handle_delete(State(state): State<Arc<StubState>>) -> StatusCode {
    state.deletes.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn handle_broken() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn spawn_stub() -> (SocketAddr, Arc<StubState>) {
    spawn_stub_with(StubState::default()).await
}

async fn spawn_stub_with(state: StubState) -> (SocketAddr, Arc<StubState>) {
    let state = Arc::new(state);
    let app = Router::new()
        .route("/mcp", post(handle_post).delete(handle_delete))
        .route("/broken", post(handle_broken))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

fn connector(addr: SocketAddr, path: &str) -> HttpConnector {
    HttpConnector::new(HttpTransportConfig::new(format!("http://{}{}", addr, path)))
        .expect("connector should build")
}

/// Session teardown runs in the background of the MCP service, so wait for it.
async fn wait_for_deletes(state: &StubState, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while state.deletes.load(Ordering::SeqCst) < expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("server session was not deleted");
}

#[tokio::test]
async fn handshake_sends_initialize_then_notification() {
    let (addr, state) = spawn_stub().await;
    let transport = connector(addr, "/mcp").open().await.expect("open");

    tokio::time::timeout(Duration::from_secs(5), async {
        while state.methods().len() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("initialized notification should arrive");

    let requests = state.methods();
    assert_eq!(requests[0], ("initialize".to_string(), None));
    assert_eq!(
        requests[1],
        (
            "notifications/initialized".to_string(),
            Some(STUB_SESSION.to_string())
        )
    );

    transport.close().await.unwrap();
}

#[tokio::test]
async fn tool_call_joins_text_content() {
    let (addr, state) = spawn_stub().await;
    let transport = connector(addr, "/mcp").open().await.unwrap();

    let mut args = ToolArgs::new();
    args.insert("phone_number".to_string(), json!("+905535235961"));
    let output = transport.call_tool("echo", args).await.unwrap();
    assert_eq!(output, "{\"phone_number\":\"+905535235961\"}\ndone");

    let last = state.methods().last().cloned().unwrap();
    assert_eq!(
        last,
        ("tools/call".to_string(), Some(STUB_SESSION.to_string()))
    );

    transport.close().await.unwrap();
}

#[tokio::test]
async fn tool_call_reads_event_stream_response() {
    let (addr, _state) = spawn_stub().await;
    let transport = connector(addr, "/mcp").open().await.unwrap();

    let output = transport
        .call_tool("streamed", ToolArgs::new())
        .await
        .unwrap();
    assert_eq!(output, "from stream");

    transport.close().await.unwrap();
}

#[tokio::test]
async fn tool_errors_are_call_errors() {
    let (addr, _state) = spawn_stub().await;
    let transport = connector(addr, "/mcp").open().await.unwrap();

    let err = transport
        .call_tool("fail", ToolArgs::new())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ToolError::Call {
            tool: "fail".to_string(),
            reason: "no such caller".to_string()
        }
    );

    let err = transport
        .call_tool("missing", ToolArgs::new())
        .await
        .unwrap_err();
    match err {
        ToolError::Call { tool, .. } => assert_eq!(tool, "missing"),
        other => panic!("expected call error, got {:?}", other),
    }

    // The session keeps working after failed calls.
    assert!(transport.call_tool("echo", ToolArgs::new()).await.is_ok());
    transport.close().await.unwrap();
}

#[tokio::test]
async fn prompt_and_tool_list() {
    let (addr, _state) = spawn_stub().await;
    let transport = connector(addr, "/mcp").open().await.unwrap();

    let mut args = PromptArgs::new();
    args.insert("caller".to_string(), "+905535235961".to_string());
    let prompt = transport.get_prompt("greeting", Some(args)).await.unwrap();
    assert_eq!(prompt, "Greet +905535235961");

    let tools = transport.list_tools().await.unwrap();
    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0].name, "send-summary-to-user");
    assert_eq!(tools[0].description.as_deref(), Some("Sends a summary"));
    assert_eq!(tools[1].description, None);

    transport.close().await.unwrap();
}

#[tokio::test]
async fn close_deletes_session_once_and_rejects_later_calls() {
    let (addr, state) = spawn_stub().await;
    let transport = connector(addr, "/mcp").open().await.unwrap();

    transport.close().await.unwrap();
    transport.close().await.unwrap();
    wait_for_deletes(&state, 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(state.deletes.load(Ordering::SeqCst), 1);

    let result = transport.call_tool("echo", ToolArgs::new()).await;
    assert_eq!(result, Err(ToolError::Closed));
}

#[tokio::test]
async fn failed_handshake_is_connection_error() {
    let (addr, _state) = spawn_stub().await;
    let result = connector(addr, "/broken").open().await;
    match result {
        Err(ToolError::Connection(reason)) => assert!(reason.contains("initialize")),
        Err(other) => panic!("expected connection error, got {:?}", other),
        Ok(_) => panic!("expected connection error, got a transport"),
    }
}

#[tokio::test]
async fn gateway_over_http_end_to_end() {
    let (addr, state) = spawn_stub().await;
    let session = ToolSession::start(connector(addr, "/mcp"));
    let gateway = session.gateway();

    let (a, b) = tokio::join!(
        gateway.call_tool("echo", ToolArgs::new()),
        gateway.call_tool("echo", ToolArgs::new()),
    );
    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(gateway.state(), SessionState::Ready);

    session.shutdown().await;
    wait_for_deletes(&state, 1).await;
    assert_eq!(gateway.state(), SessionState::Closed);
}

#[tokio::test]
async fn shutdown_during_handshake_releases_server_session() {
    let (addr, state) = spawn_stub_with(StubState {
        initialized_delay: Duration::from_millis(300),
        ..StubState::default()
    })
    .await;
    let session = ToolSession::start(connector(addr, "/mcp"));
    let gateway = session.gateway();

    // Shut down once the server has created a session but before the
    // handshake completes.
    tokio::time::timeout(Duration::from_secs(5), async {
        while state.initializes.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("initialize should reach the server");
    session.shutdown().await;

    assert_eq!(gateway.ready().await, Err(ToolError::Unavailable));
    assert_eq!(state.initializes.load(Ordering::SeqCst), 1);
    wait_for_deletes(&state, 1).await;
}

#[tokio::test]
async fn slow_tool_call_times_out_without_closing_session() {
    let (addr, _state) = spawn_stub().await;
    let config = HttpTransportConfig {
        request_timeout: Duration::from_millis(100),
        ..HttpTransportConfig::new(format!("http://{}/mcp", addr))
    };
    let transport = HttpConnector::new(config).unwrap().open().await.unwrap();

    let err = transport
        .call_tool("slow", ToolArgs::new())
        .await
        .unwrap_err();
    match err {
        ToolError::Call { tool, reason } => {
            assert_eq!(tool, "slow");
            assert!(reason.contains("timed out"), "reason: {}", reason);
        }
        other => panic!("expected call error, got {:?}", other),
    }

    assert!(transport.call_tool("echo", ToolArgs::new()).await.is_ok());
    transport.close().await.unwrap();
}

#[tokio::test]
async fn unreachable_server_makes_session_unavailable() {
    // Reserve a port, then free it so nothing is listening there.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let session = ToolSession::start(connector(addr, "/mcp"));
    let gateway = session.gateway();

    assert_eq!(gateway.ready().await, Err(ToolError::Unavailable));
    assert_eq!(gateway.state(), SessionState::Failed);

    session.shutdown().await;
}
