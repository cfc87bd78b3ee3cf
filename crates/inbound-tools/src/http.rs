//! Tool server transport over MCP Streamable HTTP, built on `rmcp`.
//!
//! `rmcp` owns the wire protocol: the initialize handshake, session headers,
//! JSON and event-stream responses, and session teardown when the service is
//! cancelled. This module maps its results onto [`ToolTransport`].

use crate::error::ToolError;
use crate::transport::{PromptArgs, ToolArgs, ToolConnector, ToolDescriptor, ToolTransport};
use async_trait::async_trait;
use rmcp::model::{
    CallToolRequestParam, GetPromptRequestParam, JsonObject, PromptMessageContent, RawContent,
};
use rmcp::service::{Peer, RoleClient, RunningService, ServiceExt};
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::StreamableHttpClientTransport;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Settings for [`HttpConnector`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub url: String,
    /// Bounds TCP connects and the whole initialize handshake.
    pub connect_timeout: Duration,
    /// Bounds a single tool call, prompt fetch or listing.
    pub request_timeout: Duration,
}

impl HttpTransportConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Opens [`HttpToolTransport`] sessions against one server URL.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    config: HttpTransportConfig,
    client: reqwest::Client,
}

impl HttpConnector {
    /// # Errors
    ///
    /// Returns [`ToolError::Connection`] if the URL is empty or the HTTP client
    /// cannot be built.
    pub fn new(config: HttpTransportConfig) -> Result<Self, ToolError> {
        if config.url.trim().is_empty() {
            return Err(ToolError::Connection(
                "tool server URL is not configured".to_string(),
            ));
        }

        // No overall request timeout on the client: the server may hold a
        // long-lived event stream open. Requests are bounded per call instead.
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ToolError::Connection(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl ToolConnector for HttpConnector {
    async fn open(&self) -> Result<Arc<dyn ToolTransport>, ToolError> {
        let transport = StreamableHttpClientTransport::with_client(
            self.client.clone(),
            StreamableHttpClientTransportConfig::with_uri(self.config.url.as_str()),
        );

        let service = tokio::time::timeout(self.config.connect_timeout, ().serve(transport))
            .await
            .map_err(|_| {
                ToolError::Connection(format!(
                    "initialize timed out after {:?}",
                    self.config.connect_timeout
                ))
            })?
            .map_err(|e| ToolError::Connection(format!("initialize failed: {}", e)))?;

        if let Some(info) = service.peer_info() {
            let server = info.server_info.name.as_str();
            tracing::debug!(server, url = %self.config.url, "tool server initialized");
        }

        Ok(Arc::new(HttpToolTransport {
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
            closed: AtomicBool::new(false),
            request_timeout: self.config.request_timeout,
        }))
    }

    fn endpoint(&self) -> &str {
        &self.config.url
    }
}

/// An initialized MCP session over HTTP.
pub struct HttpToolTransport {
    peer: Peer<RoleClient>,
    service: Mutex<Option<RunningService<RoleClient, ()>>>,
    closed: AtomicBool,
    request_timeout: Duration,
}

impl std::fmt::Debug for HttpToolTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpToolTransport")
            .field("closed", &self.closed.load(Ordering::Acquire))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl HttpToolTransport {
    fn ensure_open(&self) -> Result<(), ToolError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ToolError::Closed);
        }
        Ok(())
    }

    /// Runs one request against the peer, bounded by the request timeout.
    /// Failures are reported as call errors for `name`.
    async fn request<T, E: std::fmt::Display>(
        &self,
        name: &str,
        request: impl Future<Output = Result<T, E>>,
    ) -> Result<T, ToolError> {
        self.ensure_open()?;
        match tokio::time::timeout(self.request_timeout, request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ToolError::Call {
                tool: name.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(ToolError::Call {
                tool: name.to_string(),
                reason: format!("timed out after {:?}", self.request_timeout),
            }),
        }
    }
}

#[async_trait]
impl ToolTransport for HttpToolTransport {
    async fn call_tool(&self, name: &str, args: ToolArgs) -> Result<String, ToolError> {
        let result = self
            .request(
                name,
                self.peer.call_tool(CallToolRequestParam {
                    name: name.to_string().into(),
                    arguments: Some(args),
                }),
            )
            .await?;

        let text = join_text(result.content.into_iter().filter_map(|c| match c.raw {
            RawContent::Text(text_content) => Some(text_content.text),
            _ => None,
        }));

        if result.is_error.unwrap_or(false) {
            return Err(ToolError::Call {
                tool: name.to_string(),
                reason: if text.is_empty() {
                    "tool returned error".to_string()
                } else {
                    text
                },
            });
        }

        Ok(text)
    }

    async fn get_prompt(&self, name: &str, args: Option<PromptArgs>) -> Result<String, ToolError> {
        let arguments = args.map(|args| {
            args.into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect::<JsonObject>()
        });

        let result = self
            .request(
                name,
                self.peer.get_prompt(GetPromptRequestParam {
                    name: name.to_string(),
                    arguments,
                }),
            )
            .await?;

        Ok(join_text(result.messages.into_iter().filter_map(
            |message| match message.content {
                PromptMessageContent::Text { text } => Some(text),
                _ => None,
            },
        )))
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        let result = self
            .request("tools/list", self.peer.list_tools(None))
            .await?;

        Ok(result
            .tools
            .into_iter()
            .map(|tool| ToolDescriptor {
                name: tool.name.to_string(),
                description: tool.description.map(|d| d.to_string()),
                input_schema: Value::Object(Arc::unwrap_or_clone(tool.input_schema)),
            })
            .collect())
    }

    async fn close(&self) -> Result<(), ToolError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let service = self
            .service
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(service) = service else {
            return Ok(());
        };

        // Cancelling the service shuts the transport down, which ends the
        // server-side session.
        let reason = service
            .cancel()
            .await
            .map_err(|e| ToolError::Connection(format!("failed to close session: {}", e)))?;
        tracing::debug!(?reason, "tool service stopped");
        Ok(())
    }
}

/// Joins text parts with newlines.
fn join_text(parts: impl Iterator<Item = String>) -> String {
    parts.fold(String::new(), |mut acc, text| {
        if !acc.is_empty() {
            acc.push('\n');
        }
        acc.push_str(&text);
        acc
    })
}
