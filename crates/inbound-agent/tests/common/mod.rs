//! Shared fakes for the agent integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use inbound_agent::{AgentError, ReplyGenerator};
use inbound_tools::{
    PromptArgs, ToolArgs, ToolConnector, ToolDescriptor, ToolError, ToolTransport,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A recorded tool call: (transport instance, tool name, arguments).
pub type RecordedCall = (usize, String, ToolArgs);

#[derive(Debug, Default)]
pub struct Recorder {
    pub opened: AtomicUsize,
    pub closes: AtomicUsize,
    pub calls: Mutex<Vec<RecordedCall>>,
    pub prompts: Mutex<Vec<(String, Option<PromptArgs>)>>,
}

impl Recorder {
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_named(&self, name: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|(_, tool, _)| tool == name)
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeOptions {
    pub fail_open: bool,
    pub open_delay: Duration,
    /// Tool names that return a call error.
    pub failing_tools: Vec<String>,
    /// Text returned by `get_prompt`; `None` makes it fail.
    pub prompt_text: Option<String>,
    /// How long each tool call takes after it is recorded.
    pub call_delay: Duration,
}

pub struct FakeConnector {
    pub recorder: Arc<Recorder>,
    options: FakeOptions,
}

impl FakeConnector {
    pub fn new(options: FakeOptions) -> (Arc<Self>, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        (
            Arc::new(Self {
                recorder: recorder.clone(),
                options,
            }),
            recorder,
        )
    }
}

#[async_trait]
impl ToolConnector for FakeConnector {
    async fn open(&self) -> Result<Arc<dyn ToolTransport>, ToolError> {
        tokio::time::sleep(self.options.open_delay).await;
        if self.options.fail_open {
            return Err(ToolError::Connection("connection refused".to_string()));
        }
        let id = self.recorder.opened.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Arc::new(FakeTransport {
            id,
            recorder: self.recorder.clone(),
            options: self.options.clone(),
        }))
    }

    fn endpoint(&self) -> &str {
        "memory://tools"
    }
}

struct FakeTransport {
    id: usize,
    recorder: Arc<Recorder>,
    options: FakeOptions,
}

#[async_trait]
impl ToolTransport for FakeTransport {
    async fn call_tool(&self, name: &str, args: ToolArgs) -> Result<String, ToolError> {
        self.recorder
            .calls
            .lock()
            .unwrap()
            .push((self.id, name.to_string(), args));
        tokio::time::sleep(self.options.call_delay).await;
        if self.options.failing_tools.iter().any(|t| t == name) {
            return Err(ToolError::Call {
                tool: name.to_string(),
                reason: "rejected".to_string(),
            });
        }
        Ok("ok".to_string())
    }

    async fn get_prompt(&self, name: &str, args: Option<PromptArgs>) -> Result<String, ToolError> {
        self.recorder
            .prompts
            .lock()
            .unwrap()
            .push((name.to_string(), args));
        self.options.prompt_text.clone().ok_or_else(|| ToolError::Call {
            tool: name.to_string(),
            reason: "unknown prompt".to_string(),
        })
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        Ok(Vec::new())
    }

    async fn close(&self) -> Result<(), ToolError> {
        self.recorder.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Completes once `pipeline` has issued its first reply.
pub async fn after_greeting(pipeline: Arc<RecordingPipeline>) {
    while pipeline.replies.lock().unwrap().is_empty() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Pipeline that records every instruction it receives.
#[derive(Debug, Default)]
pub struct RecordingPipeline {
    pub started: Mutex<Vec<String>>,
    pub replies: Mutex<Vec<String>>,
}

#[async_trait]
impl ReplyGenerator for RecordingPipeline {
    async fn start(&self, instructions: &str) -> Result<(), AgentError> {
        self.started.lock().unwrap().push(instructions.to_string());
        Ok(())
    }

    async fn generate_reply(&self, instructions: &str) -> Result<(), AgentError> {
        self.replies.lock().unwrap().push(instructions.to_string());
        Ok(())
    }
}
