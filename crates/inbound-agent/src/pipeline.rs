//! Seam to the speech pipeline (STT, LLM, TTS).
//!
//! The pipeline itself lives in the room SDK's plugins. The agent only starts
//! it with the persona instructions and asks it for replies.

use crate::error::AgentError;
use async_trait::async_trait;
use inbound_types::ChatRole;
use inbound_voice::{ConversationHistory, PipelineConfig};
use tracing::info;

#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Starts the pipeline with the system instructions for the call.
    async fn start(&self, instructions: &str) -> Result<(), AgentError>;

    /// Asks the language model for a reply following `instructions`; the
    /// reply is spoken by TTS.
    async fn generate_reply(&self, instructions: &str) -> Result<(), AgentError>;
}

/// Pipeline used when no speech plugins are attached. Logs the configured
/// plugin selection and records requests in the conversation history.
#[derive(Debug, Clone)]
pub struct LoggingPipeline {
    config: PipelineConfig,
    history: ConversationHistory,
}

impl LoggingPipeline {
    pub fn new(config: PipelineConfig, history: ConversationHistory) -> Self {
        Self { config, history }
    }
}

#[async_trait]
impl ReplyGenerator for LoggingPipeline {
    async fn start(&self, instructions: &str) -> Result<(), AgentError> {
        info!(
            stt_model = %self.config.stt.model,
            stt_language = %self.config.stt.language,
            llm_model = %self.config.llm.model,
            tts_voice = %self.config.tts.voice,
            tts_language = %self.config.tts.language,
            vad = self.config.vad,
            turn_detection = self.config.turn_detection,
            "starting speech pipeline"
        );
        self.history.record(ChatRole::System, instructions);
        Ok(())
    }

    async fn generate_reply(&self, instructions: &str) -> Result<(), AgentError> {
        info!(instructions, "generating reply");
        self.history.record(ChatRole::System, instructions);
        Ok(())
    }
}
