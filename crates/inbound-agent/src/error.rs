use inbound_tools::ToolError;
use inbound_voice::VoiceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Tools(#[from] ToolError),

    #[error(transparent)]
    Voice(#[from] VoiceError),

    #[error("Speech pipeline error: {0}")]
    Pipeline(String),
}
