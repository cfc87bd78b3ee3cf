//! Call-room side of the inbound agent.
//!
//! Holds the LiveKit settings and join-token issuing, the speech pipeline's
//! plugin selection, and the pieces of a call room the agent reads: the room
//! name (and the caller derived from it), the ordered conversation history,
//! and participant events.
//!
//! Media transport and signaling belong to the room SDK and are not modelled
//! here.

pub mod caller;
pub mod config;
pub mod error;
pub mod history;
pub mod room;
pub mod service;

pub use caller::{caller_id_from_room, caller_number_from_metadata};
pub use config::{
    LiveKitConfig, LlmConfig, PipelineConfig, SttConfig, TtsConfig, DEFAULT_AGENT_NAME,
};
pub use error::VoiceError;
pub use history::{build_transcript, ConversationHistory};
pub use room::{CallRoom, RoomEvent};
pub use service::VoiceService;
