use serde::{Deserialize, Serialize};
use std::fmt;

/// Agent name registered with LiveKit dispatch. Must match the SIP dispatch rule.
pub const DEFAULT_AGENT_NAME: &str = "inbound-agent";

fn default_token_ttl_seconds() -> u64 {
    3600
}

fn default_agent_name() -> String {
    DEFAULT_AGENT_NAME.to_string()
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LiveKitConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing)]
    pub api_secret: String,
    /// JWT token TTL in seconds for LiveKit join tokens. Default: 3600 (1 hour).
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: u64,
    #[serde(default = "default_agent_name")]
    pub agent_name: String,
}

impl Default for LiveKitConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            token_ttl_seconds: default_token_ttl_seconds(),
            agent_name: default_agent_name(),
        }
    }
}

impl fmt::Debug for LiveKitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveKitConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field("agent_name", &self.agent_name)
            .finish()
    }
}

impl LiveKitConfig {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            ..Self::default()
        }
    }
}

/// Speech-to-text plugin settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    pub model: String,
    pub language: String,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-transcribe".to_string(),
            language: "tr".to_string(),
        }
    }
}

/// Language model plugin settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-mini".to_string(),
        }
    }
}

/// Text-to-speech plugin settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub voice: String,
    pub language: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            voice: "bb2347fe-69e9-4810-873f-ffd759fe8420".to_string(),
            language: "tr".to_string(),
        }
    }
}

/// Plugin selection for the speech pipeline. These values are handed to the
/// pipeline as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub stt: SttConfig,
    pub llm: LlmConfig,
    pub tts: TtsConfig,
    /// Enable voice activity detection.
    pub vad: bool,
    /// Enable the multilingual end-of-turn detector.
    pub turn_detection: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stt: SttConfig::default(),
            llm: LlmConfig::default(),
            tts: TtsConfig::default(),
            vad: true,
            turn_detection: true,
        }
    }
}
