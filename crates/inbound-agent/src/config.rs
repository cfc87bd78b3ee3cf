//! Agent configuration loading from file and environment variables.

use inbound_tools::HttpTransportConfig;
use inbound_voice::{LiveKitConfig, PipelineConfig};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

/// Top-level agent configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Persona, greeting and room settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Tool server connection settings.
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub livekit: LiveKitConfig,

    /// Speech pipeline plugin selection.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Health endpoint settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Behaviour of the agent within a call.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// System instructions for the language model.
    #[serde(default = "default_instructions")]
    pub instructions: String,

    /// Instructions for the opening reply when no prompt is fetched.
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Name of a prompt on the tool server whose text replaces `greeting`.
    #[serde(default)]
    pub greeting_prompt: Option<String>,

    /// Room the agent serves.
    #[serde(default = "default_room_name")]
    pub room_name: String,

    /// JSON metadata attached to the room by the dispatcher.
    #[serde(default)]
    pub room_metadata: Option<String>,
}

/// Tool server connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    /// Streamable HTTP endpoint of the tool server.
    #[serde(default)]
    pub server_url: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Timeout for a single tool call or prompt fetch.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Network configuration for the health endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "inbound_tools=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_instructions() -> String {
    "Sen yardımcı bir asistansın.".to_string()
}

fn default_greeting() -> String {
    "Arayanı selamla.".to_string()
}

fn default_room_name() -> String {
    "inbound-call".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8081
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            instructions: default_instructions(),
            greeting: default_greeting(),
            greeting_prompt: None,
            room_name: default_room_name(),
            room_metadata: None,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ToolsConfig {
    /// Transport settings for the tool server connector.
    pub fn transport_config(&self) -> HttpTransportConfig {
        HttpTransportConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..HttpTransportConfig::new(self.server_url.clone())
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults, then
/// applies environment overrides from the process environment.
///
/// Environment variable overrides:
/// - `INBOUND_MCP_SERVER_URL`, or `MCP_SERVER_URL`, overrides `tools.server_url`
/// - `LIVEKIT_URL`, `LIVEKIT_API_KEY`, `LIVEKIT_API_SECRET` override `livekit.*`
/// - `INBOUND_AGENT_NAME` overrides `livekit.agent_name`
/// - `INBOUND_ROOM_NAME` overrides `agent.room_name`
/// - `INBOUND_ROOM_METADATA` overrides `agent.room_metadata`
/// - `INBOUND_HOST` overrides `server.host`
/// - `INBOUND_PORT` overrides `server.port`
/// - `INBOUND_LOG_LEVEL` overrides `logging.level`
/// - `INBOUND_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] with an explicit environment lookup.
pub fn load_config_with_env(
    path: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    if let Some(url) = env("INBOUND_MCP_SERVER_URL").or_else(|| env("MCP_SERVER_URL")) {
        config.tools.server_url = url;
    }
    if let Some(url) = env("LIVEKIT_URL") {
        config.livekit.url = url;
    }
    if let Some(key) = env("LIVEKIT_API_KEY") {
        config.livekit.api_key = key;
    }
    if let Some(secret) = env("LIVEKIT_API_SECRET") {
        config.livekit.api_secret = secret;
    }
    if let Some(name) = env("INBOUND_AGENT_NAME") {
        config.livekit.agent_name = name;
    }
    if let Some(room) = env("INBOUND_ROOM_NAME") {
        config.agent.room_name = room;
    }
    if let Some(metadata) = env("INBOUND_ROOM_METADATA") {
        config.agent.room_metadata = Some(metadata);
    }
    if let Some(host) = env("INBOUND_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = env("INBOUND_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(level) = env("INBOUND_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = env("INBOUND_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    Ok(config)
}
