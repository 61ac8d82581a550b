//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;
use voxroom_voice::{RelayConfig, SpeechConfig};

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// HTTP server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Relay credentials, shared by the token endpoint and the worker.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Speech adapter settings.
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Agent worker settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Agent worker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Whether to start the agent worker alongside the token endpoint.
    #[serde(default = "default_agent_enabled")]
    pub enabled: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "voxroom_agent=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_agent_enabled() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            enabled: default_agent_enabled(),
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
/// applies environment variable overrides.
///
/// Environment variable overrides:
/// - `VOXROOM_HOST` overrides `server.host`
/// - `PORT` or `VOXROOM_PORT` overrides `server.port` (`VOXROOM_PORT` wins)
/// - `LIVEKIT_URL` overrides `relay.url`
/// - `LIVEKIT_API_KEY` overrides `relay.api_key`
/// - `LIVEKIT_API_SECRET` overrides `relay.api_secret`
/// - `VOXROOM_TTS_HOST` overrides `speech.tts_host`
/// - `VOXROOM_ARTIFACT_DIR` overrides `speech.artifact_dir`
/// - `VOXROOM_AGENT_ENABLED` overrides `agent.enabled`
/// - `VOXROOM_LOG_LEVEL` overrides `logging.level`
/// - `VOXROOM_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
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

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies overrides looked up through `var` (normally the process
/// environment).
pub fn apply_env_overrides<F>(config: &mut Config, var: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = var("VOXROOM_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    for key in ["PORT", "VOXROOM_PORT"] {
        if let Some(port) = var(key) {
            if let Ok(parsed) = port.parse() {
                config.server.port = parsed;
            }
        }
    }
    if let Some(url) = var("LIVEKIT_URL") {
        config.relay.url = url;
    }
    if let Some(api_key) = var("LIVEKIT_API_KEY") {
        config.relay.api_key = api_key;
    }
    if let Some(api_secret) = var("LIVEKIT_API_SECRET") {
        config.relay.api_secret = api_secret;
    }
    if let Some(host) = var("VOXROOM_TTS_HOST") {
        config.speech.tts_host = host;
    }
    if let Some(dir) = var("VOXROOM_ARTIFACT_DIR") {
        config.speech.artifact_dir = Some(dir.into());
    }
    if let Some(enabled) = var("VOXROOM_AGENT_ENABLED") {
        config.agent.enabled = enabled == "true" || enabled == "1";
    }
    if let Some(level) = var("VOXROOM_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("VOXROOM_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
