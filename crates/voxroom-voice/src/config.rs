use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Identity used when a token request names no participant.
pub const DEFAULT_IDENTITY: &str = "flutter-user";
/// Room used when a token request names no room.
pub const DEFAULT_ROOM: &str = "test-room";

fn default_token_ttl_seconds() -> u64 {
    3600
}

fn default_transcript() -> String {
    "Hello agent!".to_string()
}

fn default_reply_text() -> String {
    "Hi! This is a test voice reply.".to_string()
}

fn default_tts_host() -> String {
    "https://translate.google.com".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_synthesis_timeout_secs() -> u64 {
    15
}

fn default_recognition_timeout_secs() -> u64 {
    30
}

/// Connection settings for the media relay.
///
/// The API secret both authenticates the worker and signs access tokens.
#[derive(Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing)]
    pub api_secret: String,
    /// Lifetime of issued access tokens in seconds. Default: 3600 (1 hour).
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            token_ttl_seconds: default_token_ttl_seconds(),
        }
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .finish()
    }
}

impl RelayConfig {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            token_ttl_seconds: default_token_ttl_seconds(),
        }
    }

    /// Returns `true` when both halves of the API credential are present.
    pub fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.api_secret.trim().is_empty()
    }
}

/// Settings for the speech adapters and the reply pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Fixed text returned by the stub recognizer.
    #[serde(default = "default_transcript")]
    pub transcript: String,

    /// Canned reply spoken back for every recognized utterance.
    #[serde(default = "default_reply_text")]
    pub reply_text: String,

    /// Base URL of the remote synthesis host.
    #[serde(default = "default_tts_host")]
    pub tts_host: String,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_synthesis_timeout_secs")]
    pub synthesis_timeout_secs: u64,

    #[serde(default = "default_recognition_timeout_secs")]
    pub recognition_timeout_secs: u64,

    /// When set, every synthesized reply is also written here as an MP3 file.
    #[serde(default)]
    pub artifact_dir: Option<PathBuf>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            transcript: default_transcript(),
            reply_text: default_reply_text(),
            tts_host: default_tts_host(),
            language: default_language(),
            synthesis_timeout_secs: default_synthesis_timeout_secs(),
            recognition_timeout_secs: default_recognition_timeout_secs(),
            artifact_dir: None,
        }
    }
}
