use crate::config::SpeechConfig;
use crate::error::VoiceError;
use crate::speech::SpeechSynthesizer;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest text the remote host accepts in a single request.
const MAX_TTS_INPUT_CHARS: usize = 200;

/// Synthesizes speech by fetching MP3 audio from a remote translate-style
/// TTS host.
#[derive(Debug, Clone)]
pub struct RemoteSynthesizer {
    client: reqwest::Client,
    host: String,
    language: String,
    artifact_dir: Option<PathBuf>,
    artifact_seq: Arc<AtomicU64>,
}

impl RemoteSynthesizer {
    /// Creates a synthesizer for `host` (e.g. `https://translate.google.com`).
    pub fn new(
        host: impl Into<String>,
        language: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, VoiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VoiceError::Config(format!("failed to build HTTP client: {}", e)))?;

        let host = host.into().trim_end_matches('/').to_string();
        if host.is_empty() {
            return Err(VoiceError::Config("TTS host must not be empty".to_string()));
        }

        Ok(Self {
            client,
            host,
            language: language.into(),
            artifact_dir: None,
            artifact_seq: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn from_config(config: &SpeechConfig) -> Result<Self, VoiceError> {
        let synthesizer = Self::new(
            config.tts_host.clone(),
            config.language.clone(),
            Duration::from_secs(config.synthesis_timeout_secs),
        )?;
        Ok(match &config.artifact_dir {
            Some(dir) => synthesizer.with_artifact_dir(dir.clone()),
            None => synthesizer,
        })
    }

    /// Also write every synthesized payload to `dir` as `reply-<n>.mp3`.
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/translate_tts", self.host)
    }

    /// Writes `payload` as the next `reply-<n>.mp3` under `dir`.
    async fn save_artifact(&self, dir: &Path, payload: &[u8]) -> Result<PathBuf, VoiceError> {
        let seq = self.artifact_seq.fetch_add(1, Ordering::Relaxed);
        let path = dir.join(format!("reply-{}.mp3", seq));
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&path, payload).await?;
        Ok(path)
    }
}

#[async_trait]
impl SpeechSynthesizer for RemoteSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError> {
        let text_len = text.chars().count();
        if text.trim().is_empty() {
            return Err(VoiceError::Synthesis("text must not be empty".to_string()));
        }
        if text_len > MAX_TTS_INPUT_CHARS {
            return Err(VoiceError::Synthesis(format!(
                "text exceeds maximum length: {} characters (limit: {} characters)",
                text_len, MAX_TTS_INPUT_CHARS
            )));
        }

        let textlen = text_len.to_string();
        let response = self
            .client
            .get(self.endpoint())
            .query(&[
                ("ie", "UTF-8"),
                ("q", text),
                ("tl", self.language.as_str()),
                ("total", "1"),
                ("idx", "0"),
                ("textlen", textlen.as_str()),
                ("client", "tw-ob"),
                ("prev", "input"),
                ("ttsspeed", "1"),
            ])
            .send()
            .await
            .map_err(|e| VoiceError::Synthesis(format!("request to TTS host failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VoiceError::Synthesis(format!(
                "TTS host returned {}",
                status
            )));
        }

        let payload = response
            .bytes()
            .await
            .map_err(|e| VoiceError::Synthesis(format!("failed to read TTS response: {}", e)))?;

        if payload.is_empty() {
            return Err(VoiceError::EmptyAudio);
        }

        if let Some(dir) = &self.artifact_dir {
            // The reply is still delivered when its artifact cannot be kept.
            match self.save_artifact(dir, &payload).await {
                Ok(path) => {
                    debug!(path = %path.display(), bytes = payload.len(), "saved reply artifact")
                }
                Err(e) => warn!(dir = %dir.display(), "failed to save reply artifact: {}", e),
            }
        }
        Ok(payload.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn artifact_write_failure_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let synthesizer =
            RemoteSynthesizer::new("http://127.0.0.1:9", "en", Duration::from_secs(1)).unwrap();

        let result = synthesizer.save_artifact(&blocker, b"mp3").await;

        assert!(matches!(result, Err(VoiceError::Io(_))), "got {:?}", result);
    }
}
