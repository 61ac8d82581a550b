//! Speech adapter boundary.
//!
//! The reply pipeline depends on these traits only, so recognition and
//! synthesis backends can be swapped (or faked in tests) without touching the
//! orchestration code.

use crate::config::SpeechConfig;
use crate::error::VoiceError;
use crate::stt::StubRecognizer;
use crate::tts::RemoteSynthesizer;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use voxroom_types::RemoteTrack;

/// Speech-to-text over a live audio track.
///
/// Implementations may take arbitrarily long. Callers bound the call with a
/// timeout and drop the future to cancel it.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn recognize(&self, track: &RemoteTrack) -> Result<String, VoiceError>;
}

/// Text-to-speech returning an encoded audio payload.
///
/// Network failures surface as [`VoiceError::Synthesis`]; an empty result as
/// [`VoiceError::EmptyAudio`].
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError>;
}

/// Chooses what the agent says back to a recognized utterance.
pub trait ReplyComposer: Send + Sync {
    fn compose(&self, recognized: &str) -> String;
}

/// Answers every utterance with the same configured text.
#[derive(Debug, Clone)]
pub struct CannedReply {
    text: String,
}

impl CannedReply {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl ReplyComposer for CannedReply {
    fn compose(&self, _recognized: &str) -> String {
        self.text.clone()
    }
}

/// Everything a reply pipeline needs to turn speech into a spoken answer.
#[derive(Clone)]
pub struct SpeechStack {
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub composer: Arc<dyn ReplyComposer>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub recognition_timeout: Duration,
}

impl SpeechStack {
    pub fn new(
        recognizer: Arc<dyn SpeechRecognizer>,
        composer: Arc<dyn ReplyComposer>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            recognizer,
            composer,
            synthesizer,
            recognition_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_recognition_timeout(mut self, timeout: Duration) -> Self {
        self.recognition_timeout = timeout;
        self
    }

    /// Builds the stub recognizer, canned reply, and remote synthesizer
    /// described by `config`.
    pub fn from_config(config: &SpeechConfig) -> Result<Self, VoiceError> {
        let synthesizer = RemoteSynthesizer::from_config(config)?;
        Ok(Self::new(
            Arc::new(StubRecognizer::new(config.transcript.clone())),
            Arc::new(CannedReply::new(config.reply_text.clone())),
            Arc::new(synthesizer),
        )
        .with_recognition_timeout(Duration::from_secs(config.recognition_timeout_secs)))
    }
}

impl std::fmt::Debug for SpeechStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechStack")
            .field("recognition_timeout", &self.recognition_timeout)
            .finish_non_exhaustive()
    }
}
