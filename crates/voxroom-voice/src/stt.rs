use crate::error::VoiceError;
use crate::speech::SpeechRecognizer;
use async_trait::async_trait;
use tracing::debug;
use voxroom_types::RemoteTrack;

/// Recognizer that "hears" the same configured transcript on every track.
///
/// Stands in for a real speech-to-text engine until one is wired up.
#[derive(Debug, Clone)]
pub struct StubRecognizer {
    transcript: String,
}

impl StubRecognizer {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
        }
    }
}

#[async_trait]
impl SpeechRecognizer for StubRecognizer {
    async fn recognize(&self, track: &RemoteTrack) -> Result<String, VoiceError> {
        if self.transcript.trim().is_empty() {
            return Err(VoiceError::Recognition(format!(
                "no speech recognized on track {}",
                track.sid
            )));
        }

        debug!(
            track = %track.sid,
            participant = %track.participant_identity,
            "stub recognizer returning fixed transcript"
        );
        Ok(self.transcript.clone())
    }
}
