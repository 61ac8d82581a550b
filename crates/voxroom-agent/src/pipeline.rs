//! Audio reply pipeline: one instance per subscribed audio track.
//!
//! An instance walks `Listening → Recognizing → Synthesizing → Publishing →
//! Done`, dropping to `Failed` on the first error. It never touches the
//! session's track map; every state change is reported back over a channel
//! and the session applies it.

use crate::session::ReplyPublisher;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use voxroom_types::{PipelineState, RemoteTrack, SynthesizedReply};
use voxroom_voice::{SpeechStack, VoiceError};

/// A state change reported by a pipeline instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineTransition {
    pub track_sid: String,
    /// Distinguishes successive pipelines on the same track.
    pub instance: u64,
    pub state: PipelineState,
}

/// Why a pipeline stopped before reaching `Done`.
#[derive(Debug)]
enum Stop {
    /// The session cancelled the instance; it reports nothing further.
    Cancelled,
    Failed(VoiceError),
}

impl From<VoiceError> for Stop {
    fn from(e: VoiceError) -> Self {
        Stop::Failed(e)
    }
}

pub(crate) struct AudioReplyPipeline {
    track: RemoteTrack,
    instance: u64,
    state: PipelineState,
    speech: SpeechStack,
    publisher: ReplyPublisher,
    cancel: CancellationToken,
    transitions: mpsc::UnboundedSender<PipelineTransition>,
}

impl AudioReplyPipeline {
    pub(crate) fn new(
        track: RemoteTrack,
        instance: u64,
        speech: SpeechStack,
        publisher: ReplyPublisher,
        cancel: CancellationToken,
        transitions: mpsc::UnboundedSender<PipelineTransition>,
    ) -> Self {
        Self {
            track,
            instance,
            state: PipelineState::Listening,
            speech,
            publisher,
            cancel,
            transitions,
        }
    }

    pub(crate) async fn run(mut self) {
        match self.drive().await {
            Ok(()) => {
                info!("published voice reply to room");
                self.report(PipelineState::Done);
            }
            Err(Stop::Cancelled) => {
                debug!(state = self.state.label(), "pipeline cancelled");
            }
            Err(Stop::Failed(e)) => {
                warn!(state = self.state.label(), "pipeline failed: {}", e);
                self.report(PipelineState::Failed);
            }
        }
    }

    async fn drive(&mut self) -> Result<(), Stop> {
        self.advance(PipelineState::Recognizing)?;
        let recognized = self.recognize().await?;
        info!(text = %recognized, "participant said");

        self.advance(PipelineState::Synthesizing)?;
        let reply_text = self.speech.composer.compose(&recognized);
        let payload = self.synthesize(&reply_text).await?;

        self.advance(PipelineState::Publishing)?;
        // Not raced against cancellation; a started publish completes.
        self.publisher
            .publish(SynthesizedReply::new(payload))
            .await?;
        Ok(())
    }

    /// Moves to `next` unless the session has cancelled this instance.
    fn advance(&mut self, next: PipelineState) -> Result<(), Stop> {
        if self.cancel.is_cancelled() {
            return Err(Stop::Cancelled);
        }
        self.report(next);
        Ok(())
    }

    fn report(&mut self, next: PipelineState) {
        debug!(from = self.state.label(), to = next.label(), "pipeline transition");
        self.state = next;
        let transition = PipelineTransition {
            track_sid: self.track.sid.clone(),
            instance: self.instance,
            state: next,
        };
        if self.transitions.send(transition).is_err() {
            debug!("room session gone, transition dropped");
        }
    }

    async fn recognize(&self) -> Result<String, Stop> {
        let timeout = self.speech.recognition_timeout;
        let recognition = tokio::time::timeout(
            timeout,
            self.speech.recognizer.recognize(&self.track),
        );

        let text = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(Stop::Cancelled),
            result = recognition => result.map_err(|_| {
                VoiceError::Recognition(format!(
                    "recognition timed out after {} seconds",
                    timeout.as_secs()
                ))
            })??,
        };

        if text.trim().is_empty() {
            return Err(VoiceError::Recognition("no speech recognized".to_string()).into());
        }
        Ok(text)
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, Stop> {
        let payload = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(Stop::Cancelled),
            result = self.speech.synthesizer.synthesize(text) => result?,
        };

        if payload.is_empty() {
            return Err(VoiceError::EmptyAudio.into());
        }
        Ok(payload)
    }
}
