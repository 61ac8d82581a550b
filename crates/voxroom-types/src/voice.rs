//! Reply artifacts produced by the agent and handed to the relay.

use crate::TrackKind;
use serde::{Deserialize, Serialize};

/// Name of the outbound track carrying synthesized replies.
pub const REPLY_TRACK_NAME: &str = "agent-voice";

/// Options attached to an outbound track when it is published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackPublishOptions {
    pub kind: TrackKind,
    pub name: String,
}

impl TrackPublishOptions {
    /// Options for the agent's reply track: `{kind: "audio", name: "agent-voice"}`.
    pub fn agent_voice() -> Self {
        Self {
            kind: TrackKind::Audio,
            name: REPLY_TRACK_NAME.to_string(),
        }
    }
}

/// Synthesized audio ready to be published into a room.
///
/// Owned by the pipeline until it is published; ownership of the payload then
/// moves to the relay's outbound track.
#[derive(Clone, PartialEq, Eq)]
pub struct SynthesizedReply {
    /// Encoded audio (MP3 from the remote synthesizer).
    pub payload: Vec<u8>,
    pub options: TrackPublishOptions,
}

impl SynthesizedReply {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            options: TrackPublishOptions::agent_voice(),
        }
    }
}

impl std::fmt::Debug for SynthesizedReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesizedReply")
            .field("payload_len", &self.payload.len())
            .field("options", &self.options)
            .finish()
    }
}
