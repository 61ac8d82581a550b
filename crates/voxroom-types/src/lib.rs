//! Shared types for the voxroom workspace.
//!
//! This crate holds the room-level vocabulary every other crate speaks:
//! track kinds, participants, the events a relay delivers for a joined room,
//! and the states an audio reply pipeline moves through.
//!
//! It deliberately has no async or network dependencies so that the relay
//! boundary, the speech adapters, and the HTTP server can all share it.

use serde::{Deserialize, Serialize};

/// Kind of media carried by a published track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// An audio stream (microphone, synthesized voice).
    Audio,
    /// A video stream (camera, screen share).
    Video,
}

impl TrackKind {
    /// Returns the wire label for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }

    /// Parses a wire label. Returns `None` for unknown kinds.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "audio" => Some(Self::Audio),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

/// Connection state of a remote participant as last reported by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Connected,
    Disconnected,
}

/// A remote participant in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    /// Unique identity within the room (the token subject).
    pub identity: String,
    pub state: ConnectionState,
}

impl ParticipantInfo {
    /// Creates a connected participant with the given identity.
    pub fn connected(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            state: ConnectionState::Connected,
        }
    }
}

/// Metadata describing a published track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackPublication {
    /// Track id assigned by the relay.
    pub sid: String,
    /// Human-readable track name chosen by the publisher.
    pub name: String,
    pub kind: TrackKind,
}

/// A subscribed remote track.
///
/// The media itself stays inside the relay; the core only needs a stable
/// handle to pass to the speech recognizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTrack {
    pub sid: String,
    /// Identity of the participant who published the track.
    pub participant_identity: String,
}

/// Events the relay delivers for a joined room, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    ParticipantConnected(ParticipantInfo),
    ParticipantDisconnected(ParticipantInfo),
    TrackSubscribed {
        track: RemoteTrack,
        publication: TrackPublication,
        participant: ParticipantInfo,
    },
    TrackUnsubscribed {
        track: RemoteTrack,
        participant: ParticipantInfo,
    },
}

/// States of an audio reply pipeline.
///
/// `Listening → Recognizing → Synthesizing → Publishing → Done`, with
/// `Failed` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Listening,
    Recognizing,
    Synthesizing,
    Publishing,
    Done,
    Failed,
}

impl PipelineState {
    /// Returns `true` for `Done` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        match (self, next) {
            (from, Self::Failed) => !from.is_terminal(),
            (Self::Listening, Self::Recognizing)
            | (Self::Recognizing, Self::Synthesizing)
            | (Self::Synthesizing, Self::Publishing)
            | (Self::Publishing, Self::Done) => true,
            _ => false,
        }
    }

    /// Returns the string label for this state.
    pub fn label(self) -> &'static str {
        match self {
            Self::Listening => "listening",
            Self::Recognizing => "recognizing",
            Self::Synthesizing => "synthesizing",
            Self::Publishing => "publishing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

pub mod voice;
pub use voice::{SynthesizedReply, TrackPublishOptions, REPLY_TRACK_NAME};
