//! Relay capability boundary.
//!
//! The media relay is an external collaborator. The agent only needs it to:
//! accept the worker's registration, hand over rooms it assigns to this
//! worker, deliver participant/track events for those rooms, and publish an
//! outbound audio track through the worker's local participant.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use voxroom_types::{ParticipantInfo, RemoteTrack, RoomEvent, TrackPublication, TrackPublishOptions};
use voxroom_voice::{RelayConfig, VoiceError};

/// The identity under which the worker itself is joined to a room.
#[async_trait]
pub trait LocalParticipant: Send + Sync {
    fn identity(&self) -> &str;

    /// Announces `payload` as a new outbound track in the room.
    async fn publish_track(
        &self,
        payload: Vec<u8>,
        options: TrackPublishOptions,
    ) -> Result<(), VoiceError>;
}

/// A room the relay has assigned to this worker.
pub struct JoinedRoom {
    pub name: String,
    /// `None` when the relay could not establish the worker's own participant.
    pub local_participant: Option<Arc<dyn LocalParticipant>>,
    /// Participants already present at join time.
    pub participants: Vec<ParticipantInfo>,
    /// Room events in arrival order. The stream ends when the room closes or
    /// the worker is disconnected.
    pub events: mpsc::UnboundedReceiver<RoomEvent>,
}

impl std::fmt::Debug for JoinedRoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinedRoom")
            .field("name", &self.name)
            .field(
                "local_participant",
                &self.local_participant.as_ref().map(|p| p.identity().to_string()),
            )
            .field("participants", &self.participants)
            .finish_non_exhaustive()
    }
}

/// Invoked by the relay whenever it assigns a room to this worker.
#[async_trait]
pub trait RoomAssignmentHandler: Send + Sync {
    async fn on_room_assigned(&self, room: JoinedRoom);
}

/// Long-lived connection to the relay.
///
/// Reconnection and backoff belong to the implementation; the agent never
/// sees connection-level errors after registration succeeds.
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Authenticates with `config` and registers `handler` for room
    /// assignments.
    async fn register(
        &self,
        config: &RelayConfig,
        handler: Arc<dyn RoomAssignmentHandler>,
    ) -> Result<(), VoiceError>;
}

/// Per-room observer capabilities, applied one event at a time.
pub trait RoomObserver {
    fn on_participant_connected(&mut self, participant: ParticipantInfo);

    fn on_participant_disconnected(&mut self, participant: ParticipantInfo);

    fn on_track_subscribed(
        &mut self,
        track: RemoteTrack,
        publication: TrackPublication,
        participant: ParticipantInfo,
    );

    fn on_track_unsubscribed(&mut self, track: RemoteTrack, participant: ParticipantInfo);
}

/// Routes a relay event to the matching observer capability.
pub fn dispatch<O: RoomObserver + ?Sized>(observer: &mut O, event: RoomEvent) {
    match event {
        RoomEvent::ParticipantConnected(participant) => {
            observer.on_participant_connected(participant)
        }
        RoomEvent::ParticipantDisconnected(participant) => {
            observer.on_participant_disconnected(participant)
        }
        RoomEvent::TrackSubscribed {
            track,
            publication,
            participant,
        } => observer.on_track_subscribed(track, publication, participant),
        RoomEvent::TrackUnsubscribed { track, participant } => {
            observer.on_track_unsubscribed(track, participant)
        }
    }
}
