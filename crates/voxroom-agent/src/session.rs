//! Room session manager: owns one joined room for the life of the membership.
//!
//! The session is the only writer of its participant roster and track map.
//! It runs as a single task that applies relay events in arrival order and
//! pipeline transitions as they arrive, so neither structure needs a lock.

use crate::pipeline::{AudioReplyPipeline, PipelineTransition};
use crate::relay::{dispatch, LocalParticipant, RoomObserver};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use voxroom_types::{
    ParticipantInfo, PipelineState, RemoteTrack, RoomEvent, SynthesizedReply, TrackKind,
    TrackPublication,
};
use voxroom_voice::{SpeechStack, VoiceError};

/// Publishes synthesized replies through the worker's local participant.
#[derive(Clone)]
pub struct ReplyPublisher {
    room: String,
    local: Option<Arc<dyn LocalParticipant>>,
}

impl ReplyPublisher {
    pub fn new(room: impl Into<String>, local: Option<Arc<dyn LocalParticipant>>) -> Self {
        Self {
            room: room.into(),
            local,
        }
    }

    /// Announces `reply` as a new outbound track.
    pub async fn publish(&self, reply: SynthesizedReply) -> Result<(), VoiceError> {
        let local = self.local.as_ref().ok_or_else(|| {
            VoiceError::Publish(format!(
                "no local participant in room '{}'",
                self.room
            ))
        })?;

        info!(
            room = %self.room,
            publisher = local.identity(),
            track = %reply.options.name,
            bytes = reply.payload.len(),
            "publishing reply track"
        );
        local.publish_track(reply.payload, reply.options).await
    }
}

struct PipelineEntry {
    instance: u64,
    participant: String,
    state: PipelineState,
    cancel: CancellationToken,
}

/// Live state of one joined room.
pub struct RoomSession {
    room: String,
    participants: HashSet<String>,
    pipelines: HashMap<String, PipelineEntry>,
    next_instance: u64,
    speech: SpeechStack,
    publisher: ReplyPublisher,
    transitions_tx: mpsc::UnboundedSender<PipelineTransition>,
    transitions_rx: mpsc::UnboundedReceiver<PipelineTransition>,
}

impl RoomSession {
    pub fn new(
        room: impl Into<String>,
        local_participant: Option<Arc<dyn LocalParticipant>>,
        speech: SpeechStack,
    ) -> Self {
        let room = room.into();
        let (transitions_tx, transitions_rx) = mpsc::unbounded_channel();
        Self {
            publisher: ReplyPublisher::new(room.clone(), local_participant),
            room,
            participants: HashSet::new(),
            pipelines: HashMap::new(),
            next_instance: 0,
            speech,
            transitions_tx,
            transitions_rx,
        }
    }

    /// Seeds the roster with participants already present at join time.
    pub fn with_participants(mut self, participants: Vec<ParticipantInfo>) -> Self {
        for participant in participants {
            info!(room = %self.room, participant = %participant.identity, "participant present");
            self.participants.insert(participant.identity);
        }
        self
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    /// Whether `identity` is currently connected.
    pub fn has_participant(&self, identity: &str) -> bool {
        self.participants.contains(identity)
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Number of tracks with a non-terminal pipeline.
    pub fn active_pipelines(&self) -> usize {
        self.pipelines.len()
    }

    pub fn pipeline_state(&self, track_sid: &str) -> Option<PipelineState> {
        self.pipelines.get(track_sid).map(|entry| entry.state)
    }

    /// Runs the session until the relay's event stream ends, then cancels
    /// every in-flight pipeline.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<RoomEvent>) {
        info!(room = %self.room, "agent joined room");

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => dispatch(&mut self, event),
                    None => break,
                },
                Some(transition) = self.transitions_rx.recv() => {
                    self.apply_transition(transition);
                }
            }
        }

        self.close();
    }

    fn close(&mut self) {
        for (track_sid, entry) in self.pipelines.drain() {
            debug!(room = %self.room, track = %track_sid, "cancelling pipeline on room close");
            entry.cancel.cancel();
        }
        info!(room = %self.room, "room session closed");
    }

    fn spawn_pipeline(&mut self, track: RemoteTrack, participant: &str) {
        let instance = self.next_instance;
        self.next_instance += 1;

        let cancel = CancellationToken::new();
        let span = info_span!(
            "pipeline",
            room = %self.room,
            track = %track.sid,
            participant = %participant,
            instance
        );
        let track_sid = track.sid.clone();
        let pipeline = AudioReplyPipeline::new(
            track,
            instance,
            self.speech.clone(),
            self.publisher.clone(),
            cancel.clone(),
            self.transitions_tx.clone(),
        );

        self.pipelines.insert(
            track_sid,
            PipelineEntry {
                instance,
                participant: participant.to_string(),
                state: PipelineState::Listening,
                cancel,
            },
        );
        tokio::spawn(pipeline.run().instrument(span));
    }

    /// Applies a pipeline's reported state change to the track map.
    ///
    /// Reports from instances that were cancelled or replaced are ignored.
    fn apply_transition(&mut self, transition: PipelineTransition) {
        let Some(entry) = self.pipelines.get_mut(&transition.track_sid) else {
            debug!(
                room = %self.room,
                track = %transition.track_sid,
                state = transition.state.label(),
                "ignoring transition for removed pipeline"
            );
            return;
        };
        if entry.instance != transition.instance {
            debug!(
                room = %self.room,
                track = %transition.track_sid,
                instance = transition.instance,
                "ignoring transition from stale pipeline instance"
            );
            return;
        }
        if !entry.state.can_transition_to(transition.state) {
            warn!(
                room = %self.room,
                track = %transition.track_sid,
                from = entry.state.label(),
                to = transition.state.label(),
                "rejecting illegal pipeline transition"
            );
            return;
        }

        entry.state = transition.state;
        if transition.state.is_terminal() {
            self.pipelines.remove(&transition.track_sid);
            debug!(
                room = %self.room,
                track = %transition.track_sid,
                state = transition.state.label(),
                "pipeline finished"
            );
        }
    }

    fn cancel_pipeline(&mut self, track_sid: &str) -> bool {
        match self.pipelines.remove(track_sid) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }
}

impl RoomObserver for RoomSession {
    fn on_participant_connected(&mut self, participant: ParticipantInfo) {
        info!(room = %self.room, participant = %participant.identity, "participant connected");
        self.participants.insert(participant.identity);
    }

    fn on_participant_disconnected(&mut self, participant: ParticipantInfo) {
        info!(room = %self.room, participant = %participant.identity, "participant disconnected");
        self.participants.remove(&participant.identity);

        let owned: Vec<String> = self
            .pipelines
            .iter()
            .filter(|(_, entry)| entry.participant == participant.identity)
            .map(|(track_sid, _)| track_sid.clone())
            .collect();
        for track_sid in owned {
            self.cancel_pipeline(&track_sid);
            debug!(room = %self.room, track = %track_sid, "cancelled pipeline of departed participant");
        }
    }

    fn on_track_subscribed(
        &mut self,
        track: RemoteTrack,
        publication: TrackPublication,
        participant: ParticipantInfo,
    ) {
        if publication.kind != TrackKind::Audio {
            debug!(
                room = %self.room,
                track = %track.sid,
                kind = publication.kind.as_str(),
                "ignoring non-audio track"
            );
            return;
        }

        if let Some(entry) = self.pipelines.get(&track.sid) {
            debug!(
                room = %self.room,
                track = %track.sid,
                state = entry.state.label(),
                "pipeline already active for track, ignoring duplicate subscription"
            );
            return;
        }

        if !self.participants.contains(&participant.identity) {
            debug!(
                room = %self.room,
                track = %track.sid,
                participant = %participant.identity,
                "ignoring track from participant not in roster"
            );
            return;
        }

        info!(
            room = %self.room,
            track = %track.sid,
            participant = %participant.identity,
            "received audio track"
        );
        self.spawn_pipeline(track, &participant.identity);
    }

    fn on_track_unsubscribed(&mut self, track: RemoteTrack, participant: ParticipantInfo) {
        if self.cancel_pipeline(&track.sid) {
            info!(
                room = %self.room,
                track = %track.sid,
                participant = %participant.identity,
                "track unsubscribed, pipeline cancelled"
            );
        }
    }
}
