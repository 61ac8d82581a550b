//! In-process relay for local development and tests.
//!
//! Rooms are assigned by calling [`LoopbackRelay::assign_room`]; the returned
//! [`LoopbackRoom`] injects participant and track events and records every
//! track the worker publishes. Dropping or closing the room ends the stream,
//! which the worker treats as the room closing.

use crate::relay::{JoinedRoom, LocalParticipant, RelayClient, RoomAssignmentHandler};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tracing::info;
use voxroom_types::{
    ParticipantInfo, RemoteTrack, RoomEvent, TrackKind, TrackPublication, TrackPublishOptions,
};
use voxroom_voice::{RelayConfig, VoiceError};

/// Identity the worker joins loopback rooms under.
pub const LOOPBACK_AGENT_IDENTITY: &str = "voxroom-agent";

/// A track published by the worker into a loopback room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedTrack {
    pub publisher: String,
    pub options: TrackPublishOptions,
    pub payload: Vec<u8>,
}

#[derive(Default)]
struct LoopbackParticipant {
    published: Mutex<Vec<PublishedTrack>>,
    reject: AtomicBool,
    notify: Notify,
}

#[async_trait]
impl LocalParticipant for LoopbackParticipant {
    fn identity(&self) -> &str {
        LOOPBACK_AGENT_IDENTITY
    }

    async fn publish_track(
        &self,
        payload: Vec<u8>,
        options: TrackPublishOptions,
    ) -> Result<(), VoiceError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(VoiceError::Publish(format!(
                "relay rejected track '{}'",
                options.name
            )));
        }

        let mut published = self
            .published
            .lock()
            .map_err(|_| VoiceError::Publish("loopback track list poisoned".to_string()))?;
        published.push(PublishedTrack {
            publisher: LOOPBACK_AGENT_IDENTITY.to_string(),
            options,
            payload,
        });
        drop(published);
        self.notify.notify_waiters();
        Ok(())
    }
}

/// Relay that lives in the same process as the worker.
#[derive(Clone, Default)]
pub struct LoopbackRelay {
    handler: Arc<Mutex<Option<Arc<dyn RoomAssignmentHandler>>>>,
}

impl LoopbackRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_registered(&self) -> bool {
        self.handler
            .lock()
            .map(|handler| handler.is_some())
            .unwrap_or(false)
    }

    /// Assigns `name` to the registered worker with `participants` already
    /// present.
    pub async fn assign_room(
        &self,
        name: &str,
        participants: Vec<ParticipantInfo>,
    ) -> Result<LoopbackRoom, VoiceError> {
        let handler = self
            .handler
            .lock()
            .map_err(|_| VoiceError::Relay("loopback handler lock poisoned".to_string()))?
            .clone()
            .ok_or_else(|| VoiceError::Relay("no worker registered".to_string()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let local = Arc::new(LoopbackParticipant::default());

        handler
            .on_room_assigned(JoinedRoom {
                name: name.to_string(),
                local_participant: Some(local.clone()),
                participants,
                events: rx,
            })
            .await;

        Ok(LoopbackRoom {
            name: name.to_string(),
            events: tx,
            local,
        })
    }
}

#[async_trait]
impl RelayClient for LoopbackRelay {
    async fn register(
        &self,
        config: &RelayConfig,
        handler: Arc<dyn RoomAssignmentHandler>,
    ) -> Result<(), VoiceError> {
        if !config.has_credentials() {
            return Err(VoiceError::Relay(
                "relay API key and secret are required to register a worker".to_string(),
            ));
        }

        let mut slot = self
            .handler
            .lock()
            .map_err(|_| VoiceError::Relay("loopback handler lock poisoned".to_string()))?;
        if slot.is_some() {
            return Err(VoiceError::Relay("a worker is already registered".to_string()));
        }
        *slot = Some(handler);

        info!(api_key = %config.api_key, "worker registered with loopback relay");
        Ok(())
    }
}

/// Control handle for one loopback room.
pub struct LoopbackRoom {
    name: String,
    events: mpsc::UnboundedSender<RoomEvent>,
    local: Arc<LoopbackParticipant>,
}

impl LoopbackRoom {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Delivers a raw event. Fails once the room session has gone away.
    pub fn send(&self, event: RoomEvent) -> Result<(), VoiceError> {
        self.events
            .send(event)
            .map_err(|_| VoiceError::Relay(format!("room '{}' is no longer joined", self.name)))
    }

    pub fn connect_participant(&self, identity: &str) -> Result<(), VoiceError> {
        self.send(RoomEvent::ParticipantConnected(ParticipantInfo::connected(
            identity,
        )))
    }

    pub fn disconnect_participant(&self, identity: &str) -> Result<(), VoiceError> {
        let mut participant = ParticipantInfo::connected(identity);
        participant.state = voxroom_types::ConnectionState::Disconnected;
        self.send(RoomEvent::ParticipantDisconnected(participant))
    }

    /// `identity` publishes a track of `kind`, and the worker is subscribed.
    pub fn subscribe_track(
        &self,
        identity: &str,
        track_sid: &str,
        kind: TrackKind,
    ) -> Result<(), VoiceError> {
        self.send(RoomEvent::TrackSubscribed {
            track: RemoteTrack {
                sid: track_sid.to_string(),
                participant_identity: identity.to_string(),
            },
            publication: TrackPublication {
                sid: track_sid.to_string(),
                name: format!("{}-{}", identity, kind.as_str()),
                kind,
            },
            participant: ParticipantInfo::connected(identity),
        })
    }

    pub fn unsubscribe_track(&self, identity: &str, track_sid: &str) -> Result<(), VoiceError> {
        self.send(RoomEvent::TrackUnsubscribed {
            track: RemoteTrack {
                sid: track_sid.to_string(),
                participant_identity: identity.to_string(),
            },
            participant: ParticipantInfo::connected(identity),
        })
    }

    /// Makes the relay refuse (or accept again) tracks the worker publishes.
    pub fn reject_publishes(&self, reject: bool) {
        self.local.reject.store(reject, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<PublishedTrack> {
        self.local
            .published
            .lock()
            .map(|published| published.clone())
            .unwrap_or_default()
    }

    /// Waits until at least `count` tracks have been published or `timeout`
    /// elapses, then returns what was published.
    pub async fn wait_for_published(&self, count: usize, timeout: Duration) -> Vec<PublishedTrack> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.local.notify.notified();
            let published = self.published();
            if published.len() >= count {
                return published;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.published();
            }
        }
    }

    /// Closes the room; the worker's session shuts down.
    pub fn close(self) {
        info!(room = %self.name, "closing loopback room");
    }
}
