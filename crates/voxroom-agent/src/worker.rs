//! Process-wide worker: registers with the relay and runs one room session
//! per assigned room.

use crate::relay::{JoinedRoom, RelayClient, RoomAssignmentHandler};
use crate::session::RoomSession;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{error, info, warn};
use voxroom_voice::{RelayConfig, SpeechStack, VoiceError};

/// Entry point that turns relay room assignments into running sessions.
pub struct Worker {
    speech: SpeechStack,
    /// Live sessions (room name -> session id).
    ///
    /// Uses `std::sync::RwLock` intentionally: every acquisition is a brief
    /// map operation that never spans an `.await`.
    sessions: Arc<RwLock<HashMap<String, u64>>>,
    next_session_id: AtomicU64,
}

impl Worker {
    pub fn new(speech: SpeechStack) -> Arc<Self> {
        Arc::new(Self {
            speech,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            next_session_id: AtomicU64::new(0),
        })
    }

    /// Registers this worker as the relay's room-assignment handler.
    ///
    /// # Errors
    ///
    /// Returns the relay's error if registration is refused. Callers treat
    /// this as fatal.
    pub async fn start(
        self: &Arc<Self>,
        relay: &dyn RelayClient,
        config: &RelayConfig,
    ) -> Result<(), VoiceError> {
        relay.register(config, self.clone()).await?;
        info!(url = %config.url, "agent worker initialized and running");
        Ok(())
    }

    /// Rooms that currently have a live session, sorted by name.
    pub fn active_rooms(&self) -> Vec<String> {
        let mut rooms: Vec<String> = match self.sessions.read() {
            Ok(sessions) => sessions.keys().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().keys().cloned().collect(),
        };
        rooms.sort();
        rooms
    }

    /// Claims `room` for a new session. Returns `None` if a session for the
    /// room is still live.
    fn claim_room(&self, room: &str) -> Option<u64> {
        let mut sessions = match self.sessions.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("session map lock poisoned, recovering");
                poisoned.into_inner()
            }
        };
        if sessions.contains_key(room) {
            return None;
        }
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        sessions.insert(room.to_string(), id);
        Some(id)
    }
}

fn release_room(sessions: &RwLock<HashMap<String, u64>>, room: &str, id: u64) {
    let mut sessions = match sessions.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if sessions.get(room) == Some(&id) {
        sessions.remove(room);
    }
}

#[async_trait]
impl RoomAssignmentHandler for Worker {
    async fn on_room_assigned(&self, room: JoinedRoom) {
        let JoinedRoom {
            name,
            local_participant,
            participants,
            events,
        } = room;

        let Some(id) = self.claim_room(&name) else {
            warn!(room = %name, "room already has a live session, ignoring assignment");
            return;
        };

        if local_participant.is_none() {
            warn!(room = %name, "joined without a local participant, replies cannot be published");
        }

        let session = RoomSession::new(name.clone(), local_participant, self.speech.clone())
            .with_participants(participants);
        let sessions = self.sessions.clone();
        tokio::spawn(async move {
            session.run(events).await;
            release_room(&sessions, &name, id);
        });
    }
}
