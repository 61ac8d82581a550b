//! The voxroom agent: joins relay rooms and answers speech with speech.
//!
//! A [`Worker`] registers with a [`RelayClient`]. For every room the relay
//! assigns, the worker runs a [`RoomSession`] that keeps the participant
//! roster and starts one audio reply pipeline per subscribed audio track. A
//! pipeline recognizes the participant's speech, synthesizes a reply, and
//! publishes it back into the room as the `agent-voice` track.

pub mod loopback;
pub mod pipeline;
pub mod relay;
pub mod session;
pub mod worker;

pub use loopback::{LoopbackRelay, LoopbackRoom, PublishedTrack, LOOPBACK_AGENT_IDENTITY};
pub use pipeline::PipelineTransition;
pub use relay::{
    dispatch, JoinedRoom, LocalParticipant, RelayClient, RoomAssignmentHandler, RoomObserver,
};
pub use session::{ReplyPublisher, RoomSession};
pub use worker::Worker;
