//! Voice infrastructure for voxroom.
//!
//! Issues signed relay access tokens, and defines the speech adapter boundary
//! the agent pipeline depends on: speech-to-text (currently a fixed-transcript
//! stub) and text-to-speech (a remote synthesis host returning MP3 audio).
//!
//! Relay credentials and speech settings live in [`RelayConfig`] and
//! [`SpeechConfig`]; both are built once at startup and passed down.

pub mod config;
pub mod error;
pub mod speech;
pub mod stt;
pub mod token;
pub mod tts;

pub use config::{RelayConfig, SpeechConfig, DEFAULT_IDENTITY, DEFAULT_ROOM};
pub use error::VoiceError;
pub use speech::{CannedReply, ReplyComposer, SpeechRecognizer, SpeechStack, SpeechSynthesizer};
pub use stt::StubRecognizer;
pub use token::{AccessToken, TokenClaims, TokenIssuer, VideoGrants};
pub use tts::RemoteSynthesizer;
