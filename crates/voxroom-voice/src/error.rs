use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    /// The signing secret or key is missing or unusable.
    #[error("token signing failed: {0}")]
    Auth(String),

    #[error("speech recognition failed: {0}")]
    Recognition(String),

    /// Network or remote failure while synthesizing speech.
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    /// The synthesizer answered but returned no audio.
    #[error("speech synthesis returned no audio")]
    EmptyAudio,

    #[error("failed to publish reply track: {0}")]
    Publish(String),

    #[error("relay error: {0}")]
    Relay(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
