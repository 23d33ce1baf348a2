//! Error types for the Aria relay

use thiserror::Error;

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the relay
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Unparseable control message from a client
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// Transcription produced no usable text; the pipeline stops here
    #[error("no speech detected")]
    NoSpeechDetected,

    /// Speech-to-text error
    #[error("transcription error: {0}")]
    Stt(String),

    /// Text generation error (recovered inside the pipeline with a
    /// fallback reply; never reaches a client as an error)
    #[error("generation error: {0}")]
    Generation(String),

    /// Speech synthesis error
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Audio decoding, resampling, or encoding error
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
