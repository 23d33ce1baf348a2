//! Wire protocol for relay sessions
//!
//! Clients send JSON command envelopes in text frames and raw audio in binary
//! frames; the relay answers with JSON status envelopes and streams reply
//! audio as binary chunks. This is the canonical protocol variant; bare
//! keyword commands are not accepted.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Incoming control message from a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Liveness probe
    Ping,
    /// Advisory pause; buffered audio is retained
    Pause,
    /// End of utterance: run the pipeline on the buffered audio
    Stop,
}

impl ClientCommand {
    /// Parse a text frame as a command envelope
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedMessage`] for non-JSON input and for valid
    /// JSON that is not a known command, so the session can reply with an
    /// "unknown message" notice in both cases.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::MalformedMessage(e.to_string()))
    }
}

/// Outgoing status envelope to a client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ServerStatus {
    /// Reply to `ping`
    Pong { message: String },
    /// Reply to `pause`
    Paused { message: String },
    /// Pipeline stage progress notification
    Processing { message: String },
    /// Pipeline finished and the reply audio was streamed
    Success { message: String },
    /// Per-session diagnostic; the connection stays open
    Error { message: String },
}

impl ServerStatus {
    /// Acknowledgment for `ping`
    #[must_use]
    pub fn pong() -> Self {
        Self::Pong {
            message: "relay is alive".to_string(),
        }
    }

    /// Acknowledgment for `pause`
    #[must_use]
    pub fn paused() -> Self {
        Self::Paused {
            message: "recording paused, buffer retained".to_string(),
        }
    }

    /// Stage progress notification
    pub fn processing(message: impl Into<String>) -> Self {
        Self::Processing {
            message: message.into(),
        }
    }

    /// Terminal success notification
    pub fn success(message: impl Into<String>) -> Self {
        Self::Success {
            message: message.into(),
        }
    }

    /// Best-effort error notice
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// One outbound item on a session's delivery queue.
///
/// Sessions, the pipeline's progress notices, and the broadcast streamer all
/// write through this type; a per-session forwarding task owns the socket
/// sink and serializes these onto the wire.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// JSON status envelope
    Status(ServerStatus),
    /// Raw audio chunk
    Audio(Vec<u8>),
    /// Transport-level keepalive ping
    Ping,
}
