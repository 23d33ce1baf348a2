//! Aria Relay - real-time voice assistant relay
//!
//! Clients stream microphone audio over a persistent websocket; a stop
//! command triggers a speech-to-text, text-generation, text-to-speech
//! pipeline and the synthesized reply is paced back out to every live
//! connection in fixed-size chunks.
//!
//! # Architecture
//!
//! ```text
//! client ──binary frames──▶ Session ──▶ AudioBuffer
//!                             │ stop
//!                             ▼
//!                          Pipeline: transcribe → generate → sanitize
//!                                    → synthesize → resample/encode
//!                             │
//!                             ▼
//!                          Broadcaster ──paced chunks──▶ Registry ──▶ all sessions
//! ```
//!
//! The engines (STT, LLM, TTS) are external collaborators behind the traits
//! in [`engines`]; everything else is the per-connection session protocol
//! and streaming pipeline.

pub mod audio;
pub mod config;
pub mod engines;
pub mod error;
pub mod pipeline;
pub mod relay;
pub mod sanitize;
pub mod watchdog;

pub use audio::AudioBuffer;
pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{FALLBACK_REPLY, Pipeline, PipelineOutput};
pub use relay::{Broadcaster, Registry, RelayServer, SessionState};
pub use sanitize::sanitize;
