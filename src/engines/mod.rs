//! External engine contracts
//!
//! The relay treats speech-to-text, text generation, and speech synthesis as
//! opaque collaborators behind narrow traits. The pipeline only sees these
//! seams; the concrete clients here talk to hosted APIs, and tests substitute
//! stubs.

mod llm;
mod stt;
mod tts;

use std::path::Path;

use async_trait::async_trait;

use crate::Result;

pub use llm::GeminiGenerator;
pub use stt::WhisperTranscriber;
pub use tts::OpenAiSynthesizer;

/// Result of one transcription call
#[derive(Debug, Clone)]
pub struct Transcription {
    /// Transcript text, segments joined with single spaces
    pub text: String,

    /// Detected language code, when the engine reports one
    pub language: Option<String>,

    /// Detection confidence in [0, 1], when the engine reports one
    pub confidence: Option<f64>,
}

/// Speech-to-text engine: WAV file in, transcript out
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the WAV file at `path`
    ///
    /// # Errors
    ///
    /// Returns error if the engine call fails
    async fn transcribe(&self, path: &Path) -> Result<Transcription>;
}

/// Text-generation engine: prompt plus system instruction in, reply out
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a reply to `prompt` under `system_instruction`
    ///
    /// # Errors
    ///
    /// Returns error if the engine call fails; the pipeline recovers with a
    /// fallback reply rather than propagating this
    async fn generate(&self, prompt: &str, system_instruction: &str) -> Result<String>;
}

/// Speech-synthesis engine: text in, WAV bytes at the engine's native rate out
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Render `text` to a WAV container
    ///
    /// # Errors
    ///
    /// Returns error if the engine call fails
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}
