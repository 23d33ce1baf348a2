//! Speech synthesis via the OpenAI speech API

use async_trait::async_trait;

use super::Synthesizer;
use crate::{Error, Result};

/// Synthesizes speech through the hosted OpenAI speech API.
///
/// Requests WAV output so the pipeline can read the engine's native sample
/// rate from the container header before resampling.
pub struct OpenAiSynthesizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    voice: String,
}

impl OpenAiSynthesizer {
    /// Create a new synthesizer
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(api_key: String, model: String, voice: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for synthesis".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            voice,
        })
    }
}

#[async_trait]
impl Synthesizer for OpenAiSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct SpeechRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            response_format: &'a str,
        }

        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            response_format: "wav",
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!(
                "speech API error {status}: {body}"
            )));
        }

        let audio = response.bytes().await?;
        tracing::debug!(audio_bytes = audio.len(), "synthesis complete");
        Ok(audio.to_vec())
    }
}
