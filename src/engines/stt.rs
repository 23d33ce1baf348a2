//! Speech-to-text via the OpenAI transcription API

use std::path::Path;

use async_trait::async_trait;

use super::{Transcriber, Transcription};
use crate::{Error, Result};

/// Response from the transcription API in `verbose_json` format
#[derive(serde::Deserialize)]
struct VerboseResponse {
    text: String,
    language: Option<String>,
    #[serde(default)]
    segments: Vec<Segment>,
}

#[derive(serde::Deserialize)]
struct Segment {
    text: String,
    avg_logprob: Option<f64>,
}

/// Transcribes speech through the hosted Whisper API
pub struct WhisperTranscriber {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl WhisperTranscriber {
    /// Create a new transcriber
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for transcription".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        })
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, path: &Path) -> Result<Transcription> {
        let audio = tokio::fs::read(path).await?;
        tracing::debug!(audio_bytes = audio.len(), "starting transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio)
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "transcription request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription API error");
            return Err(Error::Stt(format!("transcription API error {status}: {body}")));
        }

        let result: VerboseResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse transcription response");
            e
        })?;

        // Join segment texts with single spaces; fall back to the flat text
        // field when the engine returns no segment list
        let text = if result.segments.is_empty() {
            result.text
        } else {
            result
                .segments
                .iter()
                .map(|s| s.text.trim())
                .collect::<Vec<_>>()
                .join(" ")
        };

        let confidence = mean_confidence(&result.segments);

        tracing::info!(transcript = %text, "transcription complete");
        Ok(Transcription {
            text,
            language: result.language,
            confidence,
        })
    }
}

/// Mean of per-segment `exp(avg_logprob)`, the closest thing the API offers
/// to an overall confidence figure
fn mean_confidence(segments: &[Segment]) -> Option<f64> {
    let probs: Vec<f64> = segments
        .iter()
        .filter_map(|s| s.avg_logprob.map(f64::exp))
        .collect();
    if probs.is_empty() {
        None
    } else {
        #[allow(clippy::cast_precision_loss)]
        Some(probs.iter().sum::<f64>() / probs.len() as f64)
    }
}
