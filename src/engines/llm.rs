//! Text generation via the Gemini `generateContent` API

use async_trait::async_trait;

use super::Generator;
use crate::{Error, Result};

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: Content<'a>,
}

#[derive(serde::Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(serde::Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(serde::Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(serde::Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(serde::Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(serde::Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Generates replies through the hosted Gemini API
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    /// Create a new generator
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "Gemini API key required for generation".to_string(),
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
impl Generator for GeminiGenerator {
    async fn generate(&self, prompt: &str, system_instruction: &str) -> Result<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            system_instruction: Content {
                parts: vec![Part {
                    text: system_instruction,
                }],
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!(
                "generation API error {status}: {body}"
            )));
        }

        let result: GenerateResponse = response.json().await?;
        let reply = result
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        if reply.is_empty() {
            return Err(Error::Generation("empty candidate list".to_string()));
        }

        tracing::info!(reply_chars = reply.len(), "generation complete");
        Ok(reply)
    }
}
