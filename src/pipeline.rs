//! Pipeline stage runner
//!
//! One pipeline run turns a buffered utterance into an encoded spoken reply:
//! transcribe, generate, sanitize, synthesize, then resample and encode to
//! the relay's wire format. Each stage sends a progress notice to the
//! initiating session before it starts. The run owns at most one temporary
//! input file and one temporary output file; both are dropped (and therefore
//! deleted) on every exit path.

use std::io::{BufReader, Write};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::audio::{encode_u8, resample_linear, wav_to_f32};
use crate::engines::{Generator, Synthesizer, Transcriber};
use crate::relay::protocol::{Outbound, ServerStatus};
use crate::sanitize::sanitize;
use crate::{Error, Result};

/// Canned reply substituted when the text-generation engine fails.
/// Generation failure is non-fatal: the session still hears something.
pub const FALLBACK_REPLY: &str =
    "I'm sorry, I'm having trouble gathering my thoughts right now. \
     Could you say that again?";

/// Result of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// What the client said, per the transcription engine
    pub transcript: String,

    /// Sanitized reply text that was synthesized
    pub reply_text: String,

    /// Reply audio as unsigned 8-bit mono PCM at the target rate
    pub waveform: Vec<u8>,
}

/// Sequentially invokes the external engines with pre/post-processing
pub struct Pipeline {
    transcriber: Arc<dyn Transcriber>,
    generator: Arc<dyn Generator>,
    synthesizer: Arc<dyn Synthesizer>,
    persona_prompt: String,
    target_rate: u32,
}

impl Pipeline {
    /// Assemble a pipeline over the three engine seams
    #[must_use]
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        generator: Arc<dyn Generator>,
        synthesizer: Arc<dyn Synthesizer>,
        persona_prompt: String,
        target_rate: u32,
    ) -> Self {
        Self {
            transcriber,
            generator,
            synthesizer,
            persona_prompt,
            target_rate,
        }
    }

    /// Run the full pipeline on one materialized WAV utterance.
    ///
    /// `notify` receives best-effort progress notices for the initiating
    /// session; a closed queue never fails the run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSpeechDetected`] when the trimmed transcript is
    /// empty (generation and synthesis are skipped), or the failing stage's
    /// error for transcription, synthesis, and audio conversion. Generation
    /// failure is recovered with [`FALLBACK_REPLY`] and is not an error.
    pub async fn run(
        &self,
        wav_bytes: &[u8],
        notify: &mpsc::Sender<Outbound>,
    ) -> Result<PipelineOutput> {
        progress(notify, "transcribing audio").await;
        let transcript = self.transcribe(wav_bytes).await?;

        progress(notify, "generating reply").await;
        let reply_text = self.generate(&transcript).await;

        progress(notify, "synthesizing speech").await;
        let reply_wav = self.synthesizer.synthesize(&reply_text).await?;

        progress(notify, "encoding reply audio").await;
        let waveform = self.encode_reply(&reply_wav)?;

        Ok(PipelineOutput {
            transcript,
            reply_text,
            waveform,
        })
    }

    /// Materialize the utterance to a scratch file and transcribe it
    async fn transcribe(&self, wav_bytes: &[u8]) -> Result<String> {
        let mut input = tempfile::Builder::new()
            .prefix("aria-utterance-")
            .suffix(".wav")
            .tempfile()?;
        input.write_all(wav_bytes)?;
        input.flush()?;

        let transcription = self.transcriber.transcribe(input.path()).await?;
        tracing::info!(
            transcript = %transcription.text,
            language = ?transcription.language,
            confidence = ?transcription.confidence,
            "transcription stage complete"
        );

        let trimmed = transcription.text.trim();
        if trimmed.is_empty() {
            return Err(Error::NoSpeechDetected);
        }
        Ok(trimmed.to_string())
    }

    /// Generate and sanitize the reply, substituting the canned fallback on
    /// engine failure
    async fn generate(&self, transcript: &str) -> String {
        let raw = match self
            .generator
            .generate(transcript, &self.persona_prompt)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "generation failed, using fallback reply");
                FALLBACK_REPLY.to_string()
            }
        };

        sanitize(&raw)
    }

    /// Decode the synthesized WAV through a scratch file, resample to the
    /// target rate, and quantize to the wire format
    fn encode_reply(&self, reply_wav: &[u8]) -> Result<Vec<u8>> {
        let mut output = tempfile::Builder::new()
            .prefix("aria-reply-")
            .suffix(".wav")
            .tempfile()?;
        output.write_all(reply_wav)?;
        output.flush()?;

        let file = std::fs::File::open(output.path())?;
        let (samples, source_rate) = wav_to_f32(BufReader::new(file))?;
        tracing::debug!(
            samples = samples.len(),
            source_rate,
            target_rate = self.target_rate,
            "decoded synthesized reply"
        );

        let resampled = resample_linear(&samples, source_rate, self.target_rate);
        Ok(encode_u8(&resampled))
    }
}

/// Best-effort stage progress notice
async fn progress(notify: &mpsc::Sender<Outbound>, message: &str) {
    let _ = notify
        .send(Outbound::Status(ServerStatus::processing(message)))
        .await;
}
