//! Pipeline stage behavior with stub engines
//!
//! Exercises the short-circuit, fallback, and post-processing contracts
//! without any network calls.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use aria_relay::engines::{Generator, Synthesizer, Transcriber, Transcription};
use aria_relay::pipeline::{FALLBACK_REPLY, Pipeline};
use aria_relay::relay::protocol::{Outbound, ServerStatus};
use aria_relay::{Error, Result};

mod common;

struct StubTranscriber {
    text: String,
    called: Arc<AtomicBool>,
}

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, path: &Path) -> Result<Transcription> {
        assert!(path.exists(), "utterance must be materialized on disk");
        self.called.store(true, Ordering::SeqCst);
        Ok(Transcription {
            text: self.text.clone(),
            language: Some("en".to_string()),
            confidence: Some(0.93),
        })
    }
}

struct StubGenerator {
    reply: Result<String>,
    called: Arc<AtomicBool>,
}

#[async_trait]
impl Generator for StubGenerator {
    async fn generate(&self, _prompt: &str, _system_instruction: &str) -> Result<String> {
        self.called.store(true, Ordering::SeqCst);
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(_) => Err(Error::Generation("upstream unavailable".to_string())),
        }
    }
}

struct StubSynthesizer {
    wav: Vec<u8>,
    called: Arc<AtomicBool>,
    spoken: Arc<Mutex<Option<String>>>,
}

#[async_trait]
impl Synthesizer for StubSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.called.store(true, Ordering::SeqCst);
        *self.spoken.lock().await = Some(text.to_string());
        Ok(self.wav.clone())
    }
}

struct Harness {
    pipeline: Pipeline,
    generator_called: Arc<AtomicBool>,
    synthesizer_called: Arc<AtomicBool>,
    spoken: Arc<Mutex<Option<String>>>,
}

fn harness(transcript: &str, reply: Result<String>, reply_wav: Vec<u8>) -> Harness {
    let generator_called = Arc::new(AtomicBool::new(false));
    let synthesizer_called = Arc::new(AtomicBool::new(false));
    let spoken = Arc::new(Mutex::new(None));

    let pipeline = Pipeline::new(
        Arc::new(StubTranscriber {
            text: transcript.to_string(),
            called: Arc::new(AtomicBool::new(false)),
        }),
        Arc::new(StubGenerator {
            reply,
            called: Arc::clone(&generator_called),
        }),
        Arc::new(StubSynthesizer {
            wav: reply_wav,
            called: Arc::clone(&synthesizer_called),
            spoken: Arc::clone(&spoken),
        }),
        "You are a helpful relay.".to_string(),
        16_000,
    );

    Harness {
        pipeline,
        generator_called,
        synthesizer_called,
        spoken,
    }
}

fn utterance_wav() -> Vec<u8> {
    common::sine_wav(440.0, 16_000, 1600)
}

#[tokio::test]
async fn full_run_produces_resampled_encoded_reply() {
    let h = harness(
        "  hello there  ",
        Ok("All good.".to_string()),
        common::sine_wav(330.0, 22_050, 22_050),
    );
    let (tx, mut rx) = mpsc::channel(16);

    let output = h.pipeline.run(&utterance_wav(), &tx).await.unwrap();

    assert_eq!(output.transcript, "hello there");
    assert_eq!(output.reply_text, "All good.");
    // 22050 samples at 22050 Hz resampled to 16 kHz
    assert!(output.waveform.len().abs_diff(16_000) <= 1);

    let mut notices = Vec::new();
    drop(tx);
    while let Some(item) = rx.recv().await {
        if let Outbound::Status(ServerStatus::Processing { message }) = item {
            notices.push(message);
        }
    }
    assert_eq!(
        notices,
        vec![
            "transcribing audio",
            "generating reply",
            "synthesizing speech",
            "encoding reply audio",
        ]
    );
}

#[tokio::test]
async fn empty_transcript_short_circuits() {
    let h = harness("   ", Ok("never used".to_string()), Vec::new());
    let (tx, _rx) = mpsc::channel(16);

    let err = h.pipeline.run(&utterance_wav(), &tx).await.unwrap_err();

    assert!(matches!(err, Error::NoSpeechDetected));
    assert!(!h.generator_called.load(Ordering::SeqCst));
    assert!(!h.synthesizer_called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn generation_failure_speaks_fallback() {
    let h = harness(
        "what time is it",
        Err(Error::Generation("stub".to_string())),
        common::sine_wav(330.0, 16_000, 800),
    );
    let (tx, _rx) = mpsc::channel(16);

    let output = h.pipeline.run(&utterance_wav(), &tx).await.unwrap();

    assert!(h.generator_called.load(Ordering::SeqCst));
    assert_eq!(output.reply_text, FALLBACK_REPLY);
    assert_eq!(h.spoken.lock().await.as_deref(), Some(FALLBACK_REPLY));
}

#[tokio::test]
async fn reply_is_sanitized_before_synthesis() {
    let h = harness(
        "say something fancy",
        Ok("**hi** \u{1F600}".to_string()),
        common::sine_wav(330.0, 16_000, 800),
    );
    let (tx, _rx) = mpsc::channel(16);

    let output = h.pipeline.run(&utterance_wav(), &tx).await.unwrap();

    assert_eq!(output.reply_text, "hi ");
    assert_eq!(h.spoken.lock().await.as_deref(), Some("hi "));
}

#[tokio::test]
async fn closed_notice_queue_does_not_fail_the_run() {
    let h = harness(
        "hello",
        Ok("Hi.".to_string()),
        common::sine_wav(330.0, 16_000, 800),
    );
    let (tx, rx) = mpsc::channel(1);
    drop(rx);

    let output = h.pipeline.run(&utterance_wav(), &tx).await.unwrap();
    assert_eq!(output.reply_text, "Hi.");
}
