//! Configuration for the Aria relay
//!
//! Settings come from an optional TOML file merged with `ARIA_*` environment
//! overrides; every field has a working default so the relay starts with no
//! config at all (engine API keys excepted).

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result};

/// Default system instruction given to the text-generation engine
pub const DEFAULT_PERSONA_PROMPT: &str =
    "You are Aria. Aria is a warm voice companion who looks after your wellbeing. \
     Keep replies short and speakable.";

/// Relay configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind host
    pub host: String,

    /// Bind port
    pub port: u16,

    /// Maximum inbound websocket message size in bytes.
    /// Must accommodate a full utterance in one frame (>= 10 MiB).
    pub max_message_bytes: usize,

    /// Interval between server-initiated keepalive pings
    pub keepalive_interval: Duration,

    /// Grace period after a ping before an idle session is closed
    pub keepalive_timeout: Duration,

    /// Outbound audio chunk size in bytes
    pub chunk_size: usize,

    /// Target sample rate for all relayed audio (Hz)
    pub sample_rate: u32,

    /// Channel count for buffered client audio (mono)
    pub channels: u16,

    /// Bytes per sample for buffered client audio (8-bit PCM)
    pub sample_width: u16,

    /// System instruction for the text-generation engine
    pub persona_prompt: String,

    /// External engine settings
    pub engines: EngineConfig,
}

/// External engine model identifiers and credentials
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Speech-to-text model (OpenAI transcription API)
    pub stt_model: String,

    /// Text-generation model (Gemini)
    pub llm_model: String,

    /// Speech synthesis model (OpenAI speech API)
    pub tts_model: String,

    /// Synthesis voice identifier
    pub tts_voice: String,

    /// OpenAI API key (STT + TTS), from `OPENAI_API_KEY`
    pub openai_api_key: Option<String>,

    /// Gemini API key, from `GEMINI_API_KEY`
    pub gemini_api_key: Option<String>,
}

/// On-disk TOML representation; every field optional so partial files work
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    host: Option<String>,
    port: Option<u16>,
    max_message_bytes: Option<usize>,
    keepalive_interval_secs: Option<u64>,
    keepalive_timeout_secs: Option<u64>,
    chunk_size: Option<usize>,
    sample_rate: Option<u32>,
    channels: Option<u16>,
    sample_width: Option<u16>,
    persona_prompt: Option<String>,
    engines: FileEngineConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileEngineConfig {
    stt_model: Option<String>,
    llm_model: Option<String>,
    tts_model: Option<String>,
    tts_voice: Option<String>,
}

impl Config {
    /// Load configuration from an optional TOML file plus env overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed, or if a
    /// validated field is out of range.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let fc = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p).map_err(|e| {
                    Error::Config(format!("cannot read {}: {e}", p.display()))
                })?;
                toml::from_str::<FileConfig>(&raw)?
            }
            None => FileConfig::default(),
        };

        let config = Self {
            host: env_var("ARIA_HOST")
                .or(fc.host)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_env("ARIA_PORT")?.or(fc.port).unwrap_or(7860),
            max_message_bytes: parse_env("ARIA_MAX_MESSAGE_BYTES")?
                .or(fc.max_message_bytes)
                .unwrap_or(10 * 1024 * 1024),
            keepalive_interval: Duration::from_secs(
                parse_env("ARIA_KEEPALIVE_INTERVAL_SECS")?
                    .or(fc.keepalive_interval_secs)
                    .unwrap_or(20),
            ),
            keepalive_timeout: Duration::from_secs(
                parse_env("ARIA_KEEPALIVE_TIMEOUT_SECS")?
                    .or(fc.keepalive_timeout_secs)
                    .unwrap_or(10),
            ),
            chunk_size: parse_env("ARIA_CHUNK_SIZE")?
                .or(fc.chunk_size)
                .unwrap_or(1024),
            sample_rate: parse_env("ARIA_SAMPLE_RATE")?
                .or(fc.sample_rate)
                .unwrap_or(16_000),
            channels: parse_env("ARIA_CHANNELS")?.or(fc.channels).unwrap_or(1),
            sample_width: parse_env("ARIA_SAMPLE_WIDTH")?
                .or(fc.sample_width)
                .unwrap_or(1),
            persona_prompt: env_var("ARIA_PERSONA_PROMPT")
                .or(fc.persona_prompt)
                .unwrap_or_else(|| DEFAULT_PERSONA_PROMPT.to_string()),
            engines: EngineConfig {
                stt_model: env_var("ARIA_STT_MODEL")
                    .or(fc.engines.stt_model)
                    .unwrap_or_else(|| "whisper-1".to_string()),
                llm_model: env_var("ARIA_LLM_MODEL")
                    .or(fc.engines.llm_model)
                    .unwrap_or_else(|| "gemini-2.5-flash".to_string()),
                tts_model: env_var("ARIA_TTS_MODEL")
                    .or(fc.engines.tts_model)
                    .unwrap_or_else(|| "tts-1".to_string()),
                tts_voice: env_var("ARIA_TTS_VOICE")
                    .or(fc.engines.tts_voice)
                    .unwrap_or_else(|| "alloy".to_string()),
                openai_api_key: env_var("OPENAI_API_KEY"),
                gemini_api_key: env_var("GEMINI_API_KEY"),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Check field ranges that would otherwise fail deep inside the pipeline
    fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be nonzero".to_string()));
        }
        if self.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be nonzero".to_string()));
        }
        if self.channels != 1 {
            return Err(Error::Config(
                "only mono client audio is supported".to_string(),
            ));
        }
        if self.sample_width != 1 {
            return Err(Error::Config(
                "only 8-bit client audio is supported".to_string(),
            ));
        }
        Ok(())
    }

    /// Seconds of playback one outbound chunk represents; the broadcast
    /// streamer sleeps this long between chunks.
    #[must_use]
    pub fn chunk_interval(&self) -> Duration {
        Duration::from_secs_f64(self.chunk_size as f64 / f64::from(self.sample_rate))
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env_var(key) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("invalid value for {key}: {raw}"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.port, 7860);
        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.sample_rate, 16_000);
        assert!(config.max_message_bytes >= 10 * 1024 * 1024);
        assert_eq!(config.keepalive_interval, Duration::from_secs(20));
        assert_eq!(config.keepalive_timeout, Duration::from_secs(10));
    }

    #[test]
    fn chunk_interval_matches_playback_rate() {
        let config = Config::load(None).unwrap();
        // 1024 bytes at 16 kHz of 8-bit mono is 64 ms of audio
        assert_eq!(config.chunk_interval(), Duration::from_millis(64));
    }

    #[test]
    fn partial_file_fills_from_defaults() {
        let raw = "port = 9000\n[engines]\nllm_model = \"gemini-2.0-pro\"\n";
        let fc: FileConfig = toml::from_str(raw).unwrap();
        assert_eq!(fc.port, Some(9000));
        assert_eq!(fc.engines.llm_model.as_deref(), Some("gemini-2.0-pro"));
        assert!(fc.host.is_none());
    }

    #[test]
    fn unknown_file_keys_rejected() {
        let raw = "porte = 9000\n";
        assert!(toml::from_str::<FileConfig>(raw).is_err());
    }
}
