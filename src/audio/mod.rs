//! Audio primitives
//!
//! Buffering of raw inbound PCM plus the pure conversion steps the pipeline
//! runs on synthesized replies: WAV materialization, f32 decoding with mono
//! downmix, linear resampling, and unsigned 8-bit encoding.

mod buffer;
mod codec;

pub use buffer::AudioBuffer;
pub use codec::{encode_u8, pcm8_to_wav, resample_linear, wav_to_f32};
