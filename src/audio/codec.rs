//! WAV materialization and sample-format conversion
//!
//! The relay normalizes everything to mono unsigned 8-bit PCM at the
//! configured target rate: inbound raw frames are materialized as WAV for the
//! transcription engine, and synthesized replies are decoded, resampled, and
//! re-encoded before broadcast.

use std::io::{Cursor, Read};

use crate::{Error, Result};

/// Wrap raw unsigned 8-bit mono PCM in a WAV container
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn pcm8_to_wav(pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 8,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &byte in pcm {
            // WAV stores 8-bit audio unsigned; hound's sample API is signed
            #[allow(clippy::cast_possible_truncation)]
            let sample = (i16::from(byte) - 128) as i8;
            writer
                .write_sample(sample)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

/// Decode a WAV stream to f32 samples in [-1, 1], averaging multi-channel
/// audio down to mono. Returns the samples and the source sample rate.
///
/// # Errors
///
/// Returns error if the stream is not a readable WAV container
pub fn wav_to_f32<R: Read>(reader: R) -> Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::new(reader).map_err(|e| Error::Audio(e.to_string()))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Audio(e.to_string()))?,
        hound::SampleFormat::Int => {
            #[allow(clippy::cast_precision_loss)]
            let scale = f32::from(2u16).powi(i32::from(spec.bits_per_sample) - 1);
            reader
                .samples::<i32>()
                .map(|s| {
                    #[allow(clippy::cast_precision_loss)]
                    s.map(|v| v as f32 / scale)
                })
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Audio(e.to_string()))?
        }
    };

    let samples = if spec.channels > 1 {
        downmix(&interleaved, usize::from(spec.channels))
    } else {
        interleaved
    };

    Ok((samples, spec.sample_rate))
}

/// Average interleaved channels down to mono
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    #[allow(clippy::cast_precision_loss)]
    let divisor = channels as f32;
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / divisor)
        .collect()
}

/// Resample by linear interpolation at fractional source indices
///
/// Output length is `round(n * dst_rate / src_rate)`; each output sample is
/// interpolated between the two nearest input samples. Equal rates return the
/// input unchanged.
#[must_use]
pub fn resample_linear(samples: &[f32], src_rate: u32, dst_rate: u32) -> Vec<f32> {
    if samples.is_empty() || src_rate == dst_rate {
        return samples.to_vec();
    }

    let ratio = f64::from(src_rate) / f64::from(dst_rate);
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let out_len =
        (samples.len() as f64 * f64::from(dst_rate) / f64::from(src_rate)).round() as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let pos = (i as f64 * ratio).min(last as f64);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(last);
            #[allow(clippy::cast_possible_truncation)]
            let frac = (pos - pos.floor()) as f32;
            samples[lo] + (samples[hi] - samples[lo]) * frac
        })
        .collect()
}

/// Quantize f32 samples to unsigned 8-bit PCM
///
/// Values are clipped to [-1, 1] then scaled with `round(s * 127 + 128)`,
/// matching the wire format buffered clients play back directly.
#[must_use]
pub fn encode_u8(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .map(|s| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let byte = (s.clamp(-1.0, 1.0) * 127.0 + 128.0).round() as u8;
            byte
        })
        .collect()
}
