//! Shared test helpers
#![allow(dead_code)]

/// Generate sine wave samples
pub fn sine_samples(frequency: f32, sample_rate: u32, count: usize) -> Vec<f32> {
    (0..count)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            0.5 * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Wrap f32 samples in a mono float WAV container
pub fn samples_to_wav_f32(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// A playable sine WAV at the given rate
pub fn sine_wav(frequency: f32, sample_rate: u32, count: usize) -> Vec<u8> {
    samples_to_wav_f32(&sine_samples(frequency, sample_rate, count), sample_rate)
}
