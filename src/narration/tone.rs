//! Offline placeholder synthesizer.
//!
//! Produces a quiet sine tone whose length follows the word count, so
//! timing and ducking can be checked without a speech model.

use std::f32::consts::TAU;
use std::path::PathBuf;

use tracing::debug;

use crate::audio::PcmBuffer;
use crate::core::MediaRef;
use crate::narration::{validate_voice, Narration, NarrationError, Synthesizer};

/// Sample rate of the generated narration.
pub const TONE_SAMPLE_RATE: u32 = 24_000;

#[derive(Debug, Clone)]
pub struct ToneSynthesizer {
    pub seconds_per_word: f64,
    pub frequency: f32,
    pub amplitude: f32,
    /// Write each narration as a WAV file here; otherwise keep it in memory
    pub out_dir: Option<PathBuf>,
    generated: u64,
}

impl Default for ToneSynthesizer {
    fn default() -> Self {
        Self {
            seconds_per_word: 0.4,
            frequency: 220.0,
            amplitude: 0.2,
            out_dir: None,
            generated: 0,
        }
    }
}

impl ToneSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writing_to(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: Some(out_dir.into()),
            ..Self::default()
        }
    }

    fn samples(&self, seconds: f64) -> Vec<f32> {
        let len = (seconds * TONE_SAMPLE_RATE as f64).round() as usize;
        let step = TAU * self.frequency / TONE_SAMPLE_RATE as f32;
        (0..len)
            .map(|i| (i as f32 * step).sin() * self.amplitude)
            .collect()
    }

    fn write_wav(&self, path: &std::path::Path, samples: &[f32]) -> Result<(), NarrationError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: TONE_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for s in samples {
            writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
        }
        writer.finalize()?;
        Ok(())
    }
}

impl Synthesizer for ToneSynthesizer {
    fn synthesize(&mut self, text: &str, voice: &str) -> Result<Narration, NarrationError> {
        validate_voice(voice)?;
        let words = text.split_whitespace().count();
        if words == 0 {
            return Err(NarrationError::EmptyScript);
        }

        let seconds = words as f64 * self.seconds_per_word;
        let samples = self.samples(seconds);
        self.generated += 1;

        let audio = match &self.out_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                let path = dir.join(format!("narration-{:03}-{}.wav", self.generated, voice));
                self.write_wav(&path, &samples)?;
                MediaRef::new(path.to_string_lossy())
            }
            None => MediaRef::new(format!("tone:{}:{}", voice, self.generated)),
        };
        debug!(words, seconds, audio = %audio, "Synthesized placeholder narration");

        let pcm = PcmBuffer::new(samples, TONE_SAMPLE_RATE, 1);
        Ok(Narration {
            audio,
            duration_secs: pcm.frames() as f64 / TONE_SAMPLE_RATE as f64,
            pcm,
        })
    }
}
