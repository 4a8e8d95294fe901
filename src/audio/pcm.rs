//! Decoded audio sources shared between preview streams and the renderer.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::core::time::{self, Time};
use crate::core::MediaRef;

/// Error type for loading audio sources
#[derive(Debug, thiserror::Error)]
pub enum PcmError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Unsupported WAV format: {bits}-bit {format:?}")]
    Unsupported {
        bits: u16,
        format: hound::SampleFormat,
    },
}

/// Immutable decoded audio, cheap to clone.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u32,
}

impl PcmBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate: sample_rate.max(1),
            channels: channels.max(1),
        }
    }

    /// Decode a WAV file (integer or float PCM) into f32 samples.
    pub fn from_wav(path: &Path) -> Result<Self, PcmError> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Float, 32) => {
                reader.samples::<f32>().collect::<Result<_, _>>()?
            }
            (hound::SampleFormat::Int, bits @ (8 | 16 | 24 | 32)) => {
                let scale = (1i64 << (bits - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()?
            }
            (format, bits) => return Err(PcmError::Unsupported { bits, format }),
        };
        Ok(Self::new(samples, spec.sample_rate, spec.channels as u32))
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Number of sample frames (per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration(&self) -> Time {
        time::from_seconds(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Source frame index at a timeline offset into this buffer.
    pub fn frame_at(&self, offset: Time) -> usize {
        (time::to_seconds(offset.max(0)) * self.sample_rate as f64).round() as usize
    }

    /// Interleaved samples for `count` frames starting at frame `start`,
    /// truncated at the end of the source.
    pub fn slice_frames(&self, start: usize, count: usize) -> &[f32] {
        let channels = self.channels as usize;
        let total = self.frames();
        let start = start.min(total);
        let end = start.saturating_add(count).min(total);
        &self.samples[start * channels..end * channels]
    }

    /// Add this source, scaled by `gain`, into an interleaved output block.
    ///
    /// `out` is `out_channels`-interleaved at `out_rate`; reading starts at
    /// `offset` into the source. Rate mismatch uses nearest-frame lookup and
    /// channels map by index modulo the source channel count. Past the end
    /// the source either wraps (`looping`) or contributes nothing.
    pub fn mix_into(
        &self,
        out: &mut [f32],
        out_rate: u32,
        out_channels: u32,
        offset: Time,
        gain: f32,
        looping: bool,
    ) {
        let total = self.frames();
        if total == 0 || gain == 0.0 || out_channels == 0 || out_rate == 0 {
            return;
        }
        let out_channels = out_channels as usize;
        let src_channels = self.channels as usize;
        let base = self.frame_at(offset);

        for (i, frame) in out.chunks_mut(out_channels).enumerate() {
            let step = (i as u64 * self.sample_rate as u64 / out_rate as u64) as usize;
            let mut idx = base + step;
            if idx >= total {
                if !looping {
                    break;
                }
                idx %= total;
            }
            let src = &self.samples[idx * src_channels..(idx + 1) * src_channels];
            for (ch, sample) in frame.iter_mut().enumerate() {
                *sample += src[ch % src_channels] * gain;
            }
        }
    }
}

/// Decoded sources keyed by media handle.
#[derive(Debug, Clone, Default)]
pub struct PcmLibrary {
    sources: HashMap<MediaRef, PcmBuffer>,
}

impl PcmLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: MediaRef, pcm: PcmBuffer) {
        self.sources.insert(source, pcm);
    }

    pub fn get(&self, source: &MediaRef) -> Option<&PcmBuffer> {
        self.sources.get(source)
    }

    pub fn contains(&self, source: &MediaRef) -> bool {
        self.sources.contains_key(source)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
