//! Audio buffer handed to the frame sink, one per output frame.
//! Samples are interleaved PCM f32.

use crate::core::time::{self, Time};

/// Audio buffer containing samples
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub data: Vec<f32>, // Interleaved samples (L, R, L, R, ...)
    pub sample_rate: u32,
    pub channels: u32,
    pub timestamp: Time, // Timestamp of first sample in nanoseconds
}

impl AudioBuffer {
    /// Create an empty buffer
    pub fn new(sample_rate: u32, channels: u32, timestamp: Time) -> Self {
        Self {
            data: Vec::new(),
            sample_rate,
            channels,
            timestamp,
        }
    }

    /// Create a buffer of `len` interleaved zero samples
    pub fn silence(sample_rate: u32, channels: u32, len: usize, timestamp: Time) -> Self {
        Self {
            data: vec![0.0; len],
            sample_rate,
            channels,
            timestamp,
        }
    }

    /// Get the number of sample frames (per channel)
    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.data.len() / self.channels as usize
    }

    /// Get the duration in nanoseconds
    pub fn duration(&self) -> Time {
        if self.sample_rate == 0 {
            return 0;
        }
        time::from_seconds(self.frame_count() as f64 / self.sample_rate as f64)
    }

    /// Append samples to the buffer
    pub fn append(&mut self, samples: &[f32]) {
        self.data.extend_from_slice(samples);
    }

    /// Hard-limit every sample to [-1, 1]
    pub fn clip(&mut self) {
        for sample in &mut self.data {
            *sample = sample.clamp(-1.0, 1.0);
        }
    }

    pub fn is_silent(&self) -> bool {
        self.data.iter().all(|s| *s == 0.0)
    }

    /// Get a slice of the audio data
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Get a mutable slice of the audio data
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_and_duration() {
        let buffer = AudioBuffer::silence(48000, 2, 3200, 0);
        assert_eq!(buffer.frame_count(), 1600);
        assert!(buffer.is_silent());
        assert_eq!(buffer.duration(), time::from_seconds(1600.0 / 48000.0));
    }

    #[test]
    fn test_clip() {
        let mut buffer = AudioBuffer::new(48000, 1, 0);
        buffer.append(&[1.5, -2.0, 0.25]);
        buffer.clip();
        assert_eq!(buffer.as_slice(), &[1.0, -1.0, 0.25]);
    }

    #[test]
    fn test_degenerate_format() {
        let buffer = AudioBuffer::silence(0, 0, 4, 0);
        assert_eq!(buffer.frame_count(), 0);
        assert_eq!(buffer.duration(), 0);
    }
}
