//! cpal-backed media primitive for interactive preview.
//!
//! Each stream owns one output stream on the default device. The audio
//! callback reads the loaded PCM at a shared cursor and advances it, so the
//! synchronizer can read back the position and correct drift.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, StreamConfig};
use tracing::{debug, warn};

use crate::audio::pcm::{PcmBuffer, PcmLibrary};
use crate::core::time::{self, Time};
use crate::core::MediaRef;
use crate::playback::media::{MediaError, MediaPrimitive};

/// State shared with the audio callback.
#[derive(Debug)]
struct Shared {
    /// Source position where the current run started
    base: AtomicI64,
    /// Output frames rendered since `base` was set
    played: AtomicU64,
    volume: AtomicU32,
    looping: AtomicBool,
    paused: AtomicBool,
}

impl Shared {
    fn new() -> Self {
        Self {
            base: AtomicI64::new(0),
            played: AtomicU64::new(0),
            volume: AtomicU32::new(1.0f32.to_bits()),
            looping: AtomicBool::new(false),
            paused: AtomicBool::new(true),
        }
    }

    fn position(&self, out_rate: u32) -> Time {
        let played = self.played.load(Ordering::Relaxed);
        self.base.load(Ordering::Relaxed)
            + time::from_seconds(played as f64 / out_rate.max(1) as f64)
    }

    fn reset(&self, offset: Time) {
        self.base.store(offset.max(0), Ordering::Relaxed);
        self.played.store(0, Ordering::Relaxed);
    }
}

/// Audio output stream playing one source from a [`PcmLibrary`].
pub struct CpalStream {
    label: &'static str,
    library: Arc<PcmLibrary>,
    device: Device,
    config: StreamConfig,
    source: Option<MediaRef>,
    pcm: Option<PcmBuffer>,
    stream: Option<cpal::Stream>,
    shared: Arc<Shared>,
}

impl CpalStream {
    /// Open the default output device. `label` only tags log lines.
    pub fn new(label: &'static str, library: Arc<PcmLibrary>) -> Result<Self, MediaError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(MediaError::NoDevice)?;
        let default_config = device
            .default_output_config()
            .map_err(|e| MediaError::Stream(e.to_string()))?;
        let config = StreamConfig::from(default_config);

        Ok(Self {
            label,
            library,
            device,
            config,
            source: None,
            pcm: None,
            stream: None,
            shared: Arc::new(Shared::new()),
        })
    }

    fn out_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn build_stream(&self, pcm: PcmBuffer) -> Result<cpal::Stream, MediaError> {
        let shared = Arc::clone(&self.shared);
        let out_rate = self.out_rate();
        let channels = self.config.channels as u32;
        let label = self.label;

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    data.fill(0.0);
                    if shared.paused.load(Ordering::Relaxed) {
                        return;
                    }
                    let offset = shared.position(out_rate);
                    let volume = f32::from_bits(shared.volume.load(Ordering::Relaxed));
                    let looping = shared.looping.load(Ordering::Relaxed);
                    pcm.mix_into(data, out_rate, channels, offset, volume, looping);
                    let frames = data.len() as u64 / channels.max(1) as u64;
                    shared.played.fetch_add(frames, Ordering::Relaxed);
                },
                move |err| warn!(stream = label, "Audio stream error: {}", err),
                None,
            )
            .map_err(|e| MediaError::Stream(e.to_string()))
    }
}

impl MediaPrimitive for CpalStream {
    fn load(&mut self, source: &MediaRef) -> Result<(), MediaError> {
        self.unload();
        let pcm = self
            .library
            .get(source)
            .cloned()
            .ok_or_else(|| MediaError::Unavailable(source.clone()))?;
        let stream = self.build_stream(pcm.clone())?;
        self.shared.reset(0);
        self.stream = Some(stream);
        self.pcm = Some(pcm);
        self.source = Some(source.clone());
        debug!(stream = self.label, source = %source, "Loaded source");
        Ok(())
    }

    fn unload(&mut self) {
        self.shared.paused.store(true, Ordering::Relaxed);
        // Dropping the stream closes it on the device
        self.stream = None;
        self.pcm = None;
        self.source = None;
        self.shared.reset(0);
    }

    fn source(&self) -> Option<&MediaRef> {
        self.source.as_ref()
    }

    fn play(&mut self) -> Result<(), MediaError> {
        let stream = self.stream.as_ref().ok_or(MediaError::NotLoaded)?;
        stream
            .play()
            .map_err(|e| MediaError::PlayRejected(e.to_string()))?;
        self.shared.paused.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn pause(&mut self) {
        self.shared.paused.store(true, Ordering::Relaxed);
        if let Some(stream) = &self.stream {
            if let Err(e) = stream.pause() {
                debug!(stream = self.label, "Pause failed: {}", e);
            }
        }
    }

    fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Relaxed)
    }

    fn offset(&self) -> Time {
        let position = self.shared.position(self.out_rate());
        match &self.pcm {
            Some(pcm) if self.shared.looping.load(Ordering::Relaxed) && pcm.duration() > 0 => {
                position % pcm.duration()
            }
            Some(pcm) => position.min(pcm.duration()),
            None => 0,
        }
    }

    fn set_offset(&mut self, offset: Time) {
        self.shared.reset(offset);
    }

    fn volume(&self) -> f32 {
        f32::from_bits(self.shared.volume.load(Ordering::Relaxed))
    }

    fn set_volume(&mut self, volume: f32) {
        self.shared
            .volume
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    fn set_looping(&mut self, looping: bool) {
        self.shared.looping.store(looping, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_position_tracks_played_frames() {
        let shared = Shared::new();
        shared.reset(time::from_seconds(2.0));
        shared.played.store(24_000, Ordering::Relaxed);
        assert_eq!(shared.position(48_000), time::from_seconds(2.5));

        shared.reset(-5);
        assert_eq!(shared.position(48_000), 0);
    }
}
