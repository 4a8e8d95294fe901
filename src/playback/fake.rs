//! In-memory media primitive for tests.

use crate::core::time::Time;
use crate::core::MediaRef;
use crate::playback::media::{MediaError, MediaPrimitive};

/// Records every call; never produces sound.
#[derive(Debug, Clone)]
pub(crate) struct FakeMedia {
    pub source: Option<MediaRef>,
    pub paused: bool,
    pub offset: Time,
    pub volume: f32,
    pub looping: bool,
    pub reject_play: bool,
    pub unavailable: Vec<MediaRef>,
    pub loads: usize,
    pub load_attempts: usize,
    pub play_attempts: usize,
    pub seeks: usize,
}

impl Default for FakeMedia {
    fn default() -> Self {
        Self {
            source: None,
            paused: true,
            offset: 0,
            volume: 1.0,
            looping: false,
            reject_play: false,
            unavailable: Vec::new(),
            loads: 0,
            load_attempts: 0,
            play_attempts: 0,
            seeks: 0,
        }
    }
}

impl MediaPrimitive for FakeMedia {
    fn load(&mut self, source: &MediaRef) -> Result<(), MediaError> {
        self.load_attempts += 1;
        if self.unavailable.contains(source) {
            return Err(MediaError::Unavailable(source.clone()));
        }
        self.loads += 1;
        self.source = Some(source.clone());
        self.offset = 0;
        self.paused = true;
        Ok(())
    }

    fn unload(&mut self) {
        self.source = None;
        self.offset = 0;
        self.paused = true;
    }

    fn source(&self) -> Option<&MediaRef> {
        self.source.as_ref()
    }

    fn play(&mut self) -> Result<(), MediaError> {
        self.play_attempts += 1;
        if self.source.is_none() {
            return Err(MediaError::NotLoaded);
        }
        if self.reject_play {
            return Err(MediaError::PlayRejected("user gesture required".into()));
        }
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn offset(&self) -> Time {
        self.offset
    }

    fn set_offset(&mut self, offset: Time) {
        self.seeks += 1;
        self.offset = offset;
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }
}
