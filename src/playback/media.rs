//! Media playback primitive: the seam between the synchronizer and whatever
//! actually produces sound.

use crate::core::time::Time;
use crate::core::MediaRef;

/// Error type for media primitives
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("No audio output device available")]
    NoDevice,
    #[error("No source loaded")]
    NotLoaded,
    #[error("Source unavailable: {0}")]
    Unavailable(MediaRef),
    #[error("Playback rejected: {0}")]
    PlayRejected(String),
    #[error("Output stream error: {0}")]
    Stream(String),
}

/// A single independently loaded stream (narration or music).
///
/// `play` may fail (no device, autoplay-style refusal); callers treat that
/// as "silent for now" and retry later.
pub trait MediaPrimitive {
    fn load(&mut self, source: &MediaRef) -> Result<(), MediaError>;
    fn unload(&mut self);
    fn source(&self) -> Option<&MediaRef>;
    fn play(&mut self) -> Result<(), MediaError>;
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    /// Current position inside the loaded source
    fn offset(&self) -> Time;
    fn set_offset(&mut self, offset: Time);
    fn volume(&self) -> f32;
    fn set_volume(&mut self, volume: f32);
    fn set_looping(&mut self, looping: bool);
}

impl<P: MediaPrimitive + ?Sized> MediaPrimitive for Box<P> {
    fn load(&mut self, source: &MediaRef) -> Result<(), MediaError> {
        (**self).load(source)
    }
    fn unload(&mut self) {
        (**self).unload()
    }
    fn source(&self) -> Option<&MediaRef> {
        (**self).source()
    }
    fn play(&mut self) -> Result<(), MediaError> {
        (**self).play()
    }
    fn pause(&mut self) {
        (**self).pause()
    }
    fn is_paused(&self) -> bool {
        (**self).is_paused()
    }
    fn offset(&self) -> Time {
        (**self).offset()
    }
    fn set_offset(&mut self, offset: Time) {
        (**self).set_offset(offset)
    }
    fn volume(&self) -> f32 {
        (**self).volume()
    }
    fn set_volume(&mut self, volume: f32) {
        (**self).set_volume(volume)
    }
    fn set_looping(&mut self, looping: bool) {
        (**self).set_looping(looping)
    }
}
