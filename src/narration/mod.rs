//! Narration synthesis: turning slide scripts into narration audio.
//!
//! The synthesizer itself is a collaborator behind [`Synthesizer`]; this
//! module owns the voice catalogue, the request queue and the step that
//! writes a finished narration back onto its slide.

pub mod queue;
pub mod tone;

use crate::audio::{PcmBuffer, PcmError};
use crate::core::MediaRef;
use crate::timeline::SlideDescriptor;

pub use queue::NarrationQueue;
pub use tone::ToneSynthesizer;

/// Voice used when a slide does not pick one.
pub const DEFAULT_VOICE: &str = "af_heart";

/// Voice ids with their display names.
pub const VOICES: &[(&str, &str)] = &[
    ("af_heart", "Heart (Default)"),
    ("af_bella", "Bella"),
    ("af_nicole", "Nicole"),
    ("am_adam", "Adam"),
    ("am_michael", "Michael"),
    ("bf_emma", "Emma (British)"),
    ("bm_george", "George (British)"),
];

/// Error type for narration synthesis
#[derive(Debug, thiserror::Error)]
pub enum NarrationError {
    #[error("Unknown voice: {0}")]
    UnknownVoice(String),
    #[error("Nothing to narrate")]
    EmptyScript,
    #[error("Synthesis failed: {0}")]
    Synthesis(String),
    #[error("Audio error: {0}")]
    Audio(#[from] PcmError),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Narration queue closed")]
    QueueClosed,
}

/// Display name for a voice id.
pub fn voice_name(id: &str) -> Option<&'static str> {
    VOICES.iter().find(|(v, _)| *v == id).map(|(_, name)| *name)
}

pub fn validate_voice(id: &str) -> Result<(), NarrationError> {
    match voice_name(id) {
        Some(_) => Ok(()),
        None => Err(NarrationError::UnknownVoice(id.to_string())),
    }
}

/// Synthesized narration for one script.
#[derive(Debug, Clone, PartialEq)]
pub struct Narration {
    pub audio: MediaRef,
    pub pcm: PcmBuffer,
    pub duration_secs: f64,
}

/// Text-to-speech backend. Calls may block for a long time; the queue runs
/// them off the caller's thread.
pub trait Synthesizer: Send + 'static {
    fn synthesize(&mut self, text: &str, voice: &str) -> Result<Narration, NarrationError>;
}

/// Attach `narration` to `slide`. The caller rebuilds the timeline.
pub fn apply_narration(slide: &mut SlideDescriptor, narration: &Narration) {
    slide.audio = Some(narration.audio.clone());
    slide.narration_duration = Some(narration.duration_secs);
}
