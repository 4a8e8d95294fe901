//! Slide entry animations.
//!
//! A transition only affects the slide that is entering; it is evaluated
//! from the time since the slide started, so any frame rate traces the same
//! curve.

use crate::core::time::{self, Time};
use crate::core::Transition;

/// Length of the fade and slide-in ramps, in seconds.
pub const ENTRY_SECONDS: f64 = 0.5;
/// Seconds for the slow zoom to reach [`ZOOM_RAMP_SCALE`].
pub const ZOOM_SECONDS: f64 = 5.0;
/// Scale reached after [`ZOOM_SECONDS`]; the zoom keeps growing at the same
/// rate for longer slides.
pub const ZOOM_RAMP_SCALE: f32 = 1.1;

/// How the incoming slide is drawn at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionState {
    /// Opacity multiplier, 0.0 to 1.0
    pub opacity: f32,
    /// Horizontal offset in output pixels
    pub offset_x: f32,
    /// Uniform scale around the frame center
    pub scale: f32,
}

impl Default for TransitionState {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            offset_x: 0.0,
            scale: 1.0,
        }
    }
}

impl TransitionState {
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

/// Evaluate `transition` at `since_start` into the slide, for an output
/// `width` pixels wide.
pub fn evaluate(transition: Transition, since_start: Time, width: u32) -> TransitionState {
    let t = time::to_seconds(since_start.max(0));

    match transition {
        Transition::None => TransitionState::default(),
        Transition::Fade => TransitionState {
            opacity: progress(t, ENTRY_SECONDS),
            ..Default::default()
        },
        Transition::Slide => TransitionState {
            offset_x: width as f32 * (1.0 - progress(t, ENTRY_SECONDS)),
            ..Default::default()
        },
        Transition::Zoom => TransitionState {
            scale: 1.0 + (ZOOM_RAMP_SCALE - 1.0) * (t / ZOOM_SECONDS) as f32,
            ..Default::default()
        },
    }
}

/// Linear 0..1 ramp over `length` seconds, clamped both ends.
fn progress(t: f64, length: f64) -> f32 {
    (t / length).clamp(0.0, 1.0) as f32
}
