//! Slide descriptor: the input unit of the timeline.

use serde::{Deserialize, Serialize};

use crate::core::{MediaRef, Transition, VisualKind};

/// Narration length assumed until synthesis has reported a real duration.
pub const DEFAULT_NARRATION_SECONDS: f64 = 5.0;

/// Shortest hold for a slide whose narration is disabled.
pub const MIN_SILENT_SECONDS: f64 = 0.5;

/// One slide of the presentation.
///
/// Immutable once handed to the timeline builder; edits produce a new list
/// and a rebuilt [`Timeline`](super::Timeline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideDescriptor {
    pub visual: MediaRef,
    #[serde(default)]
    pub visual_kind: VisualKind,
    /// Narration audio, absent until synthesized or when narration is off
    #[serde(default)]
    pub audio: Option<MediaRef>,
    /// Seconds of narration; `None` means not synthesized yet
    #[serde(default)]
    pub narration_duration: Option<f64>,
    #[serde(default)]
    pub post_audio_delay: f64,
    #[serde(default)]
    pub narration_disabled: bool,
    #[serde(default)]
    pub transition: Transition,
    #[serde(default)]
    pub music_paused: bool,
    /// Narration script fed to the synthesizer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

impl SlideDescriptor {
    /// A still-image slide with no narration attached yet.
    pub fn image(visual: impl Into<MediaRef>) -> Self {
        Self {
            visual: visual.into(),
            visual_kind: VisualKind::Image,
            audio: None,
            narration_duration: None,
            post_audio_delay: 0.0,
            narration_disabled: false,
            transition: Transition::None,
            music_paused: false,
            script: None,
        }
    }

    /// A video slide with no narration attached yet.
    pub fn video(visual: impl Into<MediaRef>) -> Self {
        Self {
            visual_kind: VisualKind::Video,
            ..Self::image(visual)
        }
    }

    pub fn with_narration(mut self, audio: impl Into<MediaRef>, seconds: f64) -> Self {
        self.audio = Some(audio.into());
        self.narration_duration = Some(seconds);
        self
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    pub fn with_post_audio_delay(mut self, seconds: f64) -> Self {
        self.post_audio_delay = seconds;
        self
    }

    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transition = transition;
        self
    }

    pub fn with_music_paused(mut self, paused: bool) -> Self {
        self.music_paused = paused;
        self
    }

    pub fn without_narration(mut self) -> Self {
        self.narration_disabled = true;
        self
    }

    /// Narration length in seconds, clamped, with the unsynthesized fallback.
    pub fn narration_seconds(&self, fallback: f64) -> f64 {
        clamp_seconds(self.narration_duration.unwrap_or(fallback))
    }

    /// Post-audio hold in seconds, clamped.
    pub fn post_delay_seconds(&self) -> f64 {
        clamp_seconds(self.post_audio_delay)
    }

    /// Total slide duration in seconds.
    ///
    /// Disabled narration holds the slide for `max(post_delay, 0.5)`;
    /// otherwise the slide lasts `narration + post_delay`.
    pub fn duration_seconds(&self, fallback: f64) -> f64 {
        if self.narration_disabled {
            self.post_delay_seconds().max(MIN_SILENT_SECONDS)
        } else {
            self.narration_seconds(fallback) + self.post_delay_seconds()
        }
    }

    /// The narration source the preview should play for this slide, if any.
    pub fn active_narration(&self) -> Option<&MediaRef> {
        if self.narration_disabled {
            None
        } else {
            self.audio.as_ref()
        }
    }
}

/// Negative and non-finite values collapse to zero.
fn clamp_seconds(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    }
}
