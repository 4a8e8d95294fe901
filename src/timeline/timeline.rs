//! Timeline: slide list resolved to contiguous time intervals.

use crate::core::time::{self, Time};
use crate::core::{MediaRef, Transition, VisualKind};
use crate::timeline::slide::{SlideDescriptor, DEFAULT_NARRATION_SECONDS};

/// Per-slide facts consumers need at playback time, copied out of the
/// descriptor so the timeline is the only value they have to hold.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideCue {
    pub visual: MediaRef,
    pub visual_kind: VisualKind,
    /// Narration to play; `None` when absent or disabled
    pub narration: Option<MediaRef>,
    /// Length of the narrated part of the slide
    pub narration_len: Time,
    pub transition: Transition,
    pub music_paused: bool,
}

/// A slide's resolved `[start, end)` position on the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    pub index: usize,
    pub start: Time,
    pub end: Time,
    pub duration: Time,
    pub cue: SlideCue,
}

impl Interval {
    /// Half-open containment: `start <= t < end`.
    pub fn contains(&self, t: Time) -> bool {
        t >= self.start && t < self.end
    }
}

/// Ordered, contiguous intervals covering `[0, total_duration)`.
///
/// Rebuilt whenever the slide list changes, otherwise shared read-only by
/// the preview synchronizer and the batch renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    intervals: Vec<Interval>,
    total_duration: Time,
}

impl Timeline {
    /// Build with the standard 5 second fallback for unsynthesized narration.
    pub fn build(slides: &[SlideDescriptor]) -> Self {
        Self::build_with_fallback(slides, DEFAULT_NARRATION_SECONDS)
    }

    /// Build, using `fallback_narration` seconds for slides whose narration
    /// length is not known yet. O(n) in slide count.
    pub fn build_with_fallback(slides: &[SlideDescriptor], fallback_narration: f64) -> Self {
        let mut intervals = Vec::with_capacity(slides.len());
        let mut accumulated: Time = 0;

        for (index, slide) in slides.iter().enumerate() {
            // Saturate so the running total stays representable
            let duration = time::from_seconds(slide.duration_seconds(fallback_narration))
                .min(Time::MAX - accumulated);
            let narration = slide.active_narration().cloned();
            let narration_len = if narration.is_some() {
                time::from_seconds(slide.narration_seconds(fallback_narration)).min(duration)
            } else {
                0
            };

            let start = accumulated;
            accumulated += duration;
            intervals.push(Interval {
                index,
                start,
                end: accumulated,
                duration,
                cue: SlideCue {
                    visual: slide.visual.clone(),
                    visual_kind: slide.visual_kind,
                    narration,
                    narration_len,
                    transition: slide.transition,
                    music_paused: slide.music_paused,
                },
            });
        }

        Self {
            intervals,
            total_duration: accumulated,
        }
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn interval(&self, index: usize) -> Option<&Interval> {
        self.intervals.get(index)
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// True when there is no slide at all.
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// True when there is something to play (non-zero total duration).
    pub fn is_playable(&self) -> bool {
        self.total_duration > 0
    }

    pub fn total_duration(&self) -> Time {
        self.total_duration
    }

    /// Clamp `t` into `[0, total_duration]`.
    pub fn clamp_time(&self, t: Time) -> Time {
        t.clamp(0, self.total_duration)
    }

    /// Start times of every slide after the first, for scrub-bar markers.
    pub fn markers(&self) -> Vec<(usize, Time)> {
        self.intervals
            .iter()
            .skip(1)
            .map(|iv| (iv.index, iv.start))
            .collect()
    }

    /// Fraction of the timeline elapsed at `t`; 0 for an empty timeline.
    pub fn progress(&self, t: Time) -> f64 {
        if self.total_duration == 0 {
            return 0.0;
        }
        time::to_seconds(self.clamp_time(t)) / time::to_seconds(self.total_duration)
    }
}

/// Free-function form of [`Timeline::build`].
pub fn build_timeline(slides: &[SlideDescriptor]) -> Timeline {
    Timeline::build(slides)
}
