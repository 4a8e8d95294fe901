//! Per-frame render plan.
//!
//! A plan says everything about output frame `f` without looking at any
//! other frame: which slide is on screen, how far into its entry animation
//! it is, and which audio samples go with it. Workers can therefore build
//! frames in any order.

use std::ops::Range;

use crate::config::{ExportSettings, GainSettings};
use crate::core::time::{self, Time};
use crate::core::MediaRef;
use crate::render::schedule::VolumeSchedule;
use crate::render::transition::{self, TransitionState};
use crate::timeline::{SlideCue, Timeline};

/// Everything needed to produce one output frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    pub frame_index: u64,
    pub slide_index: usize,
    pub frame_in_slide: u64,
    /// Time since the slide's first frame
    pub since_slide_start: Time,
    pub transition: TransitionState,
    pub narration: Option<MediaRef>,
    pub narration_gain: f32,
    /// Output sample frames of this frame, counted from the slide start
    pub narration_samples: Range<u64>,
    pub music: Option<MediaRef>,
    pub music_gain: f32,
    /// Output sample frames of this frame, counted from the video start
    pub music_samples: Range<u64>,
}

impl FramePlan {
    /// Interleaved sample count of this frame's audio block.
    pub fn sample_len(&self, channels: u32) -> usize {
        (self.music_samples.end - self.music_samples.start) as usize * channels as usize
    }
}

/// Immutable inputs shared by every frame of one render.
#[derive(Debug, Clone)]
pub struct RenderPlan {
    timeline: Timeline,
    schedule: VolumeSchedule,
    settings: ExportSettings,
    music: Option<MediaRef>,
    narration_gain: f32,
}

impl RenderPlan {
    pub fn new(
        timeline: Timeline,
        music: Option<MediaRef>,
        gains: GainSettings,
        settings: ExportSettings,
    ) -> Self {
        let schedule = VolumeSchedule::new(&timeline, settings.fps, gains.music_volume());
        Self {
            timeline,
            schedule,
            settings,
            music,
            narration_gain: gains.narration_volume(),
        }
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn schedule(&self) -> &VolumeSchedule {
        &self.schedule
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn total_frames(&self) -> u64 {
        self.schedule.total_frames()
    }

    pub fn cue(&self, slide_index: usize) -> Option<&SlideCue> {
        self.timeline.interval(slide_index).map(|iv| &iv.cue)
    }

    /// First output sample frame belonging to video frame `frame`.
    ///
    /// Cumulative rounding keeps the audio track exactly as long as the
    /// video even when the rate is not a multiple of the fps.
    pub fn sample_at_frame(&self, frame: u64) -> u64 {
        (frame as f64 * self.settings.sample_rate as f64 / self.settings.fps).round() as u64
    }

    /// Plan for `frame`, or `None` past the last frame.
    pub fn frame(&self, frame: u64) -> Option<FramePlan> {
        if frame >= self.total_frames() {
            return None;
        }
        let segment = *self.schedule.segment_at(frame)?;
        let cue = self.cue(segment.index)?;

        let frame_in_slide = frame - segment.start_frame;
        let since_slide_start = time::from_frame_index(frame_in_slide, self.settings.fps);
        let music_samples = self.sample_at_frame(frame)..self.sample_at_frame(frame + 1);
        let slide_first_sample = self.sample_at_frame(segment.start_frame);
        let narration_samples =
            music_samples.start - slide_first_sample..music_samples.end - slide_first_sample;

        Some(FramePlan {
            frame_index: frame,
            slide_index: segment.index,
            frame_in_slide,
            since_slide_start,
            transition: transition::evaluate(cue.transition, since_slide_start, self.settings.width),
            narration: cue.narration.clone(),
            narration_gain: self.narration_gain,
            narration_samples,
            music: self.music.clone(),
            music_gain: self.schedule.gain(frame),
            music_samples,
        })
    }

    /// Source offset matching the first sample of `range`.
    pub fn offset_of(&self, range: &Range<u64>) -> Time {
        time::from_seconds(range.start as f64 / self.settings.sample_rate.max(1) as f64)
    }
}
