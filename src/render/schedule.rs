//! Volume automation for the batch renderer.
//!
//! Each slide becomes a contiguous run of output frames. Background music
//! is silenced inside runs whose slide asks for it, and plays at the base
//! gain everywhere else.

use crate::core::time;
use crate::timeline::Timeline;

/// The frames one slide occupies in the rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSegment {
    pub index: usize,
    pub start_frame: u64,
    /// Exclusive
    pub end_frame: u64,
    pub music_paused: bool,
}

impl FrameSegment {
    pub fn frames(&self) -> u64 {
        self.end_frame - self.start_frame
    }

    pub fn contains(&self, frame: u64) -> bool {
        frame >= self.start_frame && frame < self.end_frame
    }
}

/// Precomputed per-slide frame ranges plus the music base gain.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeSchedule {
    segments: Vec<FrameSegment>,
    base_gain: f32,
    fps: f64,
}

impl VolumeSchedule {
    /// Lay the timeline out in frames. Every slide gets at least one frame.
    pub fn new(timeline: &Timeline, fps: f64, base_gain: f32) -> Self {
        let mut segments = Vec::with_capacity(timeline.len());
        let mut next: u64 = 0;
        for interval in timeline.intervals() {
            let frames = time::frames_for(interval.duration, fps).max(1);
            segments.push(FrameSegment {
                index: interval.index,
                start_frame: next,
                end_frame: next + frames,
                music_paused: interval.cue.music_paused,
            });
            next += frames;
        }
        Self {
            segments,
            base_gain,
            fps,
        }
    }

    pub fn segments(&self) -> &[FrameSegment] {
        &self.segments
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn base_gain(&self) -> f32 {
        self.base_gain
    }

    pub fn total_frames(&self) -> u64 {
        self.segments.last().map_or(0, |s| s.end_frame)
    }

    /// Segment covering `frame`; frames past the end belong to the last one.
    pub fn segment_at(&self, frame: u64) -> Option<&FrameSegment> {
        let last = self.segments.last()?;
        if frame >= last.end_frame {
            return Some(last);
        }
        let pos = self.segments.partition_point(|s| s.end_frame <= frame);
        self.segments.get(pos)
    }

    /// Music gain at `frame`: 0 inside a ducked segment, the base gain
    /// otherwise, and 0 when there is nothing to play at all.
    pub fn gain(&self, frame: u64) -> f32 {
        match self.segment_at(frame) {
            Some(segment) if segment.music_paused => 0.0,
            Some(_) => self.base_gain,
            None => 0.0,
        }
    }
}

/// One-shot form of [`VolumeSchedule::gain`].
pub fn gain(timeline: &Timeline, frame: u64, fps: f64, base_gain: f32) -> f32 {
    VolumeSchedule::new(timeline, fps, base_gain).gain(frame)
}
