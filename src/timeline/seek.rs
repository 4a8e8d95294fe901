//! Seek/scrub resolution shared by the preview and the batch renderer.

use crate::core::time::{self, Time};
use crate::timeline::timeline::{Interval, Timeline};

/// Smallest step back from the end of the timeline when locating.
///
/// Time is integer nanoseconds, so one tick is enough to land strictly
/// inside the last interval.
pub const BOUNDARY_EPSILON: Time = 1;

/// How close to the end a skip-forward may land, so skipping never finishes
/// the presentation.
pub const SKIP_END_GUARD: Time = 100 * time::constants::NANOS_PER_MILLI;

/// Every way user input can ask for a new playhead position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekTarget {
    /// Absolute timeline position
    Absolute(Time),
    /// Fraction of the total duration, from a scrub bar
    Ratio(f64),
    /// Skip forward from the current position
    Forward(Time),
    /// Skip back from the current position
    Back(Time),
    /// Jump to the start of a slide
    Marker(usize),
}

impl Timeline {
    /// Find the interval playing at `t`.
    ///
    /// `t` is clamped to `[0, total - ε]`; intervals are half-open so a time
    /// equal to a boundary belongs to the later slide. Returns `None` only
    /// when there is nothing to play.
    pub fn locate(&self, t: Time) -> Option<&Interval> {
        if !self.is_playable() {
            return None;
        }
        let t = t.clamp(0, self.total_duration() - BOUNDARY_EPSILON);
        let intervals = self.intervals();
        let idx = intervals.partition_point(|iv| iv.end <= t);
        intervals.get(idx)
    }

    /// Resolve a seek request against the current position.
    /// The result is always inside `[0, total]`.
    pub fn resolve_seek(&self, target: SeekTarget, elapsed: Time) -> Time {
        let total = self.total_duration();
        let resolved = match target {
            SeekTarget::Absolute(t) => t,
            SeekTarget::Ratio(ratio) => {
                let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
                time::from_seconds(ratio * time::to_seconds(total))
            }
            SeekTarget::Forward(step) => {
                let limit = (total - SKIP_END_GUARD).max(0);
                elapsed.saturating_add(step.max(0)).min(limit)
            }
            SeekTarget::Back(step) => elapsed.saturating_sub(step.max(0)),
            SeekTarget::Marker(index) => {
                let last = self.len().saturating_sub(1);
                self.interval(index.min(last)).map_or(0, |iv| iv.start)
            }
        };
        self.clamp_time(resolved)
    }
}

/// Free-function form of [`Timeline::locate`].
pub fn locate(timeline: &Timeline, t: Time) -> Option<&Interval> {
    timeline.locate(t)
}
