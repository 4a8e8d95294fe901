//! Master clock: the single source of truth for the preview position.
//!
//! Interactive playback advances it with wall-clock deltas once per
//! animation frame. The batch renderer never touches it; it evaluates the
//! timeline at `frame / fps` instead.

use std::time::Instant;

use crate::core::time::{self, Time};
use crate::playback::state::PlaybackState;

/// What a tick did to the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// Not playing; nothing changed
    Idle,
    /// Elapsed time moved forward
    Advanced,
    /// End of timeline reached: rewound to 0 and stopped
    Finished,
}

/// Elapsed time plus play/pause state.
#[derive(Debug, Clone)]
pub struct MasterClock {
    elapsed: Time,
    total: Time,
    state: PlaybackState,
    /// Wall-clock timestamp of the previous tick. `play_at` sets it to the
    /// moment of play; `play` clears it so the first wall tick captures it.
    wall_reference: Option<Instant>,
}

impl MasterClock {
    pub fn new(total: Time) -> Self {
        Self {
            elapsed: 0,
            total: total.max(0),
            state: PlaybackState::Stopped,
            wall_reference: None,
        }
    }

    pub fn elapsed(&self) -> Time {
        self.elapsed
    }

    pub fn total(&self) -> Time {
        self.total
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    /// Start or resume. Only valid from `Stopped` or `Paused`; returns
    /// whether the transition happened.
    pub fn play(&mut self) -> bool {
        if self.state.is_playing() || self.total == 0 {
            return false;
        }
        self.state = PlaybackState::Playing;
        self.wall_reference = None;
        true
    }

    /// Start or resume at wall-clock instant `now`, so the first wall tick
    /// advances by the time since play.
    pub fn play_at(&mut self, now: Instant) -> bool {
        if !self.play() {
            return false;
        }
        self.wall_reference = Some(now);
        true
    }

    /// Freeze elapsed time. Only valid from `Playing`.
    pub fn pause(&mut self) -> bool {
        if !self.state.is_playing() {
            return false;
        }
        self.state = PlaybackState::Paused;
        self.wall_reference = None;
        true
    }

    /// Move the playhead, clamped to `[0, total]`. Valid in any state and
    /// never changes whether the clock is playing.
    pub fn seek(&mut self, t: Time) {
        self.elapsed = t.clamp(0, self.total);
    }

    /// Advance by `delta` while playing.
    ///
    /// Reaching the end rewinds to 0 and stops, returning
    /// [`ClockEvent::Finished`]; the stopped clock ignores further ticks so
    /// the event fires once per play-through.
    pub fn tick(&mut self, delta: Time) -> ClockEvent {
        if !self.state.is_playing() {
            return ClockEvent::Idle;
        }
        self.elapsed = self.elapsed.saturating_add(delta.max(0));
        if self.elapsed >= self.total {
            self.elapsed = 0;
            self.state = PlaybackState::Stopped;
            self.wall_reference = None;
            return ClockEvent::Finished;
        }
        ClockEvent::Advanced
    }

    /// Advance from a wall-clock timestamp. Without a reference (after
    /// `play` or `rebase_wall`) the call only captures one.
    pub fn tick_wall(&mut self, now: Instant) -> ClockEvent {
        if !self.state.is_playing() {
            return ClockEvent::Idle;
        }
        let delta = match self.wall_reference.replace(now) {
            Some(previous) => {
                time::from_seconds(now.saturating_duration_since(previous).as_secs_f64())
            }
            None => 0,
        };
        self.tick(delta)
    }

    /// Forget the wall reference, e.g. after ticking was suspended for a
    /// scrub gesture, so the next wall tick does not count the gap.
    pub fn rebase_wall(&mut self) {
        self.wall_reference = None;
    }

    /// Adopt a rebuilt timeline's duration, re-clamping elapsed.
    pub fn set_total(&mut self, total: Time) {
        self.total = total.max(0);
        self.elapsed = self.elapsed.clamp(0, self.total);
        if self.total == 0 && self.state.is_playing() {
            self.state = PlaybackState::Stopped;
            self.wall_reference = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn secs(s: f64) -> Time {
        time::from_seconds(s)
    }

    #[test]
    fn test_initial_state() {
        let clock = MasterClock::new(secs(10.0));
        assert_eq!(clock.elapsed(), 0);
        assert!(clock.state().is_stopped());
    }

    #[test]
    fn test_play_pause_transitions() {
        let mut clock = MasterClock::new(secs(10.0));
        assert!(!clock.pause(), "pause is only valid while playing");
        assert!(clock.play());
        assert!(!clock.play(), "play is not valid while playing");
        assert!(clock.pause());
        assert!(clock.state().is_paused());
        assert!(clock.play());
        assert!(clock.is_playing());
    }

    #[test]
    fn test_play_on_empty_timeline_is_refused() {
        let mut clock = MasterClock::new(0);
        assert!(!clock.play());
        assert!(clock.state().is_stopped());
    }

    #[test]
    fn test_tick_only_while_playing() {
        let mut clock = MasterClock::new(secs(10.0));
        assert_eq!(clock.tick(secs(1.0)), ClockEvent::Idle);
        assert_eq!(clock.elapsed(), 0);

        clock.play();
        assert_eq!(clock.tick(secs(1.0)), ClockEvent::Advanced);
        clock.pause();
        assert_eq!(clock.tick(secs(1.0)), ClockEvent::Idle);
        assert_eq!(clock.elapsed(), secs(1.0));
    }

    #[test]
    fn test_finish_rewinds_once() {
        let mut clock = MasterClock::new(secs(2.0));
        clock.play();
        assert_eq!(clock.tick(secs(1.5)), ClockEvent::Advanced);
        assert_eq!(clock.tick(secs(1.0)), ClockEvent::Finished);
        assert_eq!(clock.elapsed(), 0);
        assert!(!clock.is_playing());
        assert!(clock.state().is_stopped());
        // No double-fire
        assert_eq!(clock.tick(secs(1.0)), ClockEvent::Idle);
    }

    #[test]
    fn test_finish_exactly_at_total() {
        let mut clock = MasterClock::new(secs(2.0));
        clock.play();
        assert_eq!(clock.tick(secs(2.0)), ClockEvent::Finished);
        assert_eq!(clock.elapsed(), 0);
    }

    #[test]
    fn test_seek_keeps_state_and_clamps() {
        let mut clock = MasterClock::new(secs(10.0));
        clock.seek(secs(4.0));
        assert!(clock.state().is_stopped());
        assert_eq!(clock.elapsed(), secs(4.0));

        clock.play();
        clock.seek(secs(110.0));
        assert!(clock.is_playing());
        assert_eq!(clock.elapsed(), secs(10.0));

        clock.seek(-secs(1.0));
        assert_eq!(clock.elapsed(), 0);
    }

    #[test]
    fn test_negative_delta_ignored() {
        let mut clock = MasterClock::new(secs(10.0));
        clock.play();
        clock.seek(secs(3.0));
        clock.tick(-secs(2.0));
        assert_eq!(clock.elapsed(), secs(3.0));
    }

    #[test]
    fn test_tick_wall_first_call_captures_reference() {
        let mut clock = MasterClock::new(secs(10.0));
        let t0 = Instant::now();
        clock.play();
        assert_eq!(clock.tick_wall(t0), ClockEvent::Advanced);
        assert_eq!(clock.elapsed(), 0);

        clock.tick_wall(t0 + Duration::from_millis(500));
        assert_eq!(clock.elapsed(), secs(0.5));
    }

    #[test]
    fn test_play_at_counts_first_frame() {
        let mut clock = MasterClock::new(secs(10.0));
        let t0 = Instant::now();
        assert!(clock.play_at(t0));
        clock.tick_wall(t0 + Duration::from_millis(16));
        assert_eq!(clock.elapsed(), time::from_millis(16));

        clock.pause();
        // Resume after a gap: only the time since resuming counts
        let t1 = t0 + Duration::from_secs(5);
        assert!(clock.play_at(t1));
        clock.tick_wall(t1 + Duration::from_millis(16));
        assert_eq!(clock.elapsed(), time::from_millis(32));

        assert!(!clock.play_at(t1), "play is not valid while playing");
        assert!(!MasterClock::new(0).play_at(t0));
    }

    #[test]
    fn test_tick_wall_skips_paused_gap() {
        let mut clock = MasterClock::new(secs(10.0));
        let t0 = Instant::now();
        clock.play();
        clock.tick_wall(t0);
        clock.tick_wall(t0 + Duration::from_secs(1));
        clock.pause();
        clock.play();
        // Resuming 5 seconds later must not jump
        clock.tick_wall(t0 + Duration::from_secs(6));
        assert_eq!(clock.elapsed(), secs(1.0));
        clock.tick_wall(t0 + Duration::from_millis(6250));
        assert_eq!(clock.elapsed(), secs(1.25));
    }

    #[test]
    fn test_set_total_reclamps() {
        let mut clock = MasterClock::new(secs(10.0));
        clock.seek(secs(8.0));
        clock.set_total(secs(5.0));
        assert_eq!(clock.elapsed(), secs(5.0));

        clock.play();
        clock.set_total(0);
        assert!(clock.state().is_stopped());
        assert_eq!(clock.elapsed(), 0);
    }
}
