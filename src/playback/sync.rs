//! Narration/music synchronization for interactive preview.
//!
//! Keeps the narration and music primitives consistent with the master
//! clock without re-seeking on every tick. Small drift is left alone; only
//! divergence beyond the policy's tolerance forces a seek.

use tracing::{debug, warn};

use crate::config::{GainSettings, SyncPolicy};
use crate::core::time::{self, Time};
use crate::core::MediaRef;
use crate::playback::clock::MasterClock;
use crate::playback::media::MediaPrimitive;
use crate::timeline::Timeline;

/// What every stream should be doing at the clock's current position.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamState {
    /// Active slide, `None` when the timeline is not playable
    pub active_index: Option<usize>,
    /// Narration source of the active slide, if it has enabled narration
    pub narration: Option<MediaRef>,
    /// Position inside the active slide
    pub narration_offset: Time,
    /// Inside the narrated part of the slide (before the post-audio delay)
    pub narration_active: bool,
    pub narration_should_play: bool,
    /// Music runs continuously from the start of the presentation
    pub music_offset: Time,
    pub music_should_play: bool,
}

/// Pure resolution of stream targets from the timeline and clock.
pub fn resolve_stream_state(timeline: &Timeline, clock: &MasterClock) -> StreamState {
    let playing = clock.is_playing();
    let elapsed = clock.elapsed();

    match timeline.locate(elapsed) {
        Some(interval) => {
            let offset = (elapsed - interval.start).max(0);
            let narration = interval.cue.narration.clone();
            let narration_active = narration.is_some() && offset < interval.cue.narration_len;
            StreamState {
                active_index: Some(interval.index),
                narration,
                narration_offset: offset,
                narration_active,
                narration_should_play: narration_active && playing,
                music_offset: elapsed,
                music_should_play: playing,
            }
        }
        None => StreamState {
            active_index: None,
            narration: None,
            narration_offset: 0,
            narration_active: false,
            narration_should_play: false,
            music_offset: elapsed,
            music_should_play: false,
        },
    }
}

/// What one synchronization pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub swapped_source: bool,
    pub resynced: bool,
    pub play_rejected: bool,
    pub load_failed: bool,
}

/// A primitive plus the bookkeeping that keeps failures quiet.
#[derive(Debug)]
struct Stream<P> {
    media: P,
    name: &'static str,
    /// Source that failed to load; not retried until the source changes
    failed: Option<MediaRef>,
    /// Play was refused last time; warn once, retry every tick
    rejected: bool,
}

impl<P: MediaPrimitive> Stream<P> {
    fn new(media: P, name: &'static str) -> Self {
        Self {
            media,
            name,
            failed: None,
            rejected: false,
        }
    }

    /// Make `source` the loaded source. Returns `Ok(true)` on a swap and
    /// `Err(())` when the source cannot be loaded.
    fn ensure_source(&mut self, source: &MediaRef, volume: f32) -> Result<bool, ()> {
        if self.media.source() == Some(source) {
            return Ok(false);
        }
        if self.failed.as_ref() == Some(source) {
            return Err(());
        }
        match self.media.load(source) {
            Ok(()) => {
                debug!(stream = self.name, %source, "Loaded source");
                self.failed = None;
                self.rejected = false;
                self.media.set_volume(volume);
                Ok(true)
            }
            Err(e) => {
                warn!(stream = self.name, %source, error = %e, "Source unavailable; segment will be silent");
                self.failed = Some(source.clone());
                Err(())
            }
        }
    }

    /// Request playback. Returns true if the primitive refused.
    fn ensure_playing(&mut self) -> bool {
        if !self.media.is_paused() {
            return false;
        }
        match self.media.play() {
            Ok(()) => {
                self.rejected = false;
                false
            }
            Err(e) => {
                if !self.rejected {
                    warn!(stream = self.name, error = %e, "Play rejected; retrying on next tick");
                } else {
                    debug!(stream = self.name, error = %e, "Play still rejected");
                }
                self.rejected = true;
                true
            }
        }
    }

    fn ensure_paused(&mut self) {
        if !self.media.is_paused() {
            self.media.pause();
        }
    }
}

/// Sole writer of the narration and music primitives.
#[derive(Debug)]
pub struct StreamSynchronizer<N, M> {
    narration: Stream<N>,
    music: Stream<M>,
    music_source: Option<MediaRef>,
    policy: SyncPolicy,
    gains: GainSettings,
}

impl<N: MediaPrimitive, M: MediaPrimitive> StreamSynchronizer<N, M> {
    pub fn new(narration: N, music: M, policy: SyncPolicy, gains: GainSettings) -> Self {
        let mut sync = Self {
            narration: Stream::new(narration, "narration"),
            music: Stream::new(music, "music"),
            music_source: None,
            policy,
            gains,
        };
        sync.apply_volumes();
        sync
    }

    pub fn narration(&self) -> &N {
        &self.narration.media
    }

    pub fn music(&self) -> &M {
        &self.music.media
    }

    pub fn policy(&self) -> SyncPolicy {
        self.policy
    }

    pub fn gains(&self) -> GainSettings {
        self.gains
    }

    /// Configure (or clear) the background music source.
    pub fn set_music(&mut self, source: Option<MediaRef>) {
        if source.is_none() {
            self.music.ensure_paused();
            self.music.media.unload();
        }
        self.music.failed = None;
        self.music_source = source;
    }

    pub fn set_policy(&mut self, policy: SyncPolicy) {
        self.policy = policy;
    }

    /// Change gain stages; volumes are re-applied immediately.
    pub fn set_gains(&mut self, gains: GainSettings) {
        self.gains = gains;
        self.apply_volumes();
    }

    fn apply_volumes(&mut self) {
        self.narration.media.set_volume(self.gains.narration_volume());
        self.music.media.set_volume(self.gains.music_volume());
    }

    /// One synchronization pass, run after every clock tick, seek or
    /// play/pause change.
    pub fn sync(&mut self, timeline: &Timeline, clock: &MasterClock) -> SyncReport {
        let state = resolve_stream_state(timeline, clock);
        let mut report = SyncReport::default();

        self.sync_narration(&state, &mut report);
        self.sync_music(&state, &mut report);

        report
    }

    fn sync_narration(&mut self, state: &StreamState, report: &mut SyncReport) {
        let Some(source) = &state.narration else {
            self.narration.ensure_paused();
            if self.narration.media.source().is_some() {
                self.narration.media.unload();
            }
            return;
        };

        match self.narration.ensure_source(source, self.gains.narration_volume()) {
            Ok(swapped) => report.swapped_source |= swapped,
            Err(()) => {
                report.load_failed = true;
                self.narration.ensure_paused();
                return;
            }
        }

        if !state.narration_active {
            // Post-audio delay: hold silent, leave the offset where it is
            self.narration.ensure_paused();
            return;
        }

        let drift = (self.narration.media.offset() - state.narration_offset).abs();
        if drift > time::from_seconds(self.policy.drift_tolerance) {
            debug!(
                drift_ms = time::to_millis(drift),
                target_ms = time::to_millis(state.narration_offset),
                "Narration drift beyond tolerance; seeking"
            );
            self.narration.media.set_offset(state.narration_offset);
            report.resynced = true;
        }

        if state.narration_should_play {
            report.play_rejected |= self.narration.ensure_playing();
        } else {
            self.narration.ensure_paused();
        }
    }

    fn sync_music(&mut self, state: &StreamState, report: &mut SyncReport) {
        // Per-slide ducking is baked only into exports; preview music runs
        // through every slide.
        let Some(source) = self.music_source.clone() else {
            self.music.ensure_paused();
            return;
        };

        match self.music.ensure_source(&source, self.gains.music_volume()) {
            Ok(true) => {
                self.music.media.set_looping(true);
                report.swapped_source = true;
            }
            Ok(false) => {}
            Err(()) => {
                report.load_failed = true;
                return;
            }
        }

        if state.music_should_play {
            report.play_rejected |= self.music.ensure_playing();
        } else {
            self.music.ensure_paused();
        }
    }

    /// Pause and unload both streams.
    pub fn dispose(&mut self) {
        self.narration.ensure_paused();
        self.narration.media.unload();
        self.music.ensure_paused();
        self.music.media.unload();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::fake::FakeMedia;
    use crate::timeline::SlideDescriptor;

    fn secs(s: f64) -> Time {
        time::from_seconds(s)
    }

    fn timeline() -> Timeline {
        Timeline::build(&[
            SlideDescriptor::image("1.png")
                .with_narration("1.wav", 2.0)
                .with_post_audio_delay(1.0),
            SlideDescriptor::image("2.png").without_narration(),
            SlideDescriptor::image("3.png")
                .with_narration("3.wav", 2.0)
                .with_music_paused(true),
        ])
    }

    fn synchronizer() -> StreamSynchronizer<FakeMedia, FakeMedia> {
        StreamSynchronizer::new(
            FakeMedia::default(),
            FakeMedia::default(),
            SyncPolicy::default(),
            GainSettings::default(),
        )
    }

    fn playing_clock(timeline: &Timeline, at: Time) -> MasterClock {
        let mut clock = MasterClock::new(timeline.total_duration());
        clock.play();
        clock.seek(at);
        clock
    }

    #[test]
    fn test_resolve_stream_state() {
        let timeline = timeline();
        let clock = playing_clock(&timeline, secs(1.0));
        let state = resolve_stream_state(&timeline, &clock);
        assert_eq!(state.active_index, Some(0));
        assert_eq!(state.narration, Some(MediaRef::new("1.wav")));
        assert_eq!(state.narration_offset, secs(1.0));
        assert!(state.narration_should_play);
        assert!(state.music_should_play);
        assert_eq!(state.music_offset, secs(1.0));

        // Post-delay period
        let clock = playing_clock(&timeline, secs(2.5));
        let state = resolve_stream_state(&timeline, &clock);
        assert_eq!(state.active_index, Some(0));
        assert!(!state.narration_active);
        assert!(!state.narration_should_play);

        // Slide without narration
        let clock = playing_clock(&timeline, secs(3.2));
        let state = resolve_stream_state(&timeline, &clock);
        assert_eq!(state.active_index, Some(1));
        assert_eq!(state.narration, None);
    }

    #[test]
    fn test_resolve_paused_clock() {
        let timeline = timeline();
        let mut clock = MasterClock::new(timeline.total_duration());
        clock.seek(secs(1.0));
        let state = resolve_stream_state(&timeline, &clock);
        assert!(state.narration_active);
        assert!(!state.narration_should_play);
        assert!(!state.music_should_play);
    }

    #[test]
    fn test_resolve_empty_timeline() {
        let timeline = Timeline::build(&[]);
        let clock = MasterClock::new(0);
        let state = resolve_stream_state(&timeline, &clock);
        assert_eq!(state.active_index, None);
        assert!(!state.narration_should_play);
        assert!(!state.music_should_play);
    }

    #[test]
    fn test_loads_and_plays_narration() {
        let timeline = timeline();
        let mut sync = synchronizer();
        let clock = playing_clock(&timeline, secs(0.5));

        let report = sync.sync(&timeline, &clock);
        assert!(report.swapped_source);
        assert_eq!(sync.narration().source(), Some(&MediaRef::new("1.wav")));
        assert!(!sync.narration().is_paused());
        assert_eq!(sync.narration().offset(), secs(0.5));
        assert_eq!(sync.narration().loads, 1);

        // Same slide: no reload
        let report = sync.sync(&timeline, &clock);
        assert!(!report.swapped_source);
        assert_eq!(sync.narration().loads, 1);
    }

    #[test]
    fn test_drift_within_tolerance_is_left_alone() {
        let timeline = timeline();
        let mut sync = synchronizer();
        let mut clock = playing_clock(&timeline, secs(0.5));
        sync.sync(&timeline, &clock);
        let seeks = sync.narration().seeks;

        // Media lags the clock by 0.25s: below the 0.3s tolerance
        clock.tick(secs(0.25));
        let report = sync.sync(&timeline, &clock);
        assert!(!report.resynced);
        assert_eq!(sync.narration().seeks, seeks);
        assert_eq!(sync.narration().offset(), secs(0.5));

        // Now 0.35s behind: corrected
        clock.tick(secs(0.1));
        let report = sync.sync(&timeline, &clock);
        assert!(report.resynced);
        assert_eq!(sync.narration().offset(), secs(0.85));
    }

    #[test]
    fn test_drift_tolerance_is_a_policy() {
        let timeline = timeline();
        let mut sync = StreamSynchronizer::new(
            FakeMedia::default(),
            FakeMedia::default(),
            SyncPolicy {
                drift_tolerance: 0.1,
            },
            GainSettings::default(),
        );
        let mut clock = playing_clock(&timeline, secs(0.5));
        sync.sync(&timeline, &clock);
        clock.tick(secs(0.25));
        assert!(sync.sync(&timeline, &clock).resynced);
    }

    #[test]
    fn test_post_delay_pauses_without_touching_offset() {
        let timeline = timeline();
        let mut sync = synchronizer();
        let mut clock = playing_clock(&timeline, secs(1.9));
        sync.sync(&timeline, &clock);
        assert!(!sync.narration().is_paused());

        clock.tick(secs(0.5));
        sync.sync(&timeline, &clock);
        assert!(sync.narration().is_paused());
        assert_eq!(sync.narration().offset(), secs(1.9));
        assert_eq!(sync.narration().source(), Some(&MediaRef::new("1.wav")));
    }

    #[test]
    fn test_slide_without_narration_unloads() {
        let timeline = timeline();
        let mut sync = synchronizer();
        let mut clock = playing_clock(&timeline, secs(0.5));
        sync.sync(&timeline, &clock);

        clock.seek(secs(3.1));
        sync.sync(&timeline, &clock);
        assert!(sync.narration().is_paused());
        assert_eq!(sync.narration().source(), None);
    }

    #[test]
    fn test_swaps_source_on_slide_change() {
        let timeline = timeline();
        let mut sync = synchronizer();
        let mut clock = playing_clock(&timeline, secs(0.5));
        sync.sync(&timeline, &clock);

        clock.seek(secs(3.5) + secs(0.5));
        let report = sync.sync(&timeline, &clock);
        assert!(report.swapped_source);
        assert_eq!(sync.narration().source(), Some(&MediaRef::new("3.wav")));
        assert_eq!(sync.narration().offset(), secs(0.5));
    }

    #[test]
    fn test_paused_clock_pauses_streams() {
        let timeline = timeline();
        let mut sync = synchronizer();
        sync.set_music(Some(MediaRef::new("music.mp3")));
        let mut clock = playing_clock(&timeline, secs(0.5));
        sync.sync(&timeline, &clock);
        assert!(!sync.music().is_paused());

        clock.pause();
        sync.sync(&timeline, &clock);
        assert!(sync.narration().is_paused());
        assert!(sync.music().is_paused());
    }

    #[test]
    fn test_music_loops_and_ignores_slide_ducking() {
        let timeline = timeline();
        let mut sync = synchronizer();
        sync.set_music(Some(MediaRef::new("music.mp3")));

        // Slide 2 has music_paused; the preview keeps playing music anyway
        let clock = playing_clock(&timeline, secs(4.0));
        sync.sync(&timeline, &clock);
        assert!(sync.music().looping);
        assert!(!sync.music().is_paused());
        assert!((sync.music().volume() - 0.03).abs() < 1e-6);
        // Music offset is never forced
        assert_eq!(sync.music().seeks, 0);
    }

    #[test]
    fn test_play_rejection_is_swallowed_and_retried() {
        let timeline = timeline();
        let mut sync = StreamSynchronizer::new(
            FakeMedia {
                reject_play: true,
                ..FakeMedia::default()
            },
            FakeMedia::default(),
            SyncPolicy::default(),
            GainSettings::default(),
        );
        let clock = playing_clock(&timeline, secs(0.5));

        let report = sync.sync(&timeline, &clock);
        assert!(report.play_rejected);
        assert!(sync.narration().is_paused());

        sync.narration.media.reject_play = false;
        let report = sync.sync(&timeline, &clock);
        assert!(!report.play_rejected);
        assert!(!sync.narration().is_paused());
        assert_eq!(sync.narration().play_attempts, 2);
    }

    #[test]
    fn test_load_failure_is_silent_and_not_retried() {
        let timeline = timeline();
        let mut sync = StreamSynchronizer::new(
            FakeMedia {
                unavailable: vec![MediaRef::new("1.wav")],
                ..FakeMedia::default()
            },
            FakeMedia::default(),
            SyncPolicy::default(),
            GainSettings::default(),
        );
        let clock = playing_clock(&timeline, secs(0.5));

        assert!(sync.sync(&timeline, &clock).load_failed);
        assert!(sync.sync(&timeline, &clock).load_failed);
        assert_eq!(sync.narration().load_attempts, 1);
        assert!(sync.narration().is_paused());
    }

    #[test]
    fn test_gain_changes_reapply_volume() {
        let timeline = timeline();
        let mut sync = synchronizer();
        sync.set_music(Some(MediaRef::new("music.mp3")));
        let clock = playing_clock(&timeline, secs(0.5));
        sync.sync(&timeline, &clock);

        sync.set_gains(GainSettings {
            master: 0.5,
            narration: 0.8,
            music: 0.2,
            muted: false,
        });
        assert!((sync.narration().volume() - 0.4).abs() < 1e-6);
        assert!((sync.music().volume() - 0.1).abs() < 1e-6);

        sync.set_gains(GainSettings {
            muted: true,
            ..sync.gains()
        });
        assert_eq!(sync.narration().volume(), 0.0);
        assert_eq!(sync.music().volume(), 0.0);
    }

    #[test]
    fn test_dispose_unloads_everything() {
        let timeline = timeline();
        let mut sync = synchronizer();
        sync.set_music(Some(MediaRef::new("music.mp3")));
        let clock = playing_clock(&timeline, secs(0.5));
        sync.sync(&timeline, &clock);

        sync.dispose();
        assert!(sync.narration().is_paused());
        assert!(sync.music().is_paused());
        assert_eq!(sync.narration().source(), None);
        assert_eq!(sync.music().source(), None);
    }
}
