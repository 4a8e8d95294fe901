//! Interactive playback engine: one owned instance per preview.
//!
//! Holds the timeline, the master clock and the stream synchronizer. The
//! host calls [`PlaybackEngine::on_animation_frame`] once per display frame
//! and reschedules only while the outcome says `keep_running`. Commands can
//! be sent from other threads through a crossbeam channel; they are drained
//! at the top of each frame so they never race a tick.

use std::time::Instant;

use crossbeam::channel;
use tracing::{debug, info};

use crate::config::{EngineConfig, GainSettings};
use crate::core::time::{self, Time};
use crate::core::MediaRef;
use crate::playback::clock::{ClockEvent, MasterClock};
use crate::playback::media::MediaPrimitive;
use crate::playback::state::PlaybackState;
use crate::playback::sync::{StreamSynchronizer, SyncReport};
use crate::timeline::{SeekTarget, SlideDescriptor, Timeline};

/// Command sent to playback engine
#[derive(Debug, Clone)]
pub enum PlaybackCommand {
    Play,
    Pause,
    Toggle,
    Seek(SeekTarget),
    SkipForward,
    SkipBack,
    /// A scrub gesture started: ticking is suspended until `EndScrub`
    BeginScrub,
    EndScrub,
    SetGains(GainSettings),
    SetMusic(Option<MediaRef>),
    UpdateSlides(Vec<SlideDescriptor>),
}

/// Result of one animation-frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOutcome {
    pub elapsed: Time,
    pub active_index: Option<usize>,
    /// The clock reached the end during this frame
    pub finished: bool,
    /// Whether the host should schedule another frame
    pub keep_running: bool,
    pub report: SyncReport,
}

/// Main playback engine
pub struct PlaybackEngine<N: MediaPrimitive, M: MediaPrimitive> {
    slides: Vec<SlideDescriptor>,
    timeline: Timeline,
    clock: MasterClock,
    sync: StreamSynchronizer<N, M>,
    config: EngineConfig,
    scrubbing: bool,
    active_index: Option<usize>,
    command_tx: channel::Sender<PlaybackCommand>,
    command_rx: channel::Receiver<PlaybackCommand>,
    disposed: bool,
}

impl<N: MediaPrimitive, M: MediaPrimitive> PlaybackEngine<N, M> {
    /// Create a new playback engine
    pub fn new(
        slides: Vec<SlideDescriptor>,
        music: Option<MediaRef>,
        config: EngineConfig,
        narration_media: N,
        music_media: M,
    ) -> Self {
        let timeline = Timeline::build_with_fallback(&slides, config.default_narration_seconds);
        let clock = MasterClock::new(timeline.total_duration());
        let mut sync = StreamSynchronizer::new(narration_media, music_media, config.sync, config.gains);
        sync.set_music(music);
        let (command_tx, command_rx) = channel::unbounded();

        let mut engine = Self {
            slides,
            timeline,
            clock,
            sync,
            config,
            scrubbing: false,
            active_index: None,
            command_tx,
            command_rx,
            disposed: false,
        };
        engine.resync();
        engine
    }

    /// Sender for commands issued outside the frame loop
    pub fn command_sender(&self) -> channel::Sender<PlaybackCommand> {
        self.command_tx.clone()
    }

    /// Process a playback command
    pub fn process_command(&mut self, command: PlaybackCommand) {
        if self.disposed {
            return;
        }
        match command {
            PlaybackCommand::Play => {
                self.clock.play();
            }
            PlaybackCommand::Pause => {
                self.clock.pause();
            }
            PlaybackCommand::Toggle => {
                if !self.clock.pause() {
                    self.clock.play();
                }
            }
            PlaybackCommand::Seek(target) => self.seek(target),
            PlaybackCommand::SkipForward => {
                self.seek(SeekTarget::Forward(time::from_seconds(self.config.skip_seconds)))
            }
            PlaybackCommand::SkipBack => {
                self.seek(SeekTarget::Back(time::from_seconds(self.config.skip_seconds)))
            }
            PlaybackCommand::BeginScrub => {
                self.scrubbing = true;
            }
            PlaybackCommand::EndScrub => {
                self.scrubbing = false;
                self.clock.rebase_wall();
            }
            PlaybackCommand::SetGains(gains) => {
                self.config.gains = gains;
                self.sync.set_gains(gains);
            }
            PlaybackCommand::SetMusic(music) => self.sync.set_music(music),
            PlaybackCommand::UpdateSlides(slides) => self.update_slides(slides),
        }
        self.resync();
    }

    /// Start playback at wall-clock instant `now`; the next
    /// [`on_animation_frame`](Self::on_animation_frame) advances by the time
    /// elapsed since then.
    pub fn play_at(&mut self, now: Instant) {
        if self.disposed {
            return;
        }
        self.clock.play_at(now);
        self.resync();
    }

    fn seek(&mut self, target: SeekTarget) {
        let t = self.timeline.resolve_seek(target, self.clock.elapsed());
        debug!(target = ?target, to = %time::format_time(t), "Seek");
        self.clock.seek(t);
    }

    fn update_slides(&mut self, slides: Vec<SlideDescriptor>) {
        self.timeline =
            Timeline::build_with_fallback(&slides, self.config.default_narration_seconds);
        self.slides = slides;
        self.clock.set_total(self.timeline.total_duration());
        info!(
            slides = self.timeline.len(),
            total = %time::format_time(self.timeline.total_duration()),
            "Timeline rebuilt"
        );
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.command_rx.try_recv() {
            self.process_command(command);
        }
    }

    /// Animation-frame callback driven by wall-clock time.
    pub fn on_animation_frame(&mut self, now: Instant) -> FrameOutcome {
        self.frame(|clock| clock.tick_wall(now))
    }

    /// Animation-frame callback with an explicit delta, for hosts that
    /// already measure frame time.
    pub fn on_frame_delta(&mut self, delta: Time) -> FrameOutcome {
        self.frame(|clock| clock.tick(delta))
    }

    fn frame(&mut self, advance: impl FnOnce(&mut MasterClock) -> ClockEvent) -> FrameOutcome {
        self.drain_commands();

        let mut finished = false;
        if !self.disposed && !self.scrubbing && advance(&mut self.clock) == ClockEvent::Finished {
            info!("Playback finished");
            finished = true;
        }
        let report = self.resync();

        FrameOutcome {
            elapsed: self.clock.elapsed(),
            active_index: self.active_index,
            finished,
            keep_running: self.clock.is_playing(),
            report,
        }
    }

    fn resync(&mut self) -> SyncReport {
        if self.disposed {
            return SyncReport::default();
        }
        let report = self.sync.sync(&self.timeline, &self.clock);
        let active = self.timeline.locate(self.clock.elapsed()).map(|iv| iv.index);
        if active != self.active_index {
            debug!(from = ?self.active_index, to = ?active, "Active slide changed");
            self.active_index = active;
        }
        report
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn slides(&self) -> &[SlideDescriptor] {
        &self.slides
    }

    pub fn clock(&self) -> &MasterClock {
        &self.clock
    }

    pub fn state(&self) -> PlaybackState {
        self.clock.state()
    }

    pub fn elapsed(&self) -> Time {
        self.clock.elapsed()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active_index
    }

    pub fn is_scrubbing(&self) -> bool {
        self.scrubbing
    }

    pub fn synchronizer(&self) -> &StreamSynchronizer<N, M> {
        &self.sync
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stop playback and release both streams. Idempotent; later commands
    /// and frames are ignored.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.clock.pause();
        self.sync.dispose();
        self.disposed = true;
        debug!("Playback engine disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl<N: MediaPrimitive, M: MediaPrimitive> Drop for PlaybackEngine<N, M> {
    fn drop(&mut self) {
        self.dispose();
    }
}
