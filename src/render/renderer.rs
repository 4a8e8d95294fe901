//! Deterministic batch renderer.
//!
//! Frames are evaluated from the frame index alone (never from the preview
//! clock), spread over a pool of worker threads, and handed to the sink in
//! index order through a reorder buffer.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::channel;
use tracing::{debug, info, warn};

use crate::audio::meter::{self, LevelZone, MixLevels};
use crate::audio::mixer::{mix_frame, MixInput};
use crate::audio::{AudioBuffer, PcmLibrary};
use crate::core::time;
use crate::core::MediaRef;
use crate::render::compositor::{VideoFrame, VisualSource};
use crate::render::plan::{FramePlan, RenderPlan};
use crate::render::sink::FrameSink;

/// Error type for rendering operations
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Render cancelled")]
    Cancelled,
    #[error("Nothing to render: timeline is empty")]
    EmptyTimeline,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
    #[error("Frame {got} delivered out of order (expected {expected})")]
    OutOfOrder { expected: u64, got: u64 },
    #[error("Render worker failed: {0}")]
    Worker(String),
}

/// Summary of a finished render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStats {
    pub frames: u64,
    pub samples: u64,
    pub workers: usize,
    /// Loudest combined narration/music level of any frame
    pub peak_dbfs: f32,
    pub peak_zone: LevelZone,
    /// Frames whose combined level went over full scale
    pub clipping_frames: u64,
}

/// One frame's picture, audio and measured levels.
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    pub video: VideoFrame,
    pub audio: AudioBuffer,
    pub levels: MixLevels,
}

/// Running level statistics over delivered frames.
#[derive(Debug, Clone, Copy)]
struct LevelTracker {
    peak_dbfs: f32,
    window_peak_dbfs: f32,
    clipping_frames: u64,
}

impl LevelTracker {
    fn new() -> Self {
        Self {
            peak_dbfs: meter::DBFS_FLOOR,
            window_peak_dbfs: meter::DBFS_FLOOR,
            clipping_frames: 0,
        }
    }

    fn record(&mut self, levels: &MixLevels) {
        let db = levels.dbfs();
        self.peak_dbfs = self.peak_dbfs.max(db);
        self.window_peak_dbfs = self.window_peak_dbfs.max(db);
        if levels.zone() == LevelZone::Clipping {
            self.clipping_frames += 1;
        }
    }

    /// Peak since the last call, then start a new window.
    fn take_window(&mut self) -> f32 {
        std::mem::replace(&mut self.window_peak_dbfs, meter::DBFS_FLOOR)
    }
}

type Rendered = (u64, Result<RenderedFrame, RenderError>);

/// Renders a [`RenderPlan`] into a [`FrameSink`].
pub struct BatchRenderer<V> {
    plan: RenderPlan,
    visuals: V,
    audio: PcmLibrary,
    cancel: Arc<AtomicBool>,
}

impl<V: VisualSource> BatchRenderer<V> {
    pub fn new(plan: RenderPlan, visuals: V, audio: PcmLibrary) -> Self {
        Self {
            plan,
            visuals,
            audio,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn plan(&self) -> &RenderPlan {
        &self.plan
    }

    /// Flag that stops the render at the next frame when set.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Sources the plan references but that cannot be loaded. Each one is
    /// logged once; the affected frames render black or silent.
    pub fn missing_sources(&self) -> Vec<MediaRef> {
        let mut seen = HashSet::new();
        let mut missing = Vec::new();
        for interval in self.plan.timeline().intervals() {
            let cue = &interval.cue;
            if seen.insert(cue.visual.clone()) && !self.visuals.has(&cue.visual) {
                missing.push(cue.visual.clone());
            }
            if let Some(narration) = &cue.narration {
                if seen.insert(narration.clone()) && !self.audio.contains(narration) {
                    missing.push(narration.clone());
                }
            }
        }
        if let Some(frame) = self.plan.frame(0) {
            if let Some(music) = frame.music {
                if !self.audio.contains(&music) {
                    missing.push(music);
                }
            }
        }
        for source in &missing {
            warn!(source = %source, "Source unavailable, rendering without it");
        }
        missing
    }

    /// Render a single frame's picture and audio.
    pub fn render_frame(&self, frame: u64) -> Result<RenderedFrame, RenderError> {
        let plan = self
            .plan
            .frame(frame)
            .ok_or_else(|| RenderError::InvalidFrame(format!("frame {} out of range", frame)))?;
        let settings = self.plan.settings();
        let timestamp = time::from_frame_index(frame, settings.fps);

        let cue = self
            .plan
            .cue(plan.slide_index)
            .ok_or_else(|| RenderError::InvalidFrame(format!("no slide {}", plan.slide_index)))?;
        let video = self.visuals.render(
            &cue.visual,
            &plan.transition,
            settings.width,
            settings.height,
            timestamp,
        )?;

        let (audio, levels) = self.mix_audio(&plan, timestamp);
        Ok(RenderedFrame {
            video,
            audio,
            levels,
        })
    }

    fn mix_audio(&self, plan: &FramePlan, timestamp: time::Time) -> (AudioBuffer, MixLevels) {
        let settings = self.plan.settings();
        let mut audio = AudioBuffer::silence(
            settings.sample_rate,
            settings.channels,
            plan.sample_len(settings.channels),
            timestamp,
        );
        let narration = plan
            .narration
            .as_ref()
            .and_then(|source| self.audio.get(source))
            .map(|pcm| {
                MixInput::new(pcm, self.plan.offset_of(&plan.narration_samples), plan.narration_gain)
            });
        let music = plan
            .music
            .as_ref()
            .and_then(|source| self.audio.get(source))
            .map(|pcm| {
                MixInput::new(pcm, self.plan.offset_of(&plan.music_samples), plan.music_gain)
                    .looping(true)
            });
        let levels = mix_frame(&mut audio, narration, music);
        (audio, levels)
    }

    /// Render every frame into `sink`, then finish it.
    pub fn render<S: FrameSink>(&self, sink: &mut S) -> Result<RenderStats, RenderError> {
        let total = self.plan.total_frames();
        if total == 0 {
            return Err(RenderError::EmptyTimeline);
        }
        self.missing_sources();

        let workers = self
            .plan
            .settings()
            .worker_count()
            .clamp(1, total.min(usize::MAX as u64) as usize);
        let fps = self.plan.settings().fps.round().max(1.0) as u64;
        info!(frames = total, workers, "Starting render");

        let next = AtomicU64::new(0);
        let abort = AtomicBool::new(false);
        let (tx, rx) = channel::bounded::<Rendered>(workers * 4);

        let outcome = crossbeam::scope(|scope| {
            for worker in 0..workers {
                let tx = tx.clone();
                let next = &next;
                let abort = &abort;
                scope.spawn(move |_| {
                    debug!(worker, "Render worker started");
                    loop {
                        if abort.load(Ordering::Relaxed) || self.cancel.load(Ordering::Relaxed) {
                            break;
                        }
                        let frame = next.fetch_add(1, Ordering::Relaxed);
                        if frame >= total {
                            break;
                        }
                        if tx.send((frame, self.render_frame(frame))).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);

            let mut pending = BTreeMap::new();
            let mut delivered: u64 = 0;
            let mut samples: u64 = 0;
            let mut levels = LevelTracker::new();
            let mut failure = None;

            for (frame, result) in rx.iter() {
                match result {
                    Ok(rendered) => {
                        pending.insert(frame, rendered);
                    }
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
                while let Some(rendered) = pending.remove(&delivered) {
                    samples += rendered.audio.frame_count() as u64;
                    levels.record(&rendered.levels);
                    if let Err(e) = sink.accept(delivered, rendered.video, rendered.audio) {
                        failure = Some(e);
                        break;
                    }
                    delivered += 1;
                    if delivered % fps == 0 {
                        let peak = levels.take_window();
                        info!(
                            level_dbfs = peak,
                            zone = ?LevelZone::from_dbfs(peak),
                            "Render progress: {:.1}% (frame {}/{})",
                            delivered as f64 / total as f64 * 100.0,
                            delivered,
                            total
                        );
                    }
                }
                if failure.is_some() {
                    break;
                }
            }
            abort.store(true, Ordering::Relaxed);
            drop(rx);
            (delivered, samples, levels, failure)
        });

        let (delivered, samples, levels, failure) =
            outcome.map_err(|_| RenderError::Worker("worker thread panicked".to_string()))?;
        if let Some(e) = failure {
            warn!("Render failed at frame {}: {}", delivered, e);
            return Err(e);
        }
        if delivered < total {
            if self.cancel.load(Ordering::Relaxed) {
                info!(frames = delivered, "Render cancelled");
                return Err(RenderError::Cancelled);
            }
            return Err(RenderError::Worker(format!(
                "only {} of {} frames rendered",
                delivered, total
            )));
        }

        sink.finish()?;
        let peak_zone = LevelZone::from_dbfs(levels.peak_dbfs);
        info!(
            frames = delivered,
            peak_dbfs = levels.peak_dbfs,
            zone = ?peak_zone,
            "Render complete"
        );
        if levels.clipping_frames > 0 {
            warn!(frames = levels.clipping_frames, "Mixed audio clipped");
        }
        Ok(RenderStats {
            frames: delivered,
            samples,
            workers,
            peak_dbfs: levels.peak_dbfs,
            peak_zone,
            clipping_frames: levels.clipping_frames,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::PcmBuffer;
    use crate::config::{ExportSettings, GainSettings};
    use crate::render::compositor::StillCompositor;
    use crate::render::sink::MemorySink;
    use crate::timeline::{SlideDescriptor, Timeline};

    fn settings(workers: usize) -> ExportSettings {
        ExportSettings {
            width: 4,
            height: 4,
            fps: 10.0,
            sample_rate: 100,
            channels: 1,
            workers,
        }
    }

    fn renderer(workers: usize) -> BatchRenderer<StillCompositor> {
        let slides = vec![
            SlideDescriptor::image("a.png").with_narration("a.wav", 1.0),
            SlideDescriptor::image("b.png")
                .with_narration("b.wav", 0.5)
                .with_music_paused(true),
        ];
        let gains = GainSettings {
            music: 0.5,
            ..Default::default()
        };
        let plan = RenderPlan::new(
            Timeline::build(&slides),
            Some(MediaRef::new("music.wav")),
            gains,
            settings(workers),
        );
        let mut audio = PcmLibrary::new();
        audio.insert(MediaRef::new("a.wav"), PcmBuffer::new(vec![0.25; 100], 100, 1));
        audio.insert(MediaRef::new("music.wav"), PcmBuffer::new(vec![0.5; 30], 100, 1));
        BatchRenderer::new(plan, StillCompositor::new(), audio)
    }

    #[test]
    fn test_renders_all_frames_in_order() {
        let mut sink = MemorySink::new();
        let stats = renderer(3).render(&mut sink).unwrap();
        assert_eq!(stats.frames, 15);
        assert_eq!(stats.samples, 150);
        assert!(sink.finished);
        let indices: Vec<u64> = sink.frames.iter().map(|(i, _, _)| *i).collect();
        assert_eq!(indices, (0..15).collect::<Vec<_>>());
    }

    #[test]
    fn test_output_independent_of_worker_count() {
        let mut one = MemorySink::new();
        let mut many = MemorySink::new();
        renderer(1).render(&mut one).unwrap();
        renderer(4).render(&mut many).unwrap();
        assert_eq!(one.audio(), many.audio());
        assert_eq!(one.frames.len(), many.frames.len());
    }

    #[test]
    fn test_audio_mix_and_ducking() {
        let mut sink = MemorySink::new();
        renderer(2).render(&mut sink).unwrap();
        let audio = sink.audio();
        // Slide a: narration 0.25 plus music 0.5 at gain 0.5
        assert!((audio[0] - 0.5).abs() < 1e-6);
        // Slide b: narration missing, music ducked
        assert!(audio[100..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_levels_tracked() {
        let mut sink = MemorySink::new();
        let stats = renderer(1).render(&mut sink).unwrap();
        // Narration 0.25 and music 0.25 combine to about -9 dBFS
        assert_eq!(stats.peak_zone, LevelZone::Normal);
        assert!((stats.peak_dbfs - meter::to_dbfs(0.25 * 2f32.sqrt())).abs() < 1e-3);
        assert_eq!(stats.clipping_frames, 0);
    }

    #[test]
    fn test_clipping_mix_reported() {
        let slides = vec![SlideDescriptor::image("a.png").with_narration("a.wav", 1.0)];
        let plan = RenderPlan::new(
            Timeline::build(&slides),
            Some(MediaRef::new("music.wav")),
            GainSettings {
                music: 1.0,
                ..Default::default()
            },
            settings(2),
        );
        let mut audio = PcmLibrary::new();
        audio.insert(MediaRef::new("a.wav"), PcmBuffer::new(vec![0.9; 100], 100, 1));
        audio.insert(MediaRef::new("music.wav"), PcmBuffer::new(vec![0.9; 100], 100, 1));
        let renderer = BatchRenderer::new(plan, StillCompositor::new(), audio);

        let rendered = renderer.render_frame(0).unwrap();
        assert_eq!(rendered.levels.zone(), LevelZone::Clipping);
        assert!(rendered.audio.as_slice().iter().all(|s| *s == 1.0));

        let mut sink = MemorySink::new();
        let stats = renderer.render(&mut sink).unwrap();
        assert_eq!(stats.peak_zone, LevelZone::Clipping);
        assert_eq!(stats.clipping_frames, 10);
    }

    #[test]
    fn test_missing_sources_reported() {
        let missing = renderer(1).missing_sources();
        assert!(missing.contains(&MediaRef::new("b.wav")));
        assert!(missing.contains(&MediaRef::new("a.png")));
        assert!(!missing.contains(&MediaRef::new("a.wav")));
    }

    #[test]
    fn test_cancel_before_start() {
        let renderer = renderer(2);
        renderer.cancel_handle().store(true, Ordering::Relaxed);
        let mut sink = MemorySink::new();
        assert!(matches!(renderer.render(&mut sink), Err(RenderError::Cancelled)));
        assert!(!sink.finished);
    }

    #[test]
    fn test_empty_timeline_is_error() {
        let plan = RenderPlan::new(
            Timeline::default(),
            None,
            GainSettings::default(),
            settings(1),
        );
        let renderer = BatchRenderer::new(plan, StillCompositor::new(), PcmLibrary::new());
        let mut sink = MemorySink::new();
        assert!(matches!(renderer.render(&mut sink), Err(RenderError::EmptyTimeline)));
    }
}
