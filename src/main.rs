//! slidecast command line: inspect, preview and render slide projects.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use slidecast::audio::{CpalStream, PcmBuffer, PcmLibrary};
use slidecast::core::time::{self, format_time};
use slidecast::core::{MediaRef, VisualKind};
use slidecast::export::{FfmpegLoudnorm, PostProcess, RawPcmFormat};
use slidecast::narration::{apply_narration, NarrationQueue, ToneSynthesizer};
use slidecast::playback::{PlaybackCommand, PlaybackEngine};
use slidecast::render::{BatchRenderer, RawFileSink, RenderPlan, StillCompositor, VolumeSchedule};
use slidecast::timeline::SeekTarget;
use slidecast::{Project, Timeline};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print slide intervals, markers and total duration
    Timeline {
        project: PathBuf,
    },
    /// Append slides built from the project's slide defaults, creating the
    /// project file if needed
    Add {
        project: PathBuf,
        /// Slide visuals, relative to the project file
        #[arg(required = true)]
        visuals: Vec<String>,
    },
    /// Print the music ducking schedule in frames
    Schedule {
        project: PathBuf,
        /// Frame rate; defaults to the project's export fps
        #[arg(long)]
        fps: Option<f64>,
    },
    /// Render to raw RGBA video and f32le audio streams
    Render {
        project: PathBuf,
        /// Output stem; `.rgba` and `.f32le` are appended
        #[arg(short, long)]
        out: PathBuf,
        /// Worker threads (0 = available parallelism)
        #[arg(long)]
        workers: Option<usize>,
        /// Loudness-normalize the audio stream with ffmpeg afterwards
        #[arg(long)]
        normalize: bool,
        /// Synthesize missing narration from slide scripts with a tone
        #[arg(long)]
        placeholder_tts: bool,
    },
    /// Headless preview on the default audio device
    Preview {
        project: PathBuf,
        #[arg(long)]
        placeholder_tts: bool,
        /// Start position in seconds
        #[arg(long, default_value_t = 0.0)]
        start: f64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match args.command {
        Command::Timeline { project } => print_timeline(&project),
        Command::Add { project, visuals } => add_slides(&project, visuals),
        Command::Schedule { project, fps } => print_schedule(&project, fps),
        Command::Render {
            project,
            out,
            workers,
            normalize,
            placeholder_tts,
        } => render(&project, &out, workers, normalize, placeholder_tts),
        Command::Preview {
            project,
            placeholder_tts,
            start,
        } => preview(&project, placeholder_tts, start),
    }
}

/// A project with its media resolved relative to the project file.
struct Loaded {
    project: Project,
    base: PathBuf,
    audio: PcmLibrary,
}

impl Loaded {
    fn open(path: &Path, placeholder_tts: bool) -> Result<Self> {
        let project = Project::load(path)
            .with_context(|| format!("Failed to load project {}", path.display()))?;
        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let mut loaded = Self {
            project,
            base,
            audio: PcmLibrary::new(),
        };
        if placeholder_tts {
            loaded.synthesize_missing()?;
        }
        loaded.load_audio();
        Ok(loaded)
    }

    fn resolve(&self, media: &MediaRef) -> PathBuf {
        self.base.join(media.as_str())
    }

    fn timeline(&self) -> Timeline {
        Timeline::build_with_fallback(
            &self.project.slides,
            self.project.config.default_narration_seconds,
        )
    }

    fn synthesize_missing(&mut self) -> Result<()> {
        let queue = NarrationQueue::spawn(ToneSynthesizer::new())?;
        let voice = self.project.defaults.voice.clone();
        for (index, slide) in self.project.slides.iter_mut().enumerate() {
            if slide.narration_disabled || slide.audio.is_some() {
                continue;
            }
            let Some(script) = slide.script.clone() else {
                continue;
            };
            match queue.synthesize_blocking(script, voice.as_str()) {
                Ok(narration) => {
                    info!(slide = index, seconds = narration.duration_secs, "Placeholder narration");
                    self.audio.insert(narration.audio.clone(), narration.pcm.clone());
                    apply_narration(slide, &narration);
                }
                Err(e) => warn!(slide = index, "Narration failed: {}", e),
            }
        }
        Ok(())
    }

    fn load_audio(&mut self) {
        let sources: Vec<MediaRef> = self
            .project
            .slides
            .iter()
            .filter_map(|s| s.active_narration().cloned())
            .chain(self.project.music.clone())
            .collect();
        for source in sources {
            if self.audio.contains(&source) {
                continue;
            }
            let path = self.resolve(&source);
            match PcmBuffer::from_wav(&path) {
                Ok(pcm) => self.audio.insert(source, pcm),
                Err(e) => warn!(source = %source, "Could not load audio: {}", e),
            }
        }
    }

    fn load_stills(&self) -> StillCompositor {
        let mut stills = StillCompositor::new();
        for slide in &self.project.slides {
            if slide.visual_kind != VisualKind::Image {
                continue;
            }
            if let Err(e) = stills.load_file(slide.visual.clone(), &self.resolve(&slide.visual)) {
                warn!(visual = %slide.visual, "Could not load still: {}", e);
            }
        }
        stills
    }
}

fn print_timeline(path: &Path) -> Result<()> {
    let loaded = Loaded::open(path, false)?;
    let timeline = loaded.timeline();
    for iv in timeline.intervals() {
        println!(
            "{:>3}  {} - {}  ({:>8.3}s)  {}{}",
            iv.index,
            format_time(iv.start),
            format_time(iv.end),
            time::to_seconds(iv.duration),
            iv.cue.visual,
            if iv.cue.music_paused { "  [music paused]" } else { "" }
        );
    }
    let markers: Vec<String> = timeline
        .markers()
        .iter()
        .map(|(_, t)| format_time(*t))
        .collect();
    println!("markers: {}", markers.join(", "));
    println!("total:   {}", format_time(timeline.total_duration()));
    Ok(())
}

fn add_slides(path: &Path, visuals: Vec<String>) -> Result<()> {
    let mut project = if path.exists() {
        Project::load(path).with_context(|| format!("Failed to load project {}", path.display()))?
    } else {
        Project::default()
    };
    let added = project.add_slides(visuals);
    for slide in &mut project.slides[added.clone()] {
        if is_video(slide.visual.as_str()) {
            slide.visual_kind = VisualKind::Video;
        }
    }
    project
        .save(path)
        .with_context(|| format!("Failed to save project {}", path.display()))?;
    info!(
        added = added.len(),
        slides = project.slides.len(),
        "Slides added"
    );
    Ok(())
}

fn is_video(visual: &str) -> bool {
    Path::new(visual)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ["mp4", "webm", "mov", "mkv"]
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

fn print_schedule(path: &Path, fps: Option<f64>) -> Result<()> {
    let loaded = Loaded::open(path, false)?;
    let config = &loaded.project.config;
    let fps = fps.unwrap_or(config.export.fps);
    if !(fps.is_finite() && fps > 0.0) {
        bail!("fps must be positive, got {}", fps);
    }
    let schedule = VolumeSchedule::new(&loaded.timeline(), fps, config.gains.music_volume());
    for segment in schedule.segments() {
        println!(
            "{:>3}  frames {:>6} - {:>6}  gain {:.3}",
            segment.index,
            segment.start_frame,
            segment.end_frame,
            schedule.gain(segment.start_frame)
        );
    }
    println!("total frames: {}", schedule.total_frames());
    Ok(())
}

fn render(
    path: &Path,
    out: &Path,
    workers: Option<usize>,
    normalize: bool,
    placeholder_tts: bool,
) -> Result<()> {
    let loaded = Loaded::open(path, placeholder_tts)?;
    let mut settings = loaded.project.config.export.clone();
    if let Some(workers) = workers {
        settings.workers = workers;
    }
    let stills = loaded.load_stills();
    let plan = RenderPlan::new(
        loaded.timeline(),
        loaded.project.music.clone(),
        loaded.project.config.gains,
        settings.clone(),
    );
    let renderer = BatchRenderer::new(plan, stills, loaded.audio);

    let mut sink = RawFileSink::create(out)
        .with_context(|| format!("Failed to create output {}", out.display()))?;
    let stats = renderer.render(&mut sink).context("Render failed")?;
    info!(
        frames = stats.frames,
        peak_dbfs = stats.peak_dbfs,
        zone = ?stats.peak_zone,
        video = %sink.video_path().display(),
        audio = %sink.audio_path().display(),
        "Wrote {}x{} @ {} fps",
        settings.width,
        settings.height,
        settings.fps
    );

    if normalize {
        let loudnorm = FfmpegLoudnorm::for_raw_pcm(RawPcmFormat {
            sample_rate: settings.sample_rate,
            channels: settings.channels,
        });
        loudnorm
            .process(sink.audio_path(), None)
            .context("Loudness normalization failed")?;
    }
    Ok(())
}

fn preview(path: &Path, placeholder_tts: bool, start: f64) -> Result<()> {
    let loaded = Loaded::open(path, placeholder_tts)?;
    let audio = Arc::new(loaded.audio);
    let narration = CpalStream::new("narration", Arc::clone(&audio))
        .context("Failed to open narration output")?;
    let music =
        CpalStream::new("music", Arc::clone(&audio)).context("Failed to open music output")?;

    let mut engine = PlaybackEngine::new(
        loaded.project.slides,
        loaded.project.music,
        loaded.project.config,
        narration,
        music,
    );
    if !engine.timeline().is_playable() {
        bail!("Nothing to play: the project has no slides");
    }
    engine.process_command(PlaybackCommand::Seek(SeekTarget::Absolute(time::from_seconds(
        start,
    ))));
    engine.play_at(Instant::now());
    info!(total = %format_time(engine.timeline().total_duration()), "Preview started");

    let frame_interval = Duration::from_micros(16_667);
    let mut shown = None;
    loop {
        let outcome = engine.on_animation_frame(Instant::now());
        if outcome.active_index != shown {
            if let Some(index) = outcome.active_index {
                info!(slide = index, at = %time::format_clock(outcome.elapsed), "Showing slide");
            }
            shown = outcome.active_index;
        }
        if !outcome.keep_running {
            break;
        }
        std::thread::sleep(frame_interval);
    }
    engine.dispose();
    info!("Preview finished");
    Ok(())
}
