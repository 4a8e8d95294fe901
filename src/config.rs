//! Engine configuration and project files.

use std::fs;
use std::ops::Range;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{MediaRef, Transition};
use crate::timeline::slide::{SlideDescriptor, DEFAULT_NARRATION_SECONDS};

/// Error type for configuration and project files
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid project file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Gain stages for the two preview streams.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GainSettings {
    pub master: f32,
    pub narration: f32,
    pub music: f32,
    pub muted: bool,
}

impl Default for GainSettings {
    fn default() -> Self {
        Self {
            master: 1.0,
            narration: 1.0,
            music: 0.03,
            muted: false,
        }
    }
}

impl GainSettings {
    /// Effective narration volume after mute and master gain.
    pub fn narration_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.narration * self.master
        }
    }

    /// Effective music volume after mute and master gain.
    pub fn music_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.music * self.master
        }
    }
}

/// Drift tolerance policy for the preview synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncPolicy {
    /// Seconds of media/clock divergence tolerated before re-seeking
    pub drift_tolerance: f64,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            drift_tolerance: 0.3,
        }
    }
}

/// Export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub sample_rate: u32,
    pub channels: u32,
    /// Render worker threads; 0 picks the available parallelism
    pub workers: usize,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30.0,
            sample_rate: 48000,
            channels: 2,
            workers: 0,
        }
    }
}

impl ExportSettings {
    /// Interleaved samples covering one frame duration.
    pub fn samples_per_frame(&self) -> usize {
        let frames = (self.sample_rate as f64 / self.fps).round() as usize;
        frames * self.channels as usize
    }

    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub gains: GainSettings,
    pub sync: SyncPolicy,
    pub export: ExportSettings,
    /// Skip-forward/back step in seconds
    pub skip_seconds: f64,
    /// Narration length assumed before synthesis reports one
    pub default_narration_seconds: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gains: GainSettings::default(),
            sync: SyncPolicy::default(),
            export: ExportSettings::default(),
            skip_seconds: 5.0,
            default_narration_seconds: DEFAULT_NARRATION_SECONDS,
        }
    }
}

/// Defaults applied to newly created slides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SlideDefaults {
    pub narration_enabled: bool,
    pub voice: String,
    pub post_audio_delay: f64,
    pub transition: Transition,
    pub music_paused: bool,
}

impl Default for SlideDefaults {
    fn default() -> Self {
        Self {
            narration_enabled: true,
            voice: crate::narration::DEFAULT_VOICE.to_string(),
            post_audio_delay: 0.0,
            transition: Transition::Fade,
            music_paused: false,
        }
    }
}

impl SlideDefaults {
    /// A fresh image slide carrying these defaults.
    pub fn new_slide(&self, visual: impl Into<MediaRef>) -> SlideDescriptor {
        let mut slide = SlideDescriptor::image(visual)
            .with_post_audio_delay(self.post_audio_delay)
            .with_transition(self.transition)
            .with_music_paused(self.music_paused);
        slide.narration_disabled = !self.narration_enabled;
        slide
    }
}

/// A saved presentation: slides, background music and settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub slides: Vec<SlideDescriptor>,
    pub music: Option<MediaRef>,
    pub defaults: SlideDefaults,
    pub config: EngineConfig,
}

impl Project {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Append one slide per visual, built from the project's slide
    /// defaults. Returns the indices of the new slides.
    pub fn add_slides<I>(&mut self, visuals: I) -> Range<usize>
    where
        I: IntoIterator,
        I::Item: Into<MediaRef>,
    {
        let first = self.slides.len();
        let defaults = &self.defaults;
        self.slides
            .extend(visuals.into_iter().map(|visual| defaults.new_slide(visual)));
        first..self.slides.len()
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_volumes() {
        let mut gains = GainSettings {
            master: 0.5,
            narration: 0.8,
            music: 0.2,
            muted: false,
        };
        assert!((gains.narration_volume() - 0.4).abs() < 1e-6);
        assert!((gains.music_volume() - 0.1).abs() < 1e-6);

        gains.muted = true;
        assert_eq!(gains.narration_volume(), 0.0);
        assert_eq!(gains.music_volume(), 0.0);
    }

    #[test]
    fn test_samples_per_frame() {
        let settings = ExportSettings::default();
        // 48000 / 30 = 1600 frames, stereo
        assert_eq!(settings.samples_per_frame(), 3200);
        let settings = ExportSettings {
            workers: 3,
            ..ExportSettings::default()
        };
        assert_eq!(settings.worker_count(), 3);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "sync": { "drift_tolerance": 0.5 } }"#).unwrap();
        assert_eq!(config.sync.drift_tolerance, 0.5);
        assert_eq!(config.gains, GainSettings::default());
        assert_eq!(config.export.fps, 30.0);
        assert_eq!(config.skip_seconds, 5.0);
    }

    #[test]
    fn test_slide_defaults() {
        let defaults = SlideDefaults {
            narration_enabled: false,
            post_audio_delay: 2.0,
            transition: Transition::Zoom,
            ..SlideDefaults::default()
        };
        let slide = defaults.new_slide("s.png");
        assert!(slide.narration_disabled);
        assert_eq!(slide.post_audio_delay, 2.0);
        assert_eq!(slide.transition, Transition::Zoom);
    }

    #[test]
    fn test_add_slides_uses_defaults() {
        let mut project = Project {
            slides: vec![SlideDescriptor::image("0.png")],
            defaults: SlideDefaults {
                post_audio_delay: 1.5,
                music_paused: true,
                ..SlideDefaults::default()
            },
            ..Project::default()
        };
        let added = project.add_slides(["1.png", "2.png"]);
        assert_eq!(added, 1..3);
        assert_eq!(project.slides[2].visual, MediaRef::new("2.png"));
        assert!(project.slides[1..].iter().all(|s| s.post_audio_delay == 1.5 && s.music_paused));
        assert_eq!(project.slides[0].post_audio_delay, 0.0);
        assert_eq!(project.add_slides(Vec::<String>::new()), 3..3);
    }

    #[test]
    fn test_project_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");

        let project = Project {
            slides: vec![SlideDescriptor::image("1.png").with_narration("1.wav", 2.0)],
            music: Some(MediaRef::new("music.wav")),
            ..Project::default()
        };
        project.save(&path).unwrap();
        assert_eq!(Project::load(&path).unwrap(), project);
    }

    #[test]
    fn test_project_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(Project::load(&missing), Err(ConfigError::Io { .. })));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(Project::load(&broken), Err(ConfigError::Parse { .. })));
    }
}
