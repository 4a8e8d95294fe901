//! Loudness normalization of the rendered output.
//!
//! Two-pass EBU R128 normalization through ffmpeg's `loudnorm` filter: the
//! first pass measures, the second applies a linear correction using the
//! measured values. Runs once, after the batch renderer has finished.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

/// Error type for export post-processing
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Input file does not exist: {0}")]
    MissingInput(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ffmpeg exited with {status}: {stderr}")]
    Ffmpeg { status: String, stderr: String },
    #[error("Could not find loudnorm statistics in ffmpeg output")]
    StatsNotFound,
    #[error("Invalid loudnorm statistics: {0}")]
    Stats(#[from] serde_json::Error),
}

/// Loudness targets; the defaults follow common streaming guidance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessTarget {
    /// Integrated loudness, LUFS
    pub integrated: f64,
    /// True peak ceiling, dBTP
    pub true_peak: f64,
    /// Loudness range, LU
    pub range: f64,
}

impl Default for LoudnessTarget {
    fn default() -> Self {
        Self {
            integrated: -14.0,
            true_peak: -1.0,
            range: 11.0,
        }
    }
}

/// First-pass measurements printed by `loudnorm=print_format=json`.
/// ffmpeg prints the numbers as strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoudnormStats {
    #[serde(deserialize_with = "number_or_string")]
    pub input_i: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub input_tp: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub input_lra: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub input_thresh: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub target_offset: f64,
    #[serde(default)]
    pub normalization_type: String,
}

fn number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl LoudnormStats {
    /// Pull the JSON block out of ffmpeg's stderr.
    pub fn parse(output: &str) -> Result<Self, ExportError> {
        let anchor = output.find("\"input_i\"").ok_or(ExportError::StatsNotFound)?;
        let start = output[..anchor].rfind('{').ok_or(ExportError::StatsNotFound)?;
        let end = output[anchor..]
            .find('}')
            .map(|i| anchor + i + 1)
            .ok_or(ExportError::StatsNotFound)?;
        Ok(serde_json::from_str(&output[start..end])?)
    }
}

/// Headerless PCM input, as written by the raw file sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPcmFormat {
    pub sample_rate: u32,
    pub channels: u32,
}

impl RawPcmFormat {
    fn args(&self) -> Vec<String> {
        vec![
            "-f".into(),
            "f32le".into(),
            "-ar".into(),
            self.sample_rate.to_string(),
            "-ac".into(),
            self.channels.to_string(),
        ]
    }
}

/// A step applied to a finished render.
pub trait PostProcess {
    /// Process `input`, writing to `output` or replacing `input` in place
    /// when `output` is `None`. Returns the path holding the result.
    fn process(&self, input: &Path, output: Option<&Path>) -> Result<PathBuf, ExportError>;
}

#[derive(Debug, Clone)]
pub struct FfmpegLoudnorm {
    pub binary: PathBuf,
    pub target: LoudnessTarget,
    pub raw: Option<RawPcmFormat>,
}

impl Default for FfmpegLoudnorm {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
            target: LoudnessTarget::default(),
            raw: None,
        }
    }
}

impl FfmpegLoudnorm {
    /// Normalize a headerless f32le file in place of a container.
    pub fn for_raw_pcm(format: RawPcmFormat) -> Self {
        Self {
            raw: Some(format),
            ..Self::default()
        }
    }

    fn target_filter(&self) -> String {
        format!(
            "loudnorm=I={}:TP={}:LRA={}",
            self.target.integrated, self.target.true_peak, self.target.range
        )
    }

    /// Filter for the measuring pass.
    pub fn analyze_filter(&self) -> String {
        format!("{}:print_format=json", self.target_filter())
    }

    /// Filter for the correcting pass, fed with first-pass measurements.
    pub fn normalize_filter(&self, stats: &LoudnormStats) -> String {
        format!(
            "{}:measured_I={}:measured_TP={}:measured_LRA={}:measured_thresh={}:offset={}:linear=true:print_format=summary",
            self.target_filter(),
            stats.input_i,
            stats.input_tp,
            stats.input_lra,
            stats.input_thresh,
            stats.target_offset
        )
    }

    fn input_args(&self, input: &Path) -> Vec<String> {
        let mut args = self.raw.map(|r| r.args()).unwrap_or_default();
        args.push("-i".into());
        args.push(input.to_string_lossy().into_owned());
        args
    }

    pub fn analyze_args(&self, input: &Path) -> Vec<String> {
        let mut args: Vec<String> = vec!["-hide_banner".into(), "-nostats".into()];
        args.extend(self.input_args(input));
        args.extend([
            "-af".to_string(),
            self.analyze_filter(),
            "-f".to_string(),
            "null".to_string(),
            "-".to_string(),
        ]);
        args
    }

    pub fn normalize_args(&self, input: &Path, output: &Path, stats: &LoudnormStats) -> Vec<String> {
        let mut args: Vec<String> = vec!["-y".into(), "-hide_banner".into(), "-nostats".into()];
        args.extend(self.input_args(input));
        args.extend(["-af".to_string(), self.normalize_filter(stats)]);
        match self.raw {
            Some(raw) => {
                // loudnorm resamples internally; pin the output format back
                args.extend(raw.args());
            }
            None => args.extend(["-c:v".to_string(), "copy".to_string()]),
        }
        args.push(output.to_string_lossy().into_owned());
        args
    }

    fn run(&self, args: &[String]) -> Result<String, ExportError> {
        debug!(binary = %self.binary.display(), ?args, "Running ffmpeg");
        let output = Command::new(&self.binary).args(args).output()?;
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(ExportError::Ffmpeg {
                status: output.status.to_string(),
                stderr,
            });
        }
        Ok(stderr)
    }

    /// Measure `input` without changing it.
    pub fn analyze(&self, input: &Path) -> Result<LoudnormStats, ExportError> {
        let stats = LoudnormStats::parse(&self.run(&self.analyze_args(input))?)?;
        info!(
            "Measured loudness of {}: {} LUFS, true peak {} dBTP",
            input.display(),
            stats.input_i,
            stats.input_tp
        );
        Ok(stats)
    }
}

/// `clip.mp4` -> `clip-normalized.mp4`
pub fn normalized_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{}-normalized.{}", stem, ext.to_string_lossy()),
        None => format!("{}-normalized", stem),
    };
    input.with_file_name(name)
}

impl PostProcess for FfmpegLoudnorm {
    fn process(&self, input: &Path, output: Option<&Path>) -> Result<PathBuf, ExportError> {
        if !input.exists() {
            return Err(ExportError::MissingInput(input.to_path_buf()));
        }
        let target = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| normalized_path(input));

        let stats = self.analyze(input)?;
        info!(offset = stats.target_offset, "Applying loudness correction");
        self.run(&self.normalize_args(input, &target, &stats))?;

        let verify = self.analyze(&target)?;
        info!(
            "Normalized loudness: {} LUFS (target {} LUFS)",
            verify.input_i, self.target.integrated
        );

        if output.is_none() {
            fs::rename(&target, input)?;
            info!("Replaced {} with normalized version", input.display());
            return Ok(input.to_path_buf());
        }
        Ok(target)
    }
}
