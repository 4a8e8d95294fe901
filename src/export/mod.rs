pub mod loudness;

pub use loudness::{ExportError, FfmpegLoudnorm, LoudnessTarget, LoudnormStats, PostProcess, RawPcmFormat};
