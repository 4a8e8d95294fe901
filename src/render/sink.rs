//! Destinations for rendered frames.
//!
//! Sinks receive frames strictly in index order. The raw file sink writes
//! two headerless streams an external encoder can mux, e.g.
//! `ffmpeg -f rawvideo -pix_fmt rgba -s WxH -r FPS -i out.rgba
//!  -f f32le -ar RATE -ac CH -i out.f32le out.mp4`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::audio::AudioBuffer;
use crate::render::compositor::VideoFrame;
use crate::render::renderer::RenderError;

pub trait FrameSink {
    fn accept(
        &mut self,
        frame_index: u64,
        video: VideoFrame,
        audio: AudioBuffer,
    ) -> Result<(), RenderError>;

    fn finish(&mut self) -> Result<(), RenderError>;
}

/// Writes `<stem>.rgba` and `<stem>.f32le`.
pub struct RawFileSink {
    video_path: PathBuf,
    audio_path: PathBuf,
    video: BufWriter<File>,
    audio: BufWriter<File>,
    frames: u64,
}

impl RawFileSink {
    pub fn create(stem: &Path) -> Result<Self, RenderError> {
        let video_path = stem.with_extension("rgba");
        let audio_path = stem.with_extension("f32le");
        let video = BufWriter::new(File::create(&video_path)?);
        let audio = BufWriter::new(File::create(&audio_path)?);
        Ok(Self {
            video_path,
            audio_path,
            video,
            audio,
            frames: 0,
        })
    }

    pub fn video_path(&self) -> &Path {
        &self.video_path
    }

    pub fn audio_path(&self) -> &Path {
        &self.audio_path
    }

    pub fn frames_written(&self) -> u64 {
        self.frames
    }
}

impl FrameSink for RawFileSink {
    fn accept(
        &mut self,
        frame_index: u64,
        video: VideoFrame,
        audio: AudioBuffer,
    ) -> Result<(), RenderError> {
        if frame_index != self.frames {
            return Err(RenderError::OutOfOrder {
                expected: self.frames,
                got: frame_index,
            });
        }
        self.video.write_all(&video.data)?;
        for sample in audio.as_slice() {
            self.audio.write_all(&sample.to_le_bytes())?;
        }
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        self.video.flush()?;
        self.audio.flush()?;
        Ok(())
    }
}

/// Keeps every frame in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub frames: Vec<(u64, VideoFrame, AudioBuffer)>,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All audio concatenated in frame order.
    pub fn audio(&self) -> Vec<f32> {
        self.frames
            .iter()
            .flat_map(|(_, _, audio)| audio.as_slice().iter().copied())
            .collect()
    }
}

impl FrameSink for MemorySink {
    fn accept(
        &mut self,
        frame_index: u64,
        video: VideoFrame,
        audio: AudioBuffer,
    ) -> Result<(), RenderError> {
        self.frames.push((frame_index, video, audio));
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        self.finished = true;
        Ok(())
    }
}
