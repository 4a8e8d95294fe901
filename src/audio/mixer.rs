//! Per-frame audio mixing for the batch renderer.
//! Narration and music are summed with their gains, then hard-limited.

use crate::audio::buffer::AudioBuffer;
use crate::audio::meter::{self, MixLevels};
use crate::audio::pcm::PcmBuffer;
use crate::core::time::Time;

/// One source contributing to a mixed block.
#[derive(Debug, Clone, Copy)]
pub struct MixInput<'a> {
    pub pcm: &'a PcmBuffer,
    /// Position inside the source where this block starts
    pub offset: Time,
    pub gain: f32,
    pub looping: bool,
}

impl<'a> MixInput<'a> {
    pub fn new(pcm: &'a PcmBuffer, offset: Time, gain: f32) -> Self {
        Self {
            pcm,
            offset,
            gain,
            looping: false,
        }
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }
}

/// Mix narration and music into `out`, which must already hold the block's
/// zeroed samples. Missing inputs contribute silence.
///
/// Returns each source's RMS level after gain, measured before clipping.
pub fn mix_frame(
    out: &mut AudioBuffer,
    narration: Option<MixInput<'_>>,
    music: Option<MixInput<'_>>,
) -> MixLevels {
    let mut scratch = vec![0.0f32; out.as_slice().len()];
    let levels = MixLevels {
        narration: narration.map_or(0.0, |input| add_input(out, &mut scratch, input)),
        music: music.map_or(0.0, |input| add_input(out, &mut scratch, input)),
    };
    out.clip();
    levels
}

fn add_input(out: &mut AudioBuffer, scratch: &mut [f32], input: MixInput<'_>) -> f32 {
    scratch.fill(0.0);
    input.pcm.mix_into(
        scratch,
        out.sample_rate,
        out.channels,
        input.offset,
        input.gain,
        input.looping,
    );
    for (o, s) in out.as_mut_slice().iter_mut().zip(scratch.iter()) {
        *o += *s;
    }
    meter::rms(scratch)
}
