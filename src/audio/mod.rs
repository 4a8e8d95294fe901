pub mod buffer;
pub mod meter;
pub mod mixer;
pub mod output;
pub mod pcm;

pub use buffer::AudioBuffer;
pub use meter::{LevelZone, MixLevels};
pub use mixer::{mix_frame, MixInput};
pub use output::CpalStream;
pub use pcm::{PcmBuffer, PcmError, PcmLibrary};
