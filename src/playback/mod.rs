pub mod clock;
pub mod engine;
pub mod media;
pub mod state;
pub mod sync;

#[cfg(test)]
pub(crate) mod fake;

pub use clock::{ClockEvent, MasterClock};
pub use engine::{FrameOutcome, PlaybackCommand, PlaybackEngine};
pub use media::{MediaError, MediaPrimitive};
pub use state::PlaybackState;
pub use sync::{resolve_stream_state, StreamState, StreamSynchronizer, SyncReport};
