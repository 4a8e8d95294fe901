//! slidecast: timeline and synchronization engine for narrated slide
//! presentations.
//!
//! A slide list becomes a [`timeline::Timeline`] of contiguous intervals.
//! Interactive preview drives it with a [`playback::MasterClock`] and keeps
//! narration and music streams aligned through the
//! [`playback::StreamSynchronizer`]; offline export evaluates the same
//! timeline per frame in [`render::BatchRenderer`].

pub mod audio;
pub mod config;
pub mod core;
pub mod export;
pub mod narration;
pub mod playback;
pub mod render;
pub mod timeline;

pub use config::{EngineConfig, Project};
pub use timeline::{SlideDescriptor, Timeline};
