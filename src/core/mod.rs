//! Core types shared by every subsystem.
//!
//! Time is integer nanoseconds (i64); media resources are opaque handles.

pub mod media;
pub mod time;

pub use media::{MediaRef, Transition, VisualKind};
pub use time::{Time, ZERO};
