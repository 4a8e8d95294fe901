pub mod seek;
pub mod slide;
#[allow(clippy::module_inception)]
pub mod timeline;

pub use seek::{locate, SeekTarget};
pub use slide::SlideDescriptor;
pub use timeline::{build_timeline, Interval, SlideCue, Timeline};
