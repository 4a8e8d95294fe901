pub mod compositor;
pub mod plan;
pub mod renderer;
pub mod schedule;
pub mod sink;
pub mod transition;

pub use compositor::{StillCompositor, VideoFrame, VisualSource};
pub use plan::{FramePlan, RenderPlan};
pub use renderer::{BatchRenderer, RenderError, RenderStats, RenderedFrame};
pub use schedule::{gain, FrameSegment, VolumeSchedule};
pub use sink::{FrameSink, MemorySink, RawFileSink};
pub use transition::TransitionState;
