//! GUI 面板
//!
//! 每个面板是一个 [`UiWindow`](crate::gui::UiWindow)。

pub mod camera;
pub mod checklist;
pub mod frame_graph;
pub mod profiler;
pub mod stats;

pub use camera::CameraWindow;
pub use checklist::ChecklistWindow;
pub use frame_graph::FrameGraphWindow;
pub use profiler::ProfilerWindow;
pub use stats::StatsWindow;
