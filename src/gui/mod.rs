//! GUI 模块
//!
//! 基于 egui 的即时模式叠加层：`context` 负责输入和细分，`painter` 在
//! 呈现通道中绘制，`windows` 和 `panels` 是各个调试面板。

pub mod context;
pub mod metrics;
pub mod painter;
pub mod panels;
pub mod windows;

pub use context::{GuiContext, GuiOutput};
pub use metrics::PerformanceMetrics;
pub use painter::GuiPainter;
pub use windows::{UiFrameState, UiWindow, UiWindows};
