//! 帧图（Render Graph）
//!
//! - `definition`: 通道和附件的纯数据描述、校验、执行顺序
//! - `instance`: 编译成渲染通道和帧缓冲，按顺序录制
//!
//! ```text
//! present (swapchain)
//!   └── forward (RGBA16F + D32)
//! ```

pub mod definition;
pub mod instance;

pub use definition::{AttachmentDesc, ClearValue, FrameGraph, RenderPassDesc, RenderTarget};
pub use instance::{recorder, FrameGraphInstance, PassContext, PassRecorder, PassRecorders};
