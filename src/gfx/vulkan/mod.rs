//! Vulkan 实现
//!
//! - `context`: 实例、表面、设备、队列和分配器
//! - `queues`: 队列族选择
//! - `swapchain`: 交换链创建、重建和图像获取
//! - `frame`: fence 计数、帧资源池、延迟释放队列
//! - `frame_graph`: 渲染通道的描述与编译
//! - `resources`: 缓冲区、图像、采样器、网格、管线、描述符集
//! - `shaders`: 编译期生成的着色器模块
//! - `renderer`: 把以上组合成每帧的绘制

pub mod context;
pub mod frame;
pub mod frame_graph;
pub mod queues;
pub mod renderer;
pub mod resources;
pub mod shaders;
pub mod swapchain;

pub use context::VulkanContext;
pub use frame::{DeferredReleaseQueue, FenceManager, FenceValue, FrameResourcePool};
pub use renderer::{FrameStats, Renderer, FORWARD_PASS, PRESENT_PASS};
pub use swapchain::SwapchainState;
