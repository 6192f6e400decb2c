//! 图形模块
//!
//! 只有 Vulkan 一个后端，通过 vulkano 访问。

pub mod vulkan;

pub use vulkan::{Renderer, VulkanContext};
