//! 着色器
//!
//! 使用 `vulkano_shaders::shader!` 宏在编译期把 GLSL 编译为 SPIR-V，并生成
//! 统一缓冲区和推送常量对应的 Rust 类型。
//!
//! | 模块        | 用途                                   |
//! |-------------|----------------------------------------|
//! | `mesh`      | 前向通道：模型 + 方向光                |
//! | `composite` | 呈现通道：全屏三角形采样前向通道结果  |
//! | `gui`       | 呈现通道：egui 网格                    |

pub mod mesh {
    /// 输入 `position`/`normal`/`texcoord`，统一缓冲区 `SceneData`（set 0）
    pub mod vs {
        vulkano_shaders::shader! {
            ty: "vertex",
            path: "src/gfx/vulkan/shaders/mesh.vert",
        }
    }

    pub mod fs {
        vulkano_shaders::shader! {
            ty: "fragment",
            path: "src/gfx/vulkan/shaders/mesh.frag",
        }
    }
}

pub mod composite {
    pub mod vs {
        vulkano_shaders::shader! {
            ty: "vertex",
            path: "src/gfx/vulkan/shaders/composite.vert",
        }
    }

    /// 采样器 `scene_color`（set 0, binding 0）
    pub mod fs {
        vulkano_shaders::shader! {
            ty: "fragment",
            path: "src/gfx/vulkan/shaders/composite.frag",
        }
    }
}

pub mod gui {
    /// 推送常量 `ScreenData { scale, translate }`
    pub mod vs {
        vulkano_shaders::shader! {
            ty: "vertex",
            path: "src/gfx/vulkan/shaders/gui.vert",
        }
    }

    pub mod fs {
        vulkano_shaders::shader! {
            ty: "fragment",
            path: "src/gfx/vulkan/shaders/gui.frag",
        }
    }
}

use std::sync::Arc;

use vulkano::device::Device;
use vulkano::shader::{EntryPoint, ShaderModule};

use crate::core::error::{GraphicsError, Result};

/// 取着色器模块的 `main` 入口
pub fn entry_point<F, E>(load: F, device: Arc<Device>, name: &str) -> Result<EntryPoint>
where
    F: FnOnce(Arc<Device>) -> std::result::Result<Arc<ShaderModule>, E>,
    E: std::fmt::Debug,
{
    load(device)
        .map_err(|e| GraphicsError::ShaderCompilation(format!("Failed to load shader '{}': {:?}", name, e)))?
        .entry_point("main")
        .ok_or_else(|| GraphicsError::ShaderCompilation(format!("Shader '{}' has no main entry point", name)).into())
}
