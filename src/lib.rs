//! Asaogea - Vulkan 渲染引擎
//!
//! 帧图驱动的前向渲染器，配合任务系统在后台加载模型，并用 egui 绘制
//! 调试叠加层。
//!
//! # 模块结构
//!
//! - `core`: 配置、日志、错误、任务系统、性能分析器、输入、资源句柄
//! - `math`: nalgebra 类型别名和投影工具
//! - `geometry`: CPU 网格数据和 OBJ / glTF 加载器
//! - `component`: 相机、方向光
//! - `gfx`: Vulkan 上下文、交换链、帧图、GPU 资源、渲染器
//! - `gui`: egui 上下文、绘制器和调试面板
//! - `progression`: 功能清单解析
//! - `engine`: 窗口与主循环
//!
//! # 示例
//!
//! ```no_run
//! use asaogea::core::{Config, SceneConfig};
//! use asaogea::engine::Engine;
//!
//! let engine = Engine::new(Config::default(), SceneConfig::default())?;
//! engine.run()?;
//! # Ok::<(), asaogea::core::EngineError>(())
//! ```

pub mod component;
pub mod core;
pub mod engine;
pub mod geometry;
pub mod gfx;
pub mod gui;
pub mod math;
pub mod progression;
