//! 核心功能模块
//!
//! 本模块提供了引擎的基础功能，独立于具体的图形 API。
//!
//! # 模块组织
//!
//! - `log`：日志系统，提供结构化的日志记录功能
//! - `config`：引擎配置（config.toml + 命令行）
//! - `scene`：场景配置（scene.toml）
//! - `error`：错误处理，定义统一的错误类型
//! - `resource`：资源所有者与弱句柄
//! - `jobs`：工作线程池
//! - `profiler`：按帧记录的 CPU 计时
//! - `time`：帧间隔
//! - `input`：键盘鼠标状态与相机控制

pub mod config;
pub mod error;
pub mod input;
pub mod jobs;
pub mod log;
pub mod profiler;
pub mod resource;
pub mod scene;
pub mod time;

pub use config::Config;
pub use error::{EngineError, Result};
pub use input::InputManager;
pub use jobs::{JobHandle, JobSystem};
pub use profiler::Profiler;
pub use resource::{Resource, ResourceHandle};
pub use scene::SceneConfig;
pub use time::TimeDelta;
