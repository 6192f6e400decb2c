//! 配置管理模块
//!
//! 提供引擎配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (config.toml)
//!
//! ```toml
//! [window]
//! width = 1280
//! height = 720
//! title = "Asaogea"
//! resizable = true
//!
//! [graphics]
//! vsync = true
//! validation_layers = false
//! frames_in_flight = 2
//! prefer_discrete_gpu = true
//!
//! [logging]
//! level = "info"      # trace, debug, info, warn, error
//! file_output = false
//!
//! [jobs]
//! worker_count = 0    # 0 = CPU 核心数
//!
//! [profiler]
//! enabled = true
//! history_frames = 120
//!
//! [input]
//! move_speed = 5.0
//! mouse_sensitivity = 0.25
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ConfigError, Result};

/// 引擎配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 窗口配置
    #[serde(default)]
    pub window: WindowConfig,

    /// 图形配置
    #[serde(default)]
    pub graphics: GraphicsConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,

    /// 任务系统配置
    #[serde(default)]
    pub jobs: JobsConfig,

    /// 性能分析器配置
    #[serde(default)]
    pub profiler: ProfilerConfig,

    /// 输入配置
    #[serde(default)]
    pub input: InputConfig,

    /// 命令行指定的模型路径，覆盖场景文件中的设置
    #[serde(skip)]
    pub model_override: Option<String>,
}

/// 窗口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// 窗口宽度
    #[serde(default = "default_width")]
    pub width: u32,

    /// 窗口高度
    #[serde(default = "default_height")]
    pub height: u32,

    /// 窗口标题
    #[serde(default = "default_title")]
    pub title: String,

    /// 是否可调整大小
    #[serde(default = "default_resizable")]
    pub resizable: bool,
}

/// 图形配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicsConfig {
    /// 垂直同步
    #[serde(default = "default_vsync")]
    pub vsync: bool,

    /// 是否启用 Vulkan 验证层
    #[serde(default = "default_validation_layers")]
    pub validation_layers: bool,

    /// 同时在飞的帧数（2 或 3）
    #[serde(default = "default_frames_in_flight")]
    pub frames_in_flight: u32,

    /// 优先选择独立显卡
    #[serde(default = "default_prefer_discrete_gpu")]
    pub prefer_discrete_gpu: bool,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// 是否输出到文件
    #[serde(default = "default_file_output")]
    pub file_output: bool,

    /// 日志文件路径
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// 任务系统配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// 工作线程数量，0 表示使用 CPU 核心数
    #[serde(default)]
    pub worker_count: usize,
}

/// 性能分析器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilerConfig {
    #[serde(default = "default_profiler_enabled")]
    pub enabled: bool,

    /// 保留的历史帧数
    #[serde(default = "default_history_frames")]
    pub history_frames: usize,
}

/// 输入配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// 相机移动速度（单位/秒）
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,

    /// 鼠标灵敏度（度/像素）
    #[serde(default = "default_mouse_sensitivity")]
    pub mouse_sensitivity: f32,
}

// 默认值函数
fn default_width() -> u32 { 1280 }
fn default_height() -> u32 { 720 }
fn default_title() -> String { "Asaogea".to_string() }
fn default_resizable() -> bool { true }
fn default_vsync() -> bool { true }
fn default_validation_layers() -> bool { cfg!(debug_assertions) }
fn default_frames_in_flight() -> u32 { 2 }
fn default_prefer_discrete_gpu() -> bool { true }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "asaogea.log".to_string() }
fn default_profiler_enabled() -> bool { true }
fn default_history_frames() -> usize { 120 }
fn default_move_speed() -> f32 { 5.0 }
fn default_mouse_sensitivity() -> f32 { 0.25 }

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
            resizable: default_resizable(),
        }
    }
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            vsync: default_vsync(),
            validation_layers: default_validation_layers(),
            frames_in_flight: default_frames_in_flight(),
            prefer_discrete_gpu: default_prefer_discrete_gpu(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self { worker_count: 0 }
    }
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            enabled: default_profiler_enabled(),
            history_frames: default_history_frames(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            move_speed: default_move_speed(),
            mouse_sensitivity: default_mouse_sensitivity(),
        }
    }
}

impl Config {
    /// 从配置文件加载
    ///
    /// ```no_run
    /// use asaogea::core::Config;
    ///
    /// let config = Config::from_file("config.toml")?;
    /// # Ok::<(), asaogea::core::EngineError>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path_str.clone()))?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，如果文件不存在或解析失败则使用默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// 支持的参数：
    /// - `--width <value>` / `--height <value>`: 窗口尺寸
    /// - `--no-vsync`: 关闭垂直同步
    /// - `--validation`: 启用验证层
    /// - `--workers <value>`: 工作线程数量
    /// - `--model <path>`: 加载指定模型
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();
        let value_of = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .and_then(|idx| args.get(idx + 1))
        };

        if let Some(width) = value_of("--width").and_then(|v| v.parse().ok()) {
            self.window.width = width;
        }

        if let Some(height) = value_of("--height").and_then(|v| v.parse().ok()) {
            self.window.height = height;
        }

        if let Some(workers) = value_of("--workers").and_then(|v| v.parse().ok()) {
            self.jobs.worker_count = workers;
        }

        if let Some(model) = value_of("--model") {
            self.model_override = Some(model.clone());
        }

        if args.iter().any(|a| a == "--no-vsync") {
            self.graphics.vsync = false;
        }

        if args.iter().any(|a| a == "--validation") {
            self.graphics.validation_layers = true;
        }
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "window.width/height".to_string(),
                reason: "Window dimensions must be greater than 0".to_string(),
            }.into());
        }

        if !(2..=3).contains(&self.graphics.frames_in_flight) {
            return Err(ConfigError::InvalidValue {
                field: "graphics.frames_in_flight".to_string(),
                reason: "Frames in flight must be 2 or 3".to_string(),
            }.into());
        }

        if self.profiler.history_frames == 0 {
            return Err(ConfigError::InvalidValue {
                field: "profiler.history_frames".to_string(),
                reason: "History must keep at least one frame".to_string(),
            }.into());
        }

        if self.input.move_speed <= 0.0 || self.input.mouse_sensitivity <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "input".to_string(),
                reason: "Move speed and mouse sensitivity must be positive".to_string(),
            }.into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.window.title, "Asaogea");
        assert_eq!(config.graphics.frames_in_flight, 2);
        assert_eq!(config.jobs.worker_count, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.window.width = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.graphics.frames_in_flight = 4;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.profiler.history_frames = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [window]
            width = 640

            [jobs]
            worker_count = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.jobs.worker_count, 3);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.profiler.history_frames, 120);
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        config.apply_args([
            "asaogea", "--width", "1920", "--height", "1080", "--no-vsync",
            "--workers", "6", "--model", "assets/box.gltf", "--validation",
        ]);

        assert_eq!(config.window.width, 1920);
        assert_eq!(config.window.height, 1080);
        assert!(!config.graphics.vsync);
        assert!(config.graphics.validation_layers);
        assert_eq!(config.jobs.worker_count, 6);
        assert_eq!(config.model_override.as_deref(), Some("assets/box.gltf"));
    }

    #[test]
    fn test_apply_args_ignores_bad_values() {
        let mut config = Config::default();
        config.apply_args(["asaogea", "--width", "wide", "--height"]);
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 720);
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir().join(format!("asaogea_config_{}.toml", std::process::id()));
        let mut config = Config::default();
        config.window.title = "Saved".to_string();
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.window.title, "Saved");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = Config::from_file_or_default("definitely/not/here.toml");
        assert_eq!(config.window.width, 1280);
    }
}
