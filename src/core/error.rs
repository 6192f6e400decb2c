//! 错误处理模块
//!
//! 定义了引擎中使用的统一错误类型。
//!
//! 每个子系统拥有自己的错误枚举（配置、图形、资源加载、任务系统、
//! 资源句柄、帧图），最终都可以通过 `From` 转换为 [`EngineError`]，
//! 因此在引擎内部可以直接使用 `?` 传播错误。

use std::fmt;
use std::path::PathBuf;

/// 引擎统一的 Result 类型
pub type Result<T> = std::result::Result<T, EngineError>;

/// Asaogea 引擎的错误类型
#[derive(Debug)]
pub enum EngineError {
    /// 配置错误
    Config(ConfigError),

    /// 图形 API 错误
    Graphics(GraphicsError),

    /// 资源（模型、纹理）加载错误
    Asset(AssetError),

    /// 任务系统错误
    Job(JobError),

    /// 资源句柄错误
    Resource(ResourceError),

    /// 帧图错误
    FrameGraph(FrameGraphError),

    /// IO 错误
    Io(std::io::Error),

    /// 初始化错误
    Initialization(String),

    /// 运行时错误
    Runtime(String),
}

/// 配置相关的错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置文件未找到
    FileNotFound(String),

    /// 配置文件解析失败
    ParseError(String),

    /// 配置值无效
    InvalidValue { field: String, reason: String },
}

/// 图形 API 相关的错误
#[derive(Debug)]
pub enum GraphicsError {
    /// Vulkan 库或实例创建失败
    InstanceCreation(String),

    /// 没有满足要求的物理设备
    NoSuitableDevice(String),

    /// 设备创建失败
    DeviceCreation(String),

    /// 交换链错误
    SwapchainError(String),

    /// 着色器加载失败
    ShaderCompilation(String),

    /// 资源创建失败
    ResourceCreation(String),

    /// 渲染命令执行失败
    CommandExecution(String),
}

/// 资源加载相关的错误
#[derive(Debug)]
pub enum AssetError {
    /// 文件不存在
    FileNotFound(PathBuf),

    /// 不支持的文件格式
    UnsupportedFormat(String),

    /// 不支持的外部资源 URI
    UnsupportedUri(String),

    /// 解析失败
    ParseError(String),

    /// 缓冲区长度小于声明长度
    BufferTooShort { index: usize, expected: usize, actual: usize },

    /// 几何数据无效
    InvalidGeometry(String),

    /// 图片解码失败
    ImageDecode(String),
}

/// 任务系统相关的错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// 任务在执行中 panic
    Panicked(String),

    /// 任务结果通道已断开（任务未执行就被丢弃）
    Disconnected,

    /// 任务系统已关闭，不再接受新任务
    ShutDown,
}

/// 资源句柄相关的错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// 句柄指向的资源已被销毁
    Destroyed { type_name: &'static str },
}

/// 帧图相关的错误
#[derive(Debug)]
pub enum FrameGraphError {
    /// 渲染通道名称重复
    DuplicatePass(String),

    /// 渲染通道之间存在环
    Cycle(String),

    /// 渲染通道没有任何附件
    EmptyPass(String),

    /// 附件配置无效
    InvalidAttachment { pass: String, reason: String },

    /// 找不到指定的渲染通道
    UnknownPass(String),

    /// 通道录制回调返回错误
    PassFailed { pass: String, source: anyhow::Error },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Config(e) => write!(f, "Configuration error: {}", e),
            EngineError::Graphics(e) => write!(f, "Graphics error: {}", e),
            EngineError::Asset(e) => write!(f, "Asset error: {}", e),
            EngineError::Job(e) => write!(f, "Job error: {}", e),
            EngineError::Resource(e) => write!(f, "Resource error: {}", e),
            EngineError::FrameGraph(e) => write!(f, "Frame graph error: {}", e),
            EngineError::Io(e) => write!(f, "IO error: {}", e),
            EngineError::Initialization(msg) => write!(f, "Initialization error: {}", msg),
            EngineError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphicsError::InstanceCreation(msg) => write!(f, "Instance creation failed: {}", msg),
            GraphicsError::NoSuitableDevice(msg) => write!(f, "No suitable device: {}", msg),
            GraphicsError::DeviceCreation(msg) => write!(f, "Device creation failed: {}", msg),
            GraphicsError::SwapchainError(msg) => write!(f, "Swapchain error: {}", msg),
            GraphicsError::ShaderCompilation(msg) => write!(f, "Shader loading failed: {}", msg),
            GraphicsError::ResourceCreation(msg) => write!(f, "Resource creation failed: {}", msg),
            GraphicsError::CommandExecution(msg) => write!(f, "Command execution failed: {}", msg),
        }
    }
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::FileNotFound(path) => write!(f, "Asset file not found: {}", path.display()),
            AssetError::UnsupportedFormat(msg) => write!(f, "Unsupported asset format: {}", msg),
            AssetError::UnsupportedUri(uri) => write!(f, "Unsupported dependency uri: {}", uri),
            AssetError::ParseError(msg) => write!(f, "Failed to parse asset: {}", msg),
            AssetError::BufferTooShort { index, expected, actual } => write!(
                f,
                "Buffer {} is too short: expected {} bytes, got {}",
                index, expected, actual
            ),
            AssetError::InvalidGeometry(msg) => write!(f, "Invalid geometry data: {}", msg),
            AssetError::ImageDecode(msg) => write!(f, "Failed to decode image: {}", msg),
        }
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::Panicked(msg) => write!(f, "Job panicked: {}", msg),
            JobError::Disconnected => write!(f, "Job result channel disconnected"),
            JobError::ShutDown => write!(f, "Job system is shut down"),
        }
    }
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Destroyed { type_name } => {
                write!(f, "Resource of type {} has been destroyed", type_name)
            }
        }
    }
}

impl fmt::Display for FrameGraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameGraphError::DuplicatePass(name) => write!(f, "Duplicate render pass '{}'", name),
            FrameGraphError::Cycle(name) => write!(f, "Render pass '{}' depends on itself", name),
            FrameGraphError::EmptyPass(name) => write!(f, "Render pass '{}' has no attachment", name),
            FrameGraphError::InvalidAttachment { pass, reason } => {
                write!(f, "Invalid attachment in pass '{}': {}", pass, reason)
            }
            FrameGraphError::UnknownPass(name) => write!(f, "Unknown render pass '{}'", name),
            FrameGraphError::PassFailed { pass, source } => {
                write!(f, "Recording pass '{}' failed: {}", pass, source)
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Io(e) => Some(e),
            EngineError::Config(e) => Some(e),
            EngineError::Graphics(e) => Some(e),
            EngineError::Asset(e) => Some(e),
            EngineError::Job(e) => Some(e),
            EngineError::Resource(e) => Some(e),
            EngineError::FrameGraph(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for GraphicsError {}
impl std::error::Error for AssetError {}
impl std::error::Error for JobError {}
impl std::error::Error for ResourceError {}

impl std::error::Error for FrameGraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FrameGraphError::PassFailed { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

// 实现 From trait 以便于错误转换
impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err)
    }
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        EngineError::Config(err)
    }
}

impl From<GraphicsError> for EngineError {
    fn from(err: GraphicsError) -> Self {
        EngineError::Graphics(err)
    }
}

impl From<AssetError> for EngineError {
    fn from(err: AssetError) -> Self {
        EngineError::Asset(err)
    }
}

impl From<JobError> for EngineError {
    fn from(err: JobError) -> Self {
        EngineError::Job(err)
    }
}

impl From<ResourceError> for EngineError {
    fn from(err: ResourceError) -> Self {
        EngineError::Resource(err)
    }
}

impl From<FrameGraphError> for EngineError {
    fn from(err: FrameGraphError) -> Self {
        EngineError::FrameGraph(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_and_display() {
        let err: EngineError = AssetError::BufferTooShort { index: 2, expected: 64, actual: 12 }.into();
        assert!(matches!(err, EngineError::Asset(_)));
        assert_eq!(
            err.to_string(),
            "Asset error: Buffer 2 is too short: expected 64 bytes, got 12"
        );
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;

        let err: EngineError = FrameGraphError::PassFailed {
            pass: "forward".to_string(),
            source: anyhow::anyhow!("no pipeline"),
        }
        .into();
        let source = err.source().and_then(|s| s.source());
        assert_eq!(source.map(|s| s.to_string()), Some("no pipeline".to_string()));
    }
}
