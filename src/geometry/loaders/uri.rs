//! glTF 外部依赖 URI 解析
//!
//! glTF 的 buffer 和 image 可以通过 URI 引用外部数据：
//!
//! - `data:[<mime>];base64,<payload>`：内嵌的 base64 数据
//! - `file:///abs/path` 或 `file:/abs/path`：绝对路径
//! - 不含 `:` 的字符串：相对于模型文件所在目录的路径
//!
//! 其他协议（http 等）不支持。

use std::path::{Path, PathBuf};

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use tracing::debug;

use crate::core::error::AssetError;

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum DependencyUri<'a> {
    Base64 { mime: Option<&'a str>, payload: &'a str },
    Absolute(&'a str),
    Relative(&'a str),
}

impl<'a> DependencyUri<'a> {
    pub fn parse(uri: &'a str) -> Result<Self, AssetError> {
        if !uri.contains(':') {
            return Ok(DependencyUri::Relative(uri));
        }

        if let Some(rest) = uri.strip_prefix("data:") {
            return match rest.split_once(";base64,") {
                Some((mime, payload)) => Ok(DependencyUri::Base64 {
                    mime: (!mime.is_empty()).then_some(mime),
                    payload,
                }),
                None => Err(AssetError::UnsupportedUri(format!(
                    "{} (only base64 data uris are supported)",
                    truncate(uri)
                ))),
            };
        }

        if let Some(rest) = uri.strip_prefix("file://") {
            return Ok(DependencyUri::Absolute(rest));
        }
        if let Some(rest) = uri.strip_prefix("file:") {
            return Ok(DependencyUri::Absolute(rest));
        }

        Err(AssetError::UnsupportedUri(truncate(uri)))
    }

    /// data uri 声明的 mime 类型
    pub fn mime(&self) -> Option<&'a str> {
        match self {
            DependencyUri::Base64 { mime, .. } => *mime,
            _ => None,
        }
    }

    /// 读取 URI 指向的数据
    ///
    /// 相对路径先在 `base` 下查找，找不到再回退到当前工作目录。
    pub fn load(&self, base: &Path) -> Result<Vec<u8>, AssetError> {
        match self {
            DependencyUri::Base64 { payload, .. } => BASE64_STANDARD
                .decode(payload)
                .map_err(|e| AssetError::ParseError(format!("invalid base64 payload: {e}"))),
            DependencyUri::Absolute(path) => read_file(PathBuf::from(percent_decode(path))),
            DependencyUri::Relative(path) => {
                let relative = percent_decode(path);
                read_file(base.join(&relative)).or_else(|first_error| {
                    let cwd = std::env::current_dir().map_err(|_| first_error)?;
                    debug!(uri = %relative, "Dependency not found next to model, trying working directory");
                    read_file(cwd.join(&relative))
                })
            }
        }
    }
}

fn read_file(path: PathBuf) -> Result<Vec<u8>, AssetError> {
    std::fs::read(&path).map_err(|_| AssetError::FileNotFound(path))
}

/// 解码 URI 中的 `%XX` 转义
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(value) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(value);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn truncate(uri: &str) -> String {
    const MAX: usize = 64;
    match uri.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &uri[..idx]),
        None => uri.to_string(),
    }
}
