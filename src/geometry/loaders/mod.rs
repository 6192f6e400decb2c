/// 模型加载器模块
///
/// 提供统一的模型加载接口和各种格式的具体实现。
///
/// # 支持的格式
///
/// - **OBJ**: Wavefront OBJ 格式（使用 tobj crate）
/// - **glTF**: `.gltf` / `.glb`（使用 gltf crate）
///
/// # 使用示例
///
/// ```rust,no_run
/// use asaogea::geometry::loaders::load_mesh;
/// use std::path::Path;
///
/// let mesh = load_mesh(Path::new("model.glb"))?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
use crate::core::error::{AssetError, Result};
use crate::geometry::mesh::MeshData;
use std::path::Path;

pub mod gltf_loader;
pub mod obj_loader;
pub mod uri;

pub use gltf_loader::GltfLoader;
pub use obj_loader::ObjLoader;
pub use uri::DependencyUri;

/// 网格加载器 trait
///
/// 加载器返回 CPU 侧的 `MeshData`，不涉及 GPU 资源。
pub trait MeshLoader {
    /// 从文件路径加载网格
    fn load_from_file(path: &Path) -> Result<MeshData>;

    /// 从内存数据加载网格
    fn load_from_memory(data: &[u8]) -> Result<MeshData>;

    /// 支持的扩展名（小写，不含点号）
    fn supported_extensions() -> &'static [&'static str];
}

/// 根据文件扩展名选择合适的加载器
pub fn load_mesh(path: &Path) -> Result<MeshData> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .ok_or_else(|| AssetError::UnsupportedFormat(format!("{} has no file extension", path.display())))?;

    if ObjLoader::supported_extensions().contains(&extension.as_str()) {
        ObjLoader::load_from_file(path)
    } else if GltfLoader::supported_extensions().contains(&extension.as_str()) {
        GltfLoader::load_from_file(path)
    } else {
        Err(AssetError::UnsupportedFormat(format!(".{}", extension)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::EngineError;

    #[test]
    fn test_supported_extensions() {
        assert!(ObjLoader::supported_extensions().contains(&"obj"));
        assert!(GltfLoader::supported_extensions().contains(&"gltf"));
        assert!(GltfLoader::supported_extensions().contains(&"glb"));
    }

    #[test]
    fn test_load_mesh_rejects_unknown_extension() {
        let err = load_mesh(Path::new("model.fbx")).err().unwrap();
        assert!(matches!(err, EngineError::Asset(AssetError::UnsupportedFormat(_))));

        let err = load_mesh(Path::new("model")).err().unwrap();
        assert!(matches!(err, EngineError::Asset(AssetError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_load_mesh_dispatch_is_case_insensitive() {
        let err = load_mesh(Path::new("missing/Model.OBJ")).err().unwrap();
        assert!(matches!(err, EngineError::Asset(AssetError::FileNotFound(_))));
    }
}
