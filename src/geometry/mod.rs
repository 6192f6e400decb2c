/// 几何体加载和处理模块
///
/// # 模块结构
///
/// - `vertex`: 顶点数据结构定义
/// - `mesh`: 网格数据和子网格结构
/// - `processing`: 法线重建、切线空间
/// - `loaders`: 各种格式的模型加载器
///
/// ```text
/// 文件 (OBJ/glTF/GLB)
///     ↓
/// Loader (ObjLoader/GltfLoader)
///     ↓
/// MeshData (CPU侧数据)
///     ↓
/// GpuMesh (上传到GPU)
/// ```

pub mod loaders;
pub mod mesh;
pub mod processing;
pub mod vertex;

pub use mesh::{Aabb, MeshData, Subset};
pub use vertex::Vertex;
