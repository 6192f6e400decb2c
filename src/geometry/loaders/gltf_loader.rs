//! glTF 2.0 加载器
//!
//! 支持 `.gltf`（JSON + 外部/内嵌 buffer）和 `.glb`（二进制容器）。
//! 所有 mesh 的所有三角形 primitive 合并进一个 [`MeshData`]，每个 primitive 一个子网格。
//! 节点变换不参与合并，顶点保持 mesh 局部空间。

use std::path::{Path, PathBuf};

use gltf::image::Source as ImageSource;
use gltf::mesh::util::ReadIndices;
use gltf::mesh::Mode;
use gltf::{Document, Gltf};
use image::{DynamicImage, ImageFormat};
use tracing::{debug, info, warn};

use super::uri::DependencyUri;
use super::MeshLoader;
use crate::core::error::{AssetError, Result};
use crate::geometry::mesh::{MeshData, Subset};
use crate::geometry::processing::reconstruct_normals;
use crate::geometry::vertex::Vertex;

pub struct GltfLoader {
    document: Document,
    buffers: Vec<Vec<u8>>,
    base_dir: PathBuf,
    name: String,
}

impl GltfLoader {
    /// 打开 glTF 文件并读取所有 buffer
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AssetError::FileNotFound(path.to_path_buf()).into());
        }

        let data = std::fs::read(path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut loader = Self::from_slice(&data, &base_dir)?;
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            loader.name = stem.to_string();
        }
        Ok(loader)
    }

    /// 从内存解析，相对 URI 基于 `base_dir` 查找
    pub fn from_slice(data: &[u8], base_dir: &Path) -> Result<Self> {
        let Gltf { document, mut blob } =
            Gltf::from_slice(data).map_err(|e| AssetError::ParseError(format!("gltf: {e}")))?;

        let mut buffers = Vec::with_capacity(document.buffers().len());
        for buffer in document.buffers() {
            let mut bytes = match buffer.source() {
                gltf::buffer::Source::Uri(uri) => DependencyUri::parse(uri)?.load(base_dir)?,
                gltf::buffer::Source::Bin => blob.take().ok_or_else(|| {
                    AssetError::ParseError("binary buffer referenced but the file has no BIN chunk".to_string())
                })?,
            };

            if bytes.len() < buffer.length() {
                return Err(AssetError::BufferTooShort {
                    index: buffer.index(),
                    expected: buffer.length(),
                    actual: bytes.len(),
                }
                .into());
            }
            while bytes.len() % 4 != 0 {
                bytes.push(0);
            }
            buffers.push(bytes);
        }

        debug!(buffers = buffers.len(), meshes = document.meshes().len(), "glTF document parsed");

        Ok(Self {
            document,
            buffers,
            base_dir: base_dir.to_path_buf(),
            name: "gltf".to_string(),
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// 读取所有三角形 primitive
    pub fn mesh_data(&self) -> Result<MeshData> {
        let mut mesh_data = MeshData::with_name(self.name.clone());
        let mut subset_id = 0;

        for mesh in self.document.meshes() {
            for primitive in mesh.primitives() {
                if primitive.mode() != Mode::Triangles {
                    warn!(
                        mesh = mesh.index(),
                        primitive = primitive.index(),
                        mode = ?primitive.mode(),
                        "Skipping non-triangle primitive"
                    );
                    continue;
                }

                let reader = primitive.reader(|buffer| self.buffers.get(buffer.index()).map(Vec::as_slice));

                let positions: Vec<[f32; 3]> = reader
                    .read_positions()
                    .ok_or_else(|| {
                        AssetError::InvalidGeometry(format!(
                            "primitive {} of mesh {} has no POSITION attribute",
                            primitive.index(),
                            mesh.index()
                        ))
                    })?
                    .collect();
                let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(Iterator::collect);
                let texcoords: Option<Vec<[f32; 2]>> =
                    reader.read_tex_coords(0).map(|t| t.into_f32().collect());

                let indices: Vec<u32> = match reader.read_indices() {
                    Some(ReadIndices::U8(it)) => it.map(u32::from).collect(),
                    Some(ReadIndices::U16(it)) => it.map(u32::from).collect(),
                    Some(ReadIndices::U32(it)) => it.collect(),
                    None => (0..positions.len() as u32).collect(),
                };

                if let Some(index) = indices.iter().copied().find(|&i| i as usize >= positions.len()) {
                    return Err(AssetError::InvalidGeometry(format!(
                        "primitive {} of mesh {} references vertex {} but has {} vertices",
                        primitive.index(),
                        mesh.index(),
                        index,
                        positions.len()
                    ))
                    .into());
                }

                let mut vertices: Vec<Vertex> = positions
                    .iter()
                    .enumerate()
                    .map(|(i, position)| Vertex {
                        position: *position,
                        normal: normals.as_ref().and_then(|n| n.get(i)).copied().unwrap_or_default(),
                        texcoord: texcoords.as_ref().and_then(|t| t.get(i)).copied().unwrap_or_default(),
                        tangent: [0.0; 3],
                    })
                    .collect();
                // 只重建缺少 NORMAL 的 primitive，其余 primitive 保留原有法线
                if normals.is_none() {
                    reconstruct_normals(&mut vertices, &indices);
                    debug!(mesh = mesh.index(), primitive = primitive.index(), "Normals rebuilt from faces");
                }

                // 合并后的顶点数能放进 u32，偏移后的索引就不会溢出
                let vertex_start = mesh_data.vertices.len() as u32;
                u32::try_from(mesh_data.vertices.len() + positions.len())
                    .map_err(|_| AssetError::InvalidGeometry("too many vertices".to_string()))?;
                let face_start = mesh_data.triangle_count() as u32;

                mesh_data.vertices.extend(vertices);
                mesh_data.indices.extend(indices.iter().map(|i| i + vertex_start));

                mesh_data.subsets.push(Subset::new(
                    subset_id,
                    vertex_start,
                    positions.len() as u32,
                    face_start,
                    (indices.len() / 3) as u32,
                ));
                subset_id += 1;
            }
        }

        if mesh_data.vertices.is_empty() {
            return Err(AssetError::InvalidGeometry("glTF contains no triangle geometry".to_string()).into());
        }

        mesh_data.recompute_tangents();
        mesh_data.validate()?;

        info!(
            name = %self.name,
            vertices = mesh_data.vertex_count(),
            triangles = mesh_data.triangle_count(),
            subsets = mesh_data.subsets.len(),
            "glTF mesh loaded"
        );

        Ok(mesh_data)
    }

    pub fn texture_count(&self) -> usize {
        self.document.images().len()
    }

    /// 解码第 `index` 张图片
    pub fn load_texture(&self, index: usize) -> Result<DynamicImage> {
        let image = self
            .document
            .images()
            .nth(index)
            .ok_or_else(|| AssetError::ParseError(format!("image {index} does not exist")))?;

        let decoded = match image.source() {
            ImageSource::Uri { uri, mime_type } => {
                let dependency = DependencyUri::parse(uri)?;
                let bytes = dependency.load(&self.base_dir)?;
                let name_hint = match dependency {
                    DependencyUri::Base64 { .. } => None,
                    _ => Some(uri),
                };
                decode_image(&bytes, mime_type.or(dependency.mime()), name_hint)?
            }
            ImageSource::View { view, mime_type } => {
                let buffer = self
                    .buffers
                    .get(view.buffer().index())
                    .ok_or_else(|| AssetError::ParseError("image view references a missing buffer".to_string()))?;
                let begin = view.offset();
                let end = begin + view.length();
                let bytes = buffer.get(begin..end).ok_or(AssetError::BufferTooShort {
                    index: view.buffer().index(),
                    expected: end,
                    actual: buffer.len(),
                })?;
                decode_image(bytes, Some(mime_type), None)?
            }
        };

        Ok(decoded)
    }
}

/// 确定图片格式：mime 类型优先，其次文件扩展名，最后嗅探文件头
fn decode_image(bytes: &[u8], mime: Option<&str>, name_hint: Option<&str>) -> std::result::Result<DynamicImage, AssetError> {
    let format = match mime {
        Some("image/png") => Some(ImageFormat::Png),
        Some("image/jpeg") => Some(ImageFormat::Jpeg),
        _ => None,
    }
    .or_else(|| name_hint.and_then(|name| ImageFormat::from_path(name).ok()))
    .or_else(|| image::guess_format(bytes).ok())
    .ok_or_else(|| AssetError::ImageDecode("unknown image format".to_string()))?;

    image::load_from_memory_with_format(bytes, format).map_err(|e| AssetError::ImageDecode(e.to_string()))
}

impl MeshLoader for GltfLoader {
    fn load_from_file(path: &Path) -> Result<MeshData> {
        GltfLoader::open(path)?.mesh_data()
    }

    fn load_from_memory(data: &[u8]) -> Result<MeshData> {
        let base_dir = std::env::current_dir()?;
        GltfLoader::from_slice(data, &base_dir)?.mesh_data()
    }

    fn supported_extensions() -> &'static [&'static str] {
        &["gltf", "glb"]
    }
}
