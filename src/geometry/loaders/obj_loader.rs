/// OBJ 文件加载器
///
/// 使用 tobj crate 加载 Wavefront OBJ 格式的3D模型。
/// 支持顶点位置、法线、纹理坐标的加载，并可自动重建缺失的法线和切线。
use super::MeshLoader;
use crate::core::error::{AssetError, Result};
use crate::geometry::mesh::{MeshData, Subset};
use crate::geometry::processing::reconstruct_normals;
use crate::geometry::vertex::Vertex;
use std::io::{BufReader, Cursor};
use std::path::Path;

/// OBJ 格式加载器
///
/// - 自动三角化
/// - UV 坐标翻转（V轴：1.0 - v）
/// - 自动重建缺失的法线
/// - 有 UV 时计算切线空间
pub struct ObjLoader;

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

impl ObjLoader {
    fn build(models: Vec<tobj::Model>, name: &str) -> Result<MeshData> {
        if models.is_empty() {
            return Err(AssetError::InvalidGeometry("OBJ contains no models".to_string()).into());
        }

        let mut mesh_data = MeshData::with_name(name);
        let mut has_texcoords = false;

        // OBJ 可能包含多个对象，每个对象一个子网格
        for (mesh_idx, model) in models.iter().enumerate() {
            let mesh = &model.mesh;
            let positions = &mesh.positions;
            let normals = &mesh.normals;
            let texcoords = &mesh.texcoords;

            if positions.len() % 3 != 0 {
                return Err(AssetError::InvalidGeometry(format!(
                    "object '{}' has {} position floats",
                    model.name,
                    positions.len()
                ))
                .into());
            }

            let vertex_start = mesh_data.vertices.len() as u32;
            let face_start = mesh_data.triangle_count() as u32;
            let vertex_count = positions.len() / 3;

            has_texcoords |= !texcoords.is_empty();

            let mut vertices: Vec<Vertex> = (0..vertex_count)
                .map(|i| {
                    let position = [positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]];

                    let normal = normals
                        .get(i * 3..i * 3 + 3)
                        .map(|n| [n[0], n[1], n[2]])
                        .unwrap_or_default();

                    // 翻转V坐标
                    let texcoord = texcoords
                        .get(i * 2..i * 2 + 2)
                        .map(|t| [t[0], 1.0 - t[1]])
                        .unwrap_or_default();

                    Vertex::new(position, normal, texcoord, [0.0; 3])
                })
                .collect();

            // 只重建没有法线的对象
            if normals.is_empty() {
                tracing::info!(name, object = %model.name, "OBJ object has no normals, rebuilding");
                reconstruct_normals(&mut vertices, &mesh.indices);
            }

            mesh_data.vertices.extend(vertices);
            mesh_data.indices.extend(mesh.indices.iter().map(|&index| vertex_start + index));

            mesh_data.subsets.push(Subset::new(
                mesh_idx as u32,
                vertex_start,
                vertex_count as u32,
                face_start,
                (mesh.indices.len() / 3) as u32,
            ));
        }

        if mesh_data.vertices.is_empty() {
            return Err(AssetError::InvalidGeometry("OBJ contains no vertices".to_string()).into());
        }

        if has_texcoords {
            mesh_data.recompute_tangents();
        } else {
            tracing::debug!(name, "OBJ has no texcoords, tangents left empty");
        }

        mesh_data.validate()?;

        tracing::info!(
            name,
            vertices = mesh_data.vertex_count(),
            triangles = mesh_data.triangle_count(),
            subsets = mesh_data.subsets.len(),
            "OBJ mesh loaded"
        );

        Ok(mesh_data)
    }
}

impl MeshLoader for ObjLoader {
    fn load_from_file(path: &Path) -> Result<MeshData> {
        if !path.exists() {
            return Err(AssetError::FileNotFound(path.to_path_buf()).into());
        }

        let (models, _materials) = tobj::load_obj(path, &load_options())
            .map_err(|e| AssetError::ParseError(format!("obj: {}", e)))?;

        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("Unnamed");
        Self::build(models, name)
    }

    fn load_from_memory(data: &[u8]) -> Result<MeshData> {
        let mut reader = BufReader::new(Cursor::new(data));
        // 内存中的 OBJ 无法解析 mtllib，材质一律忽略
        let (models, _materials) = tobj::load_obj_buf(&mut reader, &load_options(), |_| {
            Err(tobj::LoadError::OpenFileFailed)
        })
        .map_err(|e| AssetError::ParseError(format!("obj: {}", e)))?;

        Self::build(models, "Unnamed")
    }

    fn supported_extensions() -> &'static [&'static str] {
        &["obj"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
o Quad
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
f 1/1 2/2 3/3 4/4
";

    #[test]
    fn test_supported_extensions() {
        assert_eq!(ObjLoader::supported_extensions(), &["obj"]);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ObjLoader::load_from_file(Path::new("nonexistent.obj"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_memory_triangulates() {
        let mesh = ObjLoader::load_from_memory(QUAD.as_bytes()).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.subsets.len(), 1);
        assert!(!mesh.missing_normals());
        // V 被翻转
        assert_eq!(mesh.vertices[0].texcoord, [0.0, 1.0]);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("asaogea_quad_{}.obj", std::process::id()));
        std::fs::write(&path, QUAD).unwrap();

        let mesh = ObjLoader::load_from_file(&path).unwrap();
        assert_eq!(mesh.name.as_deref(), path.file_stem().and_then(|s| s.to_str()));
        assert!(mesh.validate().is_ok());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_empty_obj_is_rejected() {
        assert!(ObjLoader::load_from_memory(b"# nothing here\n").is_err());
    }
}
