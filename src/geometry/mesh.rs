//! CPU 侧网格数据
//!
//! 加载器输出 [`MeshData`]，渲染器把它上传为 GPU 网格。一个网格可以包含多个
//! [`Subset`]（glTF 的 primitive、OBJ 的对象），共享同一组顶点和索引缓冲。

use crate::core::error::AssetError;
use crate::math::Vector3;

use super::processing::{compute_tangent_space, reconstruct_normals};
use super::vertex::Vertex;

/// 子网格描述符
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subset {
    /// 子网格ID（通常对应材质ID）
    pub id: u32,
    pub vertex_start: u32,
    pub vertex_count: u32,
    /// 起始三角形
    pub face_start: u32,
    pub face_count: u32,
}

impl Subset {
    #[inline]
    pub fn new(id: u32, vertex_start: u32, vertex_count: u32, face_start: u32, face_count: u32) -> Self {
        Self {
            id,
            vertex_start,
            vertex_count,
            face_start,
            face_count,
        }
    }

    /// 索引起始位置（以索引数量计）
    #[inline]
    pub fn index_start(&self) -> u32 {
        self.face_start * 3
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.face_count * 3
    }
}

/// 轴对齐包围盒
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vector3,
    pub max: Vector3,
}

impl Aabb {
    pub fn center(&self) -> Vector3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vector3 {
        self.max - self.min
    }

    /// 包围球半径
    pub fn radius(&self) -> f32 {
        self.extent().norm() * 0.5
    }
}

#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    /// 三角形列表，每 3 个索引一个三角形
    pub indices: Vec<u32>,
    pub subsets: Vec<Subset>,
    pub name: Option<String>,
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// 边长为 `size` 的立方体，模型加载完成前作为占位显示
    pub fn cube(size: f32) -> Self {
        let h = size * 0.5;
        // (法线, 切线, 面上的四个角)
        let faces: [([f32; 3], [f32; 3]); 6] = [
            ([0.0, 0.0, -1.0], [1.0, 0.0, 0.0]),
            ([0.0, 0.0, 1.0], [-1.0, 0.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0]),
        ];

        let mut mesh = Self::with_name("Cube");
        for (face, (normal, tangent)) in faces.iter().enumerate() {
            let n = Vector3::from(*normal);
            let t = Vector3::from(*tangent);
            let b = n.cross(&t);
            let base = (face * 4) as u32;

            for (u, v) in [(0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0)] {
                let p = (n + t * (u * 2.0 - 1.0) + b * (v * 2.0 - 1.0)) * h;
                mesh.vertices.push(Vertex::new(p.into(), *normal, [u, v], *tangent));
            }
            mesh.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh.subsets.push(Subset::new(0, 0, 24, 0, 12));
        mesh
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// 验证网格数据的有效性
    ///
    /// - 索引数量是3的倍数
    /// - 所有索引都在顶点范围内
    /// - 子网格范围不越界
    pub fn validate(&self) -> Result<(), AssetError> {
        if self.indices.len() % 3 != 0 {
            return Err(AssetError::InvalidGeometry(format!(
                "index count {} is not a multiple of 3",
                self.indices.len()
            )));
        }

        let vertex_count = self.vertices.len() as u32;
        if let Some((i, &index)) = self.indices.iter().enumerate().find(|&(_, &index)| index >= vertex_count) {
            return Err(AssetError::InvalidGeometry(format!(
                "index {} at position {} is out of range ({} vertices)",
                index, i, vertex_count
            )));
        }

        let triangle_count = self.triangle_count() as u32;
        for (i, subset) in self.subsets.iter().enumerate() {
            if subset.vertex_start + subset.vertex_count > vertex_count
                || subset.face_start + subset.face_count > triangle_count
            {
                return Err(AssetError::InvalidGeometry(format!(
                    "subset {} exceeds mesh bounds", i
                )));
            }
        }

        Ok(())
    }

    /// 包围盒；空网格返回 `None`
    pub fn compute_bounds(&self) -> Option<Aabb> {
        let first = Vector3::from(self.vertices.first()?.position);
        let bounds = self.vertices.iter().fold(Aabb { min: first, max: first }, |acc, v| {
            let p = Vector3::from(v.position);
            Aabb {
                min: acc.min.inf(&p),
                max: acc.max.sup(&p),
            }
        });
        Some(bounds)
    }

    /// 重建法线和切线
    pub fn recompute_normals(&mut self) {
        reconstruct_normals(&mut self.vertices, &self.indices);
        compute_tangent_space(&mut self.vertices, &self.indices);
    }

    /// 只重算切线，保留已有法线
    pub fn recompute_tangents(&mut self) {
        compute_tangent_space(&mut self.vertices, &self.indices);
    }

    /// 加载器没有提供任何法线
    ///
    /// 只有部分顶点缺少法线时不算缺失，已有的法线不能被覆盖。
    pub fn missing_normals(&self) -> bool {
        !self.vertices.is_empty() && self.vertices.iter().all(|v| !v.has_normal())
    }

    /// 整个网格都没有法线时才重建
    pub fn recompute_normals_if_missing(&mut self) -> bool {
        let missing = self.missing_normals();
        if missing {
            self.recompute_normals();
        }
        missing
    }

    /// 追加另一个网格，子网格的 id 与偏移随之调整
    pub fn append(&mut self, other: MeshData) {
        let vertex_offset = self.vertices.len() as u32;
        let face_offset = self.triangle_count() as u32;
        let id_offset = self.subsets.len() as u32;

        self.vertices.extend(other.vertices);
        self.indices.extend(other.indices.into_iter().map(|i| i + vertex_offset));
        self.subsets.extend(other.subsets.into_iter().map(|s| Subset {
            id: s.id + id_offset,
            vertex_start: s.vertex_start + vertex_offset,
            face_start: s.face_start + face_offset,
            ..s
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> MeshData {
        let mut mesh = MeshData::with_name("Triangle");
        mesh.vertices = vec![
            Vertex::from_position([0.0, 0.0, 0.0]),
            Vertex::from_position([1.0, 0.0, 0.0]),
            Vertex::from_position([0.0, 2.0, -1.0]),
        ];
        mesh.indices = vec![0, 1, 2];
        mesh.subsets.push(Subset::new(0, 0, 3, 0, 1));
        mesh
    }

    #[test]
    fn test_subset_index_helpers() {
        let subset = Subset::new(0, 0, 100, 10, 20);
        assert_eq!(subset.index_start(), 30);
        assert_eq!(subset.index_count(), 60);
    }

    #[test]
    fn test_counts_and_validate() {
        let mesh = triangle();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.index_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_indices() {
        let mut mesh = triangle();
        mesh.indices = vec![0, 1];
        assert!(mesh.validate().is_err());

        let mut mesh = triangle();
        mesh.indices = vec![0, 1, 5];
        assert!(matches!(mesh.validate(), Err(AssetError::InvalidGeometry(_))));

        let mut mesh = triangle();
        mesh.subsets[0].face_count = 2;
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn test_bounds() {
        let bounds = triangle().compute_bounds().unwrap();
        assert_eq!(bounds.min, Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(bounds.max, Vector3::new(1.0, 2.0, 0.0));
        assert_eq!(bounds.center(), Vector3::new(0.5, 1.0, -0.5));
        assert!(MeshData::new().compute_bounds().is_none());
    }

    #[test]
    fn test_recompute_normals() {
        let mut mesh = triangle();
        assert!(mesh.missing_normals());
        mesh.recompute_normals();
        assert!(!mesh.missing_normals());
    }

    #[test]
    fn test_partial_normals_are_kept() {
        let mut mesh = triangle();
        mesh.append(triangle());
        mesh.vertices[0].normal = [0.0, 0.0, -1.0];

        assert!(!mesh.missing_normals());
        assert!(!mesh.recompute_normals_if_missing());
        assert_eq!(mesh.vertices[0].normal, [0.0, 0.0, -1.0]);
    }

    #[test]
    fn test_cube() {
        let cube = MeshData::cube(2.0);
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.triangle_count(), 12);
        assert!(cube.validate().is_ok());
        let bounds = cube.compute_bounds().unwrap();
        assert_eq!(bounds.min, Vector3::new(-1.0, -1.0, -1.0));
        assert_eq!(bounds.max, Vector3::new(1.0, 1.0, 1.0));
        assert!(!cube.missing_normals());
    }

    #[test]
    fn test_append_offsets() {
        let mut mesh = triangle();
        mesh.append(triangle());
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(&mesh.indices[3..], &[3, 4, 5]);
        assert_eq!(mesh.subsets[1], Subset::new(1, 3, 3, 1, 1));
        assert!(mesh.validate().is_ok());
    }
}
