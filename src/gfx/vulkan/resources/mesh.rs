//! GPU 网格
//!
//! 把 [`MeshData`] 上传为顶点缓冲区和索引缓冲区。索引全部能用 16 位表示时
//! 使用 `u16`，否则使用 `u32`。

use std::sync::Arc;

use vulkano::buffer::{BufferContents, BufferUsage, IndexBuffer, Subbuffer};
use vulkano::memory::allocator::StandardMemoryAllocator;
use vulkano::pipeline::graphics::vertex_input::Vertex as VertexInput;

use super::buffer::upload_iter;
use crate::core::error::{GraphicsError, Result};
use crate::geometry::{Aabb, MeshData, Subset, Vertex};

/// 传给 `mesh.vert` 的顶点格式，字段名与着色器输入一致
#[derive(BufferContents, VertexInput, Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct MeshVertex {
    #[format(R32G32B32_SFLOAT)]
    pub position: [f32; 3],
    #[format(R32G32B32_SFLOAT)]
    pub normal: [f32; 3],
    #[format(R32G32_SFLOAT)]
    pub texcoord: [f32; 2],
    #[format(R32G32B32_SFLOAT)]
    pub tangent: [f32; 3],
}

impl From<&Vertex> for MeshVertex {
    fn from(v: &Vertex) -> Self {
        Self {
            position: v.position,
            normal: v.normal,
            texcoord: v.texcoord,
            tangent: v.tangent,
        }
    }
}

/// 索引宽度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexWidth {
    U16,
    U32,
}

impl IndexWidth {
    pub fn size_in_bytes(self) -> usize {
        match self {
            IndexWidth::U16 => 2,
            IndexWidth::U32 => 4,
        }
    }
}

pub fn index_width(indices: &[u32]) -> IndexWidth {
    if indices.iter().all(|&i| i <= u16::MAX as u32) {
        IndexWidth::U16
    } else {
        IndexWidth::U32
    }
}

/// 已上传到 GPU 的网格
pub struct GpuMesh {
    pub name: Option<String>,
    pub vertex_buffer: Subbuffer<[MeshVertex]>,
    pub index_buffer: IndexBuffer,
    pub index_width: IndexWidth,
    pub subsets: Vec<Subset>,
    pub index_count: u32,
    pub bounds: Option<Aabb>,
}

impl GpuMesh {
    pub fn upload(allocator: Arc<StandardMemoryAllocator>, mesh: &MeshData) -> Result<Self> {
        mesh.validate()?;
        if mesh.indices.is_empty() {
            return Err(GraphicsError::ResourceCreation("Cannot upload a mesh without indices".to_string()).into());
        }

        let vertex_buffer = upload_iter(
            allocator.clone(),
            BufferUsage::VERTEX_BUFFER,
            mesh.vertices.iter().map(MeshVertex::from),
        )?;

        let width = index_width(&mesh.indices);
        let index_buffer = match width {
            IndexWidth::U16 => IndexBuffer::U16(upload_iter(
                allocator,
                BufferUsage::INDEX_BUFFER,
                mesh.indices.iter().map(|&i| i as u16),
            )?),
            IndexWidth::U32 => IndexBuffer::U32(upload_iter(
                allocator,
                BufferUsage::INDEX_BUFFER,
                mesh.indices.iter().copied(),
            )?),
        };

        Ok(Self {
            name: mesh.name.clone(),
            vertex_buffer,
            index_buffer,
            index_width: width,
            subsets: draw_subsets(mesh),
            index_count: mesh.indices.len() as u32,
            bounds: mesh.compute_bounds(),
        })
    }

    pub fn vertex_count(&self) -> u64 {
        self.vertex_buffer.len()
    }

    pub fn triangle_count(&self) -> u32 {
        self.index_count / 3
    }
}

/// 没有子网格时整个网格作为一次绘制
pub fn draw_subsets(mesh: &MeshData) -> Vec<Subset> {
    if mesh.subsets.is_empty() {
        vec![Subset::new(
            0,
            0,
            mesh.vertices.len() as u32,
            0,
            (mesh.indices.len() / 3) as u32,
        )]
    } else {
        mesh.subsets.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_width() {
        assert_eq!(index_width(&[0, 1, 2]), IndexWidth::U16);
        assert_eq!(index_width(&[0, 65535]), IndexWidth::U16);
        assert_eq!(index_width(&[0, 65536]), IndexWidth::U32);
        assert_eq!(IndexWidth::U16.size_in_bytes(), 2);
        assert_eq!(IndexWidth::U32.size_in_bytes(), 4);
    }

    #[test]
    fn test_vertex_conversion() {
        let v = Vertex::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.5, 0.25], [1.0, 0.0, 0.0]);
        let gpu = MeshVertex::from(&v);
        assert_eq!(gpu.position, [1.0, 2.0, 3.0]);
        assert_eq!(gpu.texcoord, [0.5, 0.25]);
        assert_eq!(std::mem::size_of::<MeshVertex>(), 44);
    }

    #[test]
    fn test_draw_subsets_fallback() {
        let mut mesh = MeshData::cube(1.0);
        mesh.subsets.clear();
        let subsets = draw_subsets(&mesh);
        assert_eq!(subsets.len(), 1);
        assert_eq!(subsets[0].index_count() as usize, mesh.index_count());

        let cube = MeshData::cube(1.0);
        assert_eq!(draw_subsets(&cube).len(), cube.subsets.len().max(1));
    }
}
