//! CPU 侧顶点定义
//!
//! 加载器统一输出这个结构，渲染器上传时再转换为 GPU 顶点格式。

use bytemuck::{Pod, Zeroable};

/// 完整的 3D 顶点
///
/// 内存布局：position 12 + normal 12 + texcoord 8 + tangent 12 = 44 字节。
#[repr(C)]
#[derive(Default, Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    /// 单位法线，加载器缺失法线时为零向量
    pub normal: [f32; 3],
    pub texcoord: [f32; 2],
    pub tangent: [f32; 3],
}

impl Vertex {
    #[inline]
    pub fn new(position: [f32; 3], normal: [f32; 3], texcoord: [f32; 2], tangent: [f32; 3]) -> Self {
        Self {
            position,
            normal,
            texcoord,
            tangent,
        }
    }

    /// 只有位置的顶点，其余属性留给后处理计算
    #[inline]
    pub fn from_position(position: [f32; 3]) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn has_normal(&self) -> bool {
        self.normal.iter().any(|c| *c != 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    #[test]
    fn test_vertex_layout() {
        assert_eq!(size_of::<Vertex>(), 44);
        assert_eq!(align_of::<Vertex>(), 4);
    }

    #[test]
    fn test_from_position() {
        let vertex = Vertex::from_position([1.0, 2.0, 3.0]);
        assert_eq!(vertex.position, [1.0, 2.0, 3.0]);
        assert!(!vertex.has_normal());
        assert_eq!(vertex.texcoord, [0.0, 0.0]);
    }

    #[test]
    fn test_cast_to_bytes() {
        let vertices = [Vertex::default(); 2];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 88);
    }
}
