//! 网格后处理：法线重建与切线空间计算

use crate::math::{Vector2, Vector3};

use super::vertex::Vertex;

#[inline]
fn v3(a: [f32; 3]) -> Vector3 {
    Vector3::new(a[0], a[1], a[2])
}

/// 归一化，零向量保持为零
#[inline]
fn normalize_or_zero(v: Vector3) -> Vector3 {
    v.try_normalize(1e-6).unwrap_or_else(Vector3::zeros)
}

/// 从三角形面重建顶点法线
///
/// 面法线按面积加权（未归一化的叉乘）累加到三个顶点上，最后统一归一化。
/// 超出顶点范围的索引所在的三角形被跳过。
pub fn reconstruct_normals(vertices: &mut [Vertex], indices: &[u32]) {
    let mut accumulated = vec![Vector3::zeros(); vertices.len()];

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
        if i0 >= vertices.len() || i1 >= vertices.len() || i2 >= vertices.len() {
            continue;
        }

        let p0 = v3(vertices[i0].position);
        let face_normal = (v3(vertices[i1].position) - p0).cross(&(v3(vertices[i2].position) - p0));

        accumulated[i0] += face_normal;
        accumulated[i1] += face_normal;
        accumulated[i2] += face_normal;
    }

    for (vertex, normal) in vertices.iter_mut().zip(accumulated) {
        vertex.normal = normalize_or_zero(normal).into();
    }
}

/// 计算切线向量（用于法线贴图）
///
/// UV 退化的三角形不参与累加。结果经过 Gram-Schmidt 正交化。
pub fn compute_tangent_space(vertices: &mut [Vertex], indices: &[u32]) {
    let mut accumulated = vec![Vector3::zeros(); vertices.len()];

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
        if i0 >= vertices.len() || i1 >= vertices.len() || i2 >= vertices.len() {
            continue;
        }

        let (v0, v1, v2) = (&vertices[i0], &vertices[i1], &vertices[i2]);
        let dp1 = v3(v1.position) - v3(v0.position);
        let dp2 = v3(v2.position) - v3(v0.position);
        let duv1 = Vector2::from(v1.texcoord) - Vector2::from(v0.texcoord);
        let duv2 = Vector2::from(v2.texcoord) - Vector2::from(v0.texcoord);

        let det = duv1.x * duv2.y - duv1.y * duv2.x;
        if det.abs() < 1e-6 {
            continue;
        }

        let tangent = (dp1 * duv2.y - dp2 * duv1.y) / det;
        accumulated[i0] += tangent;
        accumulated[i1] += tangent;
        accumulated[i2] += tangent;
    }

    for (vertex, tangent) in vertices.iter_mut().zip(accumulated) {
        let normal = v3(vertex.normal);
        let orthogonal = tangent - normal * normal.dot(&tangent);
        vertex.tangent = normalize_or_zero(orthogonal).into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_xz() -> (Vec<Vertex>, Vec<u32>) {
        let mut vertices = vec![
            Vertex::from_position([0.0, 0.0, 0.0]),
            Vertex::from_position([0.0, 0.0, 1.0]),
            Vertex::from_position([1.0, 0.0, 1.0]),
            Vertex::from_position([1.0, 0.0, 0.0]),
        ];
        vertices[0].texcoord = [0.0, 0.0];
        vertices[1].texcoord = [0.0, 1.0];
        vertices[2].texcoord = [1.0, 1.0];
        vertices[3].texcoord = [1.0, 0.0];
        (vertices, vec![0, 1, 2, 0, 2, 3])
    }

    #[test]
    fn test_reconstruct_normals_points_up() {
        let (mut vertices, indices) = quad_xz();
        reconstruct_normals(&mut vertices, &indices);
        for vertex in &vertices {
            assert!((vertex.normal[1] - 1.0).abs() < 1e-5, "{:?}", vertex.normal);
        }
    }

    #[test]
    fn test_unreferenced_vertex_keeps_zero_normal() {
        let (mut vertices, _) = quad_xz();
        reconstruct_normals(&mut vertices, &[0, 1, 2]);
        assert_eq!(vertices[3].normal, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_out_of_range_triangle_skipped() {
        let (mut vertices, _) = quad_xz();
        reconstruct_normals(&mut vertices, &[0, 1, 9]);
        assert!(vertices.iter().all(|v| !v.has_normal()));
    }

    #[test]
    fn test_tangents_follow_u_axis() {
        let (mut vertices, indices) = quad_xz();
        reconstruct_normals(&mut vertices, &indices);
        compute_tangent_space(&mut vertices, &indices);
        for vertex in &vertices {
            assert!((vertex.tangent[0] - 1.0).abs() < 1e-5, "{:?}", vertex.tangent);
        }
    }
}
