//! 数学库模块
//!
//! 基于 `nalgebra` 的类型别名，以及渲染中常用的投影和角度工具函数。
//!
//! 相机空间约定：左手坐标系，+X 向右、+Y 向上、+Z 指向相机前方。
//! 投影矩阵输出 Vulkan 裁剪空间：Y 轴向下，深度范围 [0, 1]。

pub use nalgebra::{
    Matrix4 as Mat4, Point3, UnitQuaternion, Vector2 as Vec2, Vector3 as Vec3,
    Vector4 as Vec4,
};

pub type Vector2 = Vec2<f32>;
pub type Vector3 = Vec3<f32>;
pub type Vector4 = Vec4<f32>;
pub type Matrix4 = Mat4<f32>;
pub type Quaternion = UnitQuaternion<f32>;

pub const DEG_TO_RAD: f32 = std::f32::consts::PI / 180.0;
pub const RAD_TO_DEG: f32 = 180.0 / std::f32::consts::PI;

#[inline]
pub fn deg_to_rad(degrees: f32) -> f32 {
    degrees * DEG_TO_RAD
}

#[inline]
pub fn rad_to_deg(radians: f32) -> f32 {
    radians * RAD_TO_DEG
}

/// 左手坐标系透视投影，输出 Vulkan 裁剪空间
///
/// `fov_y` 为弧度。视空间 z = near 映射到深度 0，z = far 映射到深度 1。
pub fn perspective_vk(fov_y: f32, aspect: f32, near: f32, far: f32) -> Matrix4 {
    let f = 1.0 / (0.5 * fov_y).tan();
    let range = far / (far - near);

    #[rustfmt::skip]
    let proj = Matrix4::new(
        f / aspect, 0.0, 0.0,   0.0,
        0.0,        -f,  0.0,   0.0,
        0.0,        0.0, range, -near * range,
        0.0,        0.0, 1.0,   0.0,
    );
    proj
}

/// 由平移、欧拉角（弧度，按 X、Y、Z 顺序施加）和缩放组合模型矩阵
pub fn compose_trs(position: &Vector3, euler: &Vector3, scale: &Vector3) -> Matrix4 {
    let rotation = Matrix4::from_axis_angle(&Vector3::z_axis(), euler.z)
        * Matrix4::from_axis_angle(&Vector3::y_axis(), euler.y)
        * Matrix4::from_axis_angle(&Vector3::x_axis(), euler.x);

    Matrix4::new_translation(position) * rotation * Matrix4::new_nonuniform_scaling(scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(m: &Matrix4, p: Vector3) -> Vector3 {
        let clip = m * Vector4::new(p.x, p.y, p.z, 1.0);
        Vector3::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w)
    }

    #[test]
    fn test_angle_conversion() {
        assert!((deg_to_rad(180.0) - std::f32::consts::PI).abs() < 1e-6);
        assert!((rad_to_deg(std::f32::consts::FRAC_PI_2) - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_perspective_depth_range() {
        let proj = perspective_vk(deg_to_rad(60.0), 16.0 / 9.0, 0.1, 100.0);
        let near = project(&proj, Vector3::new(0.0, 0.0, 0.1));
        let far = project(&proj, Vector3::new(0.0, 0.0, 100.0));
        assert!(near.z.abs() < 1e-5);
        assert!((far.z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_perspective_flips_y() {
        let proj = perspective_vk(deg_to_rad(90.0), 1.0, 1.0, 10.0);
        let above = project(&proj, Vector3::new(0.0, 1.0, 2.0));
        assert!(above.y < 0.0);
        let right = project(&proj, Vector3::new(1.0, 0.0, 2.0));
        assert!(right.x > 0.0);
    }

    #[test]
    fn test_compose_trs() {
        let m = compose_trs(
            &Vector3::new(1.0, 2.0, 3.0),
            &Vector3::zeros(),
            &Vector3::new(2.0, 2.0, 2.0),
        );
        let p = m.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_eq!(p, Point3::new(3.0, 2.0, 3.0));
    }
}
