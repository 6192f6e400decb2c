//! 第一人称飞行相机
//!
//! 管理相机的视锥体和视图矩阵。左手坐标系，基向量满足
//! `right = up × look`，`up = look × right`。

use crate::math::{perspective_vk, Matrix4, Vector3};
use nalgebra::Unit;
use std::f32::consts::PI;

/// 俯仰角上限，look 不能与世界上方向重合
const MAX_PITCH: f32 = 85.0 * PI / 180.0;

#[derive(Debug, Clone)]
pub struct Camera {
    position: Vector3,

    /// 相机坐标系：右向量
    right: Vector3,
    /// 相机坐标系：上向量
    up: Vector3,
    /// 相机坐标系：前向量（Look）
    look: Vector3,

    near_z: f32,
    far_z: f32,
    aspect: f32,
    /// 垂直视场角（弧度）
    fov_y: f32,

    view_matrix: Matrix4,
    proj_matrix: Matrix4,

    /// 视图矩阵是否需要更新
    view_dirty: bool,
}

impl Camera {
    /// 位于原点、朝向 +Z 的相机，FOV 45 度
    pub fn new() -> Self {
        let mut camera = Self {
            position: Vector3::zeros(),
            right: Vector3::new(1.0, 0.0, 0.0),
            up: Vector3::new(0.0, 1.0, 0.0),
            look: Vector3::new(0.0, 0.0, 1.0),
            near_z: 0.0,
            far_z: 0.0,
            aspect: 0.0,
            fov_y: 0.0,
            view_matrix: Matrix4::identity(),
            proj_matrix: Matrix4::identity(),
            view_dirty: true,
        };

        camera.set_lens(0.25 * PI, 1.0, 0.1, 1000.0);
        camera
    }

    pub fn position(&self) -> Vector3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vector3) {
        self.position = position;
        self.view_dirty = true;
    }

    pub fn right(&self) -> Vector3 {
        self.right
    }

    pub fn up(&self) -> Vector3 {
        self.up
    }

    pub fn look(&self) -> Vector3 {
        self.look
    }

    pub fn near_z(&self) -> f32 {
        self.near_z
    }

    pub fn far_z(&self) -> f32 {
        self.far_z
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// 垂直 FOV（弧度）
    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    pub fn fov_y_degrees(&self) -> f32 {
        self.fov_y * 180.0 / PI
    }

    /// 水平 FOV（弧度）
    pub fn fov_x(&self) -> f32 {
        2.0 * (self.aspect * (0.5 * self.fov_y).tan()).atan()
    }

    /// 设置透视投影参数
    ///
    /// # 参数
    /// - `fov_y`: 垂直视场角（弧度）
    /// - `aspect`: 宽高比
    /// - `near_z`: 近裁剪面距离
    /// - `far_z`: 远裁剪面距离
    pub fn set_lens(&mut self, fov_y: f32, aspect: f32, near_z: f32, far_z: f32) {
        self.fov_y = fov_y;
        self.aspect = aspect;
        self.near_z = near_z;
        self.far_z = far_z;
        self.proj_matrix = perspective_vk(fov_y, aspect, near_z, far_z);
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 && (self.aspect - aspect).abs() > f32::EPSILON {
            self.aspect = aspect;
            self.proj_matrix = perspective_vk(self.fov_y, self.aspect, self.near_z, self.far_z);
        }
    }

    /// 设置相机朝向目标点
    pub fn look_at(&mut self, position: Vector3, target: Vector3, world_up: Vector3) {
        let look = (target - position).normalize();
        let right = world_up.cross(&look).normalize();
        let up = look.cross(&right);

        self.position = position;
        self.look = look;
        self.right = right;
        self.up = up;
        self.view_dirty = true;
    }

    pub fn view_matrix(&mut self) -> Matrix4 {
        if self.view_dirty {
            self.update_view_matrix();
        }
        self.view_matrix
    }

    pub fn proj_matrix(&self) -> Matrix4 {
        self.proj_matrix
    }

    pub fn view_proj(&mut self) -> Matrix4 {
        self.proj_matrix * self.view_matrix()
    }

    /// 左右平移，正值向右
    pub fn strafe(&mut self, distance: f32) {
        self.position += self.right * distance;
        self.view_dirty = true;
    }

    /// 前后移动，正值向前
    pub fn walk(&mut self, distance: f32) {
        self.position += self.look * distance;
        self.view_dirty = true;
    }

    /// 沿世界 Y 轴升降
    pub fn elevate(&mut self, distance: f32) {
        self.position.y += distance;
        self.view_dirty = true;
    }

    /// 绕 Right 轴旋转（正值向下看）
    pub fn pitch(&mut self, angle: f32) {
        let current = (-self.look.y).clamp(-1.0, 1.0).asin();
        let angle = (current + angle).clamp(-MAX_PITCH, MAX_PITCH) - current;
        if angle.abs() < 1e-6 {
            return;
        }

        let axis = Unit::new_normalize(self.right);
        let rotation = Matrix4::from_axis_angle(&axis, angle);

        self.up = rotation.transform_vector(&self.up).normalize();
        self.look = rotation.transform_vector(&self.look).normalize();
        self.view_dirty = true;
    }

    /// 绕世界 Y 轴旋转（正值向右转）
    pub fn rotate_y(&mut self, angle: f32) {
        let rotation = Matrix4::from_axis_angle(&Vector3::y_axis(), angle);

        self.right = rotation.transform_vector(&self.right).normalize();
        self.up = rotation.transform_vector(&self.up).normalize();
        self.look = rotation.transform_vector(&self.look).normalize();
        self.view_dirty = true;
    }

    /// 重新正交化坐标轴并重建视图矩阵
    pub fn update_view_matrix(&mut self) {
        if !self.view_dirty {
            return;
        }

        let look = self.look.normalize();
        let up = look.cross(&self.right).normalize();
        let right = up.cross(&look);

        let x = -self.position.dot(&right);
        let y = -self.position.dot(&up);
        let z = -self.position.dot(&look);

        self.right = right;
        self.up = up;
        self.look = look;

        #[rustfmt::skip]
        let view = Matrix4::new(
            right.x, right.y, right.z, x,
            up.x,    up.y,    up.z,    y,
            look.x,  look.y,  look.z,  z,
            0.0,     0.0,     0.0,     1.0,
        );

        self.view_matrix = view;
        self.view_dirty = false;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{deg_to_rad, Vector4};

    fn approx(a: Vector3, b: Vector3) -> bool {
        (a - b).norm() < 1e-4
    }

    fn transform_point(m: &Matrix4, p: Vector3) -> Vector4 {
        m * Vector4::new(p.x, p.y, p.z, 1.0)
    }

    #[test]
    fn test_default_view_is_identity() {
        let mut camera = Camera::new();
        assert_eq!(camera.view_matrix(), Matrix4::identity());
    }

    #[test]
    fn test_view_moves_world_opposite_to_camera() {
        let mut camera = Camera::new();
        camera.set_position(Vector3::new(1.0, 2.0, 3.0));
        let p = transform_point(&camera.view_matrix(), Vector3::new(1.0, 2.0, 8.0));
        assert!(approx(p.xyz(), Vector3::new(0.0, 0.0, 5.0)));
    }

    #[test]
    fn test_walk_strafe_elevate() {
        let mut camera = Camera::new();
        camera.walk(2.0);
        camera.strafe(-1.0);
        camera.elevate(0.5);
        assert!(approx(camera.position(), Vector3::new(-1.0, 0.5, 2.0)));
    }

    #[test]
    fn test_rotate_y_turns_right() {
        let mut camera = Camera::new();
        camera.rotate_y(deg_to_rad(90.0));
        assert!(approx(camera.look(), Vector3::new(1.0, 0.0, 0.0)));
        assert!(approx(camera.right(), Vector3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = Camera::new();
        camera.pitch(deg_to_rad(30.0));
        assert!(camera.look().y < 0.0);

        camera.pitch(deg_to_rad(80.0));
        let expected = -deg_to_rad(85.0).sin();
        assert!((camera.look().y - expected).abs() < 1e-4);
    }

    #[test]
    fn test_look_at() {
        let mut camera = Camera::new();
        camera.look_at(Vector3::new(0.0, 0.0, -5.0), Vector3::zeros(), Vector3::y());
        assert!(approx(camera.look(), Vector3::new(0.0, 0.0, 1.0)));
        assert!(approx(camera.right(), Vector3::new(1.0, 0.0, 0.0)));
        assert!(approx(camera.up(), Vector3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_view_proj_projects_visible_point() {
        let mut camera = Camera::new();
        camera.set_lens(deg_to_rad(60.0), 16.0 / 9.0, 0.1, 100.0);
        camera.look_at(Vector3::new(0.0, 0.0, -5.0), Vector3::zeros(), Vector3::y());

        let clip = transform_point(&camera.view_proj(), Vector3::new(0.0, 1.0, 0.0));
        let ndc = clip.xyz() / clip.w;
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
        // Vulkan 裁剪空间 Y 向下
        assert!(ndc.y < 0.0);
    }

    #[test]
    fn test_set_aspect_ignores_invalid() {
        let mut camera = Camera::new();
        camera.set_aspect(0.0);
        assert_eq!(camera.aspect(), 1.0);
        camera.set_aspect(2.0);
        assert_eq!(camera.aspect(), 2.0);
        assert!(camera.fov_x() > camera.fov_y());
    }
}
