//! 光源组件
//!
//! 前向通道只有一盏方向光，参数随场景统一缓冲区一起上传。

use crate::math::Vector3;

/// 方向光
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// 光线前进的方向（单位向量）
    direction: Vector3,
    pub color: [f32; 3],
    pub intensity: f32,
}

impl DirectionalLight {
    pub fn new(direction: Vector3, color: [f32; 3], intensity: f32) -> Self {
        let mut light = Self {
            direction: Vector3::new(0.0, -1.0, 0.0),
            color,
            intensity,
        };
        light.set_direction(direction);
        light
    }

    pub fn direction(&self) -> Vector3 {
        self.direction
    }

    /// 零向量被忽略
    pub fn set_direction(&mut self, direction: Vector3) {
        if let Some(unit) = direction.try_normalize(f32::EPSILON) {
            self.direction = unit;
        }
    }

    /// 着色器中的 `light_dir`，w 分量为 0
    pub fn direction_uniform(&self) -> [f32; 4] {
        [self.direction.x, self.direction.y, self.direction.z, 0.0]
    }

    /// 着色器中的 `light_color`：rgb 为颜色，a 为强度
    pub fn color_uniform(&self) -> [f32; 4] {
        [self.color[0], self.color[1], self.color[2], self.intensity]
    }
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self::new(Vector3::new(-0.4, -1.0, -0.6), [1.0, 0.98, 0.95], 1.2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_is_normalized() {
        let light = DirectionalLight::new(Vector3::new(0.0, -3.0, 4.0), [1.0; 3], 2.0);
        assert!((light.direction().norm() - 1.0).abs() < 1e-6);
        assert_eq!(light.direction_uniform()[3], 0.0);
        assert_eq!(light.color_uniform(), [1.0, 1.0, 1.0, 2.0]);
    }

    #[test]
    fn test_zero_direction_ignored() {
        let mut light = DirectionalLight::default();
        let before = light.direction();
        light.set_direction(Vector3::zeros());
        assert_eq!(light.direction(), before);
    }
}
