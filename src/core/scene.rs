//! 场景配置模块
//!
//! 定义场景配置（scene.toml），包括相机、模型的变换和参数以及清屏颜色。
//!
//! ```toml
//! clear_color = [0.1, 0.1, 0.12, 1.0]
//!
//! [camera]
//! fov = 60.0
//! transform = { position = [0.0, 1.0, -4.0], rotation = [10.0, 0.0, 0.0] }
//!
//! [model]
//! path = "assets/models/model.glb"
//! transform = { scale = [1.0, 1.0, 1.0] }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::component::Camera;
use crate::core::error::{ConfigError, Result};
use crate::math::{compose_trs, deg_to_rad, Matrix4, Vector3};

/// 3D 变换数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    #[serde(default = "default_position")]
    pub position: [f32; 3],

    /// 旋转（欧拉角，度数）(pitch, yaw, roll)
    #[serde(default = "default_rotation")]
    pub rotation: [f32; 3],

    #[serde(default = "default_scale")]
    pub scale: [f32; 3],
}

fn default_position() -> [f32; 3] {
    [0.0, 0.0, 0.0]
}

fn default_rotation() -> [f32; 3] {
    [0.0, 0.0, 0.0]
}

fn default_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: default_position(),
            rotation: default_rotation(),
            scale: default_scale(),
        }
    }
}

impl Transform {
    /// 模型矩阵 T * R * S
    pub fn to_matrix(&self) -> Matrix4 {
        let euler = Vector3::from(self.rotation).map(deg_to_rad);
        compose_trs(&Vector3::from(self.position), &euler, &Vector3::from(self.scale))
    }
}

/// 相机配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// 只使用 position 与 rotation 的 pitch/yaw
    #[serde(default)]
    pub transform: Transform,

    /// 垂直视野角度（度数）
    #[serde(default = "default_fov")]
    pub fov: f32,

    #[serde(default = "default_near_clip")]
    pub near_clip: f32,

    #[serde(default = "default_far_clip")]
    pub far_clip: f32,
}

fn default_fov() -> f32 {
    60.0
}

fn default_near_clip() -> f32 {
    0.1
}

fn default_far_clip() -> f32 {
    100.0
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            transform: Transform {
                position: [0.0, 0.0, -3.0],
                ..Transform::default()
            },
            fov: default_fov(),
            near_clip: default_near_clip(),
            far_clip: default_far_clip(),
        }
    }
}

impl CameraConfig {
    /// 按配置创建相机
    pub fn build_camera(&self, aspect: f32) -> Camera {
        let mut camera = Camera::new();
        camera.set_lens(deg_to_rad(self.fov), aspect, self.near_clip, self.far_clip);
        camera.set_position(Vector3::from(self.transform.position));
        camera.rotate_y(deg_to_rad(self.transform.rotation[1]));
        camera.pitch(deg_to_rad(self.transform.rotation[0]));
        camera
    }
}

/// 模型配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// 模型文件路径（.obj / .gltf / .glb）
    pub path: String,

    #[serde(default)]
    pub transform: Transform,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "assets/models/model.glb".to_string(),
            transform: Transform::default(),
        }
    }
}

/// 场景配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub model: ModelConfig,

    /// 前向渲染通道的清屏颜色
    #[serde(default = "default_clear_color")]
    pub clear_color: [f32; 4],
}

fn default_clear_color() -> [f32; 4] {
    [0.1, 0.1, 0.12, 1.0]
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            model: ModelConfig::default(),
            clear_color: default_clear_color(),
        }
    }
}

impl SceneConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ConfigError::FileNotFound(format!(
                "Failed to read scene config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("Failed to parse scene config: {}", e)).into())
    }

    /// 从文件加载，如果文件不存在或解析失败则返回默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("Scene config not found, using defaults");
            return Self::default();
        }

        match Self::from_file(path) {
            Ok(config) => {
                tracing::info!("Loaded scene config from: {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("Failed to load scene config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(format!("Failed to serialize scene config: {}", e)))?;

        fs::write(path, contents)?;
        tracing::info!("Saved scene config to: {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector4;

    #[test]
    fn test_default_transform() {
        let transform = Transform::default();
        assert_eq!(transform.position, [0.0, 0.0, 0.0]);
        assert_eq!(transform.rotation, [0.0, 0.0, 0.0]);
        assert_eq!(transform.scale, [1.0, 1.0, 1.0]);
        assert_eq!(transform.to_matrix(), Matrix4::identity());
    }

    #[test]
    fn test_transform_to_matrix() {
        let transform = Transform {
            position: [1.0, 2.0, 3.0],
            rotation: [0.0, 90.0, 0.0],
            scale: [2.0, 2.0, 2.0],
        };
        let matrix = transform.to_matrix();

        assert!((matrix[(0, 3)] - 1.0).abs() < 0.001);
        assert!((matrix[(1, 3)] - 2.0).abs() < 0.001);
        assert!((matrix[(2, 3)] - 3.0).abs() < 0.001);

        // 缩放后绕 Y 旋转 90 度：+Z 轴转到 +X
        let p = matrix * Vector4::new(0.0, 0.0, 1.0, 1.0);
        assert!((p.x - 3.0).abs() < 1e-4);
        assert!((p.z - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_camera_from_config() {
        let config = CameraConfig {
            transform: Transform {
                position: [0.0, 1.0, -4.0],
                rotation: [0.0, 90.0, 0.0],
                ..Transform::default()
            },
            ..CameraConfig::default()
        };
        let camera = config.build_camera(2.0);
        assert_eq!(camera.position(), Vector3::new(0.0, 1.0, -4.0));
        assert!((camera.look().x - 1.0).abs() < 1e-4);
        assert_eq!(camera.aspect(), 2.0);
        assert!((camera.fov_y_degrees() - 60.0).abs() < 1e-3);
    }

    #[test]
    fn test_default_scene() {
        let scene = SceneConfig::default();
        assert_eq!(scene.camera.fov, 60.0);
        assert_eq!(scene.model.path, "assets/models/model.glb");
        assert_eq!(scene.clear_color[3], 1.0);
    }

    #[test]
    fn test_partial_scene_toml() {
        let scene: SceneConfig = toml::from_str(
            r#"
            [model]
            path = "box.gltf"
            "#,
        )
        .unwrap();
        assert_eq!(scene.model.path, "box.gltf");
        assert_eq!(scene.model.transform, Transform::default());
        assert_eq!(scene.camera.near_clip, 0.1);
    }

    #[test]
    fn test_scene_save_and_load() {
        let path = std::env::temp_dir().join(format!("asaogea_scene_{}.toml", std::process::id()));
        let mut scene = SceneConfig::default();
        scene.clear_color = [1.0, 0.0, 0.0, 1.0];
        scene.save_to_file(&path).unwrap();

        let loaded = SceneConfig::from_file(&path).unwrap();
        assert_eq!(loaded.clear_color, [1.0, 0.0, 0.0, 1.0]);
        assert!(SceneConfig::from_file("missing_scene.toml").is_err());

        let _ = std::fs::remove_file(&path);
    }
}
