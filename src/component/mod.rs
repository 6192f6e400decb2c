//! 场景组件
//!
//! 第一人称相机和方向光。

mod camera;
mod light;

pub use camera::Camera;
pub use light::DirectionalLight;
