//! 采样器

use std::sync::Arc;

use vulkano::device::Device;
use vulkano::image::sampler::{Filter, Sampler, SamplerAddressMode, SamplerCreateInfo, SamplerMipmapMode};

use crate::core::error::{GraphicsError, Result};

/// 采样器配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    pub filter: Filter,
    pub address_mode: SamplerAddressMode,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            filter: Filter::Linear,
            address_mode: SamplerAddressMode::Repeat,
        }
    }
}

impl SamplerConfig {
    /// 全屏合成和 GUI 字体使用：线性过滤，边缘钳制
    pub fn linear_clamp() -> Self {
        Self {
            filter: Filter::Linear,
            address_mode: SamplerAddressMode::ClampToEdge,
        }
    }

    pub fn nearest_clamp() -> Self {
        Self {
            filter: Filter::Nearest,
            address_mode: SamplerAddressMode::ClampToEdge,
        }
    }

    /// egui 纹理选项对应的采样器
    pub fn from_egui(options: egui::TextureOptions) -> Self {
        let filter = match options.magnification {
            egui::TextureFilter::Nearest => Filter::Nearest,
            egui::TextureFilter::Linear => Filter::Linear,
        };
        Self {
            filter,
            address_mode: SamplerAddressMode::ClampToEdge,
        }
    }

    pub fn create(&self, device: Arc<Device>) -> Result<Arc<Sampler>> {
        let mipmap_mode = match self.filter {
            Filter::Nearest => SamplerMipmapMode::Nearest,
            _ => SamplerMipmapMode::Linear,
        };

        Sampler::new(
            device,
            SamplerCreateInfo {
                mag_filter: self.filter,
                min_filter: self.filter,
                mipmap_mode,
                address_mode: [self.address_mode; 3],
                ..Default::default()
            },
        )
        .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to create sampler: {:?}", e)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampler_presets() {
        let default = SamplerConfig::default();
        assert_eq!(default.filter, Filter::Linear);
        assert_eq!(default.address_mode, SamplerAddressMode::Repeat);

        assert_eq!(SamplerConfig::linear_clamp().address_mode, SamplerAddressMode::ClampToEdge);
        assert_eq!(SamplerConfig::nearest_clamp().filter, Filter::Nearest);
    }

    #[test]
    fn test_from_egui_options() {
        assert_eq!(SamplerConfig::from_egui(egui::TextureOptions::NEAREST).filter, Filter::Nearest);
        assert_eq!(SamplerConfig::from_egui(egui::TextureOptions::LINEAR), SamplerConfig::linear_clamp());
    }
}
