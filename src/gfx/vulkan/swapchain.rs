//! 交换链
//!
//! 参数选择（呈现模式、表面格式、图像数量、尺寸）都是纯函数；
//! [`SwapchainState`] 负责创建、重建和获取图像。

use std::sync::Arc;

use tracing::{debug, info};
use vulkano::format::Format;
use vulkano::image::view::ImageView;
use vulkano::image::{Image, ImageUsage};
use vulkano::swapchain::{
    acquire_next_image, ColorSpace, PresentMode, Surface, SurfaceCapabilities, Swapchain,
    SwapchainAcquireFuture, SwapchainCreateInfo, SwapchainPresentInfo,
};
use vulkano::sync::Sharing;
use vulkano::{Validated, VulkanError};

use super::context::VulkanContext;
use crate::core::error::{EngineError, GraphicsError, Result};

/// 垂直同步使用 FIFO；否则依次尝试 MAILBOX、IMMEDIATE，最后退回 FIFO（总是可用）
pub fn choose_present_mode(vsync: bool, supported: &[PresentMode]) -> PresentMode {
    if vsync {
        return PresentMode::Fifo;
    }
    [PresentMode::Mailbox, PresentMode::Immediate]
        .into_iter()
        .find(|mode| supported.contains(mode))
        .unwrap_or(PresentMode::Fifo)
}

/// 优先 sRGB 非线性的 BGRA8 / RGBA8，否则取第一个
pub fn choose_surface_format(formats: &[(Format, ColorSpace)]) -> Option<(Format, ColorSpace)> {
    [Format::B8G8R8A8_SRGB, Format::R8G8B8A8_SRGB]
        .into_iter()
        .find_map(|preferred| {
            formats
                .iter()
                .copied()
                .find(|&(format, space)| format == preferred && space == ColorSpace::SrgbNonLinear)
        })
        .or_else(|| formats.first().copied())
}

/// 至少比最小值多一张，且不少于在飞帧数；`max` 为 `None` 表示没有上限
pub fn choose_image_count(min: u32, max: Option<u32>, frames_in_flight: u32) -> u32 {
    let count = (min + 1).max(frames_in_flight);
    match max {
        Some(max) if max > 0 => count.min(max),
        _ => count,
    }
}

/// 把窗口尺寸限制在表面支持的范围内
pub fn clamp_extent(requested: [u32; 2], min: [u32; 2], max: [u32; 2]) -> [u32; 2] {
    [
        requested[0].clamp(min[0], max[0].max(min[0])),
        requested[1].clamp(min[1], max[1].max(min[1])),
    ]
}

/// 宽或高为零（窗口最小化）时不能创建交换链
pub fn is_zero_area(extent: [u32; 2]) -> bool {
    extent[0] == 0 || extent[1] == 0
}

/// 获取图像的结果
pub enum AcquireOutcome {
    Acquired {
        image_index: u32,
        suboptimal: bool,
        future: SwapchainAcquireFuture,
    },
    /// 交换链已过期，需要重建
    OutOfDate,
}

pub struct SwapchainState {
    swapchain: Arc<Swapchain>,
    images: Vec<Arc<Image>>,
    views: Vec<Arc<ImageView>>,
}

impl SwapchainState {
    pub fn new(ctx: &VulkanContext, extent: [u32; 2], vsync: bool, frames_in_flight: u32) -> Result<Self> {
        let physical_device = &ctx.physical_device;

        let capabilities = surface_capabilities(ctx)?;
        let formats = physical_device
            .surface_formats(&ctx.surface, Default::default())
            .map_err(|e| GraphicsError::SwapchainError(format!("Failed to get surface formats: {:?}", e)))?;
        let present_modes: Vec<PresentMode> = physical_device
            .surface_present_modes(&ctx.surface, Default::default())
            .map_err(|e| GraphicsError::SwapchainError(format!("Failed to get present modes: {:?}", e)))?
            .into_iter()
            .collect();

        let (image_format, image_color_space) = choose_surface_format(&formats)
            .ok_or_else(|| GraphicsError::SwapchainError("No surface formats available".to_string()))?;
        let present_mode = choose_present_mode(vsync, &present_modes);
        let min_image_count = choose_image_count(
            capabilities.min_image_count,
            capabilities.max_image_count,
            frames_in_flight,
        );

        let composite_alpha = capabilities
            .supported_composite_alpha
            .into_iter()
            .next()
            .ok_or_else(|| GraphicsError::SwapchainError("No supported composite alpha modes".to_string()))?;

        let families = ctx.queue_families;
        let image_sharing = if families.graphics != families.present {
            Sharing::Concurrent(vec![families.graphics, families.present].into())
        } else {
            Sharing::Exclusive
        };

        let (swapchain, images) = Swapchain::new(
            ctx.device.clone(),
            ctx.surface.clone(),
            SwapchainCreateInfo {
                min_image_count,
                image_format,
                image_color_space,
                image_extent: surface_extent(&capabilities, extent),
                image_usage: ImageUsage::COLOR_ATTACHMENT,
                image_sharing,
                composite_alpha,
                present_mode,
                ..Default::default()
            },
        )
        .map_err(|e| GraphicsError::SwapchainError(format!("Failed to create swapchain: {:?}", e)))?;

        let views = create_views(&images)?;

        info!(
            width = swapchain.image_extent()[0],
            height = swapchain.image_extent()[1],
            images = images.len(),
            format = ?image_format,
            present_mode = ?present_mode,
            "Swapchain created"
        );

        Ok(Self { swapchain, images, views })
    }

    /// 按新尺寸重建；尺寸为零时跳过并返回 `false`
    pub fn recreate(&mut self, ctx: &VulkanContext, extent: [u32; 2]) -> Result<bool> {
        if is_zero_area(extent) {
            return Ok(false);
        }

        let capabilities = surface_capabilities(ctx)?;
        let image_extent = surface_extent(&capabilities, extent);
        if is_zero_area(image_extent) {
            return Ok(false);
        }

        let (swapchain, images) = self
            .swapchain
            .recreate(SwapchainCreateInfo {
                image_extent,
                ..self.swapchain.create_info()
            })
            .map_err(|e| GraphicsError::SwapchainError(format!("Failed to recreate swapchain: {:?}", e)))?;

        self.views = create_views(&images)?;
        self.swapchain = swapchain;
        self.images = images;

        #[cfg(debug_assertions)]
        debug!(
            width = image_extent[0],
            height = image_extent[1],
            images = self.images.len(),
            "Swapchain recreated"
        );

        Ok(true)
    }

    pub fn acquire(&self) -> Result<AcquireOutcome> {
        match acquire_next_image(self.swapchain.clone(), None).map_err(Validated::unwrap) {
            Ok((image_index, suboptimal, future)) => Ok(AcquireOutcome::Acquired {
                image_index,
                suboptimal,
                future,
            }),
            Err(VulkanError::OutOfDate) => Ok(AcquireOutcome::OutOfDate),
            Err(e) => Err(GraphicsError::SwapchainError(format!("Failed to acquire next image: {:?}", e)).into()),
        }
    }

    pub fn present_info(&self, image_index: u32) -> SwapchainPresentInfo {
        SwapchainPresentInfo::swapchain_image_index(self.swapchain.clone(), image_index)
    }

    pub fn swapchain(&self) -> &Arc<Swapchain> {
        &self.swapchain
    }

    pub fn images(&self) -> &[Arc<Image>] {
        &self.images
    }

    pub fn views(&self) -> &[Arc<ImageView>] {
        &self.views
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn format(&self) -> Format {
        self.swapchain.image_format()
    }

    pub fn extent(&self) -> [u32; 2] {
        self.swapchain.image_extent()
    }

    pub fn surface(&self) -> &Arc<Surface> {
        self.swapchain.surface()
    }
}

fn surface_capabilities(ctx: &VulkanContext) -> Result<SurfaceCapabilities> {
    ctx.physical_device
        .surface_capabilities(&ctx.surface, Default::default())
        .map_err(|e| EngineError::from(GraphicsError::SwapchainError(format!("Failed to get surface capabilities: {:?}", e))))
}

/// 表面给出固定尺寸时必须使用它
fn surface_extent(capabilities: &SurfaceCapabilities, requested: [u32; 2]) -> [u32; 2] {
    capabilities.current_extent.unwrap_or_else(|| {
        clamp_extent(requested, capabilities.min_image_extent, capabilities.max_image_extent)
    })
}

fn create_views(images: &[Arc<Image>]) -> Result<Vec<Arc<ImageView>>> {
    images
        .iter()
        .map(|image| {
            ImageView::new_default(image.clone()).map_err(|e| {
                EngineError::from(GraphicsError::ResourceCreation(format!("Failed to create swapchain image view: {:?}", e)))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_mode() {
        let all = [PresentMode::Fifo, PresentMode::Mailbox, PresentMode::Immediate];
        assert_eq!(choose_present_mode(true, &all), PresentMode::Fifo);
        assert_eq!(choose_present_mode(false, &all), PresentMode::Mailbox);
        assert_eq!(
            choose_present_mode(false, &[PresentMode::Fifo, PresentMode::Immediate]),
            PresentMode::Immediate
        );
        assert_eq!(choose_present_mode(false, &[PresentMode::Fifo]), PresentMode::Fifo);
    }

    #[test]
    fn test_surface_format() {
        let formats = [
            (Format::R8G8B8A8_UNORM, ColorSpace::SrgbNonLinear),
            (Format::R8G8B8A8_SRGB, ColorSpace::SrgbNonLinear),
            (Format::B8G8R8A8_SRGB, ColorSpace::SrgbNonLinear),
        ];
        assert_eq!(
            choose_surface_format(&formats),
            Some((Format::B8G8R8A8_SRGB, ColorSpace::SrgbNonLinear))
        );
        assert_eq!(
            choose_surface_format(&formats[..2]),
            Some((Format::R8G8B8A8_SRGB, ColorSpace::SrgbNonLinear))
        );
        assert_eq!(
            choose_surface_format(&formats[..1]),
            Some((Format::R8G8B8A8_UNORM, ColorSpace::SrgbNonLinear))
        );
        assert_eq!(choose_surface_format(&[]), None);
    }

    #[test]
    fn test_image_count() {
        assert_eq!(choose_image_count(2, Some(8), 2), 3);
        assert_eq!(choose_image_count(1, None, 3), 3);
        assert_eq!(choose_image_count(3, Some(3), 2), 3);
        // 0 表示没有上限
        assert_eq!(choose_image_count(2, Some(0), 2), 3);
    }

    #[test]
    fn test_extent_helpers() {
        assert_eq!(clamp_extent([5000, 10], [1, 1], [4096, 4096]), [4096, 10]);
        assert_eq!(clamp_extent([800, 600], [1, 1], [4096, 4096]), [800, 600]);
        assert!(is_zero_area([0, 600]));
        assert!(!is_zero_area([1, 1]));
    }
}
