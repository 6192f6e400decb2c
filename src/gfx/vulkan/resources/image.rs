//! 图像资源：渲染附件与纹理

use std::sync::Arc;

use vulkano::buffer::{Buffer, BufferCreateInfo, BufferUsage, Subbuffer};
use vulkano::command_buffer::{
    AutoCommandBufferBuilder, BufferImageCopy, CommandBufferUsage, CopyBufferToImageInfo,
    PrimaryAutoCommandBuffer,
};
use vulkano::format::Format;
use vulkano::image::view::ImageView;
use vulkano::image::{Image, ImageAspects, ImageCreateInfo, ImageType, ImageUsage};
use vulkano::memory::allocator::{AllocationCreateInfo, MemoryTypeFilter, StandardMemoryAllocator};
use vulkano::sync::{self, GpuFuture};

use crate::core::error::{GraphicsError, Result};
use crate::gfx::vulkan::context::VulkanContext;

/// 纹理统一使用的格式
pub const TEXTURE_FORMAT: Format = Format::R8G8B8A8_SRGB;

pub fn is_depth_format(format: Format) -> bool {
    format.aspects().intersects(ImageAspects::DEPTH | ImageAspects::STENCIL)
}

pub fn has_stencil(format: Format) -> bool {
    format.aspects().intersects(ImageAspects::STENCIL)
}

/// 附件用途：深度附件或颜色附件，两者都可以被后续通道采样
pub fn attachment_usage(is_depth: bool) -> ImageUsage {
    if is_depth {
        ImageUsage::DEPTH_STENCIL_ATTACHMENT | ImageUsage::SAMPLED
    } else {
        ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED
    }
}

/// 创建帧图内部附件
pub fn create_attachment(
    allocator: Arc<StandardMemoryAllocator>,
    format: Format,
    extent: [u32; 2],
) -> Result<Arc<ImageView>> {
    let image = Image::new(
        allocator,
        ImageCreateInfo {
            image_type: ImageType::Dim2d,
            format,
            extent: [extent[0], extent[1], 1],
            usage: attachment_usage(is_depth_format(format)),
            ..Default::default()
        },
        AllocationCreateInfo::default(),
    )
    .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to create attachment image: {:?}", e)))?;

    ImageView::new_default(image)
        .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to create attachment view: {:?}", e)).into())
}

/// 创建可作为拷贝目标的 RGBA8 纹理图像
pub fn create_texture_image(allocator: Arc<StandardMemoryAllocator>, format: Format, extent: [u32; 2]) -> Result<Arc<Image>> {
    Image::new(
        allocator,
        ImageCreateInfo {
            image_type: ImageType::Dim2d,
            format,
            extent: [extent[0].max(1), extent[1].max(1), 1],
            usage: ImageUsage::TRANSFER_DST | ImageUsage::SAMPLED,
            ..Default::default()
        },
        AllocationCreateInfo::default(),
    )
    .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to create texture image: {:?}", e)).into())
}

/// CPU 可写的暂存缓冲区
pub fn create_staging_buffer(allocator: Arc<StandardMemoryAllocator>, data: &[u8]) -> Result<Subbuffer<[u8]>> {
    Buffer::from_iter(
        allocator,
        BufferCreateInfo {
            usage: BufferUsage::TRANSFER_SRC,
            ..Default::default()
        },
        AllocationCreateInfo {
            memory_type_filter: MemoryTypeFilter::PREFER_HOST | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
            ..Default::default()
        },
        data.iter().copied(),
    )
    .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to create staging buffer: {:?}", e)).into())
}

/// 记录从暂存缓冲区到图像某个区域的拷贝
pub fn record_copy_to_image(
    builder: &mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
    staging: Subbuffer<[u8]>,
    image: Arc<Image>,
    offset: [u32; 2],
    extent: [u32; 2],
) -> Result<()> {
    let region = BufferImageCopy {
        image_subresource: image.subresource_layers(),
        image_offset: [offset[0], offset[1], 0],
        image_extent: [extent[0], extent[1], 1],
        ..Default::default()
    };

    builder
        .copy_buffer_to_image(CopyBufferToImageInfo {
            regions: [region].into_iter().collect(),
            ..CopyBufferToImageInfo::buffer_image(staging, image)
        })
        .map_err(|e| GraphicsError::CommandExecution(format!("Failed to record image copy: {:?}", e)))?;
    Ok(())
}

/// 默认反照率贴图：`size` x `size` 的 RGBA8 棋盘格，每边 `cells` 格
pub fn checker_texture(size: u32, cells: u32) -> Vec<u8> {
    const LIGHT: [u8; 4] = [204, 199, 191, 255];
    const DARK: [u8; 4] = [173, 169, 162, 255];

    let cell = (size / cells.max(1)).max(1);
    (0..size)
        .flat_map(|y| (0..size).map(move |x| (x / cell + y / cell) % 2 == 0))
        .flat_map(|light| if light { LIGHT } else { DARK })
        .collect()
}

/// 上传 RGBA8 像素，阻塞直到拷贝完成
///
/// 只在加载阶段使用；每帧更新的纹理（GUI）直接记录到帧命令缓冲区。
pub fn upload_texture(ctx: &VulkanContext, rgba8: &[u8], width: u32, height: u32) -> Result<Arc<ImageView>> {
    let expected = width as usize * height as usize * 4;
    if rgba8.len() != expected || expected == 0 {
        return Err(GraphicsError::ResourceCreation(format!(
            "Texture data is {} bytes, expected {} for {}x{}",
            rgba8.len(),
            expected,
            width,
            height
        ))
        .into());
    }

    let staging = create_staging_buffer(ctx.memory_allocator.clone(), rgba8)?;
    let image = create_texture_image(ctx.memory_allocator.clone(), TEXTURE_FORMAT, [width, height])?;

    let mut builder = AutoCommandBufferBuilder::primary(
        &ctx.command_buffer_allocator,
        ctx.graphics_queue.queue_family_index(),
        CommandBufferUsage::OneTimeSubmit,
    )
    .map_err(|e| GraphicsError::CommandExecution(format!("Failed to create command buffer builder: {:?}", e)))?;

    record_copy_to_image(&mut builder, staging, image.clone(), [0, 0], [width, height])?;

    let command_buffer = builder
        .build()
        .map_err(|e| GraphicsError::CommandExecution(format!("Failed to build upload command buffer: {:?}", e)))?;

    sync::now(ctx.device.clone())
        .then_execute(ctx.graphics_queue.clone(), command_buffer)
        .map_err(|e| GraphicsError::CommandExecution(format!("Failed to execute texture upload: {:?}", e)))?
        .then_signal_fence_and_flush()
        .map_err(|e| GraphicsError::CommandExecution(format!("Failed to flush texture upload: {:?}", e)))?
        .wait(None)
        .map_err(|e| GraphicsError::CommandExecution(format!("Texture upload did not finish: {:?}", e)))?;

    ImageView::new_default(image)
        .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to create texture view: {:?}", e)).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checker_texture() {
        let pixels = checker_texture(4, 2);
        assert_eq!(pixels.len(), 4 * 4 * 4);

        let texel = |x: usize, y: usize| &pixels[(y * 4 + x) * 4..(y * 4 + x) * 4 + 4];
        assert_eq!(texel(0, 0), texel(1, 1));
        assert_ne!(texel(0, 0), texel(2, 0));
        assert_eq!(texel(0, 0), texel(2, 2));
        assert!(pixels.chunks(4).all(|p| p[3] == 255));
    }

    #[test]
    fn test_depth_formats() {
        assert!(is_depth_format(Format::D32_SFLOAT));
        assert!(is_depth_format(Format::D24_UNORM_S8_UINT));
        assert!(!is_depth_format(Format::R16G16B16A16_SFLOAT));
        assert!(!is_depth_format(TEXTURE_FORMAT));

        assert!(has_stencil(Format::D24_UNORM_S8_UINT));
        assert!(!has_stencil(Format::D32_SFLOAT));
    }

    #[test]
    fn test_attachment_usage() {
        assert!(attachment_usage(true).intersects(ImageUsage::DEPTH_STENCIL_ATTACHMENT));
        assert!(attachment_usage(false).intersects(ImageUsage::COLOR_ATTACHMENT));
        assert!(attachment_usage(false).intersects(ImageUsage::SAMPLED));
    }
}
