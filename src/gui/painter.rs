//! GUI 绘制
//!
//! 把 egui 细分后的网格画到呈现通道上：顶点和索引每帧从环形分配器中
//! 取新的子缓冲区，裁剪矩形转换为动态裁剪，每个纹理一个描述符集。
//! 纹理的创建和局部更新录制在帧命令缓冲区的渲染通道之前。

use std::collections::HashMap;
use std::sync::Arc;

use egui::epaint::{ClippedPrimitive, ImageData, Primitive};
use egui::{Rect, TextureId, TexturesDelta};
use tracing::{debug, warn};
use vulkano::buffer::allocator::{SubbufferAllocator, SubbufferAllocatorCreateInfo};
use vulkano::buffer::{BufferContents, BufferUsage};
use vulkano::command_buffer::{AutoCommandBufferBuilder, PrimaryAutoCommandBuffer};
use vulkano::descriptor_set::layout::DescriptorSetLayout;
use vulkano::descriptor_set::PersistentDescriptorSet;
use vulkano::image::sampler::{Filter, Sampler};
use vulkano::image::view::ImageView;
use vulkano::image::Image;
use vulkano::pipeline::graphics::vertex_input::Vertex as VertexInput;
use vulkano::pipeline::graphics::viewport::Scissor;
use vulkano::pipeline::{GraphicsPipeline, Pipeline, PipelineBindPoint};
use vulkano::render_pass::Subpass;

use crate::core::error::{GraphicsError, Result};
use crate::gfx::vulkan::context::VulkanContext;
use crate::gfx::vulkan::resources::buffer::MemoryType;
use crate::gfx::vulkan::resources::descriptor::{set_layout, DescriptorAllocatorExt};
use crate::gfx::vulkan::resources::image::{
    create_staging_buffer, create_texture_image, record_copy_to_image, TEXTURE_FORMAT,
};
use crate::gfx::vulkan::resources::pipeline::{AlphaMode, PipelineConfig};
use crate::gfx::vulkan::resources::sampler::SamplerConfig;
use crate::gfx::vulkan::shaders::{self, entry_point};
use crate::gui::context::GuiOutput;

/// 与 `gui.vert` 输入一致；颜色是 sRGB 编码、预乘 alpha 的 RGBA8
#[derive(BufferContents, VertexInput, Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct GuiVertex {
    #[format(R32G32_SFLOAT)]
    pub position: [f32; 2],
    #[format(R32G32_SFLOAT)]
    pub tex_coords: [f32; 2],
    #[format(R8G8B8A8_UNORM)]
    pub color: [u8; 4],
}

impl From<&egui::epaint::Vertex> for GuiVertex {
    fn from(v: &egui::epaint::Vertex) -> Self {
        Self {
            position: [v.pos.x, v.pos.y],
            tex_coords: [v.uv.x, v.uv.y],
            color: v.color.to_array(),
        }
    }
}

/// 逻辑坐标（point）到裁剪空间的缩放和平移
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenTransform {
    pub scale: [f32; 2],
    pub translate: [f32; 2],
}

pub fn screen_push_constants(extent: [u32; 2], pixels_per_point: f32) -> ScreenTransform {
    let ppp = if pixels_per_point > 0.0 { pixels_per_point } else { 1.0 };
    let width = extent[0].max(1) as f32 / ppp;
    let height = extent[1].max(1) as f32 / ppp;
    ScreenTransform {
        scale: [2.0 / width, 2.0 / height],
        translate: [-1.0, -1.0],
    }
}

/// 逻辑坐标的裁剪矩形转换为像素裁剪；完全在屏幕外或面积为零时返回 `None`
pub fn clip_rect_to_scissor(rect: Rect, pixels_per_point: f32, extent: [u32; 2]) -> Option<Scissor> {
    let (width, height) = (extent[0] as f32, extent[1] as f32);

    let min_x = (rect.min.x * pixels_per_point).round().clamp(0.0, width);
    let min_y = (rect.min.y * pixels_per_point).round().clamp(0.0, height);
    let max_x = (rect.max.x * pixels_per_point).round().clamp(min_x, width);
    let max_y = (rect.max.y * pixels_per_point).round().clamp(min_y, height);

    let scissor_width = (max_x - min_x) as u32;
    let scissor_height = (max_y - min_y) as u32;
    if scissor_width == 0 || scissor_height == 0 {
        return None;
    }

    Some(Scissor {
        offset: [min_x as u32, min_y as u32],
        extent: [scissor_width, scissor_height],
    })
}

/// egui 图像数据转换为 RGBA8 像素
pub fn image_delta_rgba(image: &ImageData) -> ([u32; 2], Vec<u8>) {
    let size = [image.width() as u32, image.height() as u32];
    let pixels = match image {
        ImageData::Color(color) => color.pixels.iter().flat_map(|c| c.to_array()).collect(),
        ImageData::Font(font) => font.srgba_pixels(None).flat_map(|c| c.to_array()).collect(),
    };
    (size, pixels)
}

/// GPU 上的 GUI 纹理
pub struct GuiTexture {
    pub image: Arc<Image>,
    pub view: Arc<ImageView>,
    pub set: Arc<PersistentDescriptorSet>,
}

pub struct GuiPainter {
    pipeline: Arc<GraphicsPipeline>,
    texture_layout: Arc<DescriptorSetLayout>,
    vertex_allocator: SubbufferAllocator,
    index_allocator: SubbufferAllocator,
    linear_sampler: Arc<Sampler>,
    nearest_sampler: Arc<Sampler>,
    textures: HashMap<TextureId, GuiTexture>,
}

impl GuiPainter {
    /// 为帧图中 `subpass` 所在的通道创建管线
    pub fn new(ctx: &VulkanContext, subpass: Subpass) -> Result<Self> {
        let device = ctx.device.clone();
        let vs = entry_point(shaders::gui::vs::load, device.clone(), "gui.vert")?;
        let fs = entry_point(shaders::gui::fs::load, device.clone(), "gui.frag")?;

        let pipeline = PipelineConfig::overlay(AlphaMode::Translucent).build(
            device.clone(),
            subpass,
            vs,
            fs,
            Some(GuiVertex::per_vertex()),
        )?;
        let texture_layout = set_layout(&pipeline, 0)?;

        let dynamic_buffer = |buffer_usage| {
            SubbufferAllocator::new(
                ctx.memory_allocator.clone(),
                SubbufferAllocatorCreateInfo {
                    buffer_usage,
                    memory_type_filter: MemoryType::HostVisible.to_filter(),
                    ..Default::default()
                },
            )
        };

        Ok(Self {
            pipeline,
            texture_layout,
            vertex_allocator: dynamic_buffer(BufferUsage::VERTEX_BUFFER),
            index_allocator: dynamic_buffer(BufferUsage::INDEX_BUFFER),
            linear_sampler: SamplerConfig::linear_clamp().create(device.clone())?,
            nearest_sampler: SamplerConfig::nearest_clamp().create(device)?,
            textures: HashMap::new(),
        })
    }

    /// 录制纹理创建和局部更新，返回被整体替换的旧纹理
    pub fn update_textures(
        &mut self,
        ctx: &VulkanContext,
        builder: &mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
        delta: &TexturesDelta,
    ) -> Result<Vec<GuiTexture>> {
        let mut replaced = Vec::new();

        for (id, image_delta) in &delta.set {
            let (size, pixels) = image_delta_rgba(&image_delta.image);
            if size[0] == 0 || size[1] == 0 {
                continue;
            }
            let staging = create_staging_buffer(ctx.memory_allocator.clone(), &pixels)?;

            match image_delta.pos {
                Some(pos) => {
                    let Some(texture) = self.textures.get(id) else {
                        warn!(?id, "Partial update for unknown GUI texture");
                        continue;
                    };
                    record_copy_to_image(
                        builder,
                        staging,
                        texture.image.clone(),
                        [pos[0] as u32, pos[1] as u32],
                        size,
                    )?;
                }
                None => {
                    let image = create_texture_image(ctx.memory_allocator.clone(), TEXTURE_FORMAT, size)?;
                    record_copy_to_image(builder, staging, image.clone(), [0, 0], size)?;

                    let view = ImageView::new_default(image.clone()).map_err(|e| {
                        GraphicsError::ResourceCreation(format!("Failed to create GUI texture view: {:?}", e))
                    })?;
                    let sampler = if SamplerConfig::from_egui(image_delta.options).filter == Filter::Nearest {
                        self.nearest_sampler.clone()
                    } else {
                        self.linear_sampler.clone()
                    };
                    let set = ctx
                        .descriptor_allocator
                        .texture_set(self.texture_layout.clone(), 0, view.clone(), sampler)?;

                    debug!(?id, width = size[0], height = size[1], "GUI texture created");

                    if let Some(old) = self.textures.insert(*id, GuiTexture { image, view, set }) {
                        replaced.push(old);
                    }
                }
            }
        }

        Ok(replaced)
    }

    /// 从表中移除纹理，由调用方延迟释放
    pub fn free_textures(&mut self, ids: &[TextureId]) -> Vec<GuiTexture> {
        ids.iter().filter_map(|id| self.textures.remove(id)).collect()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// 在当前通道中绘制，返回绘制调用数
    pub fn draw(
        &self,
        builder: &mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
        extent: [u32; 2],
        output: &GuiOutput,
    ) -> Result<u32> {
        if output.primitives.is_empty() {
            return Ok(0);
        }

        let cmd_err = |e| GraphicsError::CommandExecution(format!("Failed to record GUI draw: {:?}", e));
        let transform = screen_push_constants(extent, output.pixels_per_point);

        builder
            .bind_pipeline_graphics(self.pipeline.clone())
            .map_err(cmd_err)?
            .push_constants(
                self.pipeline.layout().clone(),
                0,
                shaders::gui::vs::ScreenData {
                    scale: transform.scale,
                    translate: transform.translate,
                },
            )
            .map_err(cmd_err)?;

        let mut draw_calls = 0;
        for ClippedPrimitive { clip_rect, primitive } in &output.primitives {
            let Primitive::Mesh(mesh) = primitive else {
                continue;
            };
            if mesh.vertices.is_empty() || mesh.indices.is_empty() {
                continue;
            }
            let Some(scissor) = clip_rect_to_scissor(*clip_rect, output.pixels_per_point, extent) else {
                continue;
            };
            let Some(texture) = self.textures.get(&mesh.texture_id) else {
                continue;
            };

            let alloc_err = |e| GraphicsError::ResourceCreation(format!("Failed to allocate GUI buffer: {:?}", e));
            let vertices = self
                .vertex_allocator
                .allocate_slice::<GuiVertex>(mesh.vertices.len() as u64)
                .map_err(alloc_err)?;
            let indices = self
                .index_allocator
                .allocate_slice::<u32>(mesh.indices.len() as u64)
                .map_err(alloc_err)?;
            {
                let write_err = |e| GraphicsError::ResourceCreation(format!("Failed to write GUI buffer: {:?}", e));
                let mut vertex_data = vertices.write().map_err(write_err)?;
                for (dst, src) in vertex_data.iter_mut().zip(&mesh.vertices) {
                    *dst = GuiVertex::from(src);
                }
                indices.write().map_err(write_err)?.copy_from_slice(&mesh.indices);
            }

            builder
                .set_scissor(0, [scissor].into_iter().collect())
                .map_err(cmd_err)?
                .bind_descriptor_sets(
                    PipelineBindPoint::Graphics,
                    self.pipeline.layout().clone(),
                    0,
                    texture.set.clone(),
                )
                .map_err(cmd_err)?
                .bind_vertex_buffers(0, vertices)
                .map_err(cmd_err)?
                .bind_index_buffer(indices)
                .map_err(cmd_err)?
                .draw_indexed(mesh.indices.len() as u32, 1, 0, 0, 0)
                .map_err(cmd_err)?;
            draw_calls += 1;
        }

        Ok(draw_calls)
    }
}
