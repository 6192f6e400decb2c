//! Vulkan 渲染器
//!
//! 每帧的流程：
//!
//! 1. 等待即将复用的帧槽位的 fence，回收已完成帧退役的资源
//! 2. 必要时重建交换链和帧图附件
//! 3. 获取交换链图像，上传场景统一缓冲区
//! 4. 录制 GUI 纹理更新，再按帧图顺序录制各通道：
//!    前向通道绘制网格，呈现通道合成前向结果并绘制 GUI
//! 5. 提交、呈现，把 fence 存入当前槽位
//!
//! 帧中被替换或释放的 GPU 对象（旧网格、GUI 纹理、交换链相关的描述符集）
//! 不直接丢弃，而是带着当前帧的 fence 值进入延迟释放队列。

use std::sync::Arc;

use tracing::{debug, error, info, trace};
use vulkano::command_buffer::{AutoCommandBufferBuilder, CommandBufferUsage, PrimaryAutoCommandBuffer};
use vulkano::descriptor_set::PersistentDescriptorSet;
use vulkano::image::sampler::Sampler;
use vulkano::pipeline::graphics::rasterization::CullMode;
use vulkano::pipeline::graphics::vertex_input::Vertex as VertexInput;
use vulkano::pipeline::{GraphicsPipeline, Pipeline, PipelineBindPoint};
use vulkano::sync::future::FenceSignalFuture;
use vulkano::sync::{self, GpuFuture};
use vulkano::{Validated, VulkanError};
use winit::window::Window;

use super::context::VulkanContext;
use super::frame::{DeferredReleaseQueue, FenceManager, FrameResourcePool};
use super::frame_graph::{recorder, ClearValue, FrameGraph, FrameGraphInstance, PassContext, PassRecorders};
use super::resources::{
    checker_texture, set_layout, upload_texture, AlphaMode, BufferUsageType, DescriptorAllocatorExt,
    DescriptorCache, GpuMesh, MeshVertex, PipelineConfig, SamplerConfig, UploadBuffer,
};
use super::shaders::{self, entry_point};
use super::swapchain::{is_zero_area, AcquireOutcome, SwapchainState};
use crate::component::{Camera, DirectionalLight};
use crate::core::config::GraphicsConfig;
use crate::core::error::{FrameGraphError, GraphicsError, Result};
use crate::geometry::MeshData;
use crate::gui::context::GuiOutput;
use crate::gui::painter::{GuiPainter, GuiTexture};
use crate::math::Matrix4;

/// 绘制网格的通道
pub const FORWARD_PASS: &str = "forward";
/// 写入交换链的通道，合成前向结果并绘制 GUI
pub const PRESENT_PASS: &str = "present";

const ALBEDO_SIZE: u32 = 256;
const ALBEDO_CELLS: u32 = 8;

type FrameFence = Arc<FenceSignalFuture<Box<dyn GpuFuture>>>;

/// 等待 GPU 用完后才能释放的对象
#[allow(dead_code)] // 只负责持有，直到 fence 完成
enum RetiredResource {
    Mesh(GpuMesh),
    DescriptorSet(Arc<PersistentDescriptorSet>),
    GuiTexture(GuiTexture),
}

/// 最近一帧的绘制统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub triangles: u32,
    pub draw_calls: u32,
}

pub struct Renderer {
    ctx: VulkanContext,
    swapchain: SwapchainState,
    frame_graph: FrameGraphInstance,

    mesh_pipeline: Arc<GraphicsPipeline>,
    composite_pipeline: Arc<GraphicsPipeline>,
    gui_painter: GuiPainter,

    scene_uniforms: UploadBuffer<shaders::mesh::vs::SceneData>,
    albedo_set: Arc<PersistentDescriptorSet>,
    composite_sampler: Arc<Sampler>,
    /// 按交换链图像索引缓存的合成描述符集
    composite_sets: DescriptorCache<u32>,
    meshes: Vec<GpuMesh>,
    light: DirectionalLight,

    fence_manager: FenceManager,
    frame_pool: FrameResourcePool,
    fences: Vec<Option<FrameFence>>,
    release_queue: DeferredReleaseQueue<RetiredResource>,

    recreate_swapchain: bool,
    stats: FrameStats,
}

impl Renderer {
    /// 帧图中必须有 [`FORWARD_PASS`] 和 [`PRESENT_PASS`]
    pub fn new(window: Arc<Window>, config: &GraphicsConfig, graph: FrameGraph) -> Result<Self> {
        let ctx = VulkanContext::new(window.clone(), config)?;

        let size = window.inner_size();
        let swapchain = SwapchainState::new(&ctx, [size.width, size.height], config.vsync, config.frames_in_flight)?;

        let mut frame_graph = FrameGraphInstance::new(ctx.device.clone(), graph, swapchain.format())?;
        frame_graph.resize(ctx.memory_allocator.clone(), swapchain.views(), swapchain.extent())?;

        let device = ctx.device.clone();

        // 模型绕序不统一，不做背面剔除
        let mesh_pipeline = PipelineConfig {
            cull_mode: CullMode::None,
            ..Default::default()
        }
        .build(
            device.clone(),
            frame_graph.subpass(FORWARD_PASS)?,
            entry_point(shaders::mesh::vs::load, device.clone(), "mesh.vert")?,
            entry_point(shaders::mesh::fs::load, device.clone(), "mesh.frag")?,
            Some(MeshVertex::per_vertex()),
        )?;

        let composite_pipeline = PipelineConfig::overlay(AlphaMode::Opaque).build(
            device.clone(),
            frame_graph.subpass(PRESENT_PASS)?,
            entry_point(shaders::composite::vs::load, device.clone(), "composite.vert")?,
            entry_point(shaders::composite::fs::load, device.clone(), "composite.frag")?,
            None,
        )?;

        let gui_painter = GuiPainter::new(&ctx, frame_graph.subpass(PRESENT_PASS)?)?;

        let albedo = upload_texture(&ctx, &checker_texture(ALBEDO_SIZE, ALBEDO_CELLS), ALBEDO_SIZE, ALBEDO_SIZE)?;
        let albedo_set = ctx.descriptor_allocator.texture_set(
            set_layout(&mesh_pipeline, 1)?,
            0,
            albedo,
            SamplerConfig::default().create(device.clone())?,
        )?;

        let scene_uniforms = UploadBuffer::new(
            ctx.memory_allocator.clone(),
            BufferUsageType::Constant,
            ctx.uniform_alignment(),
        );

        let frames_in_flight = config.frames_in_flight.clamp(2, 3) as usize;

        info!(
            device = %ctx.device_name(),
            passes = ?frame_graph.execution_order(),
            frames_in_flight,
            "Vulkan renderer initialized"
        );

        Ok(Self {
            composite_sampler: SamplerConfig::linear_clamp().create(device)?,
            ctx,
            swapchain,
            frame_graph,
            mesh_pipeline,
            composite_pipeline,
            gui_painter,
            scene_uniforms,
            albedo_set,
            composite_sets: DescriptorCache::new(),
            meshes: Vec::new(),
            light: DirectionalLight::default(),
            fence_manager: FenceManager::new(),
            frame_pool: FrameResourcePool::new(frames_in_flight),
            fences: vec![None; frames_in_flight],
            release_queue: DeferredReleaseQueue::new(),
            recreate_swapchain: false,
            stats: FrameStats::default(),
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        self.ctx.window()
    }

    pub fn device_name(&self) -> &str {
        self.ctx.device_name()
    }

    pub fn frame_graph(&self) -> &FrameGraphInstance {
        &self.frame_graph
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn light_mut(&mut self) -> &mut DirectionalLight {
        &mut self.light
    }

    /// 窗口尺寸变化，下一帧重建交换链
    pub fn resize(&mut self) {
        #[cfg(debug_assertions)]
        debug!("Swapchain resize requested");

        self.recreate_swapchain = true;
    }

    /// 替换场景网格，旧网格等 GPU 用完后释放
    pub fn set_mesh(&mut self, mesh: &MeshData) -> Result<()> {
        let gpu_mesh = GpuMesh::upload(self.ctx.memory_allocator.clone(), mesh)?;

        info!(
            name = gpu_mesh.name.as_deref().unwrap_or("<unnamed>"),
            vertices = gpu_mesh.vertex_count(),
            triangles = gpu_mesh.triangle_count(),
            index_width = ?gpu_mesh.index_width,
            subsets = gpu_mesh.subsets.len(),
            "Mesh uploaded"
        );

        let last_submitted = self.fence_manager.current_value();
        for old in std::mem::replace(&mut self.meshes, vec![gpu_mesh]) {
            self.release_queue.retire(RetiredResource::Mesh(old), last_submitted);
        }
        Ok(())
    }

    /// 等待设备空闲，释放所有退役资源
    pub fn flush(&mut self) {
        self.ctx.wait_idle();
        self.fence_manager.flush();
        self.frame_pool.update_availability(self.fence_manager.completed_value());
        self.fences.iter_mut().for_each(|fence| *fence = None);
        let released = self.release_queue.flush();

        #[cfg(debug_assertions)]
        debug!(released, "Command queue flushed");
    }

    pub fn draw(
        &mut self,
        camera: &mut Camera,
        model: &Matrix4,
        clear_color: [f32; 4],
        gui: Option<&GuiOutput>,
    ) -> Result<()> {
        let size = self.window().inner_size();
        let window_extent = [size.width, size.height];
        if is_zero_area(window_extent) {
            return Ok(());
        }

        if self.recreate_swapchain {
            self.recreate(window_extent)?;
            if self.recreate_swapchain {
                return Ok(());
            }
        }

        let slot = self.frame_pool.current_index();
        self.wait_for_slot(slot)?;

        let (image_index, suboptimal, acquire_future) = match self.swapchain.acquire()? {
            AcquireOutcome::Acquired {
                image_index,
                suboptimal,
                future,
            } => (image_index, suboptimal, future),
            AcquireOutcome::OutOfDate => {
                #[cfg(debug_assertions)]
                debug!("Swapchain out of date, will recreate");
                self.recreate_swapchain = true;
                return Ok(());
            }
        };
        if suboptimal {
            #[cfg(debug_assertions)]
            debug!("Swapchain suboptimal, will recreate next frame");
            self.recreate_swapchain = true;
        }

        let extent = self.swapchain.extent();
        camera.set_aspect(extent[0] as f32 / extent[1] as f32);

        let uniforms = self.scene_uniforms.upload(scene_uniforms(camera, model, &self.light))?;
        let scene_set = self
            .ctx
            .descriptor_allocator
            .uniform_set(set_layout(&self.mesh_pipeline, 0)?, 0, uniforms)?;

        let composite_set = {
            let frame_graph = &self.frame_graph;
            let ctx = &self.ctx;
            let layout = set_layout(&self.composite_pipeline, 0)?;
            let sampler = self.composite_sampler.clone();
            self.composite_sets.get_or_try_insert_with(image_index, || {
                let view = frame_graph.sampled_output(FORWARD_PASS, 0, image_index).ok_or_else(|| {
                    FrameGraphError::InvalidAttachment {
                        pass: FORWARD_PASS.to_string(),
                        reason: "first attachment is not sampleable".to_string(),
                    }
                })?;
                ctx.descriptor_allocator.texture_set(layout, 0, view, sampler)
            })?
        };

        self.frame_graph.set_clear(FORWARD_PASS, 0, ClearValue::Color(clear_color))?;

        let mut builder = AutoCommandBufferBuilder::primary(
            &self.ctx.command_buffer_allocator,
            self.ctx.graphics_queue.queue_family_index(),
            CommandBufferUsage::OneTimeSubmit,
        )
        .map_err(|e| GraphicsError::CommandExecution(format!("Failed to create command buffer builder: {:?}", e)))?;

        let fence_value = self.fence_manager.next_value();

        if let Some(gui) = gui {
            let replaced = self
                .gui_painter
                .update_textures(&self.ctx, &mut builder, &gui.textures_delta)?;
            for texture in replaced {
                self.release_queue.retire(RetiredResource::GuiTexture(texture), fence_value);
            }
        }

        let mut mesh_draws = 0;
        let mut gui_draws = 0;
        {
            let mesh_pipeline = &self.mesh_pipeline;
            let composite_pipeline = &self.composite_pipeline;
            let albedo_set = &self.albedo_set;
            let meshes = &self.meshes;
            let painter = &self.gui_painter;

            let mut recorders = PassRecorders::new()
                .with(
                    FORWARD_PASS,
                    recorder(|pass: &mut PassContext<'_>| {
                        mesh_draws += record_meshes(
                            pass.builder,
                            mesh_pipeline,
                            vec![scene_set.clone(), albedo_set.clone()],
                            meshes,
                        )?;
                        Ok(())
                    }),
                )
                .with(
                    PRESENT_PASS,
                    recorder(|pass: &mut PassContext<'_>| {
                        record_composite(pass.builder, composite_pipeline, composite_set.clone())?;
                        if let Some(gui) = gui {
                            gui_draws += painter.draw(pass.builder, pass.extent, gui)?;
                        }
                        Ok(())
                    }),
                );

            self.frame_graph.record(&mut builder, image_index, &mut recorders)?;
        }

        let command_buffer = builder
            .build()
            .map_err(|e| GraphicsError::CommandExecution(format!("Failed to build command buffer: {:?}", e)))?;

        let previous_slot = (slot + self.fences.len() - 1) % self.fences.len();
        let previous: Box<dyn GpuFuture> = match self.fences[previous_slot].clone() {
            Some(fence) => fence.boxed(),
            None => sync::now(self.ctx.device.clone()).boxed(),
        };

        let mut future = previous
            .join(acquire_future)
            .then_execute(self.ctx.graphics_queue.clone(), command_buffer)
            .map_err(|e| GraphicsError::CommandExecution(format!("Failed to execute command buffer: {:?}", e)))?
            .boxed();
        if !Arc::ptr_eq(&self.ctx.graphics_queue, &self.ctx.present_queue) {
            future = future.then_signal_semaphore().boxed();
        }

        let submitted = future
            .then_swapchain_present(self.ctx.present_queue.clone(), self.swapchain.present_info(image_index))
            .boxed()
            .then_signal_fence_and_flush()
            .map_err(Validated::unwrap);

        match submitted {
            Ok(fence) => {
                #[cfg(debug_assertions)]
                trace!(image_index, fence_value = fence_value.value(), "Frame submitted");
                self.fences[slot] = Some(Arc::new(fence));
            }
            Err(VulkanError::OutOfDate) => {
                #[cfg(debug_assertions)]
                debug!("Present reported out of date, will recreate");
                self.recreate_swapchain = true;
                self.fences[slot] = None;
            }
            Err(e) => {
                error!("Failed to submit frame: {:?}", e);
                self.fences[slot] = None;
                return Err(GraphicsError::CommandExecution(format!("Failed to submit frame: {:?}", e)).into());
            }
        }

        if let Some(gui) = gui {
            for texture in self.gui_painter.free_textures(&gui.textures_delta.free) {
                self.release_queue.retire(RetiredResource::GuiTexture(texture), fence_value);
            }
        }

        self.stats = FrameStats {
            triangles: self.meshes.iter().map(GpuMesh::triangle_count).sum(),
            draw_calls: mesh_draws + gui_draws + 1,
        };

        self.frame_pool.current_mut().mark_in_use(fence_value);
        self.frame_pool.advance();

        Ok(())
    }

    /// 等待槽位上一次提交的帧完成，然后回收资源
    fn wait_for_slot(&mut self, slot: usize) -> Result<()> {
        let Some(fence) = self.fences[slot].take() else {
            return Ok(());
        };
        fence
            .wait(None)
            .map_err(|e| GraphicsError::CommandExecution(format!("Failed to wait for frame fence: {:?}", e)))?;

        if let Some(frame) = self.frame_pool.get(slot) {
            self.fence_manager.update_completed_value(frame.fence_value);
        }
        let completed = self.fence_manager.completed_value();
        self.frame_pool.update_availability(completed);
        let released = self.release_queue.collect(completed);
        if released > 0 {
            trace!(released, completed = completed.value(), "Released retired resources");
        }

        Ok(())
    }

    fn recreate(&mut self, extent: [u32; 2]) -> Result<()> {
        self.flush();

        if !self.swapchain.recreate(&self.ctx, extent)? {
            return Ok(());
        }

        self.frame_graph
            .resize(self.ctx.memory_allocator.clone(), self.swapchain.views(), self.swapchain.extent())?;

        // 旧的合成描述符集引用已经销毁的附件
        let fence_value = self.fence_manager.current_value();
        for set in self.composite_sets.drain() {
            self.release_queue.retire(RetiredResource::DescriptorSet(set), fence_value);
        }

        self.recreate_swapchain = false;
        Ok(())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        debug!("Dropping Vulkan renderer...");

        self.flush();
        self.meshes.clear();
    }
}

/// 前向通道的统一缓冲区内容
pub fn scene_uniforms(camera: &mut Camera, model: &Matrix4, light: &DirectionalLight) -> shaders::mesh::vs::SceneData {
    let position = camera.position();
    shaders::mesh::vs::SceneData {
        model: (*model).into(),
        view: camera.view_matrix().into(),
        projection: camera.proj_matrix().into(),
        light_dir: light.direction_uniform(),
        light_color: light.color_uniform(),
        camera_pos: [position.x, position.y, position.z, 1.0],
    }
}

fn record_meshes(
    builder: &mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
    pipeline: &Arc<GraphicsPipeline>,
    sets: Vec<Arc<PersistentDescriptorSet>>,
    meshes: &[GpuMesh],
) -> Result<u32> {
    if meshes.is_empty() {
        return Ok(0);
    }

    let cmd_err = |e| GraphicsError::CommandExecution(format!("Failed to record mesh draw: {:?}", e));

    builder
        .bind_pipeline_graphics(pipeline.clone())
        .map_err(cmd_err)?
        .bind_descriptor_sets(PipelineBindPoint::Graphics, pipeline.layout().clone(), 0, sets)
        .map_err(cmd_err)?;

    let mut draw_calls = 0;
    for mesh in meshes {
        builder
            .bind_vertex_buffers(0, mesh.vertex_buffer.clone())
            .map_err(cmd_err)?
            .bind_index_buffer(mesh.index_buffer.clone())
            .map_err(cmd_err)?;

        // 索引是整个网格的绝对顶点编号，顶点偏移为 0
        for subset in mesh.subsets.iter().filter(|s| s.index_count() > 0) {
            builder
                .draw_indexed(subset.index_count(), 1, subset.index_start(), 0, 0)
                .map_err(cmd_err)?;
            draw_calls += 1;
        }
    }
    Ok(draw_calls)
}

/// 全屏三角形采样前向通道的颜色
fn record_composite(
    builder: &mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
    pipeline: &Arc<GraphicsPipeline>,
    set: Arc<PersistentDescriptorSet>,
) -> Result<()> {
    let cmd_err = |e| GraphicsError::CommandExecution(format!("Failed to record composite: {:?}", e));

    builder
        .bind_pipeline_graphics(pipeline.clone())
        .map_err(cmd_err)?
        .bind_descriptor_sets(PipelineBindPoint::Graphics, pipeline.layout().clone(), 0, set)
        .map_err(cmd_err)?
        .draw(3, 1, 0, 0)
        .map_err(cmd_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Matrix4, Vector3};

    #[test]
    fn test_scene_uniforms() {
        let mut camera = Camera::new();
        camera.look_at(Vector3::new(0.0, 1.0, -5.0), Vector3::zeros(), Vector3::y());
        let model = Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0));
        let light = DirectionalLight::default();

        let data = scene_uniforms(&mut camera, &model, &light);

        // 列主序：平移在第 4 列
        assert_eq!(data.model[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(data.camera_pos, [0.0, 1.0, -5.0, 1.0]);
        assert_eq!(data.light_color, light.color_uniform());

        let view: [[f32; 4]; 4] = camera.view_matrix().into();
        assert_eq!(data.view, view);
    }

    #[test]
    fn test_frame_stats_default() {
        let stats = FrameStats::default();
        assert_eq!(stats.triangles, 0);
        assert_eq!(stats.draw_calls, 0);
    }
}
