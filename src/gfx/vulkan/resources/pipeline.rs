//! 图形管线
//!
//! [`PipelineConfig`] 描述光栅化、混合和深度状态，`build` 针对帧图中某个
//! 通道的子通道创建 vulkano 管线。视口和裁剪矩形都是动态状态，交换链
//! 重建后不需要重建管线。

use std::sync::Arc;

use tracing::debug;
use vulkano::device::Device;
use vulkano::pipeline::graphics::color_blend::{
    AttachmentBlend, BlendFactor, BlendOp, ColorBlendAttachmentState, ColorBlendState,
};
use vulkano::pipeline::graphics::depth_stencil::{CompareOp, DepthState, DepthStencilState};
use vulkano::pipeline::graphics::input_assembly::{InputAssemblyState, PrimitiveTopology};
use vulkano::pipeline::graphics::multisample::MultisampleState;
use vulkano::pipeline::graphics::rasterization::{CullMode, FrontFace, PolygonMode, RasterizationState};
use vulkano::pipeline::graphics::vertex_input::{VertexBufferDescription, VertexDefinition, VertexInputState};
use vulkano::pipeline::graphics::viewport::ViewportState;
use vulkano::pipeline::graphics::GraphicsPipelineCreateInfo;
use vulkano::pipeline::layout::PipelineDescriptorSetLayoutCreateInfo;
use vulkano::pipeline::{DynamicState, GraphicsPipeline, PipelineLayout, PipelineShaderStageCreateInfo};
use vulkano::render_pass::Subpass;
use vulkano::shader::EntryPoint;

use crate::core::error::{GraphicsError, Result};

/// 颜色混合方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaMode {
    /// 不混合
    #[default]
    Opaque,
    /// 预乘 alpha 混合
    Translucent,
    /// 叠加
    Additive,
}

/// 混合模式对应的附件混合状态；`None` 表示关闭混合
pub fn blend_state(alpha_mode: AlphaMode) -> Option<AttachmentBlend> {
    match alpha_mode {
        AlphaMode::Opaque => None,
        AlphaMode::Translucent => Some(AttachmentBlend {
            src_color_blend_factor: BlendFactor::One,
            dst_color_blend_factor: BlendFactor::OneMinusSrcAlpha,
            color_blend_op: BlendOp::Add,
            src_alpha_blend_factor: BlendFactor::OneMinusDstAlpha,
            dst_alpha_blend_factor: BlendFactor::One,
            alpha_blend_op: BlendOp::Add,
        }),
        AlphaMode::Additive => Some(AttachmentBlend {
            src_color_blend_factor: BlendFactor::One,
            dst_color_blend_factor: BlendFactor::One,
            color_blend_op: BlendOp::Add,
            src_alpha_blend_factor: BlendFactor::One,
            dst_alpha_blend_factor: BlendFactor::One,
            alpha_blend_op: BlendOp::Add,
        }),
    }
}

/// 管线配置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub topology: PrimitiveTopology,
    pub polygon_mode: PolygonMode,
    pub alpha_mode: AlphaMode,
    pub depth_test: bool,
    pub depth_write: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            front_face: FrontFace::CounterClockwise,
            topology: PrimitiveTopology::TriangleList,
            polygon_mode: PolygonMode::Fill,
            alpha_mode: AlphaMode::Opaque,
            depth_test: true,
            depth_write: true,
        }
    }
}

impl PipelineConfig {
    /// 全屏三角形、GUI 等二维绘制：不剔除，不测试深度
    pub fn overlay(alpha_mode: AlphaMode) -> Self {
        Self {
            cull_mode: CullMode::None,
            alpha_mode,
            depth_test: false,
            depth_write: false,
            ..Self::default()
        }
    }

    pub fn wireframe(mut self) -> Self {
        self.polygon_mode = PolygonMode::Line;
        self
    }

    /// 子通道没有深度附件时忽略深度设置
    pub fn depth_stencil_state(&self, subpass_has_depth: bool) -> Option<DepthStencilState> {
        if !subpass_has_depth || !self.depth_test {
            return None;
        }
        Some(DepthStencilState {
            depth: Some(DepthState {
                write_enable: self.depth_write,
                compare_op: CompareOp::Less,
            }),
            ..Default::default()
        })
    }

    pub fn rasterization_state(&self) -> RasterizationState {
        RasterizationState {
            cull_mode: self.cull_mode,
            front_face: self.front_face,
            polygon_mode: self.polygon_mode,
            ..Default::default()
        }
    }

    /// 创建管线；`vertex` 为 `None` 时没有顶点输入（顶点在着色器中生成）
    pub fn build(
        &self,
        device: Arc<Device>,
        subpass: Subpass,
        vs: EntryPoint,
        fs: EntryPoint,
        vertex: Option<VertexBufferDescription>,
    ) -> Result<Arc<GraphicsPipeline>> {
        let vertex_input_state = match vertex {
            Some(description) => description
                .definition(&vs.info().input_interface)
                .map_err(|e| GraphicsError::ShaderCompilation(format!("Vertex layout does not match shader: {:?}", e)))?,
            None => VertexInputState::default(),
        };

        let stages = [
            PipelineShaderStageCreateInfo::new(vs),
            PipelineShaderStageCreateInfo::new(fs),
        ];

        let layout = PipelineLayout::new(
            device.clone(),
            PipelineDescriptorSetLayoutCreateInfo::from_stages(&stages)
                .into_pipeline_layout_create_info(device.clone())
                .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to derive pipeline layout: {:?}", e)))?,
        )
        .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to create pipeline layout: {:?}", e)))?;

        let color_attachments = subpass.num_color_attachments();
        let depth_stencil_state = self.depth_stencil_state(subpass.subpass_desc().depth_stencil_attachment.as_ref().map_or(false, |reference| {
            subpass.render_pass().attachments()[reference.attachment as usize]
                .format
                .aspects()
                .intersects(vulkano::image::ImageAspects::DEPTH)
        }));

        let pipeline = GraphicsPipeline::new(
            device,
            None,
            GraphicsPipelineCreateInfo {
                stages: stages.into_iter().collect(),
                vertex_input_state: Some(vertex_input_state),
                input_assembly_state: Some(InputAssemblyState {
                    topology: self.topology,
                    ..Default::default()
                }),
                viewport_state: Some(ViewportState::default()),
                rasterization_state: Some(self.rasterization_state()),
                depth_stencil_state,
                multisample_state: Some(MultisampleState::default()),
                color_blend_state: Some(ColorBlendState::with_attachment_states(
                    color_attachments,
                    ColorBlendAttachmentState {
                        blend: blend_state(self.alpha_mode),
                        ..Default::default()
                    },
                )),
                dynamic_state: [DynamicState::Viewport, DynamicState::Scissor].into_iter().collect(),
                subpass: Some(subpass.into()),
                ..GraphicsPipelineCreateInfo::layout(layout)
            },
        )
        .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to create graphics pipeline: {:?}", e)))?;

        #[cfg(debug_assertions)]
        debug!(
            alpha_mode = ?self.alpha_mode,
            depth_test = self.depth_test,
            color_attachments,
            "Graphics pipeline created"
        );

        Ok(pipeline)
    }
}
