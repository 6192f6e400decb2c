//! 帧图实例
//!
//! 把 [`FrameGraph`] 编译成 vulkano 对象：每个通道一个单子通道的
//! `RenderPass`，每张交换链图像一套内部附件和帧缓冲。录制时按执行顺序
//! 开始每个通道，调用为它注册的 [`PassRecorder`]，再结束通道。通道之间的
//! 屏障和布局转换由 vulkano 的自动命令缓冲区插入。

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use vulkano::command_buffer::{
    AutoCommandBufferBuilder, PrimaryAutoCommandBuffer, RenderPassBeginInfo, SubpassBeginInfo,
    SubpassContents, SubpassEndInfo,
};
use vulkano::device::Device;
use vulkano::format::{ClearValue as AttachmentClearValue, Format};
use vulkano::image::view::ImageView;
use vulkano::image::ImageLayout;
use vulkano::memory::allocator::StandardMemoryAllocator;
use vulkano::pipeline::graphics::viewport::{Scissor, Viewport};
use vulkano::render_pass::{
    AttachmentDescription, AttachmentReference, AttachmentStoreOp, Framebuffer, FramebufferCreateInfo,
    RenderPass, RenderPassCreateInfo, Subpass, SubpassDescription,
};

use super::definition::{
    attachment_layout, clear_value, final_layout, load_op, ClearValue, FrameGraph, RenderPassDesc, RenderTarget,
};
use crate::core::error::{FrameGraphError, GraphicsError, Result};
use crate::gfx::vulkan::resources::image::create_attachment;

/// 录制某个通道时可用的上下文
pub struct PassContext<'a> {
    pub builder: &'a mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
    pub subpass: Subpass,
    pub image_index: u32,
    pub extent: [u32; 2],
    pub graph: &'a FrameGraphInstance,
}

/// 在通道内录制绘制命令
pub trait PassRecorder {
    fn record(&mut self, ctx: &mut PassContext<'_>) -> anyhow::Result<()>;
}

impl<F> PassRecorder for F
where
    F: FnMut(&mut PassContext<'_>) -> anyhow::Result<()>,
{
    fn record(&mut self, ctx: &mut PassContext<'_>) -> anyhow::Result<()> {
        self(ctx)
    }
}

/// 让闭包按 [`PassRecorder`] 的签名推断参数和返回类型
pub fn recorder<F>(f: F) -> F
where
    F: FnMut(&mut PassContext<'_>) -> anyhow::Result<()>,
{
    f
}

/// 按通道名注册的录制器，没有录制器的通道只做清除
#[derive(Default)]
pub struct PassRecorders<'a> {
    recorders: HashMap<String, Box<dyn PassRecorder + 'a>>,
}

impl<'a> PassRecorders<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, pass: impl Into<String>, recorder: impl PassRecorder + 'a) -> Self {
        self.insert(pass, recorder);
        self
    }

    pub fn insert(&mut self, pass: impl Into<String>, recorder: impl PassRecorder + 'a) {
        self.recorders.insert(pass.into(), Box::new(recorder));
    }

    pub fn contains(&self, pass: &str) -> bool {
        self.recorders.contains_key(pass)
    }

    fn get_mut(&mut self, pass: &str) -> Option<&mut (dyn PassRecorder + 'a)> {
        self.recorders.get_mut(pass).map(|r| r.as_mut())
    }
}

struct CompiledPass {
    desc: RenderPassDesc,
    render_pass: Arc<RenderPass>,
    clear_values: Vec<Option<AttachmentClearValue>>,
    /// `[交换链图像][附件]`
    views: Vec<Vec<Arc<ImageView>>>,
    framebuffers: Vec<Arc<Framebuffer>>,
}

pub struct FrameGraphInstance {
    graph: FrameGraph,
    passes: Vec<CompiledPass>,
    swapchain_format: Format,
    extent: [u32; 2],
}

impl FrameGraphInstance {
    /// 校验并编译渲染通道；附件和帧缓冲在 [`resize`](Self::resize) 中创建
    pub fn new(device: Arc<Device>, graph: FrameGraph, swapchain_format: Format) -> Result<Self> {
        let order: Vec<RenderPassDesc> = graph.execution_order()?.into_iter().cloned().collect();

        let mut passes = Vec::with_capacity(order.len());
        for desc in order {
            let render_pass = create_render_pass(device.clone(), &desc, swapchain_format)?;
            let clear_values = desc
                .attachments()
                .map(|a| clear_value(a.clear, a.format(swapchain_format)))
                .collect();

            #[cfg(debug_assertions)]
            debug!(
                pass = %desc.name,
                attachments = desc.attachment_count(),
                "Frame graph pass compiled"
            );

            passes.push(CompiledPass {
                desc,
                render_pass,
                clear_values,
                views: Vec::new(),
                framebuffers: Vec::new(),
            });
        }

        Ok(Self {
            graph,
            passes,
            swapchain_format,
            extent: [0, 0],
        })
    }

    /// 交换链重建后重新分配内部附件和帧缓冲
    pub fn resize(
        &mut self,
        allocator: Arc<StandardMemoryAllocator>,
        swapchain_views: &[Arc<ImageView>],
        extent: [u32; 2],
    ) -> Result<()> {
        for pass in &mut self.passes {
            let mut views = Vec::with_capacity(swapchain_views.len());
            let mut framebuffers = Vec::with_capacity(swapchain_views.len());

            for swapchain_view in swapchain_views {
                let attachments = pass
                    .desc
                    .attachments()
                    .map(|attachment| match attachment.target {
                        RenderTarget::Swapchain => Ok(swapchain_view.clone()),
                        RenderTarget::Internal(format) => create_attachment(allocator.clone(), format, extent),
                    })
                    .collect::<Result<Vec<_>>>()?;

                let framebuffer = Framebuffer::new(
                    pass.render_pass.clone(),
                    FramebufferCreateInfo {
                        attachments: attachments.clone(),
                        ..Default::default()
                    },
                )
                .map_err(|e| {
                    GraphicsError::ResourceCreation(format!(
                        "Failed to create framebuffer for pass '{}': {:?}",
                        pass.desc.name, e
                    ))
                })?;

                views.push(attachments);
                framebuffers.push(framebuffer);
            }

            pass.views = views;
            pass.framebuffers = framebuffers;
        }

        self.extent = extent;

        #[cfg(debug_assertions)]
        debug!(
            width = extent[0],
            height = extent[1],
            images = swapchain_views.len(),
            "Frame graph resources rebuilt"
        );

        Ok(())
    }

    /// 按执行顺序录制所有通道
    pub fn record(
        &self,
        builder: &mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
        image_index: u32,
        recorders: &mut PassRecorders<'_>,
    ) -> Result<()> {
        for pass in &self.passes {
            let framebuffer = pass.framebuffers.get(image_index as usize).cloned().ok_or_else(|| {
                FrameGraphError::InvalidAttachment {
                    pass: pass.desc.name.clone(),
                    reason: format!("no framebuffer for swapchain image {}", image_index),
                }
            })?;

            builder
                .begin_render_pass(
                    RenderPassBeginInfo {
                        clear_values: pass.clear_values.clone(),
                        ..RenderPassBeginInfo::framebuffer(framebuffer)
                    },
                    SubpassBeginInfo {
                        contents: SubpassContents::Inline,
                        ..Default::default()
                    },
                )
                .map_err(|e| GraphicsError::CommandExecution(format!("Failed to begin pass '{}': {:?}", pass.desc.name, e)))?
                .set_viewport(0, [full_viewport(self.extent)].into_iter().collect())
                .map_err(|e| GraphicsError::CommandExecution(format!("Failed to set viewport: {:?}", e)))?
                .set_scissor(0, [full_scissor(self.extent)].into_iter().collect())
                .map_err(|e| GraphicsError::CommandExecution(format!("Failed to set scissor: {:?}", e)))?;

            if let Some(recorder) = recorders.get_mut(&pass.desc.name) {
                let subpass = first_subpass(&pass.render_pass, &pass.desc.name)?;
                let mut ctx = PassContext {
                    builder: &mut *builder,
                    subpass,
                    image_index,
                    extent: self.extent,
                    graph: self,
                };
                recorder
                    .record(&mut ctx)
                    .map_err(|source| FrameGraphError::PassFailed {
                        pass: pass.desc.name.clone(),
                        source,
                    })?;
            }

            builder
                .end_render_pass(SubpassEndInfo::default())
                .map_err(|e| GraphicsError::CommandExecution(format!("Failed to end pass '{}': {:?}", pass.desc.name, e)))?;
        }
        Ok(())
    }

    /// 修改附件的清除值，下一次录制生效；加载方式（清除与否）编译后不能改变
    pub fn set_clear(&mut self, pass: &str, attachment: usize, clear: ClearValue) -> Result<()> {
        let swapchain_format = self.swapchain_format;
        let compiled = self
            .passes
            .iter_mut()
            .find(|p| p.desc.name == pass)
            .ok_or_else(|| FrameGraphError::UnknownPass(pass.to_string()))?;

        let desc = compiled.desc.attachments().nth(attachment).ok_or_else(|| FrameGraphError::InvalidAttachment {
            pass: pass.to_string(),
            reason: format!("no attachment {}", attachment),
        })?;
        if load_op(desc.clear) != load_op(clear) {
            return Err(FrameGraphError::InvalidAttachment {
                pass: pass.to_string(),
                reason: format!("attachment {} cannot change its load op after compile", attachment),
            }
            .into());
        }

        compiled.clear_values[attachment] = clear_value(clear, desc.format(swapchain_format));
        Ok(())
    }

    /// 某个通道的内部附件，供后续通道采样；交换链附件不可采样
    pub fn sampled_output(&self, pass: &str, attachment: usize, image_index: u32) -> Option<Arc<ImageView>> {
        let compiled = self.compiled(pass)?;
        let desc = compiled.desc.attachments().nth(attachment)?;
        if desc.target == RenderTarget::Swapchain {
            return None;
        }
        compiled.views.get(image_index as usize)?.get(attachment).cloned()
    }

    /// 通道唯一的子通道，用于创建管线
    pub fn subpass(&self, pass: &str) -> Result<Subpass> {
        let compiled = self
            .compiled(pass)
            .ok_or_else(|| FrameGraphError::UnknownPass(pass.to_string()))?;
        first_subpass(&compiled.render_pass, pass)
    }

    pub fn execution_order(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.desc.name.as_str()).collect()
    }

    pub fn graph(&self) -> &FrameGraph {
        &self.graph
    }

    pub fn extent(&self) -> [u32; 2] {
        self.extent
    }

    pub fn swapchain_format(&self) -> Format {
        self.swapchain_format
    }

    fn compiled(&self, pass: &str) -> Option<&CompiledPass> {
        self.passes.iter().find(|p| p.desc.name == pass)
    }
}

fn first_subpass(render_pass: &Arc<RenderPass>, pass: &str) -> Result<Subpass> {
    Subpass::from(render_pass.clone(), 0).ok_or_else(|| {
        FrameGraphError::InvalidAttachment {
            pass: pass.to_string(),
            reason: "render pass has no subpass".to_string(),
        }
        .into()
    })
}

fn create_render_pass(device: Arc<Device>, desc: &RenderPassDesc, swapchain_format: Format) -> Result<Arc<RenderPass>> {
    let attachments = desc
        .attachments()
        .map(|attachment| AttachmentDescription {
            format: attachment.format(swapchain_format),
            load_op: load_op(attachment.clear),
            store_op: AttachmentStoreOp::Store,
            initial_layout: ImageLayout::Undefined,
            final_layout: final_layout(attachment.target),
            ..Default::default()
        })
        .collect();

    let color_attachments = (0..desc.color_attachments.len() as u32)
        .zip(&desc.color_attachments)
        .map(|(index, attachment)| {
            Some(AttachmentReference {
                attachment: index,
                layout: attachment_layout(attachment.format(swapchain_format)),
                ..Default::default()
            })
        })
        .collect();

    let depth_stencil_attachment = desc.depth_attachment.as_ref().map(|attachment| AttachmentReference {
        attachment: desc.color_attachments.len() as u32,
        layout: attachment_layout(attachment.format(swapchain_format)),
        ..Default::default()
    });

    RenderPass::new(
        device,
        RenderPassCreateInfo {
            attachments,
            subpasses: vec![SubpassDescription {
                color_attachments,
                depth_stencil_attachment,
                ..Default::default()
            }],
            ..Default::default()
        },
    )
    .map_err(|e| {
        GraphicsError::ResourceCreation(format!("Failed to create render pass '{}': {:?}", desc.name, e)).into()
    })
}

/// 覆盖整个附件的视口；相机投影已经是 Vulkan 裁剪空间，不需要翻转
pub fn full_viewport(extent: [u32; 2]) -> Viewport {
    Viewport {
        offset: [0.0, 0.0],
        extent: [extent[0] as f32, extent[1] as f32],
        depth_range: 0.0..=1.0,
    }
}

pub fn full_scissor(extent: [u32; 2]) -> Scissor {
    Scissor {
        offset: [0, 0],
        extent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_viewport() {
        let viewport = full_viewport([1280, 720]);
        assert_eq!(viewport.offset, [0.0, 0.0]);
        assert_eq!(viewport.extent, [1280.0, 720.0]);
        assert_eq!(viewport.depth_range, 0.0..=1.0);

        let scissor = full_scissor([1280, 720]);
        assert_eq!(scissor.offset, [0, 0]);
        assert_eq!(scissor.extent, [1280, 720]);
    }

    #[test]
    fn test_recorders_registry() {
        let mut count = 0;
        {
            let mut recorders = PassRecorders::new().with(
                "forward",
                recorder(|_ctx| {
                    count += 1;
                    Ok(())
                }),
            );
            assert!(recorders.contains("forward"));
            assert!(!recorders.contains("present"));
            assert!(recorders.get_mut("present").is_none());
            assert!(recorders.get_mut("forward").is_some());
        }
        assert_eq!(count, 0);
    }
}
