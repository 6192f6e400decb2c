//! 帧图定义
//!
//! 纯数据描述：每个渲染通道声明自己的颜色/深度附件，`children` 是它读取
//! 其输出的前置通道。呈现通道是树根，写入交换链。
//!
//! 同名的通道视为同一个通道（可以被多个父通道共享），因此同名通道的描述
//! 必须完全一致；一个通道的后代中出现它自己的名字即构成环。

use std::collections::HashMap;

use vulkano::format::{ClearValue as AttachmentClearValue, Format};
use vulkano::image::ImageLayout;
use vulkano::render_pass::AttachmentLoadOp;

use crate::core::error::{FrameGraphError, Result};
use crate::gfx::vulkan::resources::image::{has_stencil, is_depth_format};

/// 附件的清除方式
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ClearValue {
    #[default]
    DontClear,
    Color([f32; 4]),
    DepthStencil(f32, u32),
}

/// 附件写入的目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    /// 当前交换链图像
    Swapchain,
    /// 帧图内部分配的图像
    Internal(Format),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentDesc {
    pub clear: ClearValue,
    pub target: RenderTarget,
}

impl AttachmentDesc {
    pub fn new(clear: ClearValue, target: RenderTarget) -> Self {
        Self { clear, target }
    }

    pub fn swapchain(clear: ClearValue) -> Self {
        Self::new(clear, RenderTarget::Swapchain)
    }

    pub fn internal(format: Format, clear: ClearValue) -> Self {
        Self::new(clear, RenderTarget::Internal(format))
    }

    /// 交换链附件使用交换链格式
    pub fn format(&self, swapchain_format: Format) -> Format {
        match self.target {
            RenderTarget::Swapchain => swapchain_format,
            RenderTarget::Internal(format) => format,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDesc {
    pub name: String,
    pub color_attachments: Vec<AttachmentDesc>,
    pub depth_attachment: Option<AttachmentDesc>,
    pub children: Vec<RenderPassDesc>,
}

impl RenderPassDesc {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color_attachments: Vec::new(),
            depth_attachment: None,
            children: Vec::new(),
        }
    }

    pub fn with_color(mut self, attachment: AttachmentDesc) -> Self {
        self.color_attachments.push(attachment);
        self
    }

    pub fn with_depth(mut self, attachment: AttachmentDesc) -> Self {
        self.depth_attachment = Some(attachment);
        self
    }

    pub fn with_child(mut self, child: RenderPassDesc) -> Self {
        self.children.push(child);
        self
    }

    /// 颜色附件在前，深度附件在最后，与渲染通道中的附件编号一致
    pub fn attachments(&self) -> impl Iterator<Item = &AttachmentDesc> {
        self.color_attachments.iter().chain(self.depth_attachment.iter())
    }

    pub fn attachment_count(&self) -> usize {
        self.color_attachments.len() + usize::from(self.depth_attachment.is_some())
    }

    pub fn writes_swapchain(&self) -> bool {
        self.attachments().any(|a| a.target == RenderTarget::Swapchain)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameGraph {
    pub present_pass: RenderPassDesc,
}

impl FrameGraph {
    pub fn new(present_pass: RenderPassDesc) -> Self {
        Self { present_pass }
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen: HashMap<&str, &RenderPassDesc> = HashMap::new();
        let mut stack = Vec::new();
        self.visit(&self.present_pass, &mut stack, &mut seen)?;

        for pass in seen.values() {
            validate_attachments(pass, pass.name == self.present_pass.name)?;
        }
        Ok(())
    }

    /// 后序遍历：子通道在父通道之前，共享的通道只出现一次
    pub fn execution_order(&self) -> Result<Vec<&RenderPassDesc>> {
        self.validate()?;

        let mut order = Vec::new();
        post_order(&self.present_pass, &mut order);
        Ok(order)
    }

    pub fn find(&self, name: &str) -> Option<&RenderPassDesc> {
        find(&self.present_pass, name)
    }

    fn visit<'a>(
        &'a self,
        pass: &'a RenderPassDesc,
        stack: &mut Vec<&'a str>,
        seen: &mut HashMap<&'a str, &'a RenderPassDesc>,
    ) -> Result<()> {
        if stack.contains(&pass.name.as_str()) {
            let mut path = stack.join(" -> ");
            path.push_str(" -> ");
            path.push_str(&pass.name);
            return Err(FrameGraphError::Cycle(path).into());
        }

        match seen.get(pass.name.as_str()) {
            Some(existing) if *existing != pass => {
                return Err(FrameGraphError::DuplicatePass(pass.name.clone()).into());
            }
            Some(_) => return Ok(()),
            None => {
                seen.insert(pass.name.as_str(), pass);
            }
        }

        stack.push(pass.name.as_str());
        for child in &pass.children {
            self.visit(child, stack, seen)?;
        }
        stack.pop();
        Ok(())
    }
}

fn validate_attachments(pass: &RenderPassDesc, is_present: bool) -> Result<()> {
    let invalid = |reason: &str| -> crate::core::error::EngineError {
        FrameGraphError::InvalidAttachment {
            pass: pass.name.clone(),
            reason: reason.to_string(),
        }
        .into()
    };

    if pass.attachment_count() == 0 {
        return Err(FrameGraphError::EmptyPass(pass.name.clone()).into());
    }

    let swapchain_writes = pass
        .color_attachments
        .iter()
        .filter(|a| a.target == RenderTarget::Swapchain)
        .count();
    match (is_present, swapchain_writes) {
        (true, 1) | (false, 0) => {}
        (true, 0) => return Err(invalid("the present pass must write the swapchain")),
        (true, _) => return Err(invalid("the swapchain can only be written once")),
        (false, _) => return Err(invalid("only the present pass may write the swapchain")),
    }

    for attachment in &pass.color_attachments {
        if let RenderTarget::Internal(format) = attachment.target {
            if is_depth_format(format) {
                return Err(invalid("color attachment uses a depth format"));
            }
        }
        if matches!(attachment.clear, ClearValue::DepthStencil(..)) {
            return Err(invalid("color attachment cleared with a depth value"));
        }
    }

    if let Some(depth) = &pass.depth_attachment {
        match depth.target {
            RenderTarget::Swapchain => return Err(invalid("depth attachment cannot target the swapchain")),
            RenderTarget::Internal(format) if !is_depth_format(format) => {
                return Err(invalid("depth attachment needs a depth format"));
            }
            RenderTarget::Internal(_) => {}
        }
        if matches!(depth.clear, ClearValue::Color(_)) {
            return Err(invalid("depth attachment cleared with a color"));
        }
    }

    Ok(())
}

fn post_order<'a>(pass: &'a RenderPassDesc, order: &mut Vec<&'a RenderPassDesc>) {
    if order.iter().any(|p| p.name == pass.name) {
        return;
    }
    for child in &pass.children {
        post_order(child, order);
    }
    order.push(pass);
}

fn find<'a>(pass: &'a RenderPassDesc, name: &str) -> Option<&'a RenderPassDesc> {
    if pass.name == name {
        return Some(pass);
    }
    pass.children.iter().find_map(|child| find(child, name))
}

/// 不清除的附件不关心旧内容
pub fn load_op(clear: ClearValue) -> AttachmentLoadOp {
    match clear {
        ClearValue::DontClear => AttachmentLoadOp::DontCare,
        _ => AttachmentLoadOp::Clear,
    }
}

/// 交换链附件结束时可以呈现，内部附件结束时可以被后续通道采样
pub fn final_layout(target: RenderTarget) -> ImageLayout {
    match target {
        RenderTarget::Swapchain => ImageLayout::PresentSrc,
        RenderTarget::Internal(_) => ImageLayout::ShaderReadOnlyOptimal,
    }
}

/// 子通道中引用附件时的布局
pub fn attachment_layout(format: Format) -> ImageLayout {
    if is_depth_format(format) {
        ImageLayout::DepthStencilAttachmentOptimal
    } else {
        ImageLayout::ColorAttachmentOptimal
    }
}

/// 开始渲染通道时传入的清除值；不清除的附件为 `None`
pub fn clear_value(clear: ClearValue, format: Format) -> Option<AttachmentClearValue> {
    match clear {
        ClearValue::DontClear => None,
        ClearValue::Color(color) => Some(AttachmentClearValue::Float(color)),
        ClearValue::DepthStencil(depth, stencil) if has_stencil(format) => {
            Some(AttachmentClearValue::DepthStencil((depth, stencil)))
        }
        ClearValue::DepthStencil(depth, _) => Some(AttachmentClearValue::Depth(depth)),
    }
}
