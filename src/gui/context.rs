//! egui 上下文
//!
//! 包装 `egui::Context` 和 `egui_winit::State`：转发窗口事件，
//! 每帧运行一次 UI 构建闭包并把结果细分为可绘制的网格。

use egui::epaint::ClippedPrimitive;
use egui::TexturesDelta;
use egui_winit::State as EguiWinitState;
use winit::event::WindowEvent;
use winit::window::Window;

/// 一帧 GUI 的绘制数据
#[derive(Default)]
pub struct GuiOutput {
    pub primitives: Vec<ClippedPrimitive>,
    pub textures_delta: TexturesDelta,
    pub pixels_per_point: f32,
}

impl GuiOutput {
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty() && self.textures_delta.is_empty()
    }
}

pub struct GuiContext {
    context: egui::Context,
    state: EguiWinitState,
}

impl GuiContext {
    pub fn new(window: &Window) -> Self {
        let context = egui::Context::default();
        let viewport_id = context.viewport_id();
        let state = EguiWinitState::new(
            context.clone(),
            viewport_id,
            window,
            Some(window.scale_factor() as f32),
            None,
        );
        Self { context, state }
    }

    /// 返回 true 表示事件被 GUI 消费，不应再交给相机输入
    pub fn on_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// 构建一帧 UI
    pub fn run(&mut self, window: &Window, build: impl FnOnce(&egui::Context)) -> GuiOutput {
        let raw_input = self.state.take_egui_input(window);
        let full_output = self.context.run(raw_input, build);

        self.state
            .handle_platform_output(window, full_output.platform_output);

        let pixels_per_point = full_output.pixels_per_point;
        let primitives = self.context.tessellate(full_output.shapes, pixels_per_point);

        GuiOutput {
            primitives,
            textures_delta: full_output.textures_delta,
            pixels_per_point,
        }
    }

    /// 鼠标或键盘正被 GUI 使用
    pub fn wants_input(&self) -> bool {
        self.context.wants_pointer_input() || self.context.wants_keyboard_input()
    }

    pub fn context(&self) -> &egui::Context {
        &self.context
    }
}
