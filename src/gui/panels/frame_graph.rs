//! 帧图面板：按执行顺序列出通道

use crate::gui::windows::{UiFrameState, UiWindow};

#[derive(Debug, Default)]
pub struct FrameGraphWindow;

impl UiWindow for FrameGraphWindow {
    fn name(&self) -> &str {
        "Frame Graph"
    }

    fn show(&mut self, ctx: &egui::Context, frame: &mut UiFrameState<'_>) {
        let mut open = frame.open;

        egui::Window::new(self.name())
            .open(&mut open)
            .default_open(false)
            .show(ctx, |ui| {
                if frame.frame_graph.is_empty() {
                    ui.label("No passes");
                    return;
                }
                for (index, pass) in frame.frame_graph.iter().enumerate() {
                    ui.horizontal(|ui| {
                        ui.monospace(format!("{}", index));
                        ui.label(pass);
                    });
                }
            });

        frame.open = open;
    }
}
