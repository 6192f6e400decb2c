//! 性能统计面板
//!
//! 显示 FPS、帧时间、三角形数和绘制调用数。

use crate::gui::windows::{UiFrameState, UiWindow};

const TARGET_FRAME_MS: f32 = 1000.0 / 60.0;

#[derive(Debug, Default)]
pub struct StatsWindow;

impl UiWindow for StatsWindow {
    fn name(&self) -> &str {
        "Stats"
    }

    fn show(&mut self, ctx: &egui::Context, frame: &mut UiFrameState<'_>) {
        let mut open = frame.open;
        let metrics = frame.metrics;

        egui::Window::new(self.name())
            .open(&mut open)
            .default_pos([10.0, 10.0])
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(format!("Device: {}", frame.device_name));
                ui.separator();

                ui.label(format!("FPS: {:.1}", metrics.fps()));
                ui.label(format!(
                    "Frame: {:.2} ms (min {:.2} / max {:.2})",
                    metrics.frame_time_ms(),
                    metrics.min_frame_time_ms(),
                    metrics.max_frame_time_ms()
                ));

                let frame_time = metrics.frame_time_ms();
                if frame_time > 0.0 {
                    if frame_time <= TARGET_FRAME_MS {
                        ui.colored_label(egui::Color32::GREEN, "✓ 60 FPS");
                    } else {
                        ui.colored_label(egui::Color32::RED, "⚠ below 60 FPS");
                    }
                }

                ui.separator();
                ui.label(format!("Triangles: {}", metrics.triangles));
                ui.label(format!("Draw calls: {}", metrics.draw_calls));
                ui.label(format!("Frames: {}", metrics.total_frames()));
            });

        frame.open = open;
    }
}
