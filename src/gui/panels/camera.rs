//! 相机面板
//!
//! 显示相机位置，调整视场角和清除颜色。

use crate::gui::windows::{UiFrameState, UiWindow};
use crate::math::deg_to_rad;

#[derive(Debug, Default)]
pub struct CameraWindow;

impl UiWindow for CameraWindow {
    fn name(&self) -> &str {
        "Camera"
    }

    fn show(&mut self, ctx: &egui::Context, frame: &mut UiFrameState<'_>) {
        let mut open = frame.open;

        egui::Window::new(self.name())
            .open(&mut open)
            .default_open(false)
            .show(ctx, |ui| {
                let camera = &mut *frame.camera;
                let p = camera.position();
                ui.label(format!("Position: ({:.2}, {:.2}, {:.2})", p.x, p.y, p.z));
                let look = camera.look();
                ui.label(format!("Look: ({:.2}, {:.2}, {:.2})", look.x, look.y, look.z));

                let mut fov = camera.fov_y_degrees();
                if ui
                    .add(egui::Slider::new(&mut fov, 30.0..=120.0).text("FOV").suffix("°"))
                    .changed()
                {
                    let (aspect, near, far) = (camera.aspect(), camera.near_z(), camera.far_z());
                    camera.set_lens(deg_to_rad(fov), aspect, near, far);
                }

                ui.separator();
                ui.horizontal(|ui| {
                    ui.label("Clear color");
                    ui.color_edit_button_rgba_unmultiplied(frame.clear_color);
                });

                ui.small("WASD move · Q/E down/up · right mouse look");
            });

        frame.open = open;
    }
}
