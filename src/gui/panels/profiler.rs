//! 性能分析面板
//!
//! 上半部分是历史帧总耗时曲线，下半部分是最近一帧的各项记录。

use std::time::Duration;

use egui::{Pos2, Rect, Stroke};

use crate::core::profiler::Profiler;
use crate::gui::windows::{UiFrameState, UiWindow};

const PLOT_HEIGHT: f32 = 80.0;

#[derive(Debug, Default)]
pub struct ProfilerWindow;

impl UiWindow for ProfilerWindow {
    fn name(&self) -> &str {
        "Profiler"
    }

    fn show(&mut self, ctx: &egui::Context, frame: &mut UiFrameState<'_>) {
        let mut open = frame.open;
        let handle = &frame.profiler;

        egui::Window::new(self.name())
            .open(&mut open)
            .default_width(320.0)
            .show(ctx, |ui| {
                let Ok(profiler) = handle.read() else {
                    ui.label("Profiler unavailable");
                    return;
                };

                let mut enabled = profiler.is_enabled();
                if ui.checkbox(&mut enabled, "Enabled").changed() {
                    profiler.enable(enabled);
                }

                let totals: Vec<f32> = profiler
                    .history()
                    .iter()
                    .map(|frame| to_ms(Profiler::frame_total(frame)))
                    .collect();

                let peak = totals.iter().copied().fold(0.0_f32, f32::max);
                ui.label(format!("History: {} frames, peak {:.2} ms", totals.len(), peak));

                let (rect, _) = ui.allocate_exact_size(
                    egui::vec2(ui.available_width(), PLOT_HEIGHT),
                    egui::Sense::hover(),
                );
                let painter = ui.painter_at(rect);
                painter.rect_filled(rect, 2.0, ui.visuals().extreme_bg_color);
                let points = plot_points(&totals, rect, peak);
                if points.len() >= 2 {
                    painter.add(egui::Shape::line(points, Stroke::new(1.5, egui::Color32::LIGHT_GREEN)));
                }

                ui.separator();
                if let Some(history) = profiler.history().back() {
                    egui::Grid::new("profiler_records").striped(true).show(ui, |ui| {
                        for record in history.iter() {
                            ui.label(record.name);
                            ui.monospace(format!("{:.3} ms", to_ms(record.elapsed)));
                            ui.end_row();
                        }
                    });
                };
            });

        frame.open = open;
    }
}

fn to_ms(duration: Duration) -> f32 {
    duration.as_secs_f32() * 1000.0
}

/// 把数值序列映射到矩形内：最旧的在左，`max` 对应顶端
pub fn plot_points(values: &[f32], rect: Rect, max: f32) -> Vec<Pos2> {
    if values.is_empty() {
        return Vec::new();
    }
    let max = if max > 0.0 { max } else { 1.0 };
    let step = if values.len() > 1 {
        rect.width() / (values.len() - 1) as f32
    } else {
        0.0
    };

    values
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let t = (value / max).clamp(0.0, 1.0);
            Pos2::new(rect.left() + step * i as f32, rect.bottom() - t * rect.height())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plot_points() {
        let rect = Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(100.0, 50.0));
        let points = plot_points(&[0.0, 5.0, 10.0], rect, 10.0);

        assert_eq!(points.len(), 3);
        assert_eq!(points[0], Pos2::new(0.0, 50.0));
        assert_eq!(points[1], Pos2::new(50.0, 25.0));
        assert_eq!(points[2], Pos2::new(100.0, 0.0));
    }

    #[test]
    fn test_plot_points_degenerate() {
        let rect = Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(100.0, 50.0));
        assert!(plot_points(&[], rect, 1.0).is_empty());

        // 最大值为 0 时不除零
        let points = plot_points(&[0.0], rect, 0.0);
        assert_eq!(points, vec![Pos2::new(0.0, 50.0)]);
    }
}
