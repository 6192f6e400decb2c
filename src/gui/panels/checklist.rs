//! 进度清单面板

use crate::gui::windows::{UiFrameState, UiWindow};

#[derive(Debug, Default)]
pub struct ChecklistWindow {
    /// 只显示未完成的条目
    todo_only: bool,
}

impl UiWindow for ChecklistWindow {
    fn name(&self) -> &str {
        "Progression"
    }

    fn show(&mut self, ctx: &egui::Context, frame: &mut UiFrameState<'_>) {
        let mut open = frame.open;
        let todo_only = &mut self.todo_only;
        let handle = &frame.checklist;

        egui::Window::new("Progression")
            .open(&mut open)
            .default_open(false)
            .vscroll(true)
            .show(ctx, |ui| {
                let Ok(checklist) = handle.read() else {
                    ui.label("No checklist loaded");
                    return;
                };

                ui.add(
                    egui::ProgressBar::new(checklist.ratio())
                        .text(format!("{} / {}", checklist.completed(), checklist.total())),
                );
                ui.checkbox(todo_only, "Remaining only");
                ui.separator();

                for section in checklist.sections() {
                    let items: Vec<_> = section
                        .items
                        .iter()
                        .filter(|item| !*todo_only || !item.state.is_done())
                        .collect();
                    if items.is_empty() {
                        continue;
                    }

                    let title = if section.title.is_empty() { "General" } else { section.title.as_str() };
                    ui.collapsing(title, |ui| {
                        for item in items {
                            let mark = if item.state.is_done() { "☑" } else { "☐" };
                            ui.label(format!("{} {}", mark, item.label));
                        }
                    });
                }
            });

        frame.open = open;
    }
}
