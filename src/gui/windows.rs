//! UI 窗口注册表
//!
//! 每个面板实现 [`UiWindow`]，按名字注册到 [`UiWindows`]。同名窗口再次
//! 打开时替换旧窗口；`show` 中把 `frame.open` 置为 `false` 的窗口在本帧
//! 结束后关闭。

use crate::component::Camera;
use crate::core::profiler::Profiler;
use crate::core::resource::ResourceHandle;
use crate::gui::metrics::PerformanceMetrics;
use crate::progression::Checklist;

/// 面板每帧可以读写的引擎状态
///
/// 引擎拥有的对象以句柄形式给出，面板不延长它们的生命周期。
pub struct UiFrameState<'a> {
    pub profiler: ResourceHandle<Profiler>,
    pub metrics: &'a PerformanceMetrics,
    pub camera: &'a mut Camera,
    pub clear_color: &'a mut [f32; 4],
    /// 帧图执行顺序
    pub frame_graph: &'a [String],
    pub device_name: &'a str,
    /// 清单解析失败时句柄无效
    pub checklist: ResourceHandle<Checklist>,
    /// 当前窗口是否保持打开
    pub open: bool,
}

pub trait UiWindow {
    fn name(&self) -> &str;

    fn show(&mut self, ctx: &egui::Context, frame: &mut UiFrameState<'_>);
}

#[derive(Default)]
pub struct UiWindows {
    windows: Vec<Box<dyn UiWindow>>,
}

impl UiWindows {
    pub fn new() -> Self {
        Self::default()
    }

    /// 打开窗口；同名窗口被替换
    pub fn open(&mut self, window: impl UiWindow + 'static) {
        let window: Box<dyn UiWindow> = Box::new(window);
        match self.windows.iter().position(|w| w.name() == window.name()) {
            Some(index) => self.windows[index] = window,
            None => self.windows.push(window),
        }
    }

    pub fn close(&mut self, name: &str) -> bool {
        let before = self.windows.len();
        self.windows.retain(|w| w.name() != name);
        self.windows.len() != before
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.windows.iter().any(|w| w.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.windows.iter().map(|w| w.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// 依次显示所有窗口，关闭本帧请求关闭的窗口
    pub fn show_all(&mut self, ctx: &egui::Context, frame: &mut UiFrameState<'_>) {
        self.windows.retain_mut(|window| {
            frame.open = true;
            window.show(ctx, frame);
            frame.open
        });
        frame.open = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resource::Resource;

    struct TestWindow {
        name: &'static str,
        shown: usize,
        close_after: Option<usize>,
    }

    impl TestWindow {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                shown: 0,
                close_after: None,
            }
        }
    }

    impl UiWindow for TestWindow {
        fn name(&self) -> &str {
            self.name
        }

        fn show(&mut self, _ctx: &egui::Context, frame: &mut UiFrameState<'_>) {
            self.shown += 1;
            if self.close_after == Some(self.shown) {
                frame.open = false;
            }
        }
    }

    fn with_frame(f: impl FnOnce(&mut UiFrameState<'_>)) {
        let profiler = Resource::new(Profiler::new(8));
        let metrics = PerformanceMetrics::new();
        let mut camera = Camera::new();
        let mut clear_color = [0.0; 4];
        let mut frame = UiFrameState {
            profiler: profiler.handle(),
            metrics: &metrics,
            camera: &mut camera,
            clear_color: &mut clear_color,
            frame_graph: &[],
            device_name: "test",
            checklist: ResourceHandle::default(),
            open: true,
        };
        f(&mut frame);
    }

    /// 记录面板每帧从句柄读到的内容
    struct ObservingWindow {
        seen_history: Vec<usize>,
        checklist_total: Option<usize>,
    }

    impl UiWindow for ObservingWindow {
        fn name(&self) -> &str {
            "observer"
        }

        fn show(&mut self, _ctx: &egui::Context, frame: &mut UiFrameState<'_>) {
            if let Ok(profiler) = frame.profiler.read() {
                self.seen_history.push(profiler.history().len());
            }
            self.checklist_total = frame.checklist.read().ok().map(|c| c.total());
        }
    }

    #[test]
    fn test_open_replaces_same_name() {
        let mut windows = UiWindows::new();
        windows.open(TestWindow::new("profiler"));
        windows.open(TestWindow::new("camera"));
        windows.open(TestWindow::new("profiler"));

        assert_eq!(windows.len(), 2);
        assert_eq!(windows.names(), vec!["profiler", "camera"]);
        assert!(windows.is_open("camera"));
    }

    #[test]
    fn test_close() {
        let mut windows = UiWindows::new();
        windows.open(TestWindow::new("stats"));
        assert!(windows.close("stats"));
        assert!(!windows.close("stats"));
        assert!(windows.is_empty());
    }

    #[test]
    fn test_windows_closing_themselves() {
        let ctx = egui::Context::default();
        let mut windows = UiWindows::new();
        windows.open(TestWindow {
            close_after: Some(2),
            ..TestWindow::new("closing")
        });
        windows.open(TestWindow::new("staying"));

        with_frame(|frame| {
            windows.show_all(&ctx, frame);
            assert_eq!(windows.len(), 2);

            windows.show_all(&ctx, frame);
            assert_eq!(windows.names(), vec!["staying"]);
            assert!(frame.open);
        });
    }

    #[test]
    fn test_panels_observe_engine_objects_through_handles() {
        let ctx = egui::Context::default();
        let profiler = Resource::new(Profiler::new(8));
        let checklist = Resource::new(Checklist::parse("- [x] Window\n- [ ] Shadows\n").unwrap());
        let metrics = PerformanceMetrics::new();
        let mut camera = Camera::new();
        let mut clear_color = [0.0; 4];

        let mut frame = UiFrameState {
            profiler: profiler.handle(),
            metrics: &metrics,
            camera: &mut camera,
            clear_color: &mut clear_color,
            frame_graph: &[],
            device_name: "test",
            checklist: checklist.handle(),
            open: true,
        };
        let mut observer = ObservingWindow {
            seen_history: Vec::new(),
            checklist_total: None,
        };

        observer.show(&ctx, &mut frame);
        assert_eq!(observer.seen_history, vec![0]);
        assert_eq!(observer.checklist_total, Some(2));

        // 所有者销毁后句柄失效，面板不再读到任何内容
        drop(profiler);
        drop(checklist);
        observer.show(&ctx, &mut frame);
        assert_eq!(observer.seen_history, vec![0]);
        assert_eq!(observer.checklist_total, None);
    }
}
