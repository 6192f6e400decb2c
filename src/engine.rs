//! 引擎主循环
//!
//! [`Engine`] 持有与窗口无关的部分（配置、任务系统、性能分析器、功能清单），
//! [`Engine::run`] 创建窗口和渲染器后进入 winit 事件循环。
//!
//! # 每帧顺序
//!
//! 1. 时间步进，记录帧时间
//! 2. 轮询后台模型加载任务，完成后上传网格
//! 3. 输入更新相机（GUI 占用鼠标键盘时跳过）
//! 4. 构建 GUI
//! 5. 渲染
//!
//! 窗口事件先交给 GUI，GUI 消费掉的事件不再进入相机输入。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use vulkano::format::Format;
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::window::{Window, WindowBuilder};

use crate::component::Camera;
use crate::core::error::{EngineError, Result};
use crate::core::{
    Config, InputManager, JobHandle, JobSystem, Profiler, Resource, ResourceHandle, SceneConfig, TimeDelta,
};
use crate::geometry::loaders::load_mesh;
use crate::geometry::MeshData;
use crate::gfx::vulkan::frame_graph::{AttachmentDesc, ClearValue, FrameGraph, RenderPassDesc};
use crate::gfx::vulkan::{Renderer, FORWARD_PASS, PRESENT_PASS};
use crate::gui::panels::{CameraWindow, ChecklistWindow, FrameGraphWindow, ProfilerWindow, StatsWindow};
use crate::gui::{GuiContext, PerformanceMetrics, UiFrameState, UiWindow, UiWindows};
use crate::math::Matrix4;
use crate::progression::{Checklist, PROGRESSION};

/// 前向通道的 HDR 颜色格式
pub const SCENE_COLOR_FORMAT: Format = Format::R16G16B16A16_SFLOAT;
pub const SCENE_DEPTH_FORMAT: Format = Format::D32_SFLOAT;

/// 模型加载失败时显示的立方体边长
const FALLBACK_CUBE_SIZE: f32 = 1.0;

/// 前向通道（HDR 颜色 + 深度）作为呈现通道的子通道；呈现通道整屏合成，
/// 不需要清除交换链图像
pub fn default_frame_graph(clear_color: [f32; 4]) -> FrameGraph {
    let forward = RenderPassDesc::new(FORWARD_PASS)
        .with_color(AttachmentDesc::internal(SCENE_COLOR_FORMAT, ClearValue::Color(clear_color)))
        .with_depth(AttachmentDesc::internal(SCENE_DEPTH_FORMAT, ClearValue::DepthStencil(1.0, 0)));

    FrameGraph::new(
        RenderPassDesc::new(PRESENT_PASS)
            .with_color(AttachmentDesc::swapchain(ClearValue::DontClear))
            .with_child(forward),
    )
}

/// 加载模型，缺少法线时重新计算
pub fn load_model(path: &Path) -> Result<MeshData> {
    let mut mesh = load_mesh(path)?;
    if mesh.recompute_normals_if_missing() {
        debug!(path = %path.display(), "Normals reconstructed");
    }
    Ok(mesh)
}

/// 在任务系统中加载模型
pub fn spawn_model_load(jobs: &JobSystem, path: PathBuf) -> Result<JobHandle<Result<MeshData>>> {
    info!(path = %path.display(), "Loading model in background");
    Ok(jobs.push(move || load_model(&path))?)
}

pub struct Engine {
    config: Config,
    scene: SceneConfig,
    jobs: JobSystem,
    profiler: Resource<Profiler>,
    /// 解析失败时为空资源
    checklist: Resource<Checklist>,
}

impl Engine {
    pub fn new(config: Config, scene: SceneConfig) -> Result<Self> {
        config.validate()?;

        let jobs = JobSystem::new(config.jobs.worker_count)?;
        let profiler = Profiler::new(config.profiler.history_frames);
        profiler.enable(config.profiler.enabled);

        let checklist = match Checklist::parse(PROGRESSION) {
            Ok(checklist) => {
                for conflict in checklist.conflicts() {
                    warn!(label = %conflict.label, "Checklist item has conflicting states");
                }
                info!(
                    completed = checklist.completed(),
                    total = checklist.total(),
                    "Checklist loaded"
                );
                Resource::new(checklist)
            }
            Err(e) => {
                warn!("Failed to parse checklist: {}", e);
                Resource::default()
            }
        };

        crate::engine_info!(workers = jobs.worker_count(), "Engine created");

        Ok(Self {
            config,
            scene,
            jobs,
            profiler: Resource::new(profiler),
            checklist,
        })
    }

    /// 命令行指定的模型优先于场景文件
    pub fn model_path(&self) -> &str {
        self.config.model_override.as_deref().unwrap_or(&self.scene.model.path)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn jobs(&self) -> &JobSystem {
        &self.jobs
    }

    pub fn profiler(&self) -> ResourceHandle<Profiler> {
        self.profiler.handle()
    }

    /// 清单解析失败时返回无效句柄
    pub fn checklist(&self) -> ResourceHandle<Checklist> {
        self.checklist.handle()
    }

    /// 阻塞直到窗口关闭
    pub fn run(self) -> Result<()> {
        let event_loop = EventLoop::new()
            .map_err(|e| EngineError::Initialization(format!("Failed to create event loop: {}", e)))?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = AppWindow::new(&event_loop, &self.config, &self.scene, self.profiler(), self.checklist())?;
        app.pending_model = match spawn_model_load(&self.jobs, PathBuf::from(self.model_path())) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Failed to queue model load: {}", e);
                None
            }
        };

        info!("Entering main loop...");

        let mut failure = None;
        event_loop
            .run(|event, target| match event {
                Event::WindowEvent { window_id, event } if window_id == app.window.id() => {
                    if let Err(e) = app.on_window_event(&event, target) {
                        crate::engine_error!("Frame failed: {}", e);
                        failure = Some(e);
                        target.exit();
                    }
                }
                Event::AboutToWait => app.window.request_redraw(),
                Event::LoopExiting => info!("Event loop exiting"),
                _ => {}
            })
            .map_err(|e| EngineError::Runtime(format!("Event loop failed: {}", e)))?;

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// 窗口以及依附于它的渲染器、输入、相机和 GUI
struct AppWindow {
    window: Arc<Window>,
    renderer: Renderer,
    input: InputManager,
    camera: Camera,
    gui: GuiContext,
    windows: UiWindows,
    metrics: PerformanceMetrics,
    time: TimeDelta,
    clear_color: [f32; 4],
    model: Matrix4,
    pending_model: Option<JobHandle<Result<MeshData>>>,
    pass_order: Vec<String>,
    profiler: ResourceHandle<Profiler>,
    checklist: ResourceHandle<Checklist>,
}

impl AppWindow {
    fn new(
        event_loop: &EventLoop<()>,
        config: &Config,
        scene: &SceneConfig,
        profiler: ResourceHandle<Profiler>,
        checklist: ResourceHandle<Checklist>,
    ) -> Result<Self> {
        let window = WindowBuilder::new()
            .with_title(config.window.title.clone())
            .with_inner_size(PhysicalSize::new(config.window.width, config.window.height))
            .with_resizable(config.window.resizable)
            .build(event_loop)
            .map_err(|e| EngineError::Initialization(format!("Failed to create window: {}", e)))?;
        let window = Arc::new(window);

        let mut renderer = Renderer::new(
            window.clone(),
            &config.graphics,
            default_frame_graph(scene.clear_color),
        )?;
        renderer.set_mesh(&MeshData::cube(FALLBACK_CUBE_SIZE))?;

        let size = window.inner_size();
        let aspect = size.width.max(1) as f32 / size.height.max(1) as f32;
        let pass_order = renderer
            .frame_graph()
            .execution_order()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut windows = UiWindows::new();
        windows.open(StatsWindow);

        Ok(Self {
            gui: GuiContext::new(&window),
            window,
            renderer,
            input: InputManager::with_config(&config.input),
            camera: scene.camera.build_camera(aspect),
            windows,
            metrics: PerformanceMetrics::new(),
            time: TimeDelta::default(),
            clear_color: scene.clear_color,
            model: scene.model.transform.to_matrix(),
            pending_model: None,
            pass_order,
            profiler,
            checklist,
        })
    }

    fn on_window_event(
        &mut self,
        event: &WindowEvent,
        target: &EventLoopWindowTarget<()>,
    ) -> Result<()> {
        let consumed = self.gui.on_event(&self.window, event);

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down...");
                target.exit();
            }
            WindowEvent::Resized(size) => {
                #[cfg(debug_assertions)]
                debug!(width = size.width, height = size.height, "Window resized");
                #[cfg(not(debug_assertions))]
                let _ = size;

                self.renderer.resize();
            }
            WindowEvent::RedrawRequested => self.redraw()?,
            _ if !consumed => {
                self.input.consume_event(event);
            }
            _ => {}
        }
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let profiler = self.profiler.read()?;
        profiler.new_frame();
        let frame = profiler.record("frame");

        self.time.next();
        self.metrics.record_frame(self.time.delta_time());

        self.poll_model();

        {
            let _input = profiler.record("input");
            if !self.gui.wants_input() {
                self.input.update_camera(&mut self.camera, self.time.delta_seconds());
            }
            self.input.sync_cursor(&self.window);
            self.input.begin_frame();
        }

        let stats = self.renderer.stats();
        self.metrics.triangles = stats.triangles;
        self.metrics.draw_calls = stats.draw_calls;

        let gui_output = {
            let _gui = profiler.record("gui");
            let windows = &mut self.windows;
            let mut ui_frame = UiFrameState {
                profiler: self.profiler.clone(),
                metrics: &self.metrics,
                camera: &mut self.camera,
                clear_color: &mut self.clear_color,
                frame_graph: &self.pass_order,
                device_name: self.renderer.device_name(),
                checklist: self.checklist.clone(),
                open: true,
            };
            self.gui.run(&self.window, |ctx| {
                window_menu(ctx, windows);
                windows.show_all(ctx, &mut ui_frame);
            })
        };

        {
            let _render = profiler.record("render");
            self.renderer
                .draw(&mut self.camera, &self.model, self.clear_color, Some(&gui_output))?;
        }

        frame.end();
        Ok(())
    }

    /// 后台加载完成后替换回退立方体
    fn poll_model(&mut self) {
        let Some(outcome) = self.pending_model.as_ref().and_then(JobHandle::try_take) else {
            return;
        };
        self.pending_model = None;

        match outcome {
            Ok(Ok(mesh)) => {
                if let Err(e) = self.renderer.set_mesh(&mesh) {
                    crate::engine_warn!("Failed to upload model, keeping the fallback cube: {}", e);
                }
            }
            Ok(Err(e)) => crate::engine_warn!("Failed to load model, keeping the fallback cube: {}", e),
            Err(e) => crate::engine_warn!("Model load job failed: {}", e),
        }
    }
}

/// 顶部菜单，勾选打开或关闭面板
fn window_menu(ctx: &egui::Context, windows: &mut UiWindows) {
    egui::TopBottomPanel::top("asaogea_menu").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("Windows", |ui| {
                toggle_window(ui, windows, StatsWindow);
                toggle_window(ui, windows, ProfilerWindow);
                toggle_window(ui, windows, CameraWindow);
                toggle_window(ui, windows, FrameGraphWindow);
                toggle_window(ui, windows, ChecklistWindow::default());
            });
        });
    });
}

fn toggle_window(ui: &mut egui::Ui, windows: &mut UiWindows, window: impl UiWindow + 'static) {
    let name = window.name().to_string();
    let mut open = windows.is_open(&name);
    if ui.checkbox(&mut open, name.as_str()).changed() {
        if open {
            windows.open(window);
        } else {
            windows.close(&name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_frame_graph_order() {
        let graph = default_frame_graph([0.0, 0.0, 0.0, 1.0]);
        let order: Vec<&str> = graph
            .execution_order()
            .unwrap()
            .into_iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(order, vec![FORWARD_PASS, PRESENT_PASS]);

        let forward = graph.find(FORWARD_PASS).unwrap();
        assert_eq!(forward.attachment_count(), 2);
        assert!(!forward.writes_swapchain());
        assert!(graph.present_pass.writes_swapchain());
    }

    #[test]
    fn test_engine_hands_out_handles() {
        let config = Config {
            jobs: crate::core::config::JobsConfig { worker_count: 1 },
            ..Config::default()
        };
        let engine = Engine::new(config, SceneConfig::default()).unwrap();

        let profiler = engine.profiler();
        let checklist = engine.checklist();
        assert!(profiler.is_valid());
        assert!(checklist.read().unwrap().total() > 0);
        assert!(engine.profiler().ptr_eq(&profiler));

        drop(engine);
        assert!(!profiler.is_valid());
        assert!(checklist.read().is_err());
    }

    #[test]
    fn test_load_model_rejects_unknown_extension() {
        let path = std::env::temp_dir().join("asaogea_engine_test.xyz");
        assert!(load_model(&path).is_err());
    }
}
