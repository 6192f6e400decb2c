//! 键盘和鼠标输入
//!
//! `InputManager` 收集 winit 窗口事件得到的输入状态，并把它翻译为相机运动：
//! WASD 前后左右移动，Q/E 下降/上升，按住右键拖动旋转，滚轮调节移动速度。

use std::collections::HashSet;

use tracing::{debug, warn};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window};

use crate::component::Camera;
use crate::core::config::InputConfig;
use crate::math::DEG_TO_RAD;

/// 每行滚动对应的像素数
pub const PIXELS_PER_SCROLL_LINE: f32 = 12.0;

const MIN_MOVE_SPEED: f32 = 0.1;
const MAX_MOVE_SPEED: f32 = 500.0;

pub struct InputManager {
    pressed_keys: HashSet<KeyCode>,
    mouse_buttons: HashSet<MouseButton>,

    mouse_position: (f64, f64),
    /// 上一次的光标位置，焦点丢失后重置为 None，避免第一次移动产生跳变
    last_mouse_pos: Option<(f64, f64)>,
    mouse_delta: (f32, f32),
    scroll_delta: (f32, f32),

    move_speed: f32,        // 单位/秒
    mouse_sensitivity: f32, // 度/像素

    cursor_locked: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self::with_config(&InputConfig::default())
    }

    pub fn with_config(config: &InputConfig) -> Self {
        Self {
            pressed_keys: HashSet::new(),
            mouse_buttons: HashSet::new(),
            mouse_position: (0.0, 0.0),
            last_mouse_pos: None,
            mouse_delta: (0.0, 0.0),
            scroll_delta: (0.0, 0.0),
            move_speed: config.move_speed,
            mouse_sensitivity: config.mouse_sensitivity,
            cursor_locked: false,
        }
    }

    /// 处理一个窗口事件，返回事件是否与输入有关
    pub fn consume_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput { event, .. } => match event.physical_key {
                PhysicalKey::Code(code) => {
                    self.on_keyboard_input(code, event.state);
                    true
                }
                PhysicalKey::Unidentified(_) => false,
            },
            WindowEvent::MouseInput { state, button, .. } => {
                self.on_mouse_button(*button, *state);
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.on_mouse_move((position.x, position.y));
                true
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.on_scroll(*delta);
                true
            }
            WindowEvent::Focused(false) => {
                self.on_focus_lost();
                true
            }
            _ => false,
        }
    }

    pub fn on_keyboard_input(&mut self, keycode: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.pressed_keys.insert(keycode);
            }
            ElementState::Released => {
                self.pressed_keys.remove(&keycode);
            }
        }
    }

    pub fn on_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.mouse_buttons.insert(button);
            }
            ElementState::Released => {
                self.mouse_buttons.remove(&button);
            }
        }
    }

    /// 光标移动，同一帧内的多次移动累加
    pub fn on_mouse_move(&mut self, position: (f64, f64)) {
        if let Some(last) = self.last_mouse_pos {
            self.mouse_delta.0 += (position.0 - last.0) as f32;
            self.mouse_delta.1 += (position.1 - last.1) as f32;
        }
        self.last_mouse_pos = Some(position);
        self.mouse_position = position;
    }

    /// 滚轮，按行滚动时换算为像素
    pub fn on_scroll(&mut self, delta: MouseScrollDelta) {
        let (x, y) = match delta {
            MouseScrollDelta::LineDelta(x, y) => (x * PIXELS_PER_SCROLL_LINE, y * PIXELS_PER_SCROLL_LINE),
            MouseScrollDelta::PixelDelta(position) => (position.x as f32, position.y as f32),
        };
        self.scroll_delta.0 += x;
        self.scroll_delta.1 += y;
    }

    /// 失去焦点时松开所有按键，否则按键的释放事件会丢失
    pub fn on_focus_lost(&mut self) {
        self.pressed_keys.clear();
        self.mouse_buttons.clear();
        self.mouse_delta = (0.0, 0.0);
        self.scroll_delta = (0.0, 0.0);
        self.last_mouse_pos = None;
    }

    /// 每帧开始时清空增量
    pub fn begin_frame(&mut self) {
        self.mouse_delta = (0.0, 0.0);
        self.scroll_delta = (0.0, 0.0);
    }

    /// 根据当前输入状态更新相机
    pub fn update_camera(&mut self, camera: &mut Camera, delta_time: f32) {
        self.handle_scroll_speed();
        self.handle_keyboard_movement(camera, delta_time);
        self.handle_mouse_rotation(camera);
    }

    fn handle_scroll_speed(&mut self) {
        if self.scroll_delta.1.abs() < f32::EPSILON {
            return;
        }
        // 每滚动一行速度变化 10%
        let factor = 1.1_f32.powf(self.scroll_delta.1 / PIXELS_PER_SCROLL_LINE);
        self.move_speed = (self.move_speed * factor).clamp(MIN_MOVE_SPEED, MAX_MOVE_SPEED);
        debug!(move_speed = self.move_speed, "Camera speed changed");
    }

    fn handle_keyboard_movement(&self, camera: &mut Camera, delta_time: f32) {
        let distance = self.move_speed * delta_time;

        if self.is_key_pressed(KeyCode::KeyW) {
            camera.walk(distance);
        }
        if self.is_key_pressed(KeyCode::KeyS) {
            camera.walk(-distance);
        }
        if self.is_key_pressed(KeyCode::KeyA) {
            camera.strafe(-distance);
        }
        if self.is_key_pressed(KeyCode::KeyD) {
            camera.strafe(distance);
        }
        if self.is_key_pressed(KeyCode::KeyQ) {
            camera.elevate(-distance);
        }
        if self.is_key_pressed(KeyCode::KeyE) {
            camera.elevate(distance);
        }
    }

    /// 按住右键拖动旋转
    fn handle_mouse_rotation(&self, camera: &mut Camera) {
        if !self.is_mouse_button_pressed(MouseButton::Right) {
            return;
        }

        if self.mouse_delta.0.abs() < 0.001 && self.mouse_delta.1.abs() < 0.001 {
            return;
        }

        let dx = self.mouse_delta.0 * self.mouse_sensitivity * DEG_TO_RAD;
        let dy = self.mouse_delta.1 * self.mouse_sensitivity * DEG_TO_RAD;

        camera.pitch(dy);
        camera.rotate_y(dx);
    }

    /// 右键按下时锁定并隐藏光标，松开时恢复
    pub fn sync_cursor(&mut self, window: &Window) {
        let wants_lock = self.is_mouse_button_pressed(MouseButton::Right);
        if wants_lock && !self.cursor_locked {
            self.lock_cursor(window);
        } else if !wants_lock && self.cursor_locked {
            self.unlock_cursor(window);
        }
    }

    pub fn lock_cursor(&mut self, window: &Window) {
        if self.cursor_locked {
            return;
        }

        window.set_cursor_visible(false);

        // Confined 支持更广，失败再尝试 Locked
        if let Err(e) = window.set_cursor_grab(CursorGrabMode::Confined) {
            if let Err(e2) = window.set_cursor_grab(CursorGrabMode::Locked) {
                warn!(confined = %e, locked = %e2, "Failed to grab cursor, rotation still works");
            } else {
                debug!("Cursor grabbed with Locked mode");
            }
        } else {
            debug!("Cursor grabbed with Confined mode");
        }
        self.cursor_locked = true;
    }

    pub fn unlock_cursor(&mut self, window: &Window) {
        window.set_cursor_visible(true);
        if !self.cursor_locked {
            return;
        }

        if let Err(e) = window.set_cursor_grab(CursorGrabMode::None) {
            warn!("Failed to release cursor grab: {}", e);
        }
        self.cursor_locked = false;
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    pub fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.mouse_buttons.contains(&button)
    }

    pub fn mouse_position(&self) -> (f64, f64) {
        self.mouse_position
    }

    pub fn mouse_delta(&self) -> (f32, f32) {
        self.mouse_delta
    }

    pub fn scroll_delta(&self) -> (f32, f32) {
        self.scroll_delta
    }

    pub fn move_speed(&self) -> f32 {
        self.move_speed
    }

    pub fn set_move_speed(&mut self, speed: f32) {
        self.move_speed = speed.clamp(MIN_MOVE_SPEED, MAX_MOVE_SPEED);
    }

    pub fn mouse_sensitivity(&self) -> f32 {
        self.mouse_sensitivity
    }

    pub fn set_mouse_sensitivity(&mut self, sensitivity: f32) {
        self.mouse_sensitivity = sensitivity;
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}
