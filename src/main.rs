//! Asaogea 可执行程序
//!
//! ```bash
//! # 使用 config.toml / scene.toml
//! cargo run
//!
//! # 命令行覆盖
//! cargo run -- --width 1920 --height 1080 --no-vsync --model assets/models/model.glb
//! ```

use anyhow::Context;
use asaogea::core::{log, Config, SceneConfig};
use asaogea::engine::Engine;
use asaogea::{app_error, app_info};

/// 加载配置 → 初始化日志 → 创建引擎 → 进入主循环
fn main() -> anyhow::Result<()> {
    let mut config = Config::from_file_or_default("config.toml");
    config.apply_args(std::env::args().skip(1));
    config.validate().context("Invalid configuration")?;

    log::init_from_config(&config.logging);
    app_info!(version = env!("CARGO_PKG_VERSION"), "Asaogea starting...");

    let scene = SceneConfig::from_file_or_default("scene.toml");
    app_info!(
        width = config.window.width,
        height = config.window.height,
        vsync = config.graphics.vsync,
        frames_in_flight = config.graphics.frames_in_flight,
        "Graphics configuration"
    );
    app_info!(
        camera_pos = ?scene.camera.transform.position,
        camera_fov = scene.camera.fov,
        model_path = %config.model_override.as_deref().unwrap_or(&scene.model.path),
        "Scene configuration"
    );

    let engine = Engine::new(config, scene).context("Failed to initialize engine")?;
    if let Err(e) = engine.run() {
        app_error!("Engine stopped with an error: {}", e);
        return Err(e).context("Engine run failed");
    }

    app_info!("Asaogea exited cleanly");
    Ok(())
}
