//! 在任务系统中加载模型

use std::path::PathBuf;

use asaogea::core::error::{AssetError, EngineError};
use asaogea::core::JobSystem;
use asaogea::engine::{load_model, spawn_model_load};

const TRIANGLES: &str = "\
o Pair
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
v 2.0 0.0 0.0
f 1 2 3
f 1 3 4
f 2 5 3
";

fn write_temp(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("asaogea_{}_{}", std::process::id(), name));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_load_obj_on_job_system() {
    let path = write_temp("pair.obj", TRIANGLES);
    let jobs = JobSystem::new(2).unwrap();

    let handle = spawn_model_load(&jobs, path.clone()).unwrap();
    let mesh = handle.wait().unwrap().unwrap();

    assert_eq!(mesh.vertex_count(), 5);
    assert_eq!(mesh.triangle_count(), 3);
    assert!(!mesh.missing_normals());
    assert!(mesh.validate().is_ok());

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_missing_model_reports_error() {
    let jobs = JobSystem::new(1).unwrap();
    let path = std::env::temp_dir().join("asaogea_definitely_missing.obj");

    let result = spawn_model_load(&jobs, path).unwrap().wait().unwrap();
    assert!(matches!(result, Err(EngineError::Asset(AssetError::FileNotFound(_)))));
}

#[test]
fn test_parallel_loads() {
    let path = write_temp("parallel.obj", TRIANGLES);
    let jobs = JobSystem::new(4).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| spawn_model_load(&jobs, path.clone()).unwrap())
        .collect();

    for handle in handles {
        let mesh = handle.wait().unwrap().unwrap();
        assert_eq!(mesh.triangle_count(), 3);
    }

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_load_model_directly() {
    let path = write_temp("direct.obj", TRIANGLES);
    let mesh = load_model(&path).unwrap();
    assert_eq!(mesh.compute_bounds().map(|b| b.extent().x), Some(1.0));
    let _ = std::fs::remove_file(&path);
}
