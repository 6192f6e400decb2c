//! 帧图定义的校验与执行顺序

use asaogea::core::error::{EngineError, FrameGraphError};
use asaogea::engine::{default_frame_graph, SCENE_COLOR_FORMAT, SCENE_DEPTH_FORMAT};
use asaogea::gfx::vulkan::frame_graph::{AttachmentDesc, ClearValue, FrameGraph, RenderPassDesc};
use asaogea::gfx::vulkan::{FORWARD_PASS, PRESENT_PASS};

fn color_pass(name: &str) -> RenderPassDesc {
    RenderPassDesc::new(name).with_color(AttachmentDesc::internal(
        SCENE_COLOR_FORMAT,
        ClearValue::Color([0.0, 0.0, 0.0, 1.0]),
    ))
}

fn present() -> RenderPassDesc {
    RenderPassDesc::new(PRESENT_PASS).with_color(AttachmentDesc::swapchain(ClearValue::DontClear))
}

fn names(graph: &FrameGraph) -> Vec<String> {
    graph
        .execution_order()
        .unwrap()
        .into_iter()
        .map(|p| p.name.clone())
        .collect()
}

#[test]
fn test_default_graph() {
    let graph = default_frame_graph([0.1, 0.1, 0.1, 1.0]);
    assert_eq!(names(&graph), vec![FORWARD_PASS, PRESENT_PASS]);

    let forward = graph.find(FORWARD_PASS).unwrap();
    assert_eq!(forward.attachment_count(), 2);
    assert!(!forward.writes_swapchain());
    assert!(graph.present_pass.writes_swapchain());
}

#[test]
fn test_shared_child_runs_once() {
    let shadow = RenderPassDesc::new("shadow").with_depth(AttachmentDesc::internal(
        SCENE_DEPTH_FORMAT,
        ClearValue::DepthStencil(1.0, 0),
    ));
    let graph = FrameGraph::new(
        present()
            .with_child(color_pass("opaque").with_child(shadow.clone()))
            .with_child(color_pass("transparent").with_child(shadow)),
    );

    assert_eq!(names(&graph), vec!["shadow", "opaque", "transparent", PRESENT_PASS]);
}

#[test]
fn test_cycle_rejected() {
    let inner = color_pass("b").with_child(color_pass("a"));
    let graph = FrameGraph::new(present().with_child(color_pass("a").with_child(inner)));

    let err = graph.validate().unwrap_err();
    assert!(matches!(err, EngineError::FrameGraph(FrameGraphError::Cycle(_))));
}

#[test]
fn test_conflicting_duplicate_rejected() {
    let other = RenderPassDesc::new("a").with_depth(AttachmentDesc::internal(
        SCENE_DEPTH_FORMAT,
        ClearValue::DepthStencil(1.0, 0),
    ));
    let graph = FrameGraph::new(present().with_child(color_pass("a")).with_child(other));

    let err = graph.validate().unwrap_err();
    assert!(matches!(err, EngineError::FrameGraph(FrameGraphError::DuplicatePass(name)) if name == "a"));
}

#[test]
fn test_only_present_writes_swapchain() {
    let rogue = RenderPassDesc::new("rogue").with_color(AttachmentDesc::swapchain(ClearValue::DontClear));
    let graph = FrameGraph::new(present().with_child(rogue));

    let err = graph.validate().unwrap_err();
    assert!(matches!(
        err,
        EngineError::FrameGraph(FrameGraphError::InvalidAttachment { pass, .. }) if pass == "rogue"
    ));
}

#[test]
fn test_empty_pass_rejected() {
    let graph = FrameGraph::new(present().with_child(RenderPassDesc::new("nothing")));

    let err = graph.execution_order().unwrap_err();
    assert!(matches!(err, EngineError::FrameGraph(FrameGraphError::EmptyPass(name)) if name == "nothing"));
}
