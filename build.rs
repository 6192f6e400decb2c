/// Build script for Asaogea
///
/// GLSL shaders are compiled at build time by the `vulkano_shaders::shader!` macro;
/// this script only makes cargo rebuild when one of them changes.
fn main() {
    for shader in [
        "mesh.vert",
        "mesh.frag",
        "composite.vert",
        "composite.frag",
        "gui.vert",
        "gui.frag",
    ] {
        println!("cargo:rerun-if-changed=src/gfx/vulkan/shaders/{shader}");
    }
}
