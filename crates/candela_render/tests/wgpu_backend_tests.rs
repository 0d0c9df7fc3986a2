//! wgpu Backend Smoke Tests
//!
//! End-to-end pass over the production backend: compile WGSL stages,
//! link, reflect, build a pipeline against a target signature, write
//! uniforms, allocate descriptor sets.
//!
//! Ignored by default — they need a real GPU adapter. Run with
//! `cargo test -- --ignored` on a machine with one.

use std::sync::Arc;

use candela_render::backend::webgpu::WgpuBackend;
use candela_render::backend::RenderTargetDescriptor;
use candela_render::context::RenderContext;
use candela_render::settings::RendererSettings;
use candela_render::shader::layout::UniformKind;
use candela_render::shader::{ShaderSourceDescriptor, StageSource};

const VS: &str = r"
    struct VertexInput {
        @location(0) position: vec3<f32>,
        @location(1) uv: vec2<f32>,
    };

    @group(0) @binding(0) var<uniform> u_mvp: mat4x4<f32>;

    @vertex
    fn vs_main(vin: VertexInput) -> @builtin(position) vec4<f32> {
        return u_mvp * vec4<f32>(vin.position, 1.0);
    }
";

const FS: &str = r"
    @group(0) @binding(1) var<uniform> u_color: vec4<f32>;
    @group(0) @binding(2) var<uniform> lights: array<vec4<f32>, 4>;

    @fragment
    fn fs_main() -> @location(0) vec4<f32> {
        return u_color + lights[0];
    }
";

#[test]
#[ignore = "requires a GPU adapter"]
fn wgsl_shader_compiles_links_and_builds_a_pipeline() {
    let _ = env_logger::builder().is_test(true).try_init();
    let settings = RendererSettings::default();
    let backend = Arc::new(pollster::block_on(WgpuBackend::new(&settings)).unwrap());
    let mut context = RenderContext::new(backend, settings);

    let shader = context
        .create_shader(&ShaderSourceDescriptor {
            vertex: StageSource::new(VS),
            fragment: StageSource::new(FS),
            render_state: Default::default(),
        })
        .unwrap();

    let mvp = shader.layout().uniform("u_mvp").expect("u_mvp reflected");
    assert_eq!(mvp.kind, UniformKind::Mat4);
    let lights = shader.layout().uniform("lights").expect("array reflected");
    assert_eq!(lights.count, 4);

    let pass = context.create_render_pass(&RenderTargetDescriptor::default());
    let first = shader.pipeline(pass, true, true).unwrap();
    let second = shader.pipeline(pass, true, true).unwrap();
    assert_eq!(first, second);

    let binder = context.binder();
    assert!(binder.set_uniform_matrix(&shader, "u_mvp", &[glam::Mat4::IDENTITY]));
    assert!(!binder.set_uniform_1f(&shader, "nonexistent", 1.0));

    let allocation = binder.create_descriptor_sets(&shader).unwrap();
    assert_eq!(allocation.sets.len(), 1);
    binder.destroy_descriptor_sets(&allocation);

    context.destroy_render_pass(pass);
    assert_eq!(shader.cached_pipeline_count(), 0);
}
