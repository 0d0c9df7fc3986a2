//! Resource Binder Tests
//!
//! Tests for:
//! - Uniform setters: exact-name hit issues exactly one backend write and
//!   returns true; an unknown name returns false with no backend call
//! - Array uniforms addressed by base name after reflection normalization
//! - Descriptor sets: one allocation per declared set layout plus a layout
//!   copy for the caller
//! - Vertex attribute binding against the engine's fixed vertex format
//! - Generic buffer updates through the backend

use std::sync::Arc;

use glam::{Mat4, Vec4};

use candela_render::backend::headless::HeadlessBackend;
use candela_render::backend::BufferUsage;
use candela_render::backend::GraphicsBackend;
use candela_render::context::RenderContext;
use candela_render::settings::RendererSettings;
use candela_render::shader::{Shader, ShaderSourceDescriptor, StageSource};
use candela_render::vertex::VERTEX_STRIDE;

const VS: &str = "attribute vec3 position;\nattribute vec2 uv;\nuniform mat4 u_mvp;\nvoid main() {}\n";
const FS: &str = "uniform vec4 u_color;\nuniform vec4 lights[4];\nuniform float u_time;\nvoid main() {}\n";

fn new_context() -> (Arc<HeadlessBackend>, RenderContext) {
    let _ = env_logger::builder().is_test(true).try_init();
    let backend = Arc::new(HeadlessBackend::new());
    let context = RenderContext::new(backend.clone(), RendererSettings::default());
    (backend, context)
}

fn compile(context: &mut RenderContext) -> Arc<Shader> {
    context
        .create_shader(&ShaderSourceDescriptor {
            vertex: StageSource::new(VS),
            fragment: StageSource::new(FS),
            render_state: Default::default(),
        })
        .unwrap()
}

// ============================================================================
// Uniform setters
// ============================================================================

#[test]
fn known_uniform_write_returns_true_and_reaches_backend() {
    let (backend, mut context) = new_context();
    let shader = compile(&mut context);
    let binder = context.binder();

    assert!(binder.set_uniform_1f(&shader, "u_time", 0.25));

    let writes = backend.uniform_writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].name, "u_time");
    assert_eq!(writes[0].data, 0.25f32.to_ne_bytes().to_vec());
}

#[test]
fn unknown_uniform_returns_false_without_backend_call() {
    let (backend, mut context) = new_context();
    let shader = compile(&mut context);
    let binder = context.binder();

    assert!(!binder.set_uniform_1f(&shader, "nonexistent", 1.0));
    assert!(!binder.set_uniform_1i(&shader, "also_missing", 7));
    assert!(
        backend.uniform_writes().is_empty(),
        "a miss must not issue any backend write"
    );
}

#[test]
fn array_uniform_is_set_by_base_name() {
    let (backend, mut context) = new_context();
    let shader = compile(&mut context);
    let binder = context.binder();

    let values = [Vec4::ONE, Vec4::ZERO, Vec4::splat(0.5), Vec4::X];
    assert!(binder.set_uniform_4f(&shader, "lights", &values));
    assert!(
        !binder.set_uniform_4f(&shader, "lights[0]", &values),
        "the raw GL reflection name is not addressable"
    );

    let writes = backend.uniform_writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].data.len(), 4 * 16, "four vec4s of payload");
}

#[test]
fn matrix_uniform_writes_sixty_four_bytes() {
    let (backend, mut context) = new_context();
    let shader = compile(&mut context);
    let binder = context.binder();

    assert!(binder.set_uniform_matrix(&shader, "u_mvp", &[Mat4::IDENTITY]));
    assert_eq!(backend.uniform_writes()[0].data.len(), 64);
}

// ============================================================================
// Descriptor sets
// ============================================================================

#[test]
fn one_descriptor_set_is_allocated_per_declared_layout() {
    let (backend, mut context) = new_context();
    let shader = compile(&mut context);
    let binder = context.binder();

    let allocation = binder.create_descriptor_sets(&shader).unwrap();
    assert_eq!(allocation.sets.len(), allocation.layouts.len());
    assert_eq!(allocation.sets.len(), shader.layout().sets().len());
    assert_eq!(backend.live_descriptor_set_count(), allocation.sets.len());

    // The returned layouts are a copy of the shader's declared layout.
    assert_eq!(allocation.layouts, shader.layout().sets().to_vec());
    assert_eq!(backend.descriptor_set_index(allocation.sets[0]), Some(0));

    binder.destroy_descriptor_sets(&allocation);
    assert_eq!(backend.live_descriptor_set_count(), 0);
}

// ============================================================================
// Vertex attributes
// ============================================================================

#[test]
fn vertex_attributes_describe_present_slots_and_skip_absent_ones() {
    let (_, mut context) = new_context();
    let shader = compile(&mut context);
    let binder = context.binder();

    let bindings = binder.vertex_attribute_bindings(&shader);
    let names: Vec<&str> = bindings.iter().map(|b| b.name).collect();
    assert_eq!(
        names,
        vec!["position", "uv"],
        "normal and color are not declared by the shader and are skipped"
    );

    let position = &bindings[0];
    assert_eq!(position.location, 0);
    assert_eq!(position.offset, 0);
    assert_eq!(position.stride, VERTEX_STRIDE);

    let uv = &bindings[1];
    assert_eq!(uv.location, 1);
    assert_eq!(uv.offset, 24);
}

// ============================================================================
// Generic buffer updates
// ============================================================================

#[test]
fn update_buffer_writes_through_the_backend() {
    let (backend, _) = new_context();

    let buffer = backend.create_buffer(16, BufferUsage::UNIFORM | BufferUsage::COPY_DST);
    backend.update_buffer(buffer, 4, &[1, 2, 3, 4]);

    let data = backend.buffer_data(buffer).unwrap();
    assert_eq!(&data[4..8], &[1, 2, 3, 4]);
    assert_eq!(&data[0..4], &[0, 0, 0, 0]);

    backend.destroy_buffer(buffer);
    assert_eq!(backend.live_buffer_count(), 0);
}
