//! Shader Registry & Context Lifecycle Tests
//!
//! Tests for:
//! - Find/AddCache: pure lookup, same-instance guarantee, no build-on-miss
//! - The weak live-shader list: dropped shaders fall off invalidation
//! - Shutdown: cached shaders released once, teardown idempotent, context
//!   drop implies shutdown

use std::sync::Arc;

use candela_render::backend::headless::HeadlessBackend;
use candela_render::backend::RenderTargetDescriptor;
use candela_render::context::RenderContext;
use candela_render::settings::RendererSettings;
use candela_render::shader::{Shader, ShaderSourceDescriptor, StageSource};

const VS: &str = "attribute vec3 position;\nuniform mat4 u_mvp;\nvoid main() {}\n";
const FS: &str = "uniform vec4 u_color;\nvoid main() {}\n";

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
// Find / AddCache
// ============================================================================

#[test]
fn find_after_add_cache_returns_the_same_instance() {
    let (_, mut context) = new_context();
    let shader = compile(&mut context);
    context.add_shader_cache("pbr", shader.clone());

    let found = context.find_shader("pbr").expect("cached shader found");
    assert!(
        Arc::ptr_eq(&found, &shader),
        "the registry hands back the identical instance"
    );
}

#[test]
fn find_on_a_miss_returns_none_and_never_builds() {
    let (backend, context) = new_context();
    assert!(context.find_shader("never_compiled").is_none());
    assert_eq!(
        backend.live_program_count(),
        0,
        "lookup must not compile anything"
    );
}

#[test]
fn add_cache_replaces_a_previous_entry() {
    let (_, mut context) = new_context();
    let first = compile(&mut context);
    let second = compile(&mut context);
    context.add_shader_cache("unlit", first);
    context.add_shader_cache("unlit", second.clone());

    let found = context.find_shader("unlit").unwrap();
    assert!(Arc::ptr_eq(&found, &second));
}

// ============================================================================
// Live list
// ============================================================================

#[test]
fn dropped_shaders_fall_off_the_invalidation_list() {
    let (_, mut context) = new_context();
    let keep = compile(&mut context);
    let drop_me = compile(&mut context);
    assert_eq!(context.registry().live_count(), 2);

    drop(drop_me);
    let pass = context.create_render_pass(&RenderTargetDescriptor::default());
    context.on_render_pass_destroyed(pass);

    assert_eq!(context.registry().live_count(), 1);
    drop(keep);
}

#[test]
fn uncached_shaders_still_receive_invalidation() {
    let (backend, mut context) = new_context();
    let shader = compile(&mut context); // registered but never add_cache'd
    let pass = context.create_render_pass(&RenderTargetDescriptor::default());

    shader.pipeline(pass, true, true).unwrap();
    assert_eq!(backend.live_pipeline_count(), 1);

    context.on_render_pass_destroyed(pass);
    assert_eq!(shader.cached_pipeline_count(), 0);
    assert_eq!(backend.live_pipeline_count(), 0);
}

// ============================================================================
// Shutdown
// ============================================================================

#[test]
fn shutdown_releases_cached_shaders_and_their_native_objects() {
    let (backend, mut context) = new_context();
    let pass = context.create_render_pass(&RenderTargetDescriptor::default());
    {
        let shader = compile(&mut context);
        shader.pipeline(pass, true, true).unwrap();
        context.add_shader_cache("standard", shader);
        // Local Arc dropped here; the registry keeps the shader alive.
    }
    assert_eq!(backend.live_program_count(), 1);

    context.shutdown();

    assert!(context.find_shader("standard").is_none());
    assert_eq!(backend.live_pipeline_count(), 0);
    assert_eq!(backend.live_program_count(), 0);
    assert_eq!(backend.live_module_count(), 0);
}

#[test]
fn shutdown_is_idempotent() {
    let (_, mut context) = new_context();
    let shader = compile(&mut context);
    context.add_shader_cache("unlit", shader);

    context.shutdown();
    context.shutdown();
    assert!(context.find_shader("unlit").is_none());
}

#[test]
fn dropping_the_context_tears_down_cached_shaders() {
    let backend = Arc::new(HeadlessBackend::new());
    {
        let mut context = RenderContext::new(backend.clone(), RendererSettings::default());
        let shader = compile(&mut context);
        context.add_shader_cache("unlit", shader);
        assert_eq!(backend.live_program_count(), 1);
    }
    assert_eq!(backend.live_program_count(), 0);
    assert_eq!(backend.live_module_count(), 0);
}
