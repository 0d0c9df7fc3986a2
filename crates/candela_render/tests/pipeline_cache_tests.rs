//! Pipeline Cache Tests
//!
//! Tests for:
//! - Memoization: identical keys return the identical pipeline handle,
//!   differing attachment flags or passes yield distinct pipelines
//! - Invalidation: a render-pass-destroyed broadcast purges every entry
//!   keyed by that pass before the pass can be reused
//! - Teardown order: dropping a shader releases pipelines, then the
//!   program, then the stage modules

use std::sync::Arc;

use candela_render::backend::headless::HeadlessBackend;
use candela_render::backend::RenderTargetDescriptor;
use candela_render::context::RenderContext;
use candela_render::errors::RenderError;
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
// Memoization
// ============================================================================

#[test]
fn identical_key_returns_identical_handle() {
    let (_, mut context) = new_context();
    let shader = compile(&mut context);
    let pass = context.create_render_pass(&RenderTargetDescriptor::default());

    let first = shader.pipeline(pass, true, true).unwrap();
    let second = shader.pipeline(pass, true, true).unwrap();
    assert_eq!(first, second, "a cache hit must return the cached handle");
    assert_eq!(shader.cached_pipeline_count(), 1);
}

#[test]
fn distinct_attachment_flags_yield_distinct_pipelines() {
    let (backend, mut context) = new_context();
    let shader = compile(&mut context);
    let pass = context.create_render_pass(&RenderTargetDescriptor::default());

    let with_depth = shader.pipeline(pass, true, true).unwrap();
    let without_depth = shader.pipeline(pass, true, false).unwrap();
    assert_ne!(with_depth, without_depth);
    assert_eq!(shader.cached_pipeline_count(), 2);
    assert_eq!(backend.live_pipeline_count(), 2);
}

#[test]
fn distinct_passes_cache_separately() {
    let (_, mut context) = new_context();
    let shader = compile(&mut context);
    let pass_a = context.create_render_pass(&RenderTargetDescriptor::default());
    let pass_b = context.create_render_pass(&RenderTargetDescriptor {
        samples: 4,
        ..Default::default()
    });

    let a = shader.pipeline(pass_a, true, true).unwrap();
    let b = shader.pipeline(pass_b, true, true).unwrap();
    assert_ne!(a, b);
    assert_eq!(shader.cached_pipeline_count(), 2);
}

// ============================================================================
// Invalidation
// ============================================================================

#[test]
fn pass_destroyed_notification_purges_and_rebuilds() {
    let (backend, mut context) = new_context();
    let shader = compile(&mut context);
    let pass = context.create_render_pass(&RenderTargetDescriptor::default());
    let keep_pass = context.create_render_pass(&RenderTargetDescriptor::default());

    let stale = shader.pipeline(pass, true, true).unwrap();
    let kept = shader.pipeline(keep_pass, true, true).unwrap();
    assert_eq!(backend.live_pipeline_count(), 2);

    context.on_render_pass_destroyed(pass);

    assert_eq!(
        shader.cached_pipeline_count(),
        1,
        "only entries keyed by the destroyed pass are purged"
    );
    assert!(
        backend.pipeline_target(stale).is_none(),
        "the stale pipeline object must be destroyed"
    );
    assert!(backend.pipeline_target(kept).is_some());

    let rebuilt = shader.pipeline(pass, true, true).unwrap();
    assert_ne!(
        rebuilt, stale,
        "a fresh pipeline is built on the next request"
    );
    assert_eq!(backend.live_pipeline_count(), 2);
}

#[test]
fn destroy_render_pass_purges_before_releasing_the_pass() {
    let (backend, mut context) = new_context();
    let shader = compile(&mut context);
    let pass = context.create_render_pass(&RenderTargetDescriptor::default());

    shader.pipeline(pass, true, true).unwrap();
    context.destroy_render_pass(pass);

    assert_eq!(shader.cached_pipeline_count(), 0);
    assert_eq!(backend.live_pipeline_count(), 0);
    assert_eq!(backend.live_pass_count(), 0);

    // The pass handle is dead; resolving against it must fail rather than
    // hand back a stale pipeline.
    match shader.pipeline(pass, true, true) {
        Err(RenderError::InvalidHandle { kind }) => assert_eq!(kind, "render pass"),
        other => panic!("expected InvalidHandle, got {other:?}"),
    }
}

#[test]
fn invalidation_reaches_every_live_shader() {
    let (backend, mut context) = new_context();
    let shader_a = compile(&mut context);
    let shader_b = compile(&mut context);
    let pass = context.create_render_pass(&RenderTargetDescriptor::default());

    shader_a.pipeline(pass, true, true).unwrap();
    shader_b.pipeline(pass, true, false).unwrap();
    assert_eq!(backend.live_pipeline_count(), 2);

    context.on_render_pass_destroyed(pass);

    assert_eq!(shader_a.cached_pipeline_count(), 0);
    assert_eq!(shader_b.cached_pipeline_count(), 0);
    assert_eq!(backend.live_pipeline_count(), 0);
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn dropping_a_shader_releases_all_native_objects() {
    let (backend, mut context) = new_context();
    let shader = compile(&mut context);
    let pass = context.create_render_pass(&RenderTargetDescriptor::default());

    shader.pipeline(pass, true, true).unwrap();
    shader.pipeline(pass, true, false).unwrap();
    assert_eq!(backend.live_module_count(), 2);
    assert_eq!(backend.live_program_count(), 1);
    assert_eq!(backend.live_pipeline_count(), 2);

    drop(shader);

    assert_eq!(backend.live_pipeline_count(), 0);
    assert_eq!(backend.live_program_count(), 0);
    assert_eq!(backend.live_module_count(), 0);
}
