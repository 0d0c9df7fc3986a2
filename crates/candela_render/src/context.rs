//! Render Context
//!
//! [`RenderContext`] is the explicitly owned root object of the subsystem:
//! it holds the graphics backend, the shader registry, and the settings.
//! It is constructed at engine-context init and torn down at shutdown —
//! there is no ambient global state.
//!
//! All operations that touch native objects (compiling shaders, resolving
//! pipelines, allocating descriptor sets) must run on the thread owning the
//! graphics context; the context is deliberately not `Clone`.

use std::sync::Arc;

use crate::backend::{GraphicsBackend, RenderPassHandle, RenderTargetDescriptor};
use crate::binder::ResourceBinder;
use crate::errors::Result;
use crate::registry::ShaderRegistry;
use crate::settings::RendererSettings;
use crate::shader::compiler::ShaderCompiler;
use crate::shader::source::ShaderSourceDescriptor;
use crate::shader::Shader;

/// Owner of the backend, registry, and settings.
pub struct RenderContext {
    backend: Arc<dyn GraphicsBackend>,
    settings: RendererSettings,
    registry: ShaderRegistry,
    shut_down: bool,
}

impl RenderContext {
    /// Wraps an already-constructed backend. The backend device itself is an
    /// injected dependency — the context never creates one.
    #[must_use]
    pub fn new(backend: Arc<dyn GraphicsBackend>, settings: RendererSettings) -> Self {
        log::info!("render context created on '{}' backend", backend.name());
        Self {
            backend,
            settings,
            registry: ShaderRegistry::new(),
            shut_down: false,
        }
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn GraphicsBackend> {
        &self.backend
    }

    #[must_use]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    /// A binder over this context's backend.
    #[must_use]
    pub fn binder(&self) -> ResourceBinder {
        ResourceBinder::new(Arc::clone(&self.backend))
    }

    // ── Shaders ──────────────────────────────────────────────────────────────

    /// Compiles a shader and registers it with the invalidation list. On
    /// failure nothing is registered and the error carries the backend's
    /// diagnostic log.
    pub fn create_shader(&mut self, desc: &ShaderSourceDescriptor) -> Result<Arc<Shader>> {
        let include_root = self.settings.shader_include_root();
        let shader = ShaderCompiler::compile(&self.backend, &include_root, desc)?;
        let shader = Arc::new(shader);
        self.registry.register(&shader);
        Ok(shader)
    }

    /// Pure registry lookup. Callers compile and
    /// [`add_shader_cache`](Self::add_shader_cache) on a miss.
    #[must_use]
    pub fn find_shader(&self, name: &str) -> Option<Arc<Shader>> {
        self.registry.find(name)
    }

    /// Caches `shader` under `name` in the registry.
    pub fn add_shader_cache(&mut self, name: impl Into<String>, shader: Arc<Shader>) {
        self.registry.add_cache(name, shader);
    }

    #[must_use]
    pub fn registry(&self) -> &ShaderRegistry {
        &self.registry
    }

    // ── Render passes ────────────────────────────────────────────────────────

    /// Registers a render target configuration with the backend.
    pub fn create_render_pass(&self, target: &RenderTargetDescriptor) -> RenderPassHandle {
        self.backend.create_render_pass(target)
    }

    /// Destroys a render pass, purging every live shader's pipeline cache
    /// entries for it *first* so no stale pipeline can outlive the pass.
    pub fn destroy_render_pass(&mut self, pass: RenderPassHandle) {
        self.on_render_pass_destroyed(pass);
        self.backend.destroy_render_pass(pass);
    }

    /// Invalidation callback for the owning display/swapchain code: must be
    /// invoked before a pass's underlying object is freed or reused (for
    /// example on window resize). Applied synchronously.
    pub fn on_render_pass_destroyed(&mut self, pass: RenderPassHandle) {
        self.registry.on_render_pass_destroyed(pass);
    }

    // ── Teardown ─────────────────────────────────────────────────────────────

    /// Releases the registry's shader references. Idempotent; called
    /// automatically when the context drops.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        log::info!(
            "render context shutdown: releasing {} cached shaders",
            self.registry.cached_count()
        );
        self.registry.done();
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
