//! Compiled Shaders
//!
//! A [`Shader`] owns the native objects produced by one successful
//! compile+link: two stage modules, the linked program / pipeline-layout
//! object, and the reflected uniform layout. Module and program handles are
//! immutable after construction — the only state that grows is the private
//! pipeline cache, keyed by render-target signature.
//!
//! Teardown releases derived objects before their parents: cached pipelines
//! first, then the program, then the stage modules.

pub mod compiler;
pub mod layout;
pub mod source;

use std::sync::Arc;

use crate::backend::{
    GraphicsBackend, PipelineHandle, ProgramHandle, RenderPassHandle, StageModuleHandle,
};
use crate::errors::Result;
use crate::pipeline::{PipelineCache, PipelineKey};
use crate::render_state::RenderState;

pub use compiler::ShaderCompiler;
pub use layout::{ShaderLayout, UniformDescriptor, UniformKind, UniformSetLayout};
pub use source::{ShaderSourceDescriptor, StageSource};

/// A compiled shader and its growing pipeline cache.
pub struct Shader {
    backend: Arc<dyn GraphicsBackend>,
    vs_module: StageModuleHandle,
    fs_module: StageModuleHandle,
    program: ProgramHandle,
    layout: ShaderLayout,
    render_state: RenderState,
    pipelines: PipelineCache,
}

impl Shader {
    pub(crate) fn new(
        backend: Arc<dyn GraphicsBackend>,
        vs_module: StageModuleHandle,
        fs_module: StageModuleHandle,
        program: ProgramHandle,
        layout: ShaderLayout,
        render_state: RenderState,
    ) -> Self {
        Self {
            backend,
            vs_module,
            fs_module,
            program,
            layout,
            render_state,
            pipelines: PipelineCache::new(),
        }
    }

    /// Resolves the pipeline for `(pass, has_color, has_depth)`, building
    /// and caching it on first use. Two calls with an identical key return
    /// the identical handle.
    pub fn pipeline(
        &self,
        pass: RenderPassHandle,
        has_color: bool,
        has_depth: bool,
    ) -> Result<PipelineHandle> {
        self.pipelines.get_or_create(
            &*self.backend,
            PipelineKey::new(pass, has_color, has_depth),
            self.program,
            self.vs_module,
            self.fs_module,
            &self.render_state,
        )
    }

    /// Destroys and removes every cached pipeline keyed by `pass`. Invoked
    /// by the owning context when the pass is destroyed.
    pub fn purge_render_pass(&self, pass: RenderPassHandle) {
        self.pipelines.purge_pass(&*self.backend, pass);
    }

    /// The reflected uniform/resource layout.
    #[must_use]
    pub fn layout(&self) -> &ShaderLayout {
        &self.layout
    }

    /// The immutable fixed-function state this shader's pipelines carry.
    #[must_use]
    pub fn render_state(&self) -> &RenderState {
        &self.render_state
    }

    /// Number of currently cached pipelines.
    #[must_use]
    pub fn cached_pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    pub(crate) fn program(&self) -> ProgramHandle {
        self.program
    }

    pub(crate) fn backend(&self) -> &Arc<dyn GraphicsBackend> {
        &self.backend
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        // Release order: pipelines, then the program (which also frees
        // backend-derived layouts and uniform buffers), then the modules.
        self.pipelines.clear(&*self.backend);
        self.backend.destroy_program(self.program);
        self.backend.destroy_stage_module(self.vs_module);
        self.backend.destroy_stage_module(self.fs_module);
    }
}

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("program", &self.program)
            .field("uniforms", &self.layout.uniforms().len())
            .field("cached_pipelines", &self.pipelines.len())
            .finish_non_exhaustive()
    }
}
