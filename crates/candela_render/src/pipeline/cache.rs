//! Per-Shader Pipeline Cache
//!
//! Pipelines are expensive to build and immutable once built, so each shader
//! memoizes its compiled pipelines keyed by render-target shape — the cache
//! trades memory for skipping redundant backend compilation every frame.
//!
//! # Invalidation
//!
//! Pipeline objects are render-pass-specific. When a pass is destroyed (for
//! example on a swapchain resize) every entry keyed by it must be purged —
//! destroyed and removed — before the pass's underlying handle is reused,
//! otherwise a stale pipeline bound to a dead pass would be submitted.
//! [`RenderContext::destroy_render_pass`] drives that ordering.
//!
//! [`RenderContext::destroy_render_pass`]: crate::context::RenderContext::destroy_render_pass

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::backend::{
    GraphicsBackend, PipelineDescriptor, PipelineHandle, ProgramHandle, RenderPassHandle,
    StageModuleHandle,
};
use crate::errors::Result;
use crate::pipeline::key::PipelineKey;
use crate::render_state::RenderState;

/// Memoization map from [`PipelineKey`] to compiled pipeline handle.
///
/// The mutex serializes cache queries against invalidation sweeps; under the
/// engine's single graphics thread it is uncontended.
#[derive(Debug, Default)]
pub struct PipelineCache {
    entries: Mutex<FxHashMap<PipelineKey, PipelineHandle>>,
}

impl PipelineCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached pipeline for `key`, synthesizing and inserting it
    /// on first use. A hit has no side effects.
    pub fn get_or_create(
        &self,
        backend: &dyn GraphicsBackend,
        key: PipelineKey,
        program: ProgramHandle,
        vs_module: StageModuleHandle,
        fs_module: StageModuleHandle,
        render_state: &RenderState,
    ) -> Result<PipelineHandle> {
        let mut entries = self.entries.lock();
        if let Some(&pipeline) = entries.get(&key) {
            return Ok(pipeline);
        }

        let pipeline = backend.create_pipeline(&PipelineDescriptor {
            program,
            vs_module,
            fs_module,
            pass: key.pass,
            has_color: key.has_color,
            has_depth: key.has_depth,
            render_state,
        })?;
        entries.insert(key, pipeline);
        Ok(pipeline)
    }

    /// Destroys and removes every entry keyed by `pass`.
    pub fn purge_pass(&self, backend: &dyn GraphicsBackend, pass: RenderPassHandle) {
        let mut entries = self.entries.lock();
        entries.retain(|key, pipeline| {
            if key.pass == pass {
                backend.destroy_pipeline(*pipeline);
                false
            } else {
                true
            }
        });
    }

    /// Destroys and removes every entry. Called from the owning shader's
    /// teardown, before its modules are released.
    pub fn clear(&self, backend: &dyn GraphicsBackend) {
        let mut entries = self.entries.lock();
        for (_, pipeline) in entries.drain() {
            backend.destroy_pipeline(pipeline);
        }
    }

    /// Number of cached pipelines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
