//! Shader Registry
//!
//! Name-keyed cache of compiled shaders plus the list of live shaders that
//! render-pass invalidation broadcasts to. The registry is owned by a
//! [`RenderContext`] — there is no process-wide global — and it never builds
//! on a miss: cache policy and construction policy stay separate, so
//! callers compile and [`add_cache`](ShaderRegistry::add_cache) explicitly.
//!
//! The live list holds weak references; a shader dropped by its owners
//! disappears from invalidation sweeps without explicit unregistration.
//!
//! [`RenderContext`]: crate::context::RenderContext

use std::sync::{Arc, Weak};

use rustc_hash::FxHashMap;

use crate::backend::RenderPassHandle;
use crate::shader::Shader;

/// Name → shader cache with a weak live-shader list for invalidation.
#[derive(Default)]
pub struct ShaderRegistry {
    cache: FxHashMap<String, Arc<Shader>>,
    live: Vec<Weak<Shader>>,
}

impl ShaderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure lookup; returns the cached shader or `None`. Never compiles.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<Arc<Shader>> {
        self.cache.get(name).cloned()
    }

    /// Caches `shader` under `name`, replacing any previous entry.
    pub fn add_cache(&mut self, name: impl Into<String>, shader: Arc<Shader>) {
        self.register(&shader);
        self.cache.insert(name.into(), shader);
    }

    /// Adds `shader` to the invalidation list. Idempotent per instance.
    pub fn register(&mut self, shader: &Arc<Shader>) {
        let already = self
            .live
            .iter()
            .any(|weak| weak.upgrade().is_some_and(|live| Arc::ptr_eq(&live, shader)));
        if !already {
            self.live.push(Arc::downgrade(shader));
        }
        self.live.retain(|weak| weak.strong_count() > 0);
    }

    /// Broadcasts a render-pass-destroyed event: every live shader purges
    /// the pipeline cache entries keyed by `pass`. Runs synchronously so no
    /// stale pipeline can be resolved against a reused pass handle.
    pub fn on_render_pass_destroyed(&mut self, pass: RenderPassHandle) {
        let mut purged = 0usize;
        self.live.retain(|weak| match weak.upgrade() {
            Some(shader) => {
                shader.purge_render_pass(pass);
                purged += 1;
                true
            }
            None => false,
        });
        log::debug!("render pass {pass:?} destroyed; purged pipeline caches of {purged} shaders");
    }

    /// Releases the registry's reference to every cached shader. Shaders
    /// without outside owners are destroyed here, native resources released
    /// in reverse-dependency order by their `Drop`.
    pub fn done(&mut self) {
        self.cache.clear();
        self.live.retain(|weak| weak.strong_count() > 0);
    }

    /// Number of cached (named) shaders.
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Number of live shaders on the invalidation list.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}
