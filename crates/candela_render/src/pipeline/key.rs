//! Pipeline Cache Keys
//!
//! A pipeline object is specialized against a render pass and the presence
//! of its attachments. [`PipelineKey`] captures exactly that identity;
//! equality is structural and one pipeline object exists per distinct key
//! per shader.

use crate::backend::RenderPassHandle;

/// Lookup key of a shader's pipeline cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    /// The render pass the pipeline is bound to.
    pub pass: RenderPassHandle,
    /// Whether the target has a color attachment.
    pub has_color: bool,
    /// Whether the target has a depth attachment.
    pub has_depth: bool,
}

impl PipelineKey {
    #[must_use]
    pub const fn new(pass: RenderPassHandle, has_color: bool, has_depth: bool) -> Self {
        Self {
            pass,
            has_color,
            has_depth,
        }
    }
}
