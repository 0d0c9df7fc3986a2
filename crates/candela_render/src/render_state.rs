//! Fixed-Function Render State
//!
//! [`RenderState`] fully determines the fixed-function half of a pipeline:
//! face culling, depth test/write, and color blending. It is supplied when a
//! shader is compiled and is immutable for the shader's lifetime — pipeline
//! objects synthesized from the same shader differ only by render-target
//! configuration, never by render state.

use serde::{Deserialize, Serialize};

/// Face culling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CullMode {
    /// No culling.
    Off,
    /// Cull front faces.
    Front,
    /// Cull back faces.
    #[default]
    Back,
}

/// Depth comparison function. `Off` disables the depth test entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DepthTest {
    Off,
    Never,
    Less,
    Equal,
    #[default]
    LEqual,
    Greater,
    NotEqual,
    GEqual,
    Always,
}

/// Source/destination blend factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstColor,
    OneMinusDstColor,
    DstAlpha,
    OneMinusDstAlpha,
}

/// Color blending mode: off, or on with an explicit factor pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    /// Opaque — blending disabled.
    #[default]
    Off,
    /// Blending enabled with the given source/destination factors.
    On {
        src: BlendFactor,
        dst: BlendFactor,
    },
}

impl BlendMode {
    /// Standard premultiplied-style alpha blending
    /// (`SrcAlpha`, `OneMinusSrcAlpha`).
    #[must_use]
    pub const fn alpha() -> Self {
        Self::On {
            src: BlendFactor::SrcAlpha,
            dst: BlendFactor::OneMinusSrcAlpha,
        }
    }
}

/// Fixed-function state descriptor, immutable per shader instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderState {
    /// Face culling mode.
    pub cull: CullMode,
    /// Depth comparison function (`Off` disables the test).
    pub depth_test: DepthTest,
    /// Whether the depth buffer is written.
    pub depth_write: bool,
    /// Color blend mode.
    pub blend: BlendMode,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            cull: CullMode::Back,
            depth_test: DepthTest::LEqual,
            depth_write: true,
            blend: BlendMode::Off,
        }
    }
}

impl RenderState {
    /// Render state for transparent geometry: alpha blending on, depth
    /// writes off.
    #[must_use]
    pub fn transparent() -> Self {
        Self {
            depth_write: false,
            blend: BlendMode::alpha(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_opaque_back_face_culled() {
        let state = RenderState::default();
        assert_eq!(state.cull, CullMode::Back);
        assert_eq!(state.depth_test, DepthTest::LEqual);
        assert!(state.depth_write);
        assert_eq!(state.blend, BlendMode::Off);
    }

    #[test]
    fn transparent_state_disables_depth_write() {
        let state = RenderState::transparent();
        assert!(!state.depth_write);
        assert_eq!(
            state.blend,
            BlendMode::On {
                src: BlendFactor::SrcAlpha,
                dst: BlendFactor::OneMinusSrcAlpha,
            }
        );
    }
}
