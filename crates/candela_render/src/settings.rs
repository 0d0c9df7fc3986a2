//! Renderer Settings
//!
//! Global configuration consumed once when a [`RenderContext`] is created.
//! Settings are serde-capable so a deployment can keep them in a JSON file
//! next to its data directory.
//!
//! [`RenderContext`]: crate::context::RenderContext
//!
//! # Example
//!
//! ```rust,ignore
//! use candela_render::settings::{BackendKind, RendererSettings};
//!
//! let settings = RendererSettings {
//!     backend: BackendKind::Wgpu,
//!     data_root: "assets".into(),
//!     vsync: false,
//!     ..Default::default()
//! };
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::backend::DepthFormat;
use crate::errors::Result;

/// Which graphics backend to construct at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendKind {
    /// The production wgpu backend.
    #[default]
    Wgpu,
    /// The device-free backend (tests, server-side builds).
    Headless,
}

/// GPU adapter selection preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PowerPreference {
    /// Prefer a discrete / dedicated GPU.
    #[default]
    HighPerformance,
    /// Prefer an integrated GPU (better battery life).
    LowPower,
}

/// Global configuration for renderer initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    /// Backend selected at startup.
    pub backend: BackendKind,
    /// Root of the engine's data directory. Shader includes resolve under
    /// `<data_root>/shader/Include/`.
    pub data_root: PathBuf,
    /// Vertical sync for presenting targets.
    pub vsync: bool,
    /// Adapter selection strategy.
    pub power_preference: PowerPreference,
    /// Default framebuffer clear color.
    pub clear_color: [f32; 4],
    /// Depth buffer format for default targets.
    pub depth_format: DepthFormat,
    /// Default MSAA sample count for targets that do not override it.
    pub msaa_samples: u32,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Wgpu,
            data_root: PathBuf::from("data"),
            vsync: true,
            power_preference: PowerPreference::HighPerformance,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            depth_format: DepthFormat::Depth32Float,
            msaa_samples: 1,
        }
    }
}

impl RendererSettings {
    /// Loads settings from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// The directory shader includes are resolved from.
    #[must_use]
    pub fn shader_include_root(&self) -> PathBuf {
        self.data_root.join("shader").join("Include")
    }
}
