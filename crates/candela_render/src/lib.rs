//! # Candela Render
//!
//! Shader compilation, pipeline caching, and resource binding for the
//! Candela engine, behind a polymorphic graphics backend.
//!
//! ## Architecture
//!
//! | Component | Module | Role |
//! |-----------|--------|------|
//! | Backend abstraction | [`backend`] | Opaque handles + native API trait; wgpu and headless implementations |
//! | Shader compiler | [`shader`] | Preprocessing, per-stage compile, link, reflection normalization |
//! | Pipeline cache | [`pipeline`] | Per-shader memoization keyed by render-target shape |
//! | Resource binder | [`binder`] | Uniform setters, descriptor sets, vertex attributes |
//! | Registry & context | [`registry`], [`context`] | Name-keyed shader cache, invalidation broadcast, owned lifecycle |
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use candela_render::backend::headless::HeadlessBackend;
//! use candela_render::context::RenderContext;
//! use candela_render::settings::RendererSettings;
//! use candela_render::shader::{ShaderSourceDescriptor, StageSource};
//!
//! let backend = Arc::new(HeadlessBackend::new());
//! let mut context = RenderContext::new(backend, RendererSettings::default());
//!
//! let desc = ShaderSourceDescriptor {
//!     vertex: StageSource::new("attribute vec4 position;\nvoid main() {}"),
//!     fragment: StageSource::new("uniform vec4 u_color;\nvoid main() {}"),
//!     render_state: Default::default(),
//! };
//! let shader = context.create_shader(&desc).unwrap();
//! context.add_shader_cache("unlit", shader.clone());
//! assert!(context.find_shader("unlit").is_some());
//! ```
//!
//! ## Threading
//!
//! Graphics work is single-threaded: compilation, pipeline creation,
//! descriptor allocation, and uniform writes run on the thread owning the
//! graphics context. Internal maps are nonetheless mutex-guarded so that a
//! future multi-threaded submission path only has to relax the ownership
//! rules, not retrofit locking.

pub mod backend;
pub mod binder;
pub mod context;
pub mod errors;
pub mod pipeline;
pub mod registry;
pub mod render_state;
pub mod settings;
pub mod shader;
pub mod vertex;

pub use backend::{GraphicsBackend, ShaderStage};
pub use binder::ResourceBinder;
pub use context::RenderContext;
pub use errors::{RenderError, Result};
pub use registry::ShaderRegistry;
pub use render_state::RenderState;
pub use settings::RendererSettings;
pub use shader::{Shader, ShaderSourceDescriptor, StageSource};
