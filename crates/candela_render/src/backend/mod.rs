//! Graphics Backend Abstraction
//!
//! One polymorphic interface, [`GraphicsBackend`], hides the native graphics
//! API behind opaque handles. The core (shader compiler, pipeline cache,
//! resource binder, registry) only ever talks to this trait; each native
//! backend is one implementation, selected at startup:
//!
//! - [`webgpu::WgpuBackend`] — the production backend (wgpu device/queue,
//!   WGSL sources, naga-based reflection).
//! - [`headless::HeadlessBackend`] — a device-free backend with GL2-flavored
//!   compile/link/reflect semantics, used by the test suite and for
//!   server-side builds.
//!
//! The backend owns the native objects in per-kind handle tables and exposes
//! explicit create/destroy pairs. Destroy entry points are idempotent; the
//! callers above guarantee dependency order (pipelines before modules,
//! descriptor sets before programs).

pub mod handles;
pub mod headless;
pub mod webgpu;

use std::fmt;

pub use handles::{
    BufferHandle, DescriptorSetHandle, HandleTable, PipelineHandle, ProgramHandle,
    RenderPassHandle, StageModuleHandle, TextureHandle,
};

use crate::errors::Result;
use crate::render_state::RenderState;
use crate::shader::layout::{UniformDescriptor, UniformSetLayout};

/// Shader pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
        }
    }
}

/// Color attachment format of a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ColorFormat {
    Rgba8Unorm,
    Bgra8Unorm,
    Rgba16Float,
}

/// Depth attachment format of a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DepthFormat {
    Depth32Float,
    Depth24PlusStencil8,
}

/// Identifying configuration of a render target. Pipeline objects are
/// specialized against this signature and become invalid when the pass that
/// carries it is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetDescriptor {
    /// Color attachment format, if the target has one.
    pub color_format: Option<ColorFormat>,
    /// Depth attachment format, if the target has one.
    pub depth_format: Option<DepthFormat>,
    /// MSAA sample count.
    pub samples: u32,
}

impl Default for RenderTargetDescriptor {
    fn default() -> Self {
        Self {
            color_format: Some(ColorFormat::Bgra8Unorm),
            depth_format: Some(DepthFormat::Depth32Float),
            samples: 1,
        }
    }
}

bitflags::bitflags! {
    /// Backend-agnostic buffer usage flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const UNIFORM  = 1 << 0;
        const VERTEX   = 1 << 1;
        const INDEX    = 1 << 2;
        const COPY_DST = 1 << 3;
    }
}

/// Result of a successful link: the program handle plus the raw reflected
/// uniform list (names may still carry a GL-style `"[0]"` array suffix —
/// normalization happens in [`ShaderLayout::from_raw`]).
///
/// [`ShaderLayout::from_raw`]: crate::shader::layout::ShaderLayout::from_raw
#[derive(Debug)]
pub struct LinkedProgram {
    /// The linked program / pipeline-layout object.
    pub program: ProgramHandle,
    /// Active uniform resources, as reported by the backend.
    pub uniforms: Vec<UniformDescriptor>,
}

/// Everything a backend needs to synthesize one pipeline object.
#[derive(Debug, Clone, Copy)]
pub struct PipelineDescriptor<'a> {
    /// The linked program the pipeline executes.
    pub program: ProgramHandle,
    /// Compiled vertex stage module.
    pub vs_module: StageModuleHandle,
    /// Compiled fragment stage module.
    pub fs_module: StageModuleHandle,
    /// The render pass the pipeline is specialized against.
    pub pass: RenderPassHandle,
    /// Whether the pipeline writes a color attachment.
    pub has_color: bool,
    /// Whether the pipeline uses a depth attachment.
    pub has_depth: bool,
    /// The shader's immutable fixed-function state.
    pub render_state: &'a RenderState,
}

/// Native graphics API entry points.
///
/// All methods take `&self`; implementations serialize their internal tables
/// (the engine's graphics work is single-threaded, but invalidation iterates
/// shaders while draws query pipeline caches, so backends must not rely on
/// external synchronization).
pub trait GraphicsBackend: Send + Sync {
    /// Human-readable backend name, for logs.
    fn name(&self) -> &'static str;

    /// Backend-specific source header (version/profile string) prepended to
    /// every stage source before the caller's predefines.
    fn stage_header(&self, stage: ShaderStage) -> &'static str;

    // ── Shader stages & programs ─────────────────────────────────────────────

    /// Compiles one stage from preprocessed source text. On failure the
    /// backend's diagnostic log is captured verbatim in the error and no
    /// native object is left live for the attempt.
    fn compile_stage(&self, stage: ShaderStage, source: &str) -> Result<StageModuleHandle>;

    /// Destroys a stage module. Idempotent.
    fn destroy_stage_module(&self, module: StageModuleHandle);

    /// Links two compiled stages into a program / pipeline-layout object and
    /// reflects its active uniform resources. On failure no partial program
    /// is left live (the caller still owns and must release the modules).
    fn link_program(&self, vs: StageModuleHandle, fs: StageModuleHandle) -> Result<LinkedProgram>;

    /// Destroys a program and any backend-owned resources derived from it
    /// (uniform buffers, layouts). Idempotent.
    fn destroy_program(&self, program: ProgramHandle);

    // ── Render passes & pipelines ────────────────────────────────────────────

    /// Registers a render target configuration and returns its pass handle.
    fn create_render_pass(&self, target: &RenderTargetDescriptor) -> RenderPassHandle;

    /// Destroys a render pass. Callers must purge every pipeline keyed by
    /// this pass *before* calling this (see
    /// [`RenderContext::destroy_render_pass`]).
    ///
    /// [`RenderContext::destroy_render_pass`]: crate::context::RenderContext::destroy_render_pass
    fn destroy_render_pass(&self, pass: RenderPassHandle);

    /// Synthesizes a pipeline from compiled modules, fixed-function state,
    /// and the target signature of `desc.pass`.
    fn create_pipeline(&self, desc: &PipelineDescriptor<'_>) -> Result<PipelineHandle>;

    /// Destroys a pipeline. Idempotent.
    fn destroy_pipeline(&self, pipeline: PipelineHandle);

    // ── Descriptor sets & buffers ────────────────────────────────────────────

    /// Allocates one descriptor set matching `layout` from the backend's
    /// pool for `program`.
    fn create_descriptor_set(
        &self,
        program: ProgramHandle,
        layout: &UniformSetLayout,
    ) -> Result<DescriptorSetHandle>;

    /// Releases a descriptor set. Idempotent.
    fn destroy_descriptor_set(&self, set: DescriptorSetHandle);

    /// Creates a buffer of `size` bytes.
    fn create_buffer(&self, size: u64, usage: BufferUsage) -> BufferHandle;

    /// Writes `data` into `buffer` at `offset`.
    fn update_buffer(&self, buffer: BufferHandle, offset: u64, data: &[u8]);

    /// Destroys a buffer. Idempotent.
    fn destroy_buffer(&self, buffer: BufferHandle);

    // ── Uniform & attribute binding ──────────────────────────────────────────

    /// Writes raw bytes to the backing store of a reflected uniform. The
    /// caller has already resolved `uniform` from the program's layout.
    fn write_uniform(&self, program: ProgramHandle, uniform: &UniformDescriptor, data: &[u8]);

    /// Location of a named vertex attribute in the compiled program, or
    /// `None` when the program does not declare it.
    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<u32>;
}
