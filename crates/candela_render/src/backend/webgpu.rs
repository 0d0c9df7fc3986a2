//! wgpu Backend
//!
//! The production [`GraphicsBackend`]: owns a `wgpu::Device`/`Queue` pair and
//! keeps every native object in per-kind handle tables.
//!
//! Stage sources are WGSL. Each source is parsed and validated with naga
//! *before* the module is handed to the device, so compile diagnostics are
//! captured synchronously; reflection (uniform globals, vertex-input
//! locations) comes from the same parsed module. Parse results are
//! deduplicated by an xxh3-128 hash of the final source, so identical
//! sources are analyzed once.
//!
//! Bind-group layouts and the pipeline layout are assembled at link time
//! from the merged reflection of both stages. Uniform buffers are allocated
//! lazily, one per `(program, set, binding)`, and released with the program.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use wgpu::naga;
use xxhash_rust::xxh3::xxh3_128;

use crate::backend::handles::{
    BufferHandle, DescriptorSetHandle, HandleTable, PipelineHandle, ProgramHandle,
    RenderPassHandle, StageModuleHandle,
};
use crate::backend::{
    BufferUsage, ColorFormat, DepthFormat, GraphicsBackend, LinkedProgram, PipelineDescriptor,
    RenderTargetDescriptor, ShaderStage,
};
use crate::errors::{RenderError, Result};
use crate::render_state::{BlendFactor, BlendMode, CullMode, DepthTest, RenderState};
use crate::settings::{PowerPreference, RendererSettings};
use crate::shader::layout::{UniformDescriptor, UniformKind, UniformSetLayout};
use crate::vertex::{VERTEX_ATTRIBUTES, VERTEX_STRIDE, VertexFormat};

/// Reflection extracted from one parsed stage.
#[derive(Debug, Clone)]
struct ParsedStage {
    entry_point: String,
    uniforms: Vec<UniformDescriptor>,
    attributes: Vec<(String, u32)>,
}

struct WgpuModule {
    module: wgpu::ShaderModule,
    stage: ShaderStage,
    entry_point: String,
    uniforms: Vec<UniformDescriptor>,
    attributes: Vec<(String, u32)>,
}

struct WgpuProgram {
    uniforms: Vec<UniformDescriptor>,
    attributes: Vec<(String, u32)>,
    bind_group_layouts: Vec<wgpu::BindGroupLayout>,
    pipeline_layout: wgpu::PipelineLayout,
}

#[derive(Default)]
struct WgpuState {
    modules: HandleTable<WgpuModule>,
    programs: HandleTable<WgpuProgram>,
    pipelines: HandleTable<wgpu::RenderPipeline>,
    passes: HandleTable<RenderTargetDescriptor>,
    buffers: HandleTable<wgpu::Buffer>,
    descriptor_sets: HandleTable<wgpu::BindGroup>,
    /// xxh3-128 of final WGSL → parsed reflection.
    parse_cache: FxHashMap<u128, ParsedStage>,
    /// `(program, set, binding)` → lazily created uniform buffer.
    uniform_buffers: FxHashMap<(u64, u32, u32), BufferHandle>,
}

/// wgpu implementation of the graphics backend.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    placeholder_view: wgpu::TextureView,
    placeholder_sampler: wgpu::Sampler,
    state: Mutex<WgpuState>,
}

impl WgpuBackend {
    /// Acquires an adapter and device according to `settings`. No surface is
    /// involved — the backend renders into caller-provided targets.
    pub async fn new(settings: &RendererSettings) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: match settings.power_preference {
                    PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
                    PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
                },
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderError::AdapterRequest(e.to_string()))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;

        log::info!("wgpu backend initialized on {:?}", adapter.get_info().name);
        Ok(Self::from_device(device, queue))
    }

    /// Wraps an externally owned device/queue pair. The backend never
    /// creates a device of its own through this path — the device is an
    /// injected dependency of the subsystem.
    #[must_use]
    pub fn from_device(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let placeholder = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Placeholder Texture"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let placeholder_view = placeholder.create_view(&wgpu::TextureViewDescriptor::default());
        let placeholder_sampler = device.create_sampler(&wgpu::SamplerDescriptor::default());

        Self {
            device,
            queue,
            placeholder_view,
            placeholder_sampler,
            state: Mutex::new(WgpuState::default()),
        }
    }
}

// ─── Reflection ──────────────────────────────────────────────────────────────

fn expected_naga_stage(stage: ShaderStage) -> naga::ShaderStage {
    match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    }
}

fn classify_type(module: &naga::Module, ty: naga::Handle<naga::Type>) -> (UniformKind, u32) {
    match &module.types[ty].inner {
        naga::TypeInner::Scalar(scalar) => match scalar.kind {
            naga::ScalarKind::Sint | naga::ScalarKind::Uint => (UniformKind::Int, 1),
            _ => (UniformKind::Float, 1),
        },
        naga::TypeInner::Vector { size, .. } => match size {
            naga::VectorSize::Quad => (UniformKind::Vec4, 1),
            naga::VectorSize::Tri => (UniformKind::Block(12), 1),
            naga::VectorSize::Bi => (UniformKind::Block(8), 1),
        },
        naga::TypeInner::Matrix { .. } => (UniformKind::Mat4, 1),
        naga::TypeInner::Array { base, size, .. } => {
            let (kind, _) = classify_type(module, *base);
            let count = match size {
                naga::ArraySize::Constant(n) => n.get(),
                _ => 1,
            };
            (kind, count)
        }
        naga::TypeInner::Struct { span, .. } => (UniformKind::Block(*span), 1),
        naga::TypeInner::Image { .. } => (UniformKind::Texture2D, 1),
        naga::TypeInner::Sampler { .. } => (UniformKind::Sampler, 1),
        _ => (UniformKind::Block(0), 1),
    }
}

fn collect_vertex_inputs(module: &naga::Module, function: &naga::Function) -> Vec<(String, u32)> {
    let mut attributes = Vec::new();
    for arg in &function.arguments {
        if let Some(naga::Binding::Location { location, .. }) = &arg.binding {
            if let Some(name) = &arg.name {
                attributes.push((name.clone(), *location));
            }
        } else if let naga::TypeInner::Struct { members, .. } = &module.types[arg.ty].inner {
            for member in members {
                if let Some(naga::Binding::Location { location, .. }) = &member.binding {
                    if let Some(name) = &member.name {
                        attributes.push((name.clone(), *location));
                    }
                }
            }
        }
    }
    attributes
}

/// Parses and validates one WGSL stage, extracting its entry point, uniform
/// globals, and (for vertex stages) input attribute locations.
fn parse_and_reflect(stage: ShaderStage, source: &str) -> Result<ParsedStage> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| RenderError::ShaderCompile {
        stage,
        log: e.emit_to_string(source),
    })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| RenderError::ShaderCompile {
        stage,
        log: e.emit_to_string(source),
    })?;

    let wanted = expected_naga_stage(stage);
    let entry = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == wanted)
        .ok_or_else(|| RenderError::ShaderCompile {
            stage,
            log: format!("module declares no {stage} entry point"),
        })?;

    let mut uniforms = Vec::new();
    for (_, var) in module.global_variables.iter() {
        let relevant = matches!(
            var.space,
            naga::AddressSpace::Uniform | naga::AddressSpace::Handle
        );
        if !relevant {
            continue;
        }
        let (Some(name), Some(binding)) = (&var.name, &var.binding) else {
            continue;
        };
        let (kind, count) = classify_type(&module, var.ty);
        uniforms.push(UniformDescriptor {
            name: name.clone(),
            set: binding.group,
            binding: binding.binding,
            kind,
            count,
        });
    }

    let attributes = if stage == ShaderStage::Vertex {
        collect_vertex_inputs(&module, &entry.function)
    } else {
        Vec::new()
    };

    Ok(ParsedStage {
        entry_point: entry.name.clone(),
        uniforms,
        attributes,
    })
}

// ─── Fixed-function state translation ────────────────────────────────────────

fn map_blend_factor(factor: BlendFactor) -> wgpu::BlendFactor {
    match factor {
        BlendFactor::Zero => wgpu::BlendFactor::Zero,
        BlendFactor::One => wgpu::BlendFactor::One,
        BlendFactor::SrcColor => wgpu::BlendFactor::Src,
        BlendFactor::OneMinusSrcColor => wgpu::BlendFactor::OneMinusSrc,
        BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
        BlendFactor::DstColor => wgpu::BlendFactor::Dst,
        BlendFactor::OneMinusDstColor => wgpu::BlendFactor::OneMinusDst,
        BlendFactor::DstAlpha => wgpu::BlendFactor::DstAlpha,
        BlendFactor::OneMinusDstAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
    }
}

fn map_blend_state(blend: BlendMode) -> Option<wgpu::BlendState> {
    match blend {
        BlendMode::Off => None,
        BlendMode::On { src, dst } => {
            let component = wgpu::BlendComponent {
                src_factor: map_blend_factor(src),
                dst_factor: map_blend_factor(dst),
                operation: wgpu::BlendOperation::Add,
            };
            Some(wgpu::BlendState {
                color: component,
                alpha: component,
            })
        }
    }
}

fn map_depth_compare(test: DepthTest) -> wgpu::CompareFunction {
    match test {
        // Depth test off still needs a compare function; Always passes every
        // fragment and writes stay disabled separately.
        DepthTest::Off | DepthTest::Always => wgpu::CompareFunction::Always,
        DepthTest::Never => wgpu::CompareFunction::Never,
        DepthTest::Less => wgpu::CompareFunction::Less,
        DepthTest::Equal => wgpu::CompareFunction::Equal,
        DepthTest::LEqual => wgpu::CompareFunction::LessEqual,
        DepthTest::Greater => wgpu::CompareFunction::Greater,
        DepthTest::NotEqual => wgpu::CompareFunction::NotEqual,
        DepthTest::GEqual => wgpu::CompareFunction::GreaterEqual,
    }
}

fn map_cull_mode(cull: CullMode) -> Option<wgpu::Face> {
    match cull {
        CullMode::Off => None,
        CullMode::Front => Some(wgpu::Face::Front),
        CullMode::Back => Some(wgpu::Face::Back),
    }
}

fn map_color_format(format: ColorFormat) -> wgpu::TextureFormat {
    match format {
        ColorFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        ColorFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        ColorFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
    }
}

fn map_depth_format(format: DepthFormat) -> wgpu::TextureFormat {
    match format {
        DepthFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
        DepthFormat::Depth24PlusStencil8 => wgpu::TextureFormat::Depth24PlusStencil8,
    }
}

fn map_vertex_format(format: VertexFormat) -> wgpu::VertexFormat {
    match format {
        VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
        VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
        VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
    }
}

fn layout_entry_for(uniform: &UniformDescriptor) -> wgpu::BindGroupLayoutEntry {
    let ty = match uniform.kind {
        UniformKind::Texture2D => wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        UniformKind::Sampler => wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        _ => wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
    };
    wgpu::BindGroupLayoutEntry {
        binding: uniform.binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty,
        count: None,
    }
}

fn ensure_uniform_buffer(
    device: &wgpu::Device,
    buffers: &mut HandleTable<wgpu::Buffer>,
    uniform_buffers: &mut FxHashMap<(u64, u32, u32), BufferHandle>,
    program: ProgramHandle,
    uniform: &UniformDescriptor,
) -> BufferHandle {
    let key = (program.as_raw(), uniform.set, uniform.binding);
    if let Some(&handle) = uniform_buffers.get(&key) {
        return handle;
    }
    let size = uniform.total_byte_size().max(16);
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Uniform Buffer"),
        size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let handle = BufferHandle::from_raw(buffers.insert(buffer));
    uniform_buffers.insert(key, handle);
    handle
}

// ─── GraphicsBackend impl ────────────────────────────────────────────────────

impl GraphicsBackend for WgpuBackend {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn stage_header(&self, _stage: ShaderStage) -> &'static str {
        // WGSL carries no version/profile pragma.
        ""
    }

    fn compile_stage(&self, stage: ShaderStage, source: &str) -> Result<StageModuleHandle> {
        let hash = xxh3_128(source.as_bytes());
        let state = &mut *self.state.lock();

        let parsed = if let Some(parsed) = state.parse_cache.get(&hash) {
            parsed.clone()
        } else {
            let parsed = parse_and_reflect(stage, source)?;
            state.parse_cache.insert(hash, parsed.clone());
            parsed
        };

        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Candela Stage Module"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let raw = state.modules.insert(WgpuModule {
            module,
            stage,
            entry_point: parsed.entry_point,
            uniforms: parsed.uniforms,
            attributes: parsed.attributes,
        });
        Ok(StageModuleHandle::from_raw(raw))
    }

    fn destroy_stage_module(&self, module: StageModuleHandle) {
        self.state.lock().modules.remove(module.as_raw());
    }

    fn link_program(&self, vs: StageModuleHandle, fs: StageModuleHandle) -> Result<LinkedProgram> {
        let state = &mut *self.state.lock();
        let vs_module = state
            .modules
            .get(vs.as_raw())
            .ok_or(RenderError::InvalidHandle { kind: "stage module" })?;
        let fs_module = state
            .modules
            .get(fs.as_raw())
            .ok_or(RenderError::InvalidHandle { kind: "stage module" })?;
        if vs_module.stage != ShaderStage::Vertex || fs_module.stage != ShaderStage::Fragment {
            return Err(RenderError::ShaderLink {
                log: "stage modules attached in the wrong order".to_string(),
            });
        }

        // Merge reflection from both stages; a global declared in both
        // resolves to one binding.
        let mut uniforms: Vec<UniformDescriptor> = vs_module.uniforms.clone();
        for uniform in &fs_module.uniforms {
            if !uniforms.iter().any(|u| u.name == uniform.name) {
                uniforms.push(uniform.clone());
            }
        }
        let attributes = vs_module.attributes.clone();

        // One bind-group layout per set index, gaps filled with empty
        // layouts so group indices stay contiguous.
        let max_set = uniforms.iter().map(|u| u.set).max();
        let mut bind_group_layouts = Vec::new();
        if let Some(max_set) = max_set {
            for set in 0..=max_set {
                let entries: Vec<wgpu::BindGroupLayoutEntry> = uniforms
                    .iter()
                    .filter(|u| u.set == set)
                    .map(layout_entry_for)
                    .collect();
                bind_group_layouts.push(self.device.create_bind_group_layout(
                    &wgpu::BindGroupLayoutDescriptor {
                        label: Some("Candela Bind Group Layout"),
                        entries: &entries,
                    },
                ));
            }
        }

        let layout_refs: Vec<&wgpu::BindGroupLayout> = bind_group_layouts.iter().collect();
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Candela Pipeline Layout"),
                bind_group_layouts: &layout_refs,
                immediate_size: 0,
            });

        let raw = state.programs.insert(WgpuProgram {
            uniforms: uniforms.clone(),
            attributes,
            bind_group_layouts,
            pipeline_layout,
        });
        Ok(LinkedProgram {
            program: ProgramHandle::from_raw(raw),
            uniforms,
        })
    }

    fn destroy_program(&self, program: ProgramHandle) {
        let state = &mut *self.state.lock();
        state.programs.remove(program.as_raw());
        // Uniform buffers derived from the program go with it.
        let raw = program.as_raw();
        let buffers = &mut state.buffers;
        state.uniform_buffers.retain(|key, handle| {
            if key.0 == raw {
                buffers.remove(handle.as_raw());
                false
            } else {
                true
            }
        });
    }

    fn create_render_pass(&self, target: &RenderTargetDescriptor) -> RenderPassHandle {
        RenderPassHandle::from_raw(self.state.lock().passes.insert(*target))
    }

    fn destroy_render_pass(&self, pass: RenderPassHandle) {
        self.state.lock().passes.remove(pass.as_raw());
    }

    fn create_pipeline(&self, desc: &PipelineDescriptor<'_>) -> Result<PipelineHandle> {
        let state = &mut *self.state.lock();
        let target = *state
            .passes
            .get(desc.pass.as_raw())
            .ok_or(RenderError::InvalidHandle { kind: "render pass" })?;
        let program = state
            .programs
            .get(desc.program.as_raw())
            .ok_or(RenderError::InvalidHandle { kind: "program" })?;
        let vs = state
            .modules
            .get(desc.vs_module.as_raw())
            .ok_or(RenderError::InvalidHandle { kind: "stage module" })?;
        let fs = state
            .modules
            .get(desc.fs_module.as_raw())
            .ok_or(RenderError::InvalidHandle { kind: "stage module" })?;
        let rs: &RenderState = desc.render_state;

        // Vertex layout: the engine's fixed format filtered down to the
        // attributes the vertex entry point actually declares.
        let mut vertex_attrs = Vec::new();
        for attr in VERTEX_ATTRIBUTES {
            if let Some((_, location)) = vs.attributes.iter().find(|(name, _)| name == attr.name) {
                vertex_attrs.push(wgpu::VertexAttribute {
                    format: map_vertex_format(attr.format),
                    offset: u64::from(attr.offset),
                    shader_location: *location,
                });
            }
        }
        let vertex_buffers = if vertex_attrs.is_empty() {
            Vec::new()
        } else {
            vec![wgpu::VertexBufferLayout {
                array_stride: u64::from(VERTEX_STRIDE),
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &vertex_attrs,
            }]
        };

        let color_targets: Vec<Option<wgpu::ColorTargetState>> =
            match (desc.has_color, target.color_format) {
                (true, Some(format)) => vec![Some(wgpu::ColorTargetState {
                    format: map_color_format(format),
                    blend: map_blend_state(rs.blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                _ => Vec::new(),
            };

        let depth_stencil = match (desc.has_depth, target.depth_format) {
            (true, Some(format)) => Some(wgpu::DepthStencilState {
                format: map_depth_format(format),
                depth_write_enabled: rs.depth_test != DepthTest::Off && rs.depth_write,
                depth_compare: map_depth_compare(rs.depth_test),
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            _ => None,
        };

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Candela Render Pipeline"),
                layout: Some(&program.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vs.module,
                    entry_point: Some(&vs.entry_point),
                    buffers: &vertex_buffers,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fs.module,
                    entry_point: Some(&fs.entry_point),
                    targets: &color_targets,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: map_cull_mode(rs.cull),
                    ..Default::default()
                },
                depth_stencil,
                multisample: wgpu::MultisampleState {
                    count: target.samples,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview_mask: None,
                cache: None,
            });

        Ok(PipelineHandle::from_raw(state.pipelines.insert(pipeline)))
    }

    fn destroy_pipeline(&self, pipeline: PipelineHandle) {
        self.state.lock().pipelines.remove(pipeline.as_raw());
    }

    fn create_descriptor_set(
        &self,
        program: ProgramHandle,
        layout: &UniformSetLayout,
    ) -> Result<DescriptorSetHandle> {
        let state = &mut *self.state.lock();
        if state.programs.get(program.as_raw()).is_none() {
            return Err(RenderError::InvalidHandle { kind: "program" });
        }

        // Phase one: make sure every buffer-backed binding has its buffer.
        let mut buffer_bindings: Vec<(u32, BufferHandle)> = Vec::new();
        for uniform in &layout.entries {
            if uniform.kind.is_buffer_backed() {
                let handle = ensure_uniform_buffer(
                    &self.device,
                    &mut state.buffers,
                    &mut state.uniform_buffers,
                    program,
                    uniform,
                );
                buffer_bindings.push((uniform.binding, handle));
            }
        }

        // Phase two: assemble the bind group from immutable borrows.
        let prog = state
            .programs
            .get(program.as_raw())
            .ok_or(RenderError::InvalidHandle { kind: "program" })?;
        let group_layout = prog
            .bind_group_layouts
            .get(layout.set as usize)
            .ok_or(RenderError::InvalidHandle { kind: "descriptor set layout" })?;

        let mut entries = Vec::new();
        for uniform in &layout.entries {
            if !prog.uniforms.iter().any(|u| u.name == uniform.name) {
                log::warn!(
                    "descriptor set {} entry '{}' is not part of the program's layout",
                    layout.set,
                    uniform.name
                );
            }
        }
        for uniform in &layout.entries {
            let resource = match uniform.kind {
                UniformKind::Texture2D => {
                    wgpu::BindingResource::TextureView(&self.placeholder_view)
                }
                UniformKind::Sampler => wgpu::BindingResource::Sampler(&self.placeholder_sampler),
                _ => {
                    let (_, handle) = buffer_bindings
                        .iter()
                        .find(|(binding, _)| *binding == uniform.binding)
                        .expect("buffer created in phase one");
                    state
                        .buffers
                        .get(handle.as_raw())
                        .expect("buffer created in phase one")
                        .as_entire_binding()
                }
            };
            entries.push(wgpu::BindGroupEntry {
                binding: uniform.binding,
                resource,
            });
        }

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Candela Bind Group"),
            layout: group_layout,
            entries: &entries,
        });

        Ok(DescriptorSetHandle::from_raw(
            state.descriptor_sets.insert(bind_group),
        ))
    }

    fn destroy_descriptor_set(&self, set: DescriptorSetHandle) {
        self.state.lock().descriptor_sets.remove(set.as_raw());
    }

    fn create_buffer(&self, size: u64, usage: BufferUsage) -> BufferHandle {
        let mut wgpu_usage = wgpu::BufferUsages::empty();
        if usage.contains(BufferUsage::UNIFORM) {
            wgpu_usage |= wgpu::BufferUsages::UNIFORM;
        }
        if usage.contains(BufferUsage::VERTEX) {
            wgpu_usage |= wgpu::BufferUsages::VERTEX;
        }
        if usage.contains(BufferUsage::INDEX) {
            wgpu_usage |= wgpu::BufferUsages::INDEX;
        }
        if usage.contains(BufferUsage::COPY_DST) {
            wgpu_usage |= wgpu::BufferUsages::COPY_DST;
        }
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Candela Buffer"),
            size,
            usage: wgpu_usage,
            mapped_at_creation: false,
        });
        BufferHandle::from_raw(self.state.lock().buffers.insert(buffer))
    }

    fn update_buffer(&self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        let state = self.state.lock();
        if let Some(buf) = state.buffers.get(buffer.as_raw()) {
            self.queue.write_buffer(buf, offset, data);
        }
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        self.state.lock().buffers.remove(buffer.as_raw());
    }

    fn write_uniform(&self, program: ProgramHandle, uniform: &UniformDescriptor, data: &[u8]) {
        let state = &mut *self.state.lock();
        let handle = ensure_uniform_buffer(
            &self.device,
            &mut state.buffers,
            &mut state.uniform_buffers,
            program,
            uniform,
        );
        if let Some(buf) = state.buffers.get(handle.as_raw()) {
            self.queue.write_buffer(buf, 0, data);
        }
    }

    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        self.state
            .lock()
            .programs
            .get(program.as_raw())
            .and_then(|p| {
                p.attributes
                    .iter()
                    .find(|(attr, _)| attr == name)
                    .map(|(_, location)| *location)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = r"
        struct VertexInput {
            @location(0) position: vec3<f32>,
            @location(1) uv: vec2<f32>,
        };

        @group(0) @binding(0) var<uniform> u_mvp: mat4x4<f32>;

        @vertex
        fn vs_main(in: VertexInput) -> @builtin(position) vec4<f32> {
            return u_mvp * vec4<f32>(in.position, 1.0);
        }
    ";

    const FS: &str = r"
        @group(0) @binding(1) var<uniform> u_color: vec4<f32>;
        @group(0) @binding(2) var<uniform> lights: array<vec4<f32>, 4>;

        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return u_color + lights[0];
        }
    ";

    #[test]
    fn reflects_vertex_inputs_and_uniform_globals() {
        let parsed = parse_and_reflect(ShaderStage::Vertex, VS).unwrap();
        assert_eq!(parsed.entry_point, "vs_main");
        assert_eq!(
            parsed.attributes,
            vec![("position".to_string(), 0), ("uv".to_string(), 1)]
        );
        assert_eq!(parsed.uniforms.len(), 1);
        assert_eq!(parsed.uniforms[0].name, "u_mvp");
        assert_eq!(parsed.uniforms[0].kind, UniformKind::Mat4);
    }

    #[test]
    fn reflects_array_uniform_with_element_count() {
        let parsed = parse_and_reflect(ShaderStage::Fragment, FS).unwrap();
        let lights = parsed
            .uniforms
            .iter()
            .find(|u| u.name == "lights")
            .expect("array uniform reflected");
        assert_eq!(lights.kind, UniformKind::Vec4);
        assert_eq!(lights.count, 4);
        assert_eq!(lights.binding, 2);
    }

    #[test]
    fn syntax_error_produces_compile_diagnostic() {
        let err = parse_and_reflect(ShaderStage::Fragment, "@fragment fn fs_main( {").unwrap_err();
        match err {
            RenderError::ShaderCompile { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(!log.is_empty());
            }
            other => panic!("expected ShaderCompile, got {other:?}"),
        }
    }

    #[test]
    fn missing_entry_point_is_a_compile_error() {
        let err = parse_and_reflect(ShaderStage::Vertex, FS).unwrap_err();
        assert!(matches!(err, RenderError::ShaderCompile { .. }));
    }
}
