//! Headless Backend
//!
//! A device-free [`GraphicsBackend`] used by the test suite and for
//! server-side builds where no GPU is present. Semantics mirror a GL2-style
//! driver closely enough to exercise every core code path:
//!
//! - "Compilation" scans the preprocessed source; a `#error` line aborts
//!   with a diagnostic log, like a real preprocessor.
//! - "Reflection" records `uniform <type> <name>[N];` and
//!   `attribute <type> <name>;` declarations. Array uniforms are reported
//!   under `name[0]` — the same quirk GL reflection has — so the core's
//!   normalization is exercised end-to-end.
//! - Uniform writes are recorded and can be inspected by tests.
//!
//! All objects live in per-kind [`HandleTable`]s; the live counts double as
//! leak assertions in the integration tests.

use parking_lot::Mutex;

use crate::backend::handles::{
    BufferHandle, DescriptorSetHandle, HandleTable, PipelineHandle, ProgramHandle,
    RenderPassHandle, StageModuleHandle,
};
use crate::backend::{
    BufferUsage, GraphicsBackend, LinkedProgram, PipelineDescriptor, RenderTargetDescriptor,
    ShaderStage,
};
use crate::errors::{RenderError, Result};
use crate::shader::layout::{UniformDescriptor, UniformKind, UniformSetLayout};

/// One recorded uniform write.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformWrite {
    pub program: ProgramHandle,
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Debug)]
struct HeadlessModule {
    stage: ShaderStage,
    source: String,
}

#[derive(Debug)]
struct HeadlessProgram {
    uniforms: Vec<UniformDescriptor>,
    attributes: Vec<(String, u32)>,
}

#[derive(Debug)]
struct HeadlessPipeline {
    pass: RenderPassHandle,
    has_color: bool,
    has_depth: bool,
}

#[derive(Debug)]
struct HeadlessBuffer {
    data: Vec<u8>,
    #[allow(dead_code)]
    usage: BufferUsage,
}

#[derive(Debug)]
struct HeadlessDescriptorSet {
    #[allow(dead_code)]
    program: ProgramHandle,
    set: u32,
}

#[derive(Default)]
struct HeadlessState {
    modules: HandleTable<HeadlessModule>,
    programs: HandleTable<HeadlessProgram>,
    pipelines: HandleTable<HeadlessPipeline>,
    passes: HandleTable<RenderTargetDescriptor>,
    buffers: HandleTable<HeadlessBuffer>,
    descriptor_sets: HandleTable<HeadlessDescriptorSet>,
    uniform_writes: Vec<UniformWrite>,
    next_link_failure: Option<String>,
}

/// Device-free backend with GL2-flavored compile/link/reflect semantics.
#[derive(Default)]
pub struct HeadlessBackend {
    state: Mutex<HeadlessState>,
}

impl HeadlessBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Test & diagnostics accessors ─────────────────────────────────────────

    /// Forces the next `link_program` call to fail with `log`.
    pub fn fail_next_link(&self, log: impl Into<String>) {
        self.state.lock().next_link_failure = Some(log.into());
    }

    /// Snapshot of every uniform write issued so far.
    #[must_use]
    pub fn uniform_writes(&self) -> Vec<UniformWrite> {
        self.state.lock().uniform_writes.clone()
    }

    /// The final preprocessed source of a live module.
    #[must_use]
    pub fn module_source(&self, module: StageModuleHandle) -> Option<String> {
        self.state
            .lock()
            .modules
            .get(module.as_raw())
            .map(|m| m.source.clone())
    }

    #[must_use]
    pub fn live_module_count(&self) -> usize {
        self.state.lock().modules.len()
    }

    #[must_use]
    pub fn live_program_count(&self) -> usize {
        self.state.lock().programs.len()
    }

    #[must_use]
    pub fn live_pipeline_count(&self) -> usize {
        self.state.lock().pipelines.len()
    }

    #[must_use]
    pub fn live_pass_count(&self) -> usize {
        self.state.lock().passes.len()
    }

    #[must_use]
    pub fn live_descriptor_set_count(&self) -> usize {
        self.state.lock().descriptor_sets.len()
    }

    #[must_use]
    pub fn live_buffer_count(&self) -> usize {
        self.state.lock().buffers.len()
    }
}

// ─── GL2-flavored declaration scanning ───────────────────────────────────────

fn scan_error_directive(stage: ShaderStage, source: &str) -> Result<()> {
    for (index, line) in source.lines().enumerate() {
        let line = line.trim();
        if let Some(message) = line.strip_prefix("#error") {
            return Err(RenderError::ShaderCompile {
                stage,
                log: format!("0:{}: error: #error{message}", index + 1),
            });
        }
    }
    Ok(())
}

fn parse_uniform_kind(ty: &str) -> Option<UniformKind> {
    match ty {
        "float" => Some(UniformKind::Float),
        "int" => Some(UniformKind::Int),
        "vec4" => Some(UniformKind::Vec4),
        "mat4" => Some(UniformKind::Mat4),
        "sampler2D" => Some(UniformKind::Texture2D),
        _ => None,
    }
}

/// Splits `name[4]` into `("name", 4)`; a plain name has count 1.
fn split_array_suffix(token: &str) -> (&str, u32) {
    if let Some(open) = token.find('[') {
        let count = token[open + 1..]
            .trim_end_matches(']')
            .parse::<u32>()
            .unwrap_or(1);
        (&token[..open], count)
    } else {
        (token, 1)
    }
}

fn reflect_declarations(
    source: &str,
    next_binding: &mut u32,
    next_location: &mut u32,
    uniforms: &mut Vec<UniformDescriptor>,
    attributes: &mut Vec<(String, u32)>,
) {
    for line in source.lines() {
        let line = line.trim().trim_end_matches(';');
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("uniform") => {
                let (Some(ty), Some(name_token)) = (tokens.next(), tokens.next()) else {
                    continue;
                };
                let Some(kind) = parse_uniform_kind(ty) else {
                    log::warn!("headless reflection skipping uniform of unknown type '{ty}'");
                    continue;
                };
                let (base, count) = split_array_suffix(name_token);
                if uniforms
                    .iter()
                    .any(|u| split_array_suffix(&u.name).0 == base)
                {
                    // Same uniform declared in both stages resolves to one slot.
                    continue;
                }
                // GL reflection reports arrays under "name[0]".
                let name = if count > 1 {
                    format!("{base}[0]")
                } else {
                    base.to_string()
                };
                uniforms.push(UniformDescriptor {
                    name,
                    set: 0,
                    binding: *next_binding,
                    kind,
                    count,
                });
                *next_binding += 1;
            }
            Some("attribute") => {
                let (Some(_ty), Some(name_token)) = (tokens.next(), tokens.next()) else {
                    continue;
                };
                let (name, _) = split_array_suffix(name_token);
                attributes.push((name.to_string(), *next_location));
                *next_location += 1;
            }
            _ => {}
        }
    }
}

// ─── GraphicsBackend impl ────────────────────────────────────────────────────

impl GraphicsBackend for HeadlessBackend {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn stage_header(&self, _stage: ShaderStage) -> &'static str {
        "#version 120\n"
    }

    fn compile_stage(&self, stage: ShaderStage, source: &str) -> Result<StageModuleHandle> {
        scan_error_directive(stage, source)?;
        let raw = self.state.lock().modules.insert(HeadlessModule {
            stage,
            source: source.to_string(),
        });
        Ok(StageModuleHandle::from_raw(raw))
    }

    fn destroy_stage_module(&self, module: StageModuleHandle) {
        self.state.lock().modules.remove(module.as_raw());
    }

    fn link_program(&self, vs: StageModuleHandle, fs: StageModuleHandle) -> Result<LinkedProgram> {
        let state = &mut *self.state.lock();
        if let Some(log) = state.next_link_failure.take() {
            return Err(RenderError::ShaderLink { log });
        }

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

        let mut uniforms = Vec::new();
        let mut attributes = Vec::new();
        let (mut next_binding, mut next_location) = (0, 0);
        reflect_declarations(
            &vs_module.source,
            &mut next_binding,
            &mut next_location,
            &mut uniforms,
            &mut attributes,
        );
        reflect_declarations(
            &fs_module.source,
            &mut next_binding,
            &mut next_location,
            &mut uniforms,
            &mut attributes,
        );

        let raw = state.programs.insert(HeadlessProgram {
            uniforms: uniforms.clone(),
            attributes,
        });
        Ok(LinkedProgram {
            program: ProgramHandle::from_raw(raw),
            uniforms,
        })
    }

    fn destroy_program(&self, program: ProgramHandle) {
        self.state.lock().programs.remove(program.as_raw());
    }

    fn create_render_pass(&self, target: &RenderTargetDescriptor) -> RenderPassHandle {
        RenderPassHandle::from_raw(self.state.lock().passes.insert(*target))
    }

    fn destroy_render_pass(&self, pass: RenderPassHandle) {
        self.state.lock().passes.remove(pass.as_raw());
    }

    fn create_pipeline(&self, desc: &PipelineDescriptor<'_>) -> Result<PipelineHandle> {
        let state = &mut *self.state.lock();
        if state.passes.get(desc.pass.as_raw()).is_none() {
            return Err(RenderError::InvalidHandle { kind: "render pass" });
        }
        if state.programs.get(desc.program.as_raw()).is_none() {
            return Err(RenderError::InvalidHandle { kind: "program" });
        }
        let raw = state.pipelines.insert(HeadlessPipeline {
            pass: desc.pass,
            has_color: desc.has_color,
            has_depth: desc.has_depth,
        });
        Ok(PipelineHandle::from_raw(raw))
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
        let raw = state.descriptor_sets.insert(HeadlessDescriptorSet {
            program,
            set: layout.set,
        });
        Ok(DescriptorSetHandle::from_raw(raw))
    }

    fn destroy_descriptor_set(&self, set: DescriptorSetHandle) {
        self.state.lock().descriptor_sets.remove(set.as_raw());
    }

    fn create_buffer(&self, size: u64, usage: BufferUsage) -> BufferHandle {
        let raw = self.state.lock().buffers.insert(HeadlessBuffer {
            data: vec![0; size as usize],
            usage,
        });
        BufferHandle::from_raw(raw)
    }

    fn update_buffer(&self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        let mut state = self.state.lock();
        if let Some(buf) = state.buffers.get_mut(buffer.as_raw()) {
            let offset = offset as usize;
            let end = offset + data.len();
            if buf.data.len() < end {
                buf.data.resize(end, 0);
            }
            buf.data[offset..end].copy_from_slice(data);
        }
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        self.state.lock().buffers.remove(buffer.as_raw());
    }

    fn write_uniform(&self, program: ProgramHandle, uniform: &UniformDescriptor, data: &[u8]) {
        let mut state = self.state.lock();
        if let Some(prog) = state.programs.get(program.as_raw()) {
            let known = prog
                .uniforms
                .iter()
                .any(|u| split_array_suffix(&u.name).0 == split_array_suffix(&uniform.name).0);
            if !known {
                log::warn!(
                    "uniform '{}' written to a program that does not declare it",
                    uniform.name
                );
            }
        }
        state.uniform_writes.push(UniformWrite {
            program,
            name: uniform.name.clone(),
            data: data.to_vec(),
        });
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
                    .map(|(_, loc)| *loc)
            })
    }
}

impl HeadlessBackend {
    /// Pass a pipeline handle back to its creation parameters, for tests
    /// asserting cache behavior.
    #[must_use]
    pub fn pipeline_target(&self, pipeline: PipelineHandle) -> Option<(RenderPassHandle, bool, bool)> {
        self.state
            .lock()
            .pipelines
            .get(pipeline.as_raw())
            .map(|p| (p.pass, p.has_color, p.has_depth))
    }

    /// Set index a descriptor set was allocated against.
    #[must_use]
    pub fn descriptor_set_index(&self, set: DescriptorSetHandle) -> Option<u32> {
        self.state
            .lock()
            .descriptor_sets
            .get(set.as_raw())
            .map(|s| s.set)
    }

    /// Current contents of a live buffer.
    #[must_use]
    pub fn buffer_data(&self, buffer: BufferHandle) -> Option<Vec<u8>> {
        self.state
            .lock()
            .buffers
            .get(buffer.as_raw())
            .map(|b| b.data.clone())
    }
}
