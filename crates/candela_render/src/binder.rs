//! Resource Binder
//!
//! Associates a compiled shader's reflected resource layout with actual
//! data for a draw call:
//!
//! - **Uniform setters** — exact-name lookup in the reflected layout; a hit
//!   issues the backend write and returns `true`, a miss returns `false`
//!   with no backend call. Unknown uniform names are not fatal: shaders are
//!   allowed to omit uniforms the caller still sets generically.
//! - **Descriptor sets** — one set allocated per declared set layout, plus
//!   a copy of the layout for the caller to fill.
//! - **Vertex attributes** — the engine's fixed vertex format matched
//!   against the program's declared attributes by name; absent slots are
//!   silently skipped.

use std::sync::Arc;

use glam::{Mat4, Vec4};

use crate::backend::{DescriptorSetHandle, GraphicsBackend};
use crate::errors::Result;
use crate::shader::Shader;
use crate::shader::layout::UniformSetLayout;
use crate::vertex::{VERTEX_ATTRIBUTES, VERTEX_STRIDE, VertexFormat};

/// Descriptor sets allocated for one shader, one per declared set layout,
/// together with the layout copy the caller fills with actual bindings.
#[derive(Debug)]
pub struct DescriptorSetAllocation {
    /// Allocated set handles, ordered by set index.
    pub sets: Vec<DescriptorSetHandle>,
    /// Copy of the uniform-set layouts, same order as `sets`.
    pub layouts: Vec<UniformSetLayout>,
}

/// One bound slot of the fixed vertex format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttributeBinding {
    /// Attribute name in the fixed format.
    pub name: &'static str,
    /// Location the compiled program assigned to it.
    pub location: u32,
    /// Component format.
    pub format: VertexFormat,
    /// Byte offset within the interleaved vertex.
    pub offset: u32,
    /// Interleaved vertex stride.
    pub stride: u32,
}

/// Binds uniforms, descriptor sets, and vertex attributes for draw calls.
pub struct ResourceBinder {
    backend: Arc<dyn GraphicsBackend>,
}

impl ResourceBinder {
    #[must_use]
    pub fn new(backend: Arc<dyn GraphicsBackend>) -> Self {
        Self { backend }
    }

    // ── Uniform setters ──────────────────────────────────────────────────────

    /// Sets a float uniform. Returns `false` when the shader does not
    /// declare `name`.
    pub fn set_uniform_1f(&self, shader: &Shader, name: &str, value: f32) -> bool {
        self.write(shader, name, bytemuck::bytes_of(&value))
    }

    /// Sets an integer uniform.
    pub fn set_uniform_1i(&self, shader: &Shader, name: &str, value: i32) -> bool {
        self.write(shader, name, bytemuck::bytes_of(&value))
    }

    /// Sets a vec4 uniform (or the leading `values.len()` elements of a
    /// vec4 array).
    pub fn set_uniform_4f(&self, shader: &Shader, name: &str, values: &[Vec4]) -> bool {
        self.write(shader, name, bytemuck::cast_slice(values))
    }

    /// Sets a mat4 uniform (or the leading `matrices.len()` elements of a
    /// mat4 array).
    pub fn set_uniform_matrix(&self, shader: &Shader, name: &str, matrices: &[Mat4]) -> bool {
        self.write(shader, name, bytemuck::cast_slice(matrices))
    }

    fn write(&self, shader: &Shader, name: &str, data: &[u8]) -> bool {
        match shader.layout().uniform(name) {
            Some(uniform) => {
                self.backend.write_uniform(shader.program(), uniform, data);
                true
            }
            None => false,
        }
    }

    // ── Descriptor sets ──────────────────────────────────────────────────────

    /// Allocates one descriptor set per set layout the shader declares.
    pub fn create_descriptor_sets(&self, shader: &Shader) -> Result<DescriptorSetAllocation> {
        let layouts: Vec<UniformSetLayout> = shader.layout().sets().to_vec();
        let mut sets = Vec::with_capacity(layouts.len());
        for layout in &layouts {
            sets.push(self.backend.create_descriptor_set(shader.program(), layout)?);
        }
        Ok(DescriptorSetAllocation { sets, layouts })
    }

    /// Releases descriptor sets previously allocated by
    /// [`create_descriptor_sets`](Self::create_descriptor_sets).
    pub fn destroy_descriptor_sets(&self, allocation: &DescriptorSetAllocation) {
        for set in &allocation.sets {
            self.backend.destroy_descriptor_set(*set);
        }
    }

    // ── Vertex attributes ────────────────────────────────────────────────────

    /// Describes every fixed-format attribute slot the compiled program
    /// declares; slots the shader does not use are skipped.
    #[must_use]
    pub fn vertex_attribute_bindings(&self, shader: &Shader) -> Vec<VertexAttributeBinding> {
        let mut bindings = Vec::new();
        for attr in VERTEX_ATTRIBUTES {
            if let Some(location) = self.backend.attribute_location(shader.program(), attr.name) {
                bindings.push(VertexAttributeBinding {
                    name: attr.name,
                    location,
                    format: attr.format,
                    offset: attr.offset,
                    stride: VERTEX_STRIDE,
                });
            }
        }
        bindings
    }
}
