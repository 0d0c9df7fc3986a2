//! Fixed Vertex Format
//!
//! The engine uses one interleaved vertex layout for all mesh geometry. The
//! named attribute table drives vertex-attribute binding: at bind time each
//! slot is looked up by name in the compiled program and silently skipped
//! when the shader does not declare it.

use bytemuck::{Pod, Zeroable};

/// Interleaved mesh vertex.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

/// Component layout of one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float32x2,
    Float32x3,
    Float32x4,
}

impl VertexFormat {
    /// Byte size of one attribute of this format.
    #[must_use]
    pub const fn byte_size(self) -> u32 {
        match self {
            Self::Float32x2 => 8,
            Self::Float32x3 => 12,
            Self::Float32x4 => 16,
        }
    }
}

/// One slot of the engine's fixed vertex format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Attribute name as declared in shaders.
    pub name: &'static str,
    /// Component format.
    pub format: VertexFormat,
    /// Byte offset within [`Vertex`].
    pub offset: u32,
}

/// The engine's fixed vertex attributes, in declaration order.
pub const VERTEX_ATTRIBUTES: [VertexAttribute; 4] = [
    VertexAttribute {
        name: "position",
        format: VertexFormat::Float32x3,
        offset: 0,
    },
    VertexAttribute {
        name: "normal",
        format: VertexFormat::Float32x3,
        offset: 12,
    },
    VertexAttribute {
        name: "uv",
        format: VertexFormat::Float32x2,
        offset: 24,
    },
    VertexAttribute {
        name: "color",
        format: VertexFormat::Float32x4,
        offset: 32,
    },
];

/// Stride of the interleaved vertex buffer.
pub const VERTEX_STRIDE: u32 = size_of::<Vertex>() as u32;
