//! Reflected Uniform / Resource Layout
//!
//! After a program links, the backend reports its active uniform resources.
//! This module holds the normalized form of that reflection data:
//!
//! - [`UniformDescriptor`] — one named, typed input with its binding slot
//!   and element count. Immutable once reflected.
//! - [`UniformSetLayout`] — the descriptors of one resource set, in binding
//!   order. Descriptor sets are allocated one per set layout.
//! - [`ShaderLayout`] — the whole program's layout; lookup is by name,
//!   case-sensitive, exact match only.
//!
//! GL-style backends report an array uniform under `"name[0]"`; normalization
//! trims that suffix so arrays are addressed by their base identifier with an
//! element count > 1.

use smallvec::SmallVec;

/// Data type of a reflected uniform resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    /// 32-bit float scalar.
    Float,
    /// 32-bit signed integer scalar.
    Int,
    /// Four-component float vector.
    Vec4,
    /// 4×4 float matrix.
    Mat4,
    /// 2D texture binding.
    Texture2D,
    /// Sampler binding.
    Sampler,
    /// An opaque uniform block of the given byte size.
    Block(u32),
}

impl UniformKind {
    /// Byte size of one element, `0` for non-buffer-backed kinds.
    #[must_use]
    pub const fn byte_size(self) -> u64 {
        match self {
            Self::Float | Self::Int => 4,
            Self::Vec4 => 16,
            Self::Mat4 => 64,
            Self::Texture2D | Self::Sampler => 0,
            Self::Block(size) => size as u64,
        }
    }

    /// Whether this kind is backed by a uniform buffer (as opposed to a
    /// texture/sampler binding).
    #[must_use]
    pub const fn is_buffer_backed(self) -> bool {
        !matches!(self, Self::Texture2D | Self::Sampler)
    }
}

/// One reflected uniform resource. Immutable once reflected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDescriptor {
    /// Resource name as declared in the shader (array suffix trimmed).
    pub name: String,
    /// Resource-set index (always 0 on GL-style backends).
    pub set: u32,
    /// Binding slot / location within the set.
    pub binding: u32,
    /// Data type.
    pub kind: UniformKind,
    /// Element count; > 1 for array uniforms.
    pub count: u32,
}

impl UniformDescriptor {
    /// Total byte size of the backing data (`0` for textures/samplers).
    #[must_use]
    pub fn total_byte_size(&self) -> u64 {
        self.kind.byte_size() * u64::from(self.count.max(1))
    }
}

/// The descriptors of one resource set, in binding order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformSetLayout {
    /// Set index.
    pub set: u32,
    /// Entries, sorted by binding slot.
    pub entries: SmallVec<[UniformDescriptor; 8]>,
}

/// The full reflected layout of a linked program.
#[derive(Debug, Clone, Default)]
pub struct ShaderLayout {
    uniforms: Vec<UniformDescriptor>,
    sets: Vec<UniformSetLayout>,
}

impl ShaderLayout {
    /// Normalizes raw backend reflection into a layout.
    ///
    /// Array uniforms reported as `"name[0]"` with element count > 1 are
    /// recorded under their base name. Entries are then grouped into set
    /// layouts ordered by (set, binding).
    #[must_use]
    pub fn from_raw(mut raw: Vec<UniformDescriptor>) -> Self {
        for uniform in &mut raw {
            if uniform.count > 1 && uniform.name.ends_with("[0]") {
                let trimmed = uniform.name.len() - 3;
                uniform.name.truncate(trimmed);
            }
        }
        raw.sort_by(|a, b| (a.set, a.binding).cmp(&(b.set, b.binding)));

        let mut sets: Vec<UniformSetLayout> = Vec::new();
        for uniform in &raw {
            match sets.last_mut() {
                Some(layout) if layout.set == uniform.set => {
                    layout.entries.push(uniform.clone());
                }
                _ => sets.push(UniformSetLayout {
                    set: uniform.set,
                    entries: SmallVec::from_iter([uniform.clone()]),
                }),
            }
        }

        Self { uniforms: raw, sets }
    }

    /// Looks up a uniform by exact, case-sensitive name.
    #[must_use]
    pub fn uniform(&self, name: &str) -> Option<&UniformDescriptor> {
        self.uniforms.iter().find(|u| u.name == name)
    }

    /// All reflected uniforms, ordered by (set, binding).
    #[must_use]
    pub fn uniforms(&self) -> &[UniformDescriptor] {
        &self.uniforms
    }

    /// The per-set layouts, ordered by set index.
    #[must_use]
    pub fn sets(&self) -> &[UniformSetLayout] {
        &self.sets
    }
}
