//! Opaque Native Handles
//!
//! Every backend object (stage module, program, pipeline, render pass,
//! buffer, texture, descriptor set) is addressed through an opaque `u64`
//! newtype. The raw value round-trips through [`slotmap::KeyData::as_ffi`],
//! so a handle stays cheap to copy and hash while the backend keeps the
//! actual native object in a per-kind [`HandleTable`].
//!
//! Ownership contract: each handle is exclusively owned by the wrapper that
//! created it (a `Shader`, a buffer wrapper, …) — handles are never shared
//! across instances. Destroying through a [`HandleTable`] is idempotent:
//! removing a handle that was already removed is a no-op.

use slotmap::{DefaultKey, Key, KeyData, SlotMap};

macro_rules! define_handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Null handle constant.
            pub const NULL: Self = Self(0);

            /// Creates a handle from a raw table key.
            #[inline]
            #[must_use]
            pub const fn from_raw(value: u64) -> Self {
                Self(value)
            }

            /// Returns the raw table key.
            #[inline]
            #[must_use]
            pub const fn as_raw(self) -> u64 {
                self.0
            }

            /// Checks whether this is the null handle.
            #[inline]
            #[must_use]
            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::NULL
            }
        }
    };
}

define_handle!(
    /// Handle to a compiled per-stage shader module.
    StageModuleHandle
);
define_handle!(
    /// Handle to a linked program / pipeline-layout object.
    ProgramHandle
);
define_handle!(
    /// Handle to a compiled, render-pass-bound pipeline object.
    PipelineHandle
);
define_handle!(
    /// Handle to a render pass / target configuration.
    RenderPassHandle
);
define_handle!(
    /// Handle to a GPU buffer.
    BufferHandle
);
define_handle!(
    /// Handle to a GPU texture.
    TextureHandle
);
define_handle!(
    /// Handle to an allocated descriptor set.
    DescriptorSetHandle
);

// ─── HandleTable ──────────────────────────────────────────────────────────────

/// Per-object-kind store of backend objects behind opaque `u64` keys.
///
/// Generation-tagged keys (via `slotmap`) make stale handles harmless:
/// a lookup after removal simply returns `None`.
#[derive(Debug)]
pub struct HandleTable<T> {
    slots: SlotMap<DefaultKey, T>,
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HandleTable<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: SlotMap::new(),
        }
    }

    /// Stores `value` and returns its raw key. The returned key is never 0,
    /// so `0` can serve as the null handle.
    pub fn insert(&mut self, value: T) -> u64 {
        self.slots.insert(value).data().as_ffi()
    }

    #[must_use]
    pub fn get(&self, raw: u64) -> Option<&T> {
        self.slots.get(DefaultKey::from(KeyData::from_ffi(raw)))
    }

    #[must_use]
    pub fn get_mut(&mut self, raw: u64) -> Option<&mut T> {
        self.slots.get_mut(DefaultKey::from(KeyData::from_ffi(raw)))
    }

    /// Removes and returns the object, or `None` if the handle is stale or
    /// was already removed. Idempotent by construction.
    pub fn remove(&mut self, raw: u64) -> Option<T> {
        self.slots.remove(DefaultKey::from(KeyData::from_ffi(raw)))
    }

    /// Number of live objects in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Removes every object, returning them for ordered teardown.
    pub fn drain(&mut self) -> Vec<T> {
        self.slots.drain().map(|(_, v)| v).collect()
    }
}
