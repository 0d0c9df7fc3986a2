//! Pipeline cache and keys.

pub mod cache;
pub mod key;

pub use cache::PipelineCache;
pub use key::PipelineKey;
