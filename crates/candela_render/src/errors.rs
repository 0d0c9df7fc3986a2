//! Error Types
//!
//! This module defines the error types used throughout the rendering crate.
//!
//! # Overview
//!
//! The main error type [`RenderError`] covers all failure modes including:
//! - Shader compilation and program linking failures
//! - Include resolution failures during shader preprocessing
//! - GPU adapter/device acquisition failures
//! - Settings loading errors
//!
//! All public APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, RenderError>`.
//!
//! Unknown uniform names are deliberately **not** an error: uniform setters
//! return `bool` so callers may set uniforms generically against shaders that
//! omit them.

use std::path::PathBuf;

use thiserror::Error;

use crate::backend::ShaderStage;

/// The main error type for the Candela rendering crate.
#[derive(Error, Debug)]
pub enum RenderError {
    // ========================================================================
    // Shader Compilation Errors
    // ========================================================================
    /// A shader stage failed to compile. Carries the backend's diagnostic
    /// log verbatim.
    #[error("{stage} shader compile error: {log}")]
    ShaderCompile {
        /// The stage that failed.
        stage: ShaderStage,
        /// Backend diagnostic log, suitable for developer console output.
        log: String,
    },

    /// Linking the compiled stages into a program failed.
    #[error("shader link error: {log}")]
    ShaderLink {
        /// Backend diagnostic log.
        log: String,
    },

    /// An include named in a stage's include list could not be read.
    /// Fatal for that shader's compilation.
    #[error("missing shader include '{name}' (looked in {path})")]
    MissingInclude {
        /// The include identifier as listed by the caller.
        name: String,
        /// The resolved path that was tried.
        path: PathBuf,
    },

    // ========================================================================
    // Backend Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[error("failed to request GPU adapter: {0}")]
    AdapterRequest(String),

    /// Failed to create the GPU device.
    #[error("failed to create GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    /// An operation referenced a handle that is not (or no longer) live in
    /// the backend's tables.
    #[error("invalid {kind} handle")]
    InvalidHandle {
        /// Object kind the handle was supposed to reference.
        kind: &'static str,
    },

    // ========================================================================
    // I/O & Settings Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file parse error.
    #[error("settings parse error: {0}")]
    Settings(#[from] serde_json::Error),
}

/// Alias for `Result<T, RenderError>`.
pub type Result<T> = std::result::Result<T, RenderError>;
