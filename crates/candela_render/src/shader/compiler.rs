//! Shader Compiler
//!
//! Turns a [`ShaderSourceDescriptor`] into a compiled [`Shader`]:
//! preprocess both stages, compile each through the backend, link, and
//! normalize the reflected uniform layout.
//!
//! Construction fails as a whole — when any step errors, every native
//! object already created for the attempt is released before the error is
//! returned, so no half-built shader ever escapes.

use std::path::Path;
use std::sync::Arc;

use crate::backend::{GraphicsBackend, ShaderStage};
use crate::errors::Result;
use crate::shader::layout::ShaderLayout;
use crate::shader::source::{ShaderSourceDescriptor, preprocess};
use crate::shader::Shader;

/// Stateless compile entry point; the backend and include root are supplied
/// per call by the owning context.
pub struct ShaderCompiler;

impl ShaderCompiler {
    /// Compiles and links both stages of `desc`.
    ///
    /// Compilation is synchronous and must run on the thread owning the
    /// graphics context. There is no retry: a failed compile leaves the
    /// inputs untouched for the caller to fix and re-invoke.
    pub fn compile(
        backend: &Arc<dyn GraphicsBackend>,
        include_root: &Path,
        desc: &ShaderSourceDescriptor,
    ) -> Result<Shader> {
        let vs_source = preprocess(
            backend.stage_header(ShaderStage::Vertex),
            &desc.vertex,
            include_root,
        )?;
        let fs_source = preprocess(
            backend.stage_header(ShaderStage::Fragment),
            &desc.fragment,
            include_root,
        )?;

        let vs_module = backend
            .compile_stage(ShaderStage::Vertex, &vs_source)
            .inspect_err(|err| log::error!("{err}"))?;
        let fs_module = match backend.compile_stage(ShaderStage::Fragment, &fs_source) {
            Ok(module) => module,
            Err(err) => {
                log::error!("{err}");
                backend.destroy_stage_module(vs_module);
                return Err(err);
            }
        };

        let linked = match backend.link_program(vs_module, fs_module) {
            Ok(linked) => linked,
            Err(err) => {
                log::error!("{err}");
                backend.destroy_stage_module(vs_module);
                backend.destroy_stage_module(fs_module);
                return Err(err);
            }
        };

        let layout = ShaderLayout::from_raw(linked.uniforms);
        log::debug!(
            "linked shader program {:?} with {} uniforms in {} sets",
            linked.program,
            layout.uniforms().len(),
            layout.sets().len()
        );

        Ok(Shader::new(
            Arc::clone(backend),
            vs_module,
            fs_module,
            linked.program,
            layout,
            desc.render_state,
        ))
    }
}
