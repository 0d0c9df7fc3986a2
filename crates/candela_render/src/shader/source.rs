//! Shader Source Descriptors & Preprocessing
//!
//! A shader is compiled from two text blobs (vertex, fragment), each paired
//! with a predefine block and an ordered include list, plus a render-state
//! descriptor. Preprocessing is purely textual and backend-agnostic:
//!
//! ```text
//! <backend stage header>
//! <caller predefine block>
//! <include 0> … <include n>   (resolved under <data-root>/shader/Include/)
//! <body source>
//! ```
//!
//! A missing include aborts compilation of that shader with
//! [`RenderError::MissingInclude`] naming the include.
//!
//! [`RenderError::MissingInclude`]: crate::errors::RenderError::MissingInclude

use std::fs;
use std::path::Path;

use crate::errors::{RenderError, Result};
use crate::render_state::RenderState;

/// Source inputs for one shader stage.
#[derive(Debug, Clone, Default)]
pub struct StageSource {
    /// The stage body source.
    pub source: String,
    /// `#define`-style predefine block, prepended before the includes.
    pub predefine: String,
    /// Include identifiers, concatenated in the listed order.
    pub includes: Vec<String>,
}

impl StageSource {
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            predefine: String::new(),
            includes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_predefine(mut self, predefine: impl Into<String>) -> Self {
        self.predefine = predefine.into();
        self
    }

    #[must_use]
    pub fn with_include(mut self, include: impl Into<String>) -> Self {
        self.includes.push(include.into());
        self
    }
}

/// Full source description of a shader: both stages plus the immutable
/// render state the compiled pipelines will carry.
#[derive(Debug, Clone, Default)]
pub struct ShaderSourceDescriptor {
    pub vertex: StageSource,
    pub fragment: StageSource,
    pub render_state: RenderState,
}

/// Assembles the final stage source: header, predefines, includes (in
/// order), then the body. Include files are read from `include_root`.
pub(crate) fn preprocess(
    stage_header: &str,
    stage: &StageSource,
    include_root: &Path,
) -> Result<String> {
    let mut source = String::from(stage_header);
    source.push_str(&stage.predefine);
    source.push('\n');

    for include in &stage.includes {
        let path = include_root.join(include);
        let text = fs::read_to_string(&path).map_err(|_| RenderError::MissingInclude {
            name: include.clone(),
            path: path.clone(),
        })?;
        source.push_str(&text);
        source.push('\n');
    }

    source.push_str(&stage.source);
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};

    static CASE: AtomicU32 = AtomicU32::new(0);

    fn include_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "candela_source_test_{}_{}",
            std::process::id(),
            CASE.fetch_add(1, Ordering::Relaxed)
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn sections_concatenate_in_order() {
        let dir = include_dir();
        fs::write(dir.join("Common"), "// common\n").unwrap();
        fs::write(dir.join("Lighting"), "// lighting\n").unwrap();

        let stage = StageSource::new("void main() {}")
            .with_predefine("#define USE_FOG 1")
            .with_include("Common")
            .with_include("Lighting");

        let out = preprocess("#version 120\n", &stage, &dir).unwrap();
        let header = out.find("#version").unwrap();
        let define = out.find("#define USE_FOG").unwrap();
        let common = out.find("// common").unwrap();
        let lighting = out.find("// lighting").unwrap();
        let body = out.find("void main").unwrap();
        assert!(header < define && define < common && common < lighting && lighting < body);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_include_names_the_include() {
        let dir = include_dir();
        let stage = StageSource::new("void main() {}").with_include("DoesNotExist");
        let err = preprocess("", &stage, &dir).unwrap_err();
        match err {
            RenderError::MissingInclude { name, .. } => assert_eq!(name, "DoesNotExist"),
            other => panic!("expected MissingInclude, got {other:?}"),
        }
        fs::remove_dir_all(&dir).unwrap();
    }
}
