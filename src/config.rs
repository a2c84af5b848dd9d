use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::compiler::ShaderDialect;

/// Knobs for one compile. Missing fields in a JSON file keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompileOptions {
    pub dialect: ShaderDialect,
    /// Prefix each block's code with a `// <block name>` line.
    pub emit_comments: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            dialect: ShaderDialect::Gles300,
            emit_comments: true,
        }
    }
}

pub fn load_options_from_path(path: impl AsRef<Path>) -> Result<CompileOptions> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read options json at {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse options json at {}", path.display()))
}
