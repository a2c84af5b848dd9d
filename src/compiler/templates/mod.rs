//! Named shader includes and the textual substitutions applied to them.

mod clip_planes;
mod helpers;
mod image_processing;

use regex::{NoExpand, Regex};

use super::error::{CompileError, CompileResult};

/// A regex substitution applied to an include before it is emitted.
#[derive(Debug, Clone)]
pub struct Replacement {
    pattern: Regex,
    with: String,
}

impl Replacement {
    pub fn new(pattern: &str, with: impl Into<String>) -> CompileResult<Self> {
        let pattern = Regex::new(pattern).map_err(|e| CompileError::Template {
            name: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            pattern,
            with: with.into(),
        })
    }

    /// Replaces whole-word occurrences of `search`.
    pub fn word(search: &str, with: impl Into<String>) -> CompileResult<Self> {
        Self::new(&format!(r"\b{}\b", regex::escape(search)), with)
    }

    pub fn apply(&self, source: &str) -> String {
        self.pattern
            .replace_all(source, NoExpand(&self.with))
            .into_owned()
    }
}

pub fn include(name: &str) -> Option<&'static str> {
    match name {
        "helperFunctions" => Some(helpers::HELPER_FUNCTIONS),
        "clipPlaneVertexDeclaration" => Some(clip_planes::VERTEX_DECLARATION),
        "clipPlaneVertex" => Some(clip_planes::VERTEX),
        "clipPlaneFragmentDeclaration" => Some(clip_planes::FRAGMENT_DECLARATION),
        "clipPlaneFragment" => Some(clip_planes::FRAGMENT),
        "imageProcessingDeclaration" => Some(image_processing::DECLARATION),
        "imageProcessingFunctions" => Some(image_processing::FUNCTIONS),
        _ => None,
    }
}

pub fn render_include(name: &str, replacements: &[Replacement]) -> CompileResult<String> {
    let source = include(name).ok_or_else(|| CompileError::Template {
        name: name.to_string(),
        reason: "no such include".to_string(),
    })?;
    Ok(replacements
        .iter()
        .fold(source.to_string(), |acc, r| r.apply(&acc)))
}
