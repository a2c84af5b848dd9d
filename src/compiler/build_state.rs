//! Per-compile build context.
//!
//! [`SharedBuildData`] lives for one call to `compile_graph` and holds
//! everything both stages agree on: identifiers, declarations and the block
//! lists the material dispatches to after compilation. Each stage gets its own
//! [`BuildState`] borrowing it.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::block::OutputIo;
use super::connection::{BlockId, OutputRef};
use super::error::{CompileError, CompileResult};
use super::templates::{self, Replacement};
use super::types::{ConnectionPointType, ShaderStage};
use super::utils::{is_reserved_glsl_ident, sanitize_glsl_ident};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDecl {
    pub name: String,
    pub ty: ConnectionPointType,
    /// Set for uniforms a single block owns (named after the block).
    pub owner: Option<BlockId>,
    pub stages: BTreeSet<ShaderStage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerDecl {
    pub name: String,
    /// Preprocessor symbol the declaration is wrapped in.
    pub guard: Option<String>,
    pub stages: BTreeSet<ShaderStage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaryingDecl {
    pub name: String,
    pub ty: ConnectionPointType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDecl {
    pub name: String,
    pub ty: ConnectionPointType,
}

#[derive(Debug, Default)]
pub struct SharedBuildData {
    excluded: BTreeSet<String>,
    generated: BTreeSet<String>,
    pub(crate) uniforms: Vec<UniformDecl>,
    pub(crate) samplers: Vec<SamplerDecl>,
    pub(crate) varyings: Vec<VaryingDecl>,
    pub(crate) attributes: Vec<AttributeDecl>,
    /// Uniform names allocated for blocks that publish an authored value.
    pub(crate) block_uniforms: BTreeMap<BlockId, String>,
    pub(crate) blocks_with_defines: Vec<BlockId>,
    pub(crate) bindable_blocks: Vec<BlockId>,
    pub(crate) blocking_blocks: Vec<BlockId>,
}

impl SharedBuildData {
    pub fn exclude_variable_name(&mut self, name: &str) {
        self.excluded.insert(name.to_string());
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.contains(name)
    }

    fn is_taken(&self, name: &str) -> bool {
        is_reserved_glsl_ident(name)
            || self.excluded.contains(name)
            || self.generated.contains(name)
            || self.uniforms.iter().any(|u| u.name == name)
            || self.samplers.iter().any(|s| s.name == name)
            || self.varyings.iter().any(|v| v.name == name)
            || self.attributes.iter().any(|a| a.name == name)
            || self.block_uniforms.values().any(|n| n == name)
    }

    /// Returns an identifier derived from `prefix` that nothing else uses.
    pub fn free_variable_name(&mut self, prefix: &str) -> String {
        let base = sanitize_glsl_ident(prefix);
        let mut candidate = base.clone();
        let mut counter = 1usize;
        while self.is_taken(&candidate) {
            candidate = format!("{base}{counter}");
            counter += 1;
        }
        self.generated.insert(candidate.clone());
        candidate
    }

    fn declare_uniform_in(
        &mut self,
        stage: ShaderStage,
        name: &str,
        ty: ConnectionPointType,
        owner: Option<BlockId>,
    ) -> CompileResult<()> {
        let collision = |reason: String| CompileError::NameCollision {
            name: name.to_string(),
            reason,
        };

        if ty.is_deferred() {
            return Err(collision(format!("cannot be declared with deferred type {ty}")));
        }
        if self.generated.contains(name) {
            return Err(collision("is already used as a local variable".to_string()));
        }
        if self.samplers.iter().any(|s| s.name == name)
            || self.varyings.iter().any(|v| v.name == name)
            || self.attributes.iter().any(|a| a.name == name)
        {
            return Err(collision("is already declared with another storage".to_string()));
        }

        if let Some(existing) = self.uniforms.iter_mut().find(|u| u.name == name) {
            if existing.owner != owner {
                return Err(collision("is claimed by another block".to_string()));
            }
            if !existing.ty.is_equivalent(ty) {
                return Err(collision(format!(
                    "was declared as {} and redeclared as {ty}",
                    existing.ty
                )));
            }
            existing.stages.insert(stage);
            return Ok(());
        }

        if owner.is_some() && (is_reserved_glsl_ident(name) || self.excluded.contains(name)) {
            return Err(collision("is reserved".to_string()));
        }

        self.uniforms.push(UniformDecl {
            name: name.to_string(),
            ty,
            owner,
            stages: BTreeSet::from([stage]),
        });
        Ok(())
    }

    fn push_unique(list: &mut Vec<BlockId>, id: BlockId) {
        if !list.contains(&id) {
            list.push(id);
        }
    }
}

/// Context handed to [`Buildable::initialize`](super::Buildable::initialize).
pub struct InitState<'a> {
    pub(crate) shared: &'a mut SharedBuildData,
    pub(crate) block: BlockId,
}

impl InitState<'_> {
    pub fn block(&self) -> BlockId {
        self.block
    }

    pub fn exclude_variable_name(&mut self, name: &str) {
        self.shared.exclude_variable_name(name);
    }
}

/// A declared output local, displayed as `type name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDecl {
    pub glsl_type: &'static str,
    pub name: String,
}

impl std::fmt::Display for OutputDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.glsl_type, self.name)
    }
}

/// Code emitted for one stage, ready for assembly.
#[derive(Debug, Default, Clone)]
pub(crate) struct StageSource {
    pub code: String,
    pub functions: Vec<(String, String)>,
}

pub struct BuildState<'a> {
    stage: ShaderStage,
    pub(crate) shared: &'a mut SharedBuildData,
    current: Option<BlockId>,
    emit_comments: bool,
    compilation: String,
    functions: Vec<(String, String)>,
    produced: HashMap<OutputRef, String>,
}

impl<'a> BuildState<'a> {
    pub(crate) fn new(
        stage: ShaderStage,
        shared: &'a mut SharedBuildData,
        emit_comments: bool,
    ) -> Self {
        Self {
            stage,
            shared,
            current: None,
            emit_comments,
            compilation: String::new(),
            functions: Vec::new(),
            produced: HashMap::new(),
        }
    }

    pub fn target(&self) -> ShaderStage {
        self.stage
    }

    pub(crate) fn begin_block(&mut self, block: BlockId, name: &str) {
        self.current = Some(block);
        if self.emit_comments {
            self.compilation.push_str(&format!("// {name}\n"));
        }
    }

    fn current_block(&self) -> CompileResult<BlockId> {
        self.current
            .ok_or_else(|| CompileError::InvalidGraph("no block is being built".to_string()))
    }

    pub fn push_code(&mut self, code: &str) {
        self.compilation.push_str(code);
    }

    /// Adds a named include to the function section once per stage.
    pub fn emit_function_from_include(
        &mut self,
        name: &str,
        comments: &str,
        replacements: &[Replacement],
    ) -> CompileResult<()> {
        if self.functions.iter().any(|(key, _)| key == name) {
            return Ok(());
        }
        let mut code = String::new();
        if self.emit_comments && !comments.is_empty() {
            code.push_str(&format!("// {comments}\n"));
        }
        code.push_str(&templates::render_include(name, replacements)?);
        self.functions.push((name.to_string(), code));
        Ok(())
    }

    /// Renders a named include for the caller to place in `main`.
    pub fn emit_code_from_include(
        &mut self,
        name: &str,
        comments: &str,
        replacements: &[Replacement],
    ) -> CompileResult<String> {
        let mut code = String::new();
        if self.emit_comments && !comments.is_empty() {
            code.push_str(&format!("// {comments}\n"));
        }
        code.push_str(&templates::render_include(name, replacements)?);
        Ok(code)
    }

    /// Declares a uniform shared by every block that asks for it.
    pub fn declare_uniform(&mut self, name: &str, ty: ConnectionPointType) -> CompileResult<()> {
        self.shared.declare_uniform_in(self.stage, name, ty, None)
    }

    /// Declares a uniform owned by the block being built.
    pub fn declare_block_uniform(
        &mut self,
        name: &str,
        ty: ConnectionPointType,
    ) -> CompileResult<()> {
        let owner = self.current_block()?;
        self.shared.declare_uniform_in(self.stage, name, ty, Some(owner))
    }

    /// Uniform name of the block being built, derived from `prefix` the
    /// first time and reused by the other stage.
    pub fn block_uniform_name(&mut self, prefix: &str) -> CompileResult<String> {
        let block = self.current_block()?;
        if let Some(name) = self.shared.block_uniforms.get(&block) {
            return Ok(name.clone());
        }
        let base = sanitize_glsl_ident(prefix);
        let mut name = base.clone();
        let mut counter = 1usize;
        while self.shared.is_taken(&name) {
            name = format!("{base}{counter}");
            counter += 1;
        }
        self.shared.block_uniforms.insert(block, name.clone());
        Ok(name)
    }

    pub fn declare_sampler(&mut self, name: &str, guard: Option<&str>) -> CompileResult<()> {
        if self.shared.uniforms.iter().any(|u| u.name == name) || self.shared.generated.contains(name)
        {
            return Err(CompileError::NameCollision {
                name: name.to_string(),
                reason: "is already declared with another storage".to_string(),
            });
        }
        let stage = self.stage;
        if let Some(existing) = self.shared.samplers.iter_mut().find(|s| s.name == name) {
            if existing.guard.as_deref() != guard {
                return Err(CompileError::NameCollision {
                    name: name.to_string(),
                    reason: "was declared under a different guard".to_string(),
                });
            }
            existing.stages.insert(stage);
            return Ok(());
        }
        self.shared.samplers.push(SamplerDecl {
            name: name.to_string(),
            guard: guard.map(str::to_string),
            stages: BTreeSet::from([stage]),
        });
        Ok(())
    }

    pub fn declare_varying(&mut self, name: &str, ty: ConnectionPointType) -> CompileResult<()> {
        if ty.is_deferred() {
            return Err(CompileError::NameCollision {
                name: name.to_string(),
                reason: format!("cannot be declared with deferred type {ty}"),
            });
        }
        if let Some(existing) = self.shared.varyings.iter().find(|v| v.name == name) {
            if existing.ty.is_equivalent(ty) {
                return Ok(());
            }
            return Err(CompileError::NameCollision {
                name: name.to_string(),
                reason: format!("was declared as {} and redeclared as {ty}", existing.ty),
            });
        }
        if self.shared.uniforms.iter().any(|u| u.name == name)
            || self.shared.attributes.iter().any(|a| a.name == name)
        {
            return Err(CompileError::NameCollision {
                name: name.to_string(),
                reason: "is already declared with another storage".to_string(),
            });
        }
        self.shared.varyings.push(VaryingDecl {
            name: name.to_string(),
            ty,
        });
        Ok(())
    }

    pub fn declare_attribute(&mut self, name: &str, ty: ConnectionPointType) -> CompileResult<()> {
        if self.stage != ShaderStage::Vertex {
            return Err(CompileError::InvalidGraph(format!(
                "attribute `{name}` requested in the {} stage",
                self.stage
            )));
        }
        if let Some(existing) = self.shared.attributes.iter().find(|a| a.name == name) {
            if existing.ty.is_equivalent(ty) {
                return Ok(());
            }
            return Err(CompileError::NameCollision {
                name: name.to_string(),
                reason: format!("was declared as {} and redeclared as {ty}", existing.ty),
            });
        }
        if self.shared.generated.contains(name) || self.shared.uniforms.iter().any(|u| u.name == name)
        {
            return Err(CompileError::NameCollision {
                name: name.to_string(),
                reason: "is already in use".to_string(),
            });
        }
        self.shared.attributes.push(AttributeDecl {
            name: name.to_string(),
            ty,
        });
        Ok(())
    }

    pub fn exclude_variable_name(&mut self, name: &str) {
        self.shared.exclude_variable_name(name);
    }

    pub fn free_variable_name(&mut self, prefix: &str) -> String {
        self.shared.free_variable_name(prefix)
    }

    /// Allocates the local variable holding `output`.
    pub fn declare_output(&mut self, output: &OutputIo) -> CompileResult<OutputDecl> {
        let ty = output.resolved_type()?;
        let glsl_type = ty.glsl().ok_or_else(|| CompileError::TypeResolution {
            point: output.label.clone(),
            reason: format!("{ty} has no shader type"),
        })?;
        let block = self.current_block()?;
        let name = self.free_variable_name(&output.label.replace('.', "_"));
        self.produced.insert(
            OutputRef {
                block,
                port: output.port,
            },
            name.clone(),
        );
        Ok(OutputDecl { glsl_type, name })
    }

    /// Publishes an existing expression (attribute, uniform) as `output`.
    pub fn alias_output(&mut self, output: &OutputIo, expression: &str) -> CompileResult<()> {
        let block = self.current_block()?;
        self.produced.insert(
            OutputRef {
                block,
                port: output.port,
            },
            expression.to_string(),
        );
        Ok(())
    }

    pub fn output_variable(&self, output: OutputRef) -> Option<&str> {
        self.produced.get(&output).map(String::as_str)
    }

    pub(crate) fn produced(&self) -> &HashMap<OutputRef, String> {
        &self.produced
    }

    pub(crate) fn seed_produced(&mut self, output: OutputRef, variable: String) {
        self.produced.insert(output, variable);
    }

    pub fn register_for_defines(&mut self) -> CompileResult<()> {
        let id = self.current_block()?;
        SharedBuildData::push_unique(&mut self.shared.blocks_with_defines, id);
        Ok(())
    }

    pub fn register_for_binding(&mut self) -> CompileResult<()> {
        let id = self.current_block()?;
        SharedBuildData::push_unique(&mut self.shared.bindable_blocks, id);
        Ok(())
    }

    pub fn register_as_blocking(&mut self) -> CompileResult<()> {
        let id = self.current_block()?;
        SharedBuildData::push_unique(&mut self.shared.blocking_blocks, id);
        Ok(())
    }

    pub(crate) fn finish(self) -> StageSource {
        StageSource {
            code: self.compilation,
            functions: self.functions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionPointType::*;

    fn state(shared: &mut SharedBuildData) -> BuildState<'_> {
        let mut state = BuildState::new(ShaderStage::Fragment, shared, false);
        state.begin_block(BlockId(0), "test");
        state
    }

    #[test]
    fn uniform_declaration_is_idempotent() {
        let mut shared = SharedBuildData::default();
        let mut st = state(&mut shared);
        st.declare_uniform("time", Float).unwrap();
        st.declare_uniform("time", Float).unwrap();
        drop(st);
        assert_eq!(shared.uniforms.len(), 1);
    }

    #[test]
    fn uniform_redeclared_with_other_type_collides() {
        let mut shared = SharedBuildData::default();
        let mut st = state(&mut shared);
        st.declare_uniform("time", Float).unwrap();
        let err = st.declare_uniform("time", Vector2).unwrap_err();
        assert!(matches!(err, CompileError::NameCollision { .. }));
    }

    #[test]
    fn free_names_skip_excluded_and_used_names() {
        let mut shared = SharedBuildData::default();
        shared.exclude_variable_name("contrast");
        assert_eq!(shared.free_variable_name("contrast"), "contrast1");
        assert_eq!(shared.free_variable_name("Clamp output"), "Clamp_output");
        assert_eq!(shared.free_variable_name("Clamp output"), "Clamp_output1");
        assert_eq!(shared.free_variable_name("float"), "float1");
    }

    #[test]
    fn block_uniform_cannot_take_an_excluded_name() {
        let mut shared = SharedBuildData::default();
        shared.exclude_variable_name("exposureLinear");
        let mut st = state(&mut shared);
        let err = st.declare_block_uniform("exposureLinear", Float).unwrap_err();
        assert!(matches!(err, CompileError::NameCollision { .. }));
        // Shared declarations of reserved names are how blocks claim them.
        st.declare_uniform("exposureLinear", Float).unwrap();
    }

    #[test]
    fn block_uniform_names_are_unique_and_stable_per_block() {
        let mut shared = SharedBuildData::default();
        let first = {
            let mut state = state(&mut shared);
            let name = state.block_uniform_name("u_tint").unwrap();
            state.declare_block_uniform(&name, Color3).unwrap();
            name
        };
        let mut state = BuildState::new(ShaderStage::Vertex, &mut shared, false);
        state.begin_block(BlockId(1), "other");
        let second = state.block_uniform_name("u_tint").unwrap();
        assert_eq!(first, "u_tint");
        assert_eq!(second, "u_tint1");

        state.begin_block(BlockId(0), "test");
        assert_eq!(state.block_uniform_name("u_tint").unwrap(), "u_tint");
    }

    #[test]
    fn functions_are_deduplicated_by_include_name() {
        let mut shared = SharedBuildData::default();
        let mut st = state(&mut shared);
        st.emit_function_from_include("helperFunctions", "a", &[]).unwrap();
        st.emit_function_from_include("helperFunctions", "b", &[]).unwrap();
        let out = st.finish();
        assert_eq!(out.functions.len(), 1);
    }
}
