//! A node graph plus its compiled program, dispatching runtime work to the
//! blocks the compile registered.

use crate::compiler::{BindScope, CompileResult, CompiledShader, NodeGraph, compile_graph};
use crate::config::CompileOptions;

use super::defines::MaterialDefines;
use super::effect::{BindPhase, Effect};
use super::settings::DrawContext;

#[derive(Debug)]
pub struct NodeMaterial {
    pub name: String,
    graph: NodeGraph,
    options: CompileOptions,
    compiled: Option<CompiledShader>,
}

impl NodeMaterial {
    pub fn new(name: impl Into<String>, graph: NodeGraph, options: CompileOptions) -> Self {
        Self {
            name: name.into(),
            graph,
            options,
            compiled: None,
        }
    }

    /// Compiles the graph, replacing any previous program.
    pub fn build(&mut self) -> CompileResult<&CompiledShader> {
        let compiled = compile_graph(&self.graph, &self.options)?;
        log::debug!(
            "material `{}` built: {} bindable, {} with defines, {} blocking",
            self.name,
            compiled.bindable_blocks.len(),
            compiled.blocks_with_defines.len(),
            compiled.blocking_blocks.len()
        );
        Ok(self.compiled.insert(compiled))
    }

    pub fn compiled(&self) -> Option<&CompiledShader> {
        self.compiled.as_ref()
    }

    pub fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    /// Graph edits drop the compiled program.
    pub fn graph_mut(&mut self) -> &mut NodeGraph {
        self.compiled = None;
        &mut self.graph
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// False until built, and while any blocking block reports not ready.
    pub fn is_ready(&self, draw: &DrawContext, defines: &MaterialDefines) -> bool {
        let Some(compiled) = &self.compiled else {
            return false;
        };
        for &id in &compiled.blocking_blocks {
            let Ok(block) = self.graph.block(id) else {
                continue;
            };
            let Some(check) = block.as_readiness_check() else {
                continue;
            };
            if !check.is_ready(draw, defines) {
                log::warn!(
                    "material `{}` not ready: block `{}` is waiting",
                    self.name,
                    self.graph.name(id).unwrap_or("?")
                );
                return false;
            }
        }
        true
    }

    /// Runs every define contributor when `defines` is dirty. Returns whether
    /// any define changed, meaning the program must be rebuilt.
    pub fn prepare_defines(&self, draw: &DrawContext, defines: &mut MaterialDefines) -> bool {
        if !defines.is_dirty() {
            return false;
        }
        if let Some(compiled) = &self.compiled {
            for &id in &compiled.blocks_with_defines {
                if let Some(contributor) = self
                    .graph
                    .block(id)
                    .ok()
                    .and_then(|block| block.as_define_contributor())
                {
                    contributor.prepare_defines(draw, defines);
                }
            }
        }
        defines.mark_as_processed();
        defines.take_changed()
    }

    /// Binds textures for every bindable block, then values.
    pub fn bind(&self, draw: &DrawContext, effect: &mut dyn Effect) {
        let Some(compiled) = &self.compiled else {
            return;
        };
        for phase in BindPhase::ALL {
            for &id in &compiled.bindable_blocks {
                let (Ok(block), Ok(block_name)) = (self.graph.block(id), self.graph.name(id))
                else {
                    continue;
                };
                if let Some(bindable) = block.as_bindable() {
                    let scope = BindScope {
                        block_name,
                        uniform: compiled.block_uniform(id),
                        draw,
                    };
                    bindable.bind(phase, &scope, effect);
                }
            }
        }
    }
}
