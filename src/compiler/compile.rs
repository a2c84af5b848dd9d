//! Graph compilation: stage planning, type resolution, block builds, assembly.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::assemble::assemble_stage;
use super::block::{BlockIo, InputIo, OutputIo};
use super::build_state::{
    AttributeDecl, BuildState, InitState, SamplerDecl, SharedBuildData, UniformDecl, VaryingDecl,
};
use super::connection::{BlockId, InputRef, OutputRef};
use super::error::{CompileError, CompileResult};
use super::node_graph::NodeGraph;
use super::resolve::{ResolvedTypes, resolve_types};
use super::types::{BlockTarget, ShaderDialect, ShaderStage};
use crate::config::CompileOptions;
use crate::graph::topo_sort;

/// Result of a successful compile.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledShader {
    pub dialect: ShaderDialect,
    pub vertex: String,
    pub fragment: String,
    pub uniforms: Vec<UniformDecl>,
    pub samplers: Vec<SamplerDecl>,
    pub varyings: Vec<VaryingDecl>,
    pub attributes: Vec<AttributeDecl>,
    /// Uniform allocated for each block publishing an authored value.
    pub block_uniforms: BTreeMap<BlockId, String>,
    pub blocks_with_defines: Vec<BlockId>,
    pub bindable_blocks: Vec<BlockId>,
    pub blocking_blocks: Vec<BlockId>,
}

impl CompiledShader {
    pub fn source(&self, stage: ShaderStage) -> &str {
        match stage {
            ShaderStage::Vertex => &self.vertex,
            ShaderStage::Fragment => &self.fragment,
        }
    }

    pub fn uniform_names(&self) -> impl Iterator<Item = &str> {
        self.uniforms.iter().map(|u| u.name.as_str())
    }

    pub fn block_uniform(&self, block: BlockId) -> Option<&str> {
        self.block_uniforms.get(&block).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildStatus {
    Unbuilt,
    Initializing,
    Building,
    Built,
}

#[derive(Default)]
struct Lifecycle(HashMap<(BlockId, ShaderStage), BuildStatus>);

impl Lifecycle {
    fn advance(
        &mut self,
        block: BlockId,
        stage: ShaderStage,
        from: BuildStatus,
        to: BuildStatus,
    ) -> CompileResult<()> {
        let status = self.0.entry((block, stage)).or_insert(BuildStatus::Unbuilt);
        if *status != from {
            return Err(CompileError::InvalidGraph(format!(
                "internal: block {block} is {status:?} in the {stage} stage, cannot enter {to:?}"
            )));
        }
        *status = to;
        Ok(())
    }
}

/// Blocks to build per stage and the values crossing from vertex to fragment.
struct StagePlan {
    vertex: BTreeSet<BlockId>,
    fragment: BTreeSet<BlockId>,
    crossings: BTreeSet<OutputRef>,
}

fn stage_roots(graph: &NodeGraph, stage: ShaderStage) -> CompileResult<Vec<BlockId>> {
    let mut terminals = Vec::new();
    let mut auxiliary = Vec::new();
    for id in graph.block_ids() {
        let block = graph.block(id)?;
        if block.terminal_stage() == Some(stage) {
            terminals.push(id);
        } else if block.terminal_stage().is_none()
            && graph.outputs(id)?.is_empty()
            && block.target().includes(stage)
        {
            auxiliary.push(id);
        }
    }
    if terminals.len() != 1 {
        return Err(CompileError::InvalidGraph(format!(
            "expected exactly one {stage} output block, found {}",
            terminals.len()
        )));
    }
    terminals.extend(auxiliary);
    Ok(terminals)
}

fn plan_stages(graph: &NodeGraph) -> CompileResult<StagePlan> {
    let mut fragment = BTreeSet::new();
    let mut crossings = BTreeSet::new();
    let mut vertex_seeds = Vec::new();

    let mut stack = stage_roots(graph, ShaderStage::Fragment)?;
    while let Some(id) = stack.pop() {
        if !fragment.insert(id) {
            continue;
        }
        for (port, point) in graph.inputs(id)?.iter().enumerate() {
            if !point.participates_in(ShaderStage::Fragment) {
                continue;
            }
            let Some(upstream) = graph.connected_output(InputRef { block: id, port }) else {
                continue;
            };
            if graph.block(upstream.block)?.target() == BlockTarget::Vertex {
                crossings.insert(upstream);
                vertex_seeds.push(upstream.block);
            } else {
                stack.push(upstream.block);
            }
        }
    }

    let mut vertex = BTreeSet::new();
    let mut stack = stage_roots(graph, ShaderStage::Vertex)?;
    stack.extend(vertex_seeds);
    while let Some(id) = stack.pop() {
        if !vertex.insert(id) {
            continue;
        }
        for (port, point) in graph.inputs(id)?.iter().enumerate() {
            if !point.participates_in(ShaderStage::Vertex) {
                continue;
            }
            let input = InputRef { block: id, port };
            let Some(upstream) = graph.connected_output(input) else {
                continue;
            };
            if !graph.block(upstream.block)?.target().includes(ShaderStage::Vertex) {
                return Err(CompileError::InvalidGraph(format!(
                    "fragment-only output {} feeds the vertex stage through {}",
                    graph.output_label(upstream),
                    graph.input_label(input)
                )));
            }
            stack.push(upstream.block);
        }
    }

    Ok(StagePlan {
        vertex,
        fragment,
        crossings,
    })
}

fn block_io(
    graph: &NodeGraph,
    types: &ResolvedTypes,
    block: BlockId,
    stage: ShaderStage,
    produced: &HashMap<OutputRef, String>,
) -> CompileResult<BlockIo> {
    let name = graph.name(block)?.to_string();

    let mut inputs = Vec::new();
    for (port, point) in graph.inputs(block)?.iter().enumerate() {
        let input = InputRef { block, port };
        let label = graph.input_label(input);
        let participates = point.participates_in(stage);
        let variable = match graph.connected_output(input) {
            Some(upstream) if participates => Some(
                produced
                    .get(&upstream)
                    .cloned()
                    .ok_or_else(|| CompileError::MissingConnection {
                        point: graph.output_label(upstream),
                    })?,
            ),
            Some(_) => None,
            None if participates && !point.optional => {
                return Err(CompileError::MissingConnection { point: label });
            }
            None => None,
        };
        inputs.push(InputIo {
            name: point.name.clone(),
            label,
            ty: types.input(input),
            variable,
        });
    }

    let mut outputs = Vec::new();
    for (port, point) in graph.outputs(block)?.iter().enumerate() {
        let output = OutputRef { block, port };
        outputs.push(OutputIo {
            port,
            name: point.name.clone(),
            label: graph.output_label(output),
            ty: types.output(output),
            has_endpoints: graph.has_endpoints(output),
        });
    }

    Ok(BlockIo {
        block,
        name,
        inputs,
        outputs,
    })
}

fn build_stage(
    graph: &NodeGraph,
    types: &ResolvedTypes,
    order: &[BlockId],
    state: &mut BuildState<'_>,
    lifecycle: &mut Lifecycle,
) -> CompileResult<()> {
    let stage = state.target();
    for &id in order {
        let block = graph.block(id)?;
        lifecycle.advance(id, stage, BuildStatus::Initializing, BuildStatus::Building)?;
        let io = block_io(graph, types, id, stage, state.produced())?;
        state.begin_block(id, &io.name);
        block.build(state, &io)?;
        lifecycle.advance(id, stage, BuildStatus::Building, BuildStatus::Built)?;
        log::trace!("built {} ({}) for {stage}", io.name, block.class_name());
    }
    Ok(())
}

/// Compiles `graph` into a vertex and a fragment program.
///
/// The graph is not modified; every compile starts from fresh build state.
pub fn compile_graph(graph: &NodeGraph, options: &CompileOptions) -> CompileResult<CompiledShader> {
    let order = topo_sort(graph)?;
    let plan = plan_stages(graph)?;

    for id in &order {
        if !plan.vertex.contains(id) && !plan.fragment.contains(id) {
            log::warn!(
                "skipping block `{}`: it does not reach a stage output",
                graph.name(*id)?
            );
        }
    }

    let vertex_order: Vec<BlockId> = order
        .iter()
        .copied()
        .filter(|id| plan.vertex.contains(id))
        .collect();
    let fragment_order: Vec<BlockId> = order
        .iter()
        .copied()
        .filter(|id| plan.fragment.contains(id))
        .collect();
    let union: Vec<BlockId> = order
        .iter()
        .copied()
        .filter(|id| plan.vertex.contains(id) || plan.fragment.contains(id))
        .collect();

    let types = resolve_types(graph, &union)?;

    let mut shared = SharedBuildData::default();
    let mut lifecycle = Lifecycle::default();

    for (stage, stage_order) in [
        (ShaderStage::Vertex, &vertex_order),
        (ShaderStage::Fragment, &fragment_order),
    ] {
        for &id in stage_order {
            lifecycle.advance(id, stage, BuildStatus::Unbuilt, BuildStatus::Initializing)?;
            let mut init = InitState {
                shared: &mut shared,
                block: id,
            };
            graph.block(id)?.initialize(&mut init)?;
        }
    }

    let mut varyings: BTreeMap<OutputRef, String> = BTreeMap::new();
    let vertex_source = {
        let mut state = BuildState::new(ShaderStage::Vertex, &mut shared, options.emit_comments);
        build_stage(graph, &types, &vertex_order, &mut state, &mut lifecycle)?;

        for &crossing in &plan.crossings {
            let source = state
                .output_variable(crossing)
                .map(str::to_string)
                .ok_or_else(|| CompileError::MissingConnection {
                    point: graph.output_label(crossing),
                })?;
            let ty = types
                .output(crossing)
                .ok_or_else(|| CompileError::TypeResolution {
                    point: graph.output_label(crossing),
                    reason: "cannot pass an unresolved value between stages".to_string(),
                })?;
            let varying = state.free_variable_name(&format!("v_{source}"));
            state.declare_varying(&varying, ty)?;
            state.push_code(&format!("{varying} = {source};\n"));
            varyings.insert(crossing, varying);
        }
        state.finish()
    };

    let fragment_source = {
        let mut state = BuildState::new(ShaderStage::Fragment, &mut shared, options.emit_comments);
        for (output, varying) in &varyings {
            state.seed_produced(*output, varying.clone());
        }
        build_stage(graph, &types, &fragment_order, &mut state, &mut lifecycle)?;
        state.finish()
    };

    let vertex = assemble_stage(ShaderStage::Vertex, options.dialect, &shared, &vertex_source);
    let fragment = assemble_stage(
        ShaderStage::Fragment,
        options.dialect,
        &shared,
        &fragment_source,
    );

    log::debug!(
        "compiled graph: {} vertex blocks, {} fragment blocks, {} uniforms, {} varyings",
        vertex_order.len(),
        fragment_order.len(),
        shared.uniforms.len(),
        shared.varyings.len()
    );

    Ok(CompiledShader {
        dialect: options.dialect,
        vertex,
        fragment,
        uniforms: shared.uniforms,
        samplers: shared.samplers,
        varyings: shared.varyings,
        attributes: shared.attributes,
        block_uniforms: shared.block_uniforms,
        blocks_with_defines: shared.blocks_with_defines,
        bindable_blocks: shared.bindable_blocks,
        blocking_blocks: shared.blocking_blocks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::blocks::input::{AttributeKind, SystemValue};
    use crate::compiler::blocks::{
        ClampBlock, FragmentOutputBlock, ImageProcessingBlock, InputBlock, TransformBlock,
        VertexOutputBlock,
    };

    fn vertex_chain(graph: &mut NodeGraph) {
        let position = graph.add_block("position", InputBlock::attribute(AttributeKind::Position));
        let vp = graph.add_block("viewProjection", InputBlock::system(SystemValue::ViewProjection));
        let transform = graph.add_block("clipPos", TransformBlock::default());
        let out = graph.add_block("vertexOutput", VertexOutputBlock);
        graph.connect_named(position, "output", transform, "vector").unwrap();
        graph.connect_named(vp, "output", transform, "transform").unwrap();
        graph.connect_named(transform, "output", out, "vector").unwrap();
    }

    #[test]
    fn missing_terminal_is_an_invalid_graph() {
        let mut graph = NodeGraph::new();
        vertex_chain(&mut graph);
        let err = compile_graph(&graph, &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CompileError::InvalidGraph(_)));
    }

    #[test]
    fn vertex_values_reach_the_fragment_through_varyings() {
        let mut graph = NodeGraph::new();
        vertex_chain(&mut graph);
        let color = graph.add_block("color", InputBlock::attribute(AttributeKind::Color));
        let frag = graph.add_block("fragmentOutput", FragmentOutputBlock::default());
        graph.connect_named(color, "output", frag, "rgba").unwrap();

        let shader = compile_graph(&graph, &CompileOptions::default()).unwrap();
        assert!(shader.vertex.contains("out vec4 v_color;"));
        assert!(shader.vertex.contains("v_color = color;"));
        assert!(shader.fragment.contains("in vec4 v_color;"));
        assert!(shader.fragment.contains("glFragColor = v_color;"));
    }

    #[test]
    fn required_inputs_must_be_connected() {
        let mut graph = NodeGraph::new();
        vertex_chain(&mut graph);
        let clamp = graph.add_block("clamp", ClampBlock::default());
        let frag = graph.add_block("fragmentOutput", FragmentOutputBlock::default());
        graph.connect_named(clamp, "output", frag, "a").unwrap();
        let color = graph.add_block("color", InputBlock::attribute(AttributeKind::Color));
        graph.connect_named(color, "output", frag, "rgba").unwrap();

        let err = compile_graph(&graph, &CompileOptions::default()).unwrap_err();
        assert_eq!(
            err,
            CompileError::MissingConnection {
                point: "clamp.value".to_string()
            }
        );
    }

    #[test]
    fn reading_an_output_that_was_never_produced_fails() {
        let mut graph = NodeGraph::new();
        vertex_chain(&mut graph);
        let ip = graph.add_block("ip", ImageProcessingBlock::default());
        let frag = graph.add_block("fragmentOutput", FragmentOutputBlock::default());
        graph.connect_named(ip, "output", frag, "rgba").unwrap();

        let err = compile_graph(&graph, &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CompileError::MissingConnection { .. }));
    }
}
