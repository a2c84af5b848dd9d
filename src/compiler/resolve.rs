//! Type resolution pass run before any code is emitted.

use std::collections::HashMap;

use super::connection::{BlockId, InputRef, OutputRef};
use super::error::{CompileError, CompileResult};
use super::node_graph::NodeGraph;
use super::types::ConnectionPointType;

#[derive(Debug, Default, Clone)]
pub struct ResolvedTypes {
    inputs: HashMap<InputRef, ConnectionPointType>,
    outputs: HashMap<OutputRef, ConnectionPointType>,
}

impl ResolvedTypes {
    pub fn input(&self, input: InputRef) -> Option<ConnectionPointType> {
        self.inputs.get(&input).copied()
    }

    pub fn output(&self, output: OutputRef) -> Option<ConnectionPointType> {
        self.outputs.get(&output).copied()
    }
}

/// Resolves every port of `order`, which must be topologically sorted.
///
/// Inputs left unresolved are unconnected deferred inputs; whether that is an
/// error is decided when the block is built.
pub fn resolve_types(graph: &NodeGraph, order: &[BlockId]) -> CompileResult<ResolvedTypes> {
    let mut resolved = ResolvedTypes::default();

    for &block in order {
        for (port, point) in graph.inputs(block)?.iter().enumerate() {
            let input = InputRef { block, port };
            let Some(upstream) = graph.connected_output(input) else {
                if !point.declared.is_deferred() {
                    resolved.inputs.insert(input, point.declared);
                }
                continue;
            };

            let Some(upstream_ty) = resolved.output(upstream) else {
                if point.declared.is_deferred() {
                    return Err(CompileError::TypeResolution {
                        point: graph.input_label(input),
                        reason: format!(
                            "upstream {} has no resolved type",
                            graph.output_label(upstream)
                        ),
                    });
                }
                resolved.inputs.insert(input, point.declared);
                continue;
            };

            if !point.accepts(upstream_ty) {
                return Err(CompileError::TypeResolution {
                    point: graph.input_label(input),
                    reason: format!("{upstream_ty} is not accepted"),
                });
            }
            let ty = if point.declared.is_deferred() {
                upstream_ty
            } else {
                point.declared
            };
            resolved.inputs.insert(input, ty);
        }

        let inputs = graph.inputs(block)?;
        for (port, point) in graph.outputs(block)?.iter().enumerate() {
            let output = OutputRef { block, port };
            let ty = match point.declared {
                ConnectionPointType::BasedOnInput => {
                    let source = point.type_source.ok_or_else(|| CompileError::TypeResolution {
                        point: graph.output_label(output),
                        reason: "no source input to copy the type from".to_string(),
                    })?;
                    let source_ref = InputRef {
                        block,
                        port: source,
                    };
                    match resolved.input(source_ref) {
                        Some(ty) => ty,
                        None => {
                            let optional = inputs.get(source).is_some_and(|p| p.optional);
                            if optional {
                                return Err(CompileError::TypeResolution {
                                    point: graph.output_label(output),
                                    reason: format!(
                                        "source input {} is optional and not connected",
                                        graph.input_label(source_ref)
                                    ),
                                });
                            }
                            // Required source: the build reports the missing connection.
                            continue;
                        }
                    }
                }
                ConnectionPointType::AutoDetect => {
                    return Err(CompileError::TypeResolution {
                        point: graph.output_label(output),
                        reason: "outputs cannot auto-detect their type".to_string(),
                    });
                }
                concrete => concrete,
            };

            if point.excluded.contains(&ty) {
                return Err(CompileError::TypeResolution {
                    point: graph.output_label(output),
                    reason: format!("{ty} is excluded"),
                });
            }
            resolved.outputs.insert(output, ty);
        }
    }

    Ok(resolved)
}
