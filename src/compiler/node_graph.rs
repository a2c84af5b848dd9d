use super::block::Block;
use super::connection::{BlockId, ConnectionPoint, InputRef, OutputRef, PortRegistrar};
use super::error::{CompileError, CompileResult};
use super::types::ConnectionPointType;
use crate::graph::upstream_reachable;

/// A directed edge from an output to an input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Link {
    pub from: OutputRef,
    pub to: InputRef,
}

#[derive(Debug)]
struct BlockSlot {
    name: String,
    block: Box<dyn Block>,
    inputs: Vec<ConnectionPoint>,
    outputs: Vec<ConnectionPoint>,
}

/// Owns the blocks of a material and the links between them.
///
/// Every mutation keeps the graph acyclic and type-compatible; a rejected
/// `connect` leaves it untouched.
#[derive(Debug, Default)]
pub struct NodeGraph {
    slots: Vec<BlockSlot>,
    links: Vec<Link>,
}

impl NodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_block<B: Block + 'static>(&mut self, name: impl Into<String>, block: B) -> BlockId {
        self.add_boxed_block(name, Box::new(block))
    }

    pub fn add_boxed_block(&mut self, name: impl Into<String>, block: Box<dyn Block>) -> BlockId {
        let mut ports = PortRegistrar::default();
        block.register_ports(&mut ports);
        let (inputs, outputs) = ports.into_parts();
        let id = BlockId(self.slots.len());
        self.slots.push(BlockSlot {
            name: name.into(),
            block,
            inputs,
            outputs,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        (0..self.slots.len()).map(BlockId)
    }

    fn slot(&self, id: BlockId) -> CompileResult<&BlockSlot> {
        self.slots.get(id.0).ok_or(CompileError::UnknownBlock(id.0))
    }

    pub fn block(&self, id: BlockId) -> CompileResult<&dyn Block> {
        Ok(self.slot(id)?.block.as_ref())
    }

    pub fn block_as<T: Block + 'static>(&self, id: BlockId) -> Option<&T> {
        self.slots.get(id.0)?.block.as_any().downcast_ref::<T>()
    }

    /// Mutable access for property edits. Ports are fixed at insertion.
    pub fn block_as_mut<T: Block + 'static>(&mut self, id: BlockId) -> Option<&mut T> {
        self.slots.get_mut(id.0)?.block.as_any_mut().downcast_mut::<T>()
    }

    pub fn name(&self, id: BlockId) -> CompileResult<&str> {
        Ok(self.slot(id)?.name.as_str())
    }

    pub fn inputs(&self, id: BlockId) -> CompileResult<&[ConnectionPoint]> {
        Ok(&self.slot(id)?.inputs)
    }

    pub fn outputs(&self, id: BlockId) -> CompileResult<&[ConnectionPoint]> {
        Ok(&self.slot(id)?.outputs)
    }

    pub fn input(&self, block: BlockId, name: &str) -> CompileResult<InputRef> {
        let slot = self.slot(block)?;
        slot.inputs
            .iter()
            .position(|p| p.name == name)
            .map(|port| InputRef { block, port })
            .ok_or_else(|| CompileError::UnknownPort {
                block: slot.name.clone(),
                direction: "input",
                port: name.to_string(),
            })
    }

    pub fn output(&self, block: BlockId, name: &str) -> CompileResult<OutputRef> {
        let slot = self.slot(block)?;
        slot.outputs
            .iter()
            .position(|p| p.name == name)
            .map(|port| OutputRef { block, port })
            .ok_or_else(|| CompileError::UnknownPort {
                block: slot.name.clone(),
                direction: "output",
                port: name.to_string(),
            })
    }

    fn input_point(&self, input: InputRef) -> CompileResult<&ConnectionPoint> {
        let slot = self.slot(input.block)?;
        slot.inputs
            .get(input.port)
            .ok_or_else(|| CompileError::UnknownPort {
                block: slot.name.clone(),
                direction: "input",
                port: input.port.to_string(),
            })
    }

    fn output_point(&self, output: OutputRef) -> CompileResult<&ConnectionPoint> {
        let slot = self.slot(output.block)?;
        slot.outputs
            .get(output.port)
            .ok_or_else(|| CompileError::UnknownPort {
                block: slot.name.clone(),
                direction: "output",
                port: output.port.to_string(),
            })
    }

    pub fn input_label(&self, input: InputRef) -> String {
        match (self.slot(input.block), self.input_point(input)) {
            (Ok(slot), Ok(point)) => format!("{}.{}", slot.name, point.name),
            _ => format!("{}.in{}", input.block, input.port),
        }
    }

    pub fn output_label(&self, output: OutputRef) -> String {
        match (self.slot(output.block), self.output_point(output)) {
            (Ok(slot), Ok(point)) => format!("{}.{}", slot.name, point.name),
            _ => format!("{}.out{}", output.block, output.port),
        }
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn connected_output(&self, input: InputRef) -> Option<OutputRef> {
        self.links.iter().find(|l| l.to == input).map(|l| l.from)
    }

    pub fn endpoints(&self, output: OutputRef) -> impl Iterator<Item = InputRef> + '_ {
        self.links
            .iter()
            .filter(move |l| l.from == output)
            .map(|l| l.to)
    }

    pub fn has_endpoints(&self, output: OutputRef) -> bool {
        self.endpoints(output).next().is_some()
    }

    /// Type an output carries given the current wiring, if already known.
    pub fn current_output_type(&self, output: OutputRef) -> Option<ConnectionPointType> {
        let point = self.output_point(output).ok()?;
        match point.declared {
            ConnectionPointType::BasedOnInput => {
                let source = point.type_source?;
                self.current_input_type(InputRef {
                    block: output.block,
                    port: source,
                })
            }
            ConnectionPointType::AutoDetect => None,
            concrete => Some(concrete),
        }
    }

    pub fn current_input_type(&self, input: InputRef) -> Option<ConnectionPointType> {
        let point = self.input_point(input).ok()?;
        if !point.declared.is_deferred() {
            return Some(point.declared);
        }
        self.connected_output(input)
            .and_then(|upstream| self.current_output_type(upstream))
    }

    pub fn connect(&mut self, from: OutputRef, to: InputRef) -> CompileResult<()> {
        self.output_point(from)?;
        let target = self.input_point(to)?;

        if self.connected_output(to).is_some() {
            return Err(CompileError::InputAlreadyConnected {
                point: self.input_label(to),
            });
        }

        if from.block == to.block || upstream_reachable(self, from.block).contains(&to.block) {
            return Err(CompileError::Cycle(format!(
                "{} -> {}",
                self.output_label(from),
                self.input_label(to)
            )));
        }

        if let Some(ty) = self.current_output_type(from) {
            if !target.accepts(ty) {
                let reason = if target.excluded.contains(&ty) {
                    format!("{ty} is excluded")
                } else {
                    format!("{ty} does not match {}", target.declared)
                };
                return Err(CompileError::IncompatibleType {
                    from: self.output_label(from),
                    to: self.input_label(to),
                    reason,
                });
            }
            self.check_forwarded_type(from, to, ty)?;
        }

        self.links.push(Link { from, to });
        Ok(())
    }

    /// Follows `ty` from `input` through the `BasedOnInput` outputs that copy
    /// it and checks every input it would end up in.
    fn check_forwarded_type(
        &self,
        from: OutputRef,
        input: InputRef,
        ty: ConnectionPointType,
    ) -> CompileResult<()> {
        let mut pending = vec![input];
        while let Some(input) = pending.pop() {
            if !self.input_point(input)?.declared.is_deferred() {
                continue;
            }
            for (port, point) in self.outputs(input.block)?.iter().enumerate() {
                if point.declared != ConnectionPointType::BasedOnInput
                    || point.type_source != Some(input.port)
                {
                    continue;
                }
                let forwarded = OutputRef {
                    block: input.block,
                    port,
                };
                for downstream in self.endpoints(forwarded) {
                    let target = self.input_point(downstream)?;
                    if !target.accepts(ty) {
                        let reason = if target.excluded.contains(&ty) {
                            format!("{ty} is excluded (via {})", self.output_label(forwarded))
                        } else {
                            format!(
                                "{ty} does not match {} (via {})",
                                target.declared,
                                self.output_label(forwarded)
                            )
                        };
                        return Err(CompileError::IncompatibleType {
                            from: self.output_label(from),
                            to: self.input_label(downstream),
                            reason,
                        });
                    }
                    pending.push(downstream);
                }
            }
        }
        Ok(())
    }

    /// Connects ports by name.
    pub fn connect_named(
        &mut self,
        from: BlockId,
        from_port: &str,
        to: BlockId,
        to_port: &str,
    ) -> CompileResult<()> {
        let out = self.output(from, from_port)?;
        let input = self.input(to, to_port)?;
        self.connect(out, input)
    }

    pub fn disconnect(&mut self, input: InputRef) -> Option<Link> {
        let index = self.links.iter().position(|l| l.to == input)?;
        Some(self.links.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::blocks::{ClampBlock, ImageProcessingBlock, InputBlock, WaveBlock};
    use crate::compiler::blocks::input::{AttributeKind, SystemValue};

    #[test]
    fn connect_rejects_cycles() {
        let mut graph = NodeGraph::new();
        let a = graph.add_block("a", ClampBlock::default());
        let b = graph.add_block("b", ClampBlock::default());
        let time = graph.add_block("time", InputBlock::system(SystemValue::Time));
        graph.connect_named(time, "output", a, "value").unwrap();
        graph.connect_named(a, "output", b, "value").unwrap();

        let c = graph.add_block("c", ClampBlock::default());
        graph.connect_named(b, "output", c, "value").unwrap();
        let removed = graph.disconnect(graph.input(a, "value").unwrap());
        assert!(removed.is_some());
        let cycle = graph.connect_named(c, "output", a, "value").unwrap_err();
        assert!(matches!(cycle, CompileError::Cycle(_)));
        assert_eq!(graph.links().len(), 2);
    }

    #[test]
    fn second_upstream_is_rejected() {
        let mut graph = NodeGraph::new();
        let t1 = graph.add_block("t1", InputBlock::system(SystemValue::Time));
        let t2 = graph.add_block("t2", InputBlock::system(SystemValue::Time));
        let clamp = graph.add_block("clamp", ClampBlock::default());
        graph.connect_named(t1, "output", clamp, "value").unwrap();
        let err = graph.connect_named(t2, "output", clamp, "value").unwrap_err();
        assert!(matches!(err, CompileError::InputAlreadyConnected { .. }));
    }

    #[test]
    fn excluded_types_fail_at_connect_time() {
        let mut graph = NodeGraph::new();
        let world = graph.add_block("world", InputBlock::system(SystemValue::World));
        let clamp = graph.add_block("clamp", ClampBlock::default());
        let err = graph.connect_named(world, "output", clamp, "value").unwrap_err();
        assert!(matches!(err, CompileError::IncompatibleType { .. }));
        assert!(graph.links().is_empty());
    }

    #[test]
    fn excluded_types_are_caught_through_forwarding_blocks() {
        let mut graph = NodeGraph::new();
        let uv = graph.add_block("uv", InputBlock::attribute(AttributeKind::Uv));
        let wave = graph.add_block("wave", WaveBlock::default());
        let clamp = graph.add_block("clamp", ClampBlock::default());
        let ip = graph.add_block("ip", ImageProcessingBlock::default());
        // types are still open, so the chain connects
        graph.connect_named(wave, "output", clamp, "value").unwrap();
        graph.connect_named(clamp, "output", ip, "color").unwrap();

        let err = graph.connect_named(uv, "output", wave, "input").unwrap_err();
        match err {
            CompileError::IncompatibleType { from, to, .. } => {
                assert_eq!(from, "uv.output");
                assert_eq!(to, "ip.color");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(graph.links().len(), 2);

        let color = graph.add_block("color", InputBlock::attribute(AttributeKind::Color));
        graph.connect_named(color, "output", wave, "input").unwrap();
    }

    #[test]
    fn based_on_input_types_follow_the_wiring() {
        let mut graph = NodeGraph::new();
        let uv = graph.add_block("uv", InputBlock::attribute(AttributeKind::Uv));
        let wave = graph.add_block("wave", WaveBlock::default());
        let clamp = graph.add_block("clamp", ClampBlock::default());
        graph.connect_named(uv, "output", wave, "input").unwrap();
        graph.connect_named(wave, "output", clamp, "value").unwrap();
        let out = graph.output(clamp, "output").unwrap();
        assert_eq!(
            graph.current_output_type(out),
            Some(ConnectionPointType::Vector2)
        );
    }

    #[test]
    fn unknown_port_names_are_reported() {
        let mut graph = NodeGraph::new();
        let clamp = graph.add_block("clamp", ClampBlock::default());
        let err = graph.input(clamp, "nope").unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownPort {
                block: "clamp".to_string(),
                direction: "input",
                port: "nope".to_string(),
            }
        );
    }
}
