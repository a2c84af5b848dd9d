use std::any::Any;

use anyhow::Result;
use serde_json::{Map, Value, json};

use crate::compiler::block::{Block, BlockIo, Buildable, SerializableBlock};
use crate::compiler::build_state::BuildState;
use crate::compiler::connection::PortRegistrar;
use crate::compiler::error::CompileResult;
use crate::compiler::types::{BlockTarget, ConnectionPointType};
use crate::compiler::utils::write_float;
use crate::dsl::{BlockRecord, DeserializeContext, parse_f32};
use crate::schema::{PropertyDescriptor, PropertyKind};

const PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor {
        name: "complementZ",
        label: "Complement Z",
        kind: PropertyKind::Float,
        group: "PROPERTIES",
    },
    PropertyDescriptor {
        name: "complementW",
        label: "Complement W",
        kind: PropertyKind::Float,
        group: "PROPERTIES",
    },
];

/// Multiplies a vector by a matrix, padding it to four components.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformBlock {
    pub complement_w: f32,
    pub complement_z: f32,
}

impl Default for TransformBlock {
    fn default() -> Self {
        Self {
            complement_w: 1.0,
            complement_z: 0.0,
        }
    }
}

impl TransformBlock {
    pub fn from_record(record: &BlockRecord, _ctx: &DeserializeContext) -> Result<Box<dyn Block>> {
        let defaults = Self::default();
        Ok(Box::new(Self {
            complement_w: parse_f32(&record.params, "complementW").unwrap_or(defaults.complement_w),
            complement_z: parse_f32(&record.params, "complementZ").unwrap_or(defaults.complement_z),
        }))
    }
}

impl Buildable for TransformBlock {
    fn class_name(&self) -> &'static str {
        "TransformBlock"
    }

    fn target(&self) -> BlockTarget {
        BlockTarget::Neutral
    }

    fn register_ports(&self, ports: &mut PortRegistrar) {
        use ConnectionPointType::*;
        ports
            .register_input("vector", AutoDetect)
            .allow_only(&[Vector2, Vector3, Vector4, Color3, Color4]);
        ports.register_input("transform", Matrix);
        ports.register_output("output", Vector4);
        ports.register_output("xyz", Vector3);
    }

    fn build(&self, state: &mut BuildState<'_>, io: &BlockIo) -> CompileResult<()> {
        let vector = io.input(0)?;
        let v = vector.variable()?;
        let m = io.input(1)?.variable()?;

        let output = state.declare_output(io.output(0)?)?;
        let padded = match vector.resolved_type()? {
            ConnectionPointType::Vector2 => format!(
                "vec4({v}, {}, {})",
                write_float(self.complement_z),
                write_float(self.complement_w)
            ),
            ConnectionPointType::Vector3 | ConnectionPointType::Color3 => {
                format!("vec4({v}, {})", write_float(self.complement_w))
            }
            _ => v.to_string(),
        };
        state.push_code(&format!("{output} = {m} * {padded};\n"));

        let xyz = io.output(1)?;
        if xyz.has_endpoints {
            let decl = state.declare_output(xyz)?;
            state.push_code(&format!("{decl} = {}.xyz;\n", output.name));
        }
        Ok(())
    }
}

impl SerializableBlock for TransformBlock {
    fn serialize_fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("complementZ".into(), json!(self.complement_z));
        map.insert("complementW".into(), json!(self.complement_w));
        map
    }
}

impl Block for TransformBlock {
    fn properties(&self) -> &'static [PropertyDescriptor] {
        PROPERTIES
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::blocks::input::{AttributeKind, SystemValue};
    use crate::compiler::blocks::{FragmentOutputBlock, InputBlock, VertexOutputBlock};
    use crate::compiler::{BlockId, NodeGraph, compile_graph};
    use crate::config::CompileOptions;

    fn uv_graph(transform: TransformBlock) -> (NodeGraph, BlockId) {
        let mut graph = NodeGraph::new();
        let uv = graph.add_block("uv", InputBlock::attribute(AttributeKind::Uv));
        let vp = graph.add_block("viewProjection", InputBlock::system(SystemValue::ViewProjection));
        let t = graph.add_block("clipPos", transform);
        let out = graph.add_block("vertexOutput", VertexOutputBlock);
        graph.connect_named(uv, "output", t, "vector").unwrap();
        graph.connect_named(vp, "output", t, "transform").unwrap();
        graph.connect_named(t, "output", out, "vector").unwrap();
        (graph, t)
    }

    #[test]
    fn two_component_vectors_take_both_complements() {
        let (mut graph, _) = uv_graph(TransformBlock {
            complement_w: 1.0,
            complement_z: 0.5,
        });
        let color = graph.add_block("color", InputBlock::attribute(AttributeKind::Color));
        let frag = graph.add_block("fragmentOutput", FragmentOutputBlock::default());
        graph.connect_named(color, "output", frag, "rgba").unwrap();

        let shader = compile_graph(&graph, &CompileOptions::default()).unwrap();
        assert!(
            shader
                .vertex
                .contains("vec4 clipPos_output = viewProjection * vec4(uv, 0.5, 1.0);")
        );
        assert!(!shader.vertex.contains("clipPos_xyz"));
    }

    #[test]
    fn xyz_is_only_emitted_when_read() {
        let (mut graph, t) = uv_graph(TransformBlock::default());
        let frag = graph.add_block("fragmentOutput", FragmentOutputBlock::default());
        graph.connect_named(t, "xyz", frag, "rgb").unwrap();

        // Built in both stages; the fragment copy gets fresh names.
        let shader = compile_graph(&graph, &CompileOptions::default()).unwrap();
        assert!(shader.vertex.contains("vec3 clipPos_xyz = clipPos_output.xyz;"));
        assert!(shader.fragment.contains("vec3 clipPos_xyz1 = clipPos_output1.xyz;"));
        assert!(shader.fragment.contains("glFragColor = vec4(clipPos_xyz1, 1.0);"));
    }

    #[test]
    fn matrices_cannot_be_transformed() {
        let mut graph = NodeGraph::new();
        let world = graph.add_block("world", InputBlock::system(SystemValue::World));
        let t = graph.add_block("t", TransformBlock::default());
        assert!(graph.connect_named(world, "output", t, "vector").is_err());
        assert!(graph.links().is_empty());
    }

    #[test]
    fn record_fields() {
        let fields = TransformBlock::default().serialize_fields();
        assert_eq!(fields.get("complementW").and_then(Value::as_f64), Some(1.0));
        assert_eq!(fields.get("complementZ").and_then(Value::as_f64), Some(0.0));
    }
}
