//! Stage terminals.

use std::any::Any;

use anyhow::Result;
use serde_json::{Map, Value, json};

use crate::compiler::block::{Block, BlockIo, Buildable, SerializableBlock};
use crate::compiler::build_state::BuildState;
use crate::compiler::connection::PortRegistrar;
use crate::compiler::error::{CompileError, CompileResult};
use crate::compiler::types::{BlockTarget, ConnectionPointType, ShaderStage};
use crate::dsl::{BlockRecord, DeserializeContext, parse_bool};
use crate::schema::{PropertyDescriptor, PropertyKind};

/// Writes `gl_Position`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VertexOutputBlock;

impl VertexOutputBlock {
    pub fn from_record(_record: &BlockRecord, _ctx: &DeserializeContext) -> Result<Box<dyn Block>> {
        Ok(Box::new(Self))
    }
}

impl Buildable for VertexOutputBlock {
    fn class_name(&self) -> &'static str {
        "VertexOutputBlock"
    }

    fn target(&self) -> BlockTarget {
        BlockTarget::Vertex
    }

    fn terminal_stage(&self) -> Option<ShaderStage> {
        Some(ShaderStage::Vertex)
    }

    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("vector", ConnectionPointType::Vector4);
    }

    fn build(&self, state: &mut BuildState<'_>, io: &BlockIo) -> CompileResult<()> {
        let vector = io.input(0)?.variable()?;
        state.push_code(&format!("gl_Position = {vector};\n"));
        Ok(())
    }
}

impl SerializableBlock for VertexOutputBlock {}

impl Block for VertexOutputBlock {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

const FRAGMENT_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor {
        name: "convertToGammaSpace",
        label: "Convert to gamma space",
        kind: PropertyKind::Boolean,
        group: "PROPERTIES",
    },
    PropertyDescriptor {
        name: "convertToLinearSpace",
        label: "Convert to linear space",
        kind: PropertyKind::Boolean,
        group: "PROPERTIES",
    },
];

/// Writes `glFragColor` from `rgba`, or from `rgb` plus an optional `a`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FragmentOutputBlock {
    pub convert_to_gamma_space: bool,
    pub convert_to_linear_space: bool,
}

impl FragmentOutputBlock {
    pub fn from_record(record: &BlockRecord, _ctx: &DeserializeContext) -> Result<Box<dyn Block>> {
        Ok(Box::new(Self {
            convert_to_gamma_space: parse_bool(&record.params, "convertToGammaSpace")
                .unwrap_or(false),
            convert_to_linear_space: parse_bool(&record.params, "convertToLinearSpace")
                .unwrap_or(false),
        }))
    }
}

impl Buildable for FragmentOutputBlock {
    fn class_name(&self) -> &'static str {
        "FragmentOutputBlock"
    }

    fn target(&self) -> BlockTarget {
        BlockTarget::Fragment
    }

    fn terminal_stage(&self) -> Option<ShaderStage> {
        Some(ShaderStage::Fragment)
    }

    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("rgba", ConnectionPointType::Color4).optional();
        ports.register_input("rgb", ConnectionPointType::Color3).optional();
        ports.register_input("a", ConnectionPointType::Float).optional();
    }

    fn build(&self, state: &mut BuildState<'_>, io: &BlockIo) -> CompileResult<()> {
        let rgba = io.input(0)?;
        let rgb = io.input(1)?;
        let a = io.input(2)?;

        if let Some(color) = rgba.variable.as_deref() {
            state.push_code(&format!("glFragColor = {color};\n"));
        } else if let Some(color) = rgb.variable.as_deref() {
            let alpha = a.variable.as_deref().unwrap_or("1.0");
            state.push_code(&format!("glFragColor = vec4({color}, {alpha});\n"));
        } else {
            return Err(CompileError::MissingConnection {
                point: rgba.label.clone(),
            });
        }

        if self.convert_to_gamma_space || self.convert_to_linear_space {
            state.emit_function_from_include("helperFunctions", "Helper functions", &[])?;
        }
        if self.convert_to_gamma_space {
            state.push_code("glFragColor = vec4(toGammaSpace(glFragColor.rgb), glFragColor.a);\n");
        }
        if self.convert_to_linear_space {
            state.push_code("glFragColor = vec4(toLinearSpace(glFragColor.rgb), glFragColor.a);\n");
        }
        Ok(())
    }
}

impl SerializableBlock for FragmentOutputBlock {
    fn serialize_fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("convertToGammaSpace".into(), json!(self.convert_to_gamma_space));
        map.insert("convertToLinearSpace".into(), json!(self.convert_to_linear_space));
        map
    }
}

impl Block for FragmentOutputBlock {
    fn properties(&self) -> &'static [PropertyDescriptor] {
        FRAGMENT_PROPERTIES
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
