//! Graph inputs: mesh attributes, authored uniforms, constants and the
//! values the scene supplies every frame.

use std::any::Any;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::compiler::block::{BindScope, Bindable, Block, BlockIo, Buildable, SerializableBlock};
use crate::compiler::build_state::BuildState;
use crate::compiler::connection::PortRegistrar;
use crate::compiler::error::{CompileError, CompileResult};
use crate::compiler::types::{BlockTarget, ConnectionPointType};
use crate::compiler::utils::{sanitize_glsl_ident, write_float};
use crate::dsl::{BlockRecord, DeserializeContext};
use crate::runtime::effect::{BindPhase, Effect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeKind {
    Position,
    Normal,
    Uv,
    Color,
}

impl AttributeKind {
    pub fn attribute_name(self) -> &'static str {
        match self {
            AttributeKind::Position => "position",
            AttributeKind::Normal => "normal",
            AttributeKind::Uv => "uv",
            AttributeKind::Color => "color",
        }
    }

    pub fn ty(self) -> ConnectionPointType {
        match self {
            AttributeKind::Position | AttributeKind::Normal => ConnectionPointType::Vector3,
            AttributeKind::Uv => ConnectionPointType::Vector2,
            AttributeKind::Color => ConnectionPointType::Color4,
        }
    }
}

/// Per-frame values provided by the scene, mesh or camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SystemValue {
    World,
    ViewProjection,
    CameraPosition,
    Time,
}

impl SystemValue {
    pub fn uniform_name(self) -> &'static str {
        match self {
            SystemValue::World => "world",
            SystemValue::ViewProjection => "viewProjection",
            SystemValue::CameraPosition => "cameraPosition",
            SystemValue::Time => "time",
        }
    }

    pub fn ty(self) -> ConnectionPointType {
        match self {
            SystemValue::World | SystemValue::ViewProjection => ConnectionPointType::Matrix,
            SystemValue::CameraPosition => ConnectionPointType::Vector3,
            SystemValue::Time => ConnectionPointType::Float,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum InputValue {
    Float(f32),
    Int(i32),
    Vector2([f32; 2]),
    Vector3([f32; 3]),
    Vector4([f32; 4]),
    Color3([f32; 3]),
    Color4([f32; 4]),
    Matrix([f32; 16]),
}

fn float_list(values: &[f32]) -> String {
    values
        .iter()
        .map(|v| write_float(*v))
        .collect::<Vec<_>>()
        .join(", ")
}

impl InputValue {
    pub fn ty(&self) -> ConnectionPointType {
        match self {
            InputValue::Float(_) => ConnectionPointType::Float,
            InputValue::Int(_) => ConnectionPointType::Int,
            InputValue::Vector2(_) => ConnectionPointType::Vector2,
            InputValue::Vector3(_) => ConnectionPointType::Vector3,
            InputValue::Vector4(_) => ConnectionPointType::Vector4,
            InputValue::Color3(_) => ConnectionPointType::Color3,
            InputValue::Color4(_) => ConnectionPointType::Color4,
            InputValue::Matrix(_) => ConnectionPointType::Matrix,
        }
    }

    /// GLSL literal of the value.
    pub fn literal(&self) -> String {
        match self {
            InputValue::Float(v) => write_float(*v),
            InputValue::Int(v) => v.to_string(),
            InputValue::Vector2(v) => format!("vec2({})", float_list(v)),
            InputValue::Vector3(v) | InputValue::Color3(v) => format!("vec3({})", float_list(v)),
            InputValue::Vector4(v) | InputValue::Color4(v) => format!("vec4({})", float_list(v)),
            InputValue::Matrix(v) => format!("mat4({})", float_list(v)),
        }
    }

    fn push(&self, name: &str, effect: &mut dyn Effect) {
        match *self {
            InputValue::Float(v) => effect.set_float(name, v),
            InputValue::Int(v) => effect.set_int(name, v),
            InputValue::Vector2([x, y]) => effect.set_float2(name, x, y),
            InputValue::Vector3([x, y, z]) => effect.set_float3(name, x, y, z),
            InputValue::Color3(c) => effect.set_color3(name, c),
            InputValue::Vector4([x, y, z, w]) | InputValue::Color4([x, y, z, w]) => {
                effect.set_float4(name, x, y, z, w)
            }
            InputValue::Matrix(m) => effect.set_matrix(name, m),
        }
    }
}

/// Where an input block takes its value from. Serialized flat into the
/// block record, tagged by `mode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum InputMode {
    Attribute { attribute: AttributeKind },
    Uniform { value: InputValue },
    Constant { value: InputValue },
    System { system: SystemValue },
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputBlock {
    mode: InputMode,
}

impl InputBlock {
    pub fn new(mode: InputMode) -> Self {
        Self { mode }
    }

    pub fn attribute(attribute: AttributeKind) -> Self {
        Self::new(InputMode::Attribute { attribute })
    }

    pub fn system(system: SystemValue) -> Self {
        Self::new(InputMode::System { system })
    }

    pub fn uniform(value: InputValue) -> Self {
        Self::new(InputMode::Uniform { value })
    }

    pub fn constant(value: InputValue) -> Self {
        Self::new(InputMode::Constant { value })
    }

    pub fn mode(&self) -> &InputMode {
        &self.mode
    }

    pub fn output_type(&self) -> ConnectionPointType {
        match &self.mode {
            InputMode::Attribute { attribute } => attribute.ty(),
            InputMode::Uniform { value } | InputMode::Constant { value } => value.ty(),
            InputMode::System { system } => system.ty(),
        }
    }

    /// Replaces the authored value. The type is fixed once the block is in a
    /// graph, so a value of another type is rejected.
    pub fn set_value(&mut self, new_value: InputValue) -> CompileResult<()> {
        match &mut self.mode {
            InputMode::Uniform { value } | InputMode::Constant { value } => {
                if value.ty() != new_value.ty() {
                    return Err(CompileError::IncompatibleType {
                        from: new_value.ty().to_string(),
                        to: value.ty().to_string(),
                        reason: "an input keeps the type it was created with".to_string(),
                    });
                }
                *value = new_value;
                Ok(())
            }
            _ => Err(CompileError::InvalidGraph(
                "only uniform and constant inputs carry a value".to_string(),
            )),
        }
    }

    /// Preferred uniform name for an authored uniform input. The compile
    /// appends a counter when another block already holds it.
    pub fn uniform_name(block_name: &str) -> String {
        sanitize_glsl_ident(&format!("u_{block_name}"))
    }

    pub fn from_record(record: &BlockRecord, _ctx: &DeserializeContext) -> Result<Box<dyn Block>> {
        let mode: InputMode = serde_json::from_value(Value::Object(record.params.clone()))
            .with_context(|| format!("invalid input block `{}`", record.name))?;
        Ok(Box::new(Self::new(mode)))
    }
}

impl Buildable for InputBlock {
    fn class_name(&self) -> &'static str {
        "InputBlock"
    }

    fn target(&self) -> BlockTarget {
        match self.mode {
            InputMode::Attribute { .. } => BlockTarget::Vertex,
            _ => BlockTarget::Neutral,
        }
    }

    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_output("output", self.output_type());
    }

    fn build(&self, state: &mut BuildState<'_>, io: &BlockIo) -> CompileResult<()> {
        let output = io.output(0)?;
        match &self.mode {
            InputMode::Attribute { attribute } => {
                let name = attribute.attribute_name();
                state.declare_attribute(name, attribute.ty())?;
                state.alias_output(output, name)
            }
            InputMode::Uniform { value } => {
                let name = state.block_uniform_name(&Self::uniform_name(&io.name))?;
                state.declare_block_uniform(&name, value.ty())?;
                state.register_for_binding()?;
                state.alias_output(output, &name)
            }
            InputMode::Constant { value } => {
                let decl = state.declare_output(output)?;
                state.push_code(&format!("{decl} = {};\n", value.literal()));
                Ok(())
            }
            InputMode::System { system } => {
                let name = system.uniform_name();
                state.declare_uniform(name, system.ty())?;
                state.register_for_binding()?;
                state.alias_output(output, name)
            }
        }
    }
}

impl SerializableBlock for InputBlock {
    fn serialize_fields(&self) -> Map<String, Value> {
        match serde_json::to_value(&self.mode) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

impl Bindable for InputBlock {
    fn bind(&self, phase: BindPhase, scope: &BindScope<'_>, effect: &mut dyn Effect) {
        if phase != BindPhase::Values {
            return;
        }
        match &self.mode {
            InputMode::Uniform { value } => {
                if let Some(name) = scope.uniform {
                    value.push(name, effect);
                }
            }
            InputMode::System { system } => {
                let name = system.uniform_name();
                let draw = scope.draw;
                match system {
                    SystemValue::World => {
                        if let Some(mesh) = &draw.mesh {
                            effect.set_matrix(name, mesh.world);
                        }
                    }
                    SystemValue::ViewProjection => {
                        effect.set_matrix(name, draw.scene.view_projection)
                    }
                    SystemValue::CameraPosition => {
                        let [x, y, z] = draw.scene.camera_position;
                        effect.set_float3(name, x, y, z);
                    }
                    SystemValue::Time => effect.set_float(name, draw.scene.time),
                }
            }
            InputMode::Attribute { .. } | InputMode::Constant { .. } => {}
        }
    }
}

impl Block for InputBlock {
    fn as_bindable(&self) -> Option<&dyn Bindable> {
        match self.mode {
            InputMode::Uniform { .. } | InputMode::System { .. } => Some(self),
            _ => None,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
