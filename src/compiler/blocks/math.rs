//! Per-component math blocks whose output takes the type of their input.

use std::any::Any;

use anyhow::{Result, bail};
use serde_json::{Map, Value, json};

use crate::compiler::block::{Block, BlockIo, Buildable, SerializableBlock};
use crate::compiler::build_state::BuildState;
use crate::compiler::connection::PortRegistrar;
use crate::compiler::error::CompileResult;
use crate::compiler::types::{BlockTarget, ConnectionPointType};
use crate::compiler::utils::splat;
use crate::dsl::{BlockRecord, DeserializeContext, parse_f32, parse_i64};
use crate::schema::{PropertyDescriptor, PropertyKind};

const CLAMP_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor {
        name: "minimum",
        label: "Minimum",
        kind: PropertyKind::Float,
        group: "PROPERTIES",
    },
    PropertyDescriptor {
        name: "maximum",
        label: "Maximum",
        kind: PropertyKind::Float,
        group: "PROPERTIES",
    },
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampBlock {
    pub minimum: f32,
    pub maximum: f32,
}

impl Default for ClampBlock {
    fn default() -> Self {
        Self {
            minimum: 0.0,
            maximum: 1.0,
        }
    }
}

impl ClampBlock {
    pub fn new(minimum: f32, maximum: f32) -> Self {
        Self { minimum, maximum }
    }

    pub fn from_record(record: &BlockRecord, _ctx: &DeserializeContext) -> Result<Box<dyn Block>> {
        let defaults = Self::default();
        Ok(Box::new(Self {
            minimum: parse_f32(&record.params, "minimum").unwrap_or(defaults.minimum),
            maximum: parse_f32(&record.params, "maximum").unwrap_or(defaults.maximum),
        }))
    }
}

impl Buildable for ClampBlock {
    fn class_name(&self) -> &'static str {
        "ClampBlock"
    }

    fn target(&self) -> BlockTarget {
        BlockTarget::Neutral
    }

    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports
            .register_input("value", ConnectionPointType::AutoDetect)
            .exclude(&[ConnectionPointType::Matrix]);
        ports
            .register_output("output", ConnectionPointType::BasedOnInput)
            .type_source(0);
    }

    fn build(&self, state: &mut BuildState<'_>, io: &BlockIo) -> CompileResult<()> {
        let value = io.input(0)?;
        let v = value.variable()?;
        let ty = value.resolved_type()?;
        let decl = state.declare_output(io.output(0)?)?;
        state.push_code(&format!(
            "{decl} = clamp({v}, {}, {});\n",
            splat(ty, self.minimum),
            splat(ty, self.maximum)
        ));
        Ok(())
    }
}

impl SerializableBlock for ClampBlock {
    fn serialize_fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("minimum".into(), json!(self.minimum));
        map.insert("maximum".into(), json!(self.maximum));
        map
    }
}

impl Block for ClampBlock {
    fn properties(&self) -> &'static [PropertyDescriptor] {
        CLAMP_PROPERTIES
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Periodic waveform; serialized as its index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaveKind {
    #[default]
    SawTooth,
    Square,
    Triangle,
}

impl WaveKind {
    pub const NAMES: &'static [&'static str] = &["SawTooth", "Square", "Triangle"];

    pub fn index(self) -> i64 {
        match self {
            WaveKind::SawTooth => 0,
            WaveKind::Square => 1,
            WaveKind::Triangle => 2,
        }
    }

    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(WaveKind::SawTooth),
            1 => Some(WaveKind::Square),
            2 => Some(WaveKind::Triangle),
            _ => None,
        }
    }

    /// Expression of the wave at `x`, a value of type `ty`.
    pub fn expression(self, x: &str, ty: ConnectionPointType) -> String {
        let half = splat(ty, 0.5);
        let one = splat(ty, 1.0);
        match self {
            WaveKind::SawTooth => format!("{x} - floor({half} + {x})"),
            WaveKind::Square => format!("{one} - 2.0 * round(fract({x}))"),
            WaveKind::Triangle => {
                format!("2.0 * abs(2.0 * ({x} - floor({half} + {x}))) - {one}")
            }
        }
    }
}

const WAVE_PROPERTIES: &[PropertyDescriptor] = &[PropertyDescriptor {
    name: "kind",
    label: "Kind",
    kind: PropertyKind::List(WaveKind::NAMES),
    group: "ADVANCED",
}];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaveBlock {
    pub kind: WaveKind,
}

impl WaveBlock {
    pub fn new(kind: WaveKind) -> Self {
        Self { kind }
    }

    pub fn from_record(record: &BlockRecord, _ctx: &DeserializeContext) -> Result<Box<dyn Block>> {
        let kind = match parse_i64(&record.params, "kind") {
            None => WaveKind::default(),
            Some(index) => match WaveKind::from_index(index) {
                Some(kind) => kind,
                None => bail!("wave block `{}` has unknown kind {index}", record.name),
            },
        };
        Ok(Box::new(Self { kind }))
    }
}

impl Buildable for WaveBlock {
    fn class_name(&self) -> &'static str {
        "WaveBlock"
    }

    fn target(&self) -> BlockTarget {
        BlockTarget::Neutral
    }

    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports
            .register_input("input", ConnectionPointType::AutoDetect)
            .exclude(&[ConnectionPointType::Matrix]);
        ports
            .register_output("output", ConnectionPointType::BasedOnInput)
            .type_source(0);
    }

    fn build(&self, state: &mut BuildState<'_>, io: &BlockIo) -> CompileResult<()> {
        let input = io.input(0)?;
        let x = input.variable()?;
        let ty = input.resolved_type()?;
        let decl = state.declare_output(io.output(0)?)?;
        state.push_code(&format!("{decl} = {};\n", self.kind.expression(x, ty)));
        Ok(())
    }
}

impl SerializableBlock for WaveBlock {
    fn serialize_fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("kind".into(), json!(self.kind.index()));
        map
    }
}

impl Block for WaveBlock {
    fn properties(&self) -> &'static [PropertyDescriptor] {
        WAVE_PROPERTIES
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
