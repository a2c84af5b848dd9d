//! Capability traits implemented by material blocks.
//!
//! A block implements [`Buildable`] and [`SerializableBlock`]; the optional
//! runtime capabilities are reached through the `as_*` accessors on [`Block`],
//! so the compiler and the material only dispatch on what a block declares.

use std::any::Any;
use std::fmt;

use serde_json::{Map, Value};

use super::build_state::{BuildState, InitState};
use super::connection::{BlockId, PortRegistrar};
use super::error::{CompileError, CompileResult};
use super::types::{BlockTarget, ConnectionPointType, ShaderStage};
use crate::runtime::defines::MaterialDefines;
use crate::runtime::effect::{BindPhase, Effect};
use crate::runtime::settings::DrawContext;
use crate::schema::PropertyDescriptor;

pub trait Buildable {
    /// Class name without the registry prefix, e.g. `ClampBlock`.
    fn class_name(&self) -> &'static str;

    fn target(&self) -> BlockTarget;

    /// Declares inputs and outputs. Called once when the block joins a graph.
    fn register_ports(&self, ports: &mut PortRegistrar);

    /// Stage this block terminates, if it is a stage output.
    fn terminal_stage(&self) -> Option<ShaderStage> {
        None
    }

    /// Reserves identifiers before any block of the compile is built.
    fn initialize(&self, _state: &mut InitState<'_>) -> CompileResult<()> {
        Ok(())
    }

    /// Emits code for `state.target()`.
    fn build(&self, state: &mut BuildState<'_>, io: &BlockIo) -> CompileResult<()>;
}

pub trait SerializableBlock {
    /// Authoring properties written next to `customType` and `name`.
    fn serialize_fields(&self) -> Map<String, Value> {
        Map::new()
    }
}

pub trait Block: Buildable + SerializableBlock + Send + Sync + fmt::Debug {
    fn properties(&self) -> &'static [PropertyDescriptor] {
        &[]
    }

    fn as_bindable(&self) -> Option<&dyn Bindable> {
        None
    }

    fn as_define_contributor(&self) -> Option<&dyn DefineContributor> {
        None
    }

    fn as_readiness_check(&self) -> Option<&dyn ReadinessCheck> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// What a bindable block sees during a draw.
pub struct BindScope<'a> {
    pub block_name: &'a str,
    /// Uniform the compile allocated for this block, if any.
    pub uniform: Option<&'a str>,
    pub draw: &'a DrawContext,
}

pub trait Bindable {
    fn bind(&self, phase: BindPhase, scope: &BindScope<'_>, effect: &mut dyn Effect);
}

pub trait DefineContributor {
    fn prepare_defines(&self, draw: &DrawContext, defines: &mut MaterialDefines);
}

pub trait ReadinessCheck {
    fn is_ready(&self, draw: &DrawContext, defines: &MaterialDefines) -> bool;
}

/// Resolved view of one block's ports for the stage being built.
#[derive(Debug, Clone)]
pub struct BlockIo {
    pub block: BlockId,
    pub name: String,
    pub inputs: Vec<InputIo>,
    pub outputs: Vec<OutputIo>,
}

impl BlockIo {
    pub fn input(&self, index: usize) -> CompileResult<&InputIo> {
        self.inputs.get(index).ok_or_else(|| CompileError::UnknownPort {
            block: self.name.clone(),
            direction: "input",
            port: index.to_string(),
        })
    }

    pub fn output(&self, index: usize) -> CompileResult<&OutputIo> {
        self.outputs.get(index).ok_or_else(|| CompileError::UnknownPort {
            block: self.name.clone(),
            direction: "output",
            port: index.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct InputIo {
    pub name: String,
    /// `block.port`, used in error messages.
    pub label: String,
    pub ty: Option<ConnectionPointType>,
    pub variable: Option<String>,
}

impl InputIo {
    pub fn is_connected(&self) -> bool {
        self.variable.is_some()
    }

    pub fn variable(&self) -> CompileResult<&str> {
        self.variable
            .as_deref()
            .ok_or_else(|| CompileError::MissingConnection {
                point: self.label.clone(),
            })
    }

    pub fn resolved_type(&self) -> CompileResult<ConnectionPointType> {
        self.ty.ok_or_else(|| CompileError::TypeResolution {
            point: self.label.clone(),
            reason: "type is still unresolved".to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct OutputIo {
    pub port: usize,
    pub name: String,
    pub label: String,
    pub ty: Option<ConnectionPointType>,
    pub has_endpoints: bool,
}

impl OutputIo {
    pub fn resolved_type(&self) -> CompileResult<ConnectionPointType> {
        self.ty.ok_or_else(|| CompileError::TypeResolution {
            point: self.label.clone(),
            reason: "type is still unresolved".to_string(),
        })
    }
}
