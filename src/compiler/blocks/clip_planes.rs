//! User clip planes: distances computed per vertex, fragments discarded.

use std::any::Any;

use anyhow::Result;

use crate::compiler::block::{
    BindScope, Bindable, Block, BlockIo, Buildable, DefineContributor, SerializableBlock,
};
use crate::compiler::build_state::{BuildState, InitState};
use crate::compiler::connection::PortRegistrar;
use crate::compiler::error::CompileResult;
use crate::compiler::templates::Replacement;
use crate::compiler::types::{BlockTarget, ConnectionPointType, ShaderStage};
use crate::dsl::{BlockRecord, DeserializeContext};
use crate::runtime::defines::MaterialDefines;
use crate::runtime::effect::{BindPhase, Effect};
use crate::runtime::settings::{DrawContext, MAX_CLIP_PLANES};

/// `""` for the first plane, then `"2"` to `"6"`.
fn suffix(index: usize) -> String {
    if index == 0 {
        String::new()
    } else {
        (index + 1).to_string()
    }
}

pub fn plane_uniform(index: usize) -> String {
    format!("vClipPlane{}", suffix(index))
}

pub fn distance_varying(index: usize) -> String {
    format!("fClipDistance{}", suffix(index))
}

pub fn plane_define(index: usize) -> String {
    format!("CLIPPLANE{}", suffix(index))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClipPlanesBlock;

impl ClipPlanesBlock {
    pub fn from_record(_record: &BlockRecord, _ctx: &DeserializeContext) -> Result<Box<dyn Block>> {
        Ok(Box::new(Self))
    }

    fn build_vertex(&self, state: &mut BuildState<'_>, io: &BlockIo) -> CompileResult<()> {
        let world_pos = io.input(0)?.variable()?.to_string();
        for index in 0..MAX_CLIP_PLANES {
            state.declare_uniform(&plane_uniform(index), ConnectionPointType::Vector4)?;
            state.declare_varying(&distance_varying(index), ConnectionPointType::Float)?;
        }
        // Uniforms come from the declarations above, not from the include.
        let strip = Replacement::new(r"uniform vec4 vClipPlane\d*;\n?", "")?;
        state.emit_function_from_include("clipPlaneVertexDeclaration", "Clip planes", &[strip])?;
        let code = state.emit_code_from_include(
            "clipPlaneVertex",
            "",
            &[Replacement::word("worldPos", world_pos)?],
        )?;
        state.push_code(&code);
        Ok(())
    }

    fn build_fragment(&self, state: &mut BuildState<'_>) -> CompileResult<()> {
        state.register_for_defines()?;
        state.register_for_binding()?;
        state.emit_function_from_include("clipPlaneFragmentDeclaration", "Clip planes", &[])?;
        let code = state.emit_code_from_include("clipPlaneFragment", "", &[])?;
        state.push_code(&code);
        Ok(())
    }
}

impl Buildable for ClipPlanesBlock {
    fn class_name(&self) -> &'static str {
        "ClipPlanesBlock"
    }

    fn target(&self) -> BlockTarget {
        BlockTarget::VertexAndFragment
    }

    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports
            .register_input("worldPosition", ConnectionPointType::Vector4)
            .stage(ShaderStage::Vertex);
    }

    fn initialize(&self, state: &mut InitState<'_>) -> CompileResult<()> {
        for index in 0..MAX_CLIP_PLANES {
            state.exclude_variable_name(&plane_uniform(index));
            state.exclude_variable_name(&distance_varying(index));
        }
        Ok(())
    }

    fn build(&self, state: &mut BuildState<'_>, io: &BlockIo) -> CompileResult<()> {
        match state.target() {
            ShaderStage::Vertex => self.build_vertex(state, io),
            ShaderStage::Fragment => self.build_fragment(state),
        }
    }
}

impl SerializableBlock for ClipPlanesBlock {}

impl DefineContributor for ClipPlanesBlock {
    fn prepare_defines(&self, draw: &DrawContext, defines: &mut MaterialDefines) {
        for index in 0..MAX_CLIP_PLANES {
            defines.set_value(&plane_define(index), draw.clip_plane(index).is_some(), true);
        }
    }
}

impl Bindable for ClipPlanesBlock {
    fn bind(&self, phase: BindPhase, scope: &BindScope<'_>, effect: &mut dyn Effect) {
        if phase != BindPhase::Values || scope.draw.mesh.is_none() {
            return;
        }
        for index in 0..MAX_CLIP_PLANES {
            if let Some(plane) = scope.draw.clip_plane(index) {
                let [x, y, z, w] = plane.as_vec4();
                effect.set_float4(&plane_uniform(index), x, y, z, w);
            }
        }
    }
}

impl Block for ClipPlanesBlock {
    fn as_bindable(&self) -> Option<&dyn Bindable> {
        Some(self)
    }

    fn as_define_contributor(&self) -> Option<&dyn DefineContributor> {
        Some(self)
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
    use crate::runtime::effect::{ProgramUniforms, UniformValue};
    use crate::runtime::settings::{MeshContext, Plane};

    #[test]
    fn names_follow_the_plane_index() {
        assert_eq!(plane_uniform(0), "vClipPlane");
        assert_eq!(plane_uniform(5), "vClipPlane6");
        assert_eq!(distance_varying(1), "fClipDistance2");
        assert_eq!(plane_define(2), "CLIPPLANE3");
    }

    #[test]
    fn defines_track_active_planes() {
        let mut draw = DrawContext::default();
        draw.scene.clip_planes.set(0, Some(Plane::new([0.0, 1.0, 0.0], 0.0)));
        draw.material.clip_planes.set(3, Some(Plane::new([1.0, 0.0, 0.0], 1.0)));
        let mut defines = MaterialDefines::new();
        ClipPlanesBlock.prepare_defines(&draw, &mut defines);
        assert!(defines.is_enabled("CLIPPLANE"));
        assert!(!defines.is_enabled("CLIPPLANE2"));
        assert!(defines.is_enabled("CLIPPLANE4"));
        assert!(defines.take_changed());
    }

    #[test]
    fn bind_needs_a_mesh() {
        let mut draw = DrawContext::default();
        draw.scene.clip_planes.set(1, Some(Plane::new([0.0, 0.0, 1.0], -2.0)));
        let mut effect = ProgramUniforms::new();
        let scope = BindScope {
            block_name: "clip",
            uniform: None,
            draw: &draw,
        };
        ClipPlanesBlock.bind(BindPhase::Values, &scope, &mut effect);
        assert!(effect.calls().is_empty());

        draw.mesh = Some(MeshContext::default());
        let scope = BindScope {
            block_name: "clip",
            uniform: None,
            draw: &draw,
        };
        ClipPlanesBlock.bind(BindPhase::Values, &scope, &mut effect);
        assert_eq!(effect.calls(), ["vClipPlane2".to_string()]);
        assert_eq!(
            effect.get("vClipPlane2"),
            Some(UniformValue::Vec4([0.0, 0.0, 1.0, -2.0]))
        );
    }
}
