use std::any::Any;

use anyhow::Result;
use serde_json::{Map, Value, json};

use crate::compiler::block::{
    BindScope, Bindable, Block, BlockIo, Buildable, DefineContributor, ReadinessCheck,
    SerializableBlock,
};
use crate::compiler::build_state::{BuildState, InitState};
use crate::compiler::connection::PortRegistrar;
use crate::compiler::error::CompileResult;
use crate::compiler::types::{BlockTarget, ConnectionPointType};
use crate::dsl::{BlockRecord, DeserializeContext, parse_bool};
use crate::runtime::defines::MaterialDefines;
use crate::runtime::effect::{BindPhase, Effect};
use crate::runtime::settings::DrawContext;
use crate::schema::{PropertyDescriptor, PropertyKind};

/// Uniforms read by the image-processing functions.
pub const UNIFORMS: [(&str, ConnectionPointType); 10] = [
    ("exposureLinear", ConnectionPointType::Float),
    ("contrast", ConnectionPointType::Float),
    ("vInverseScreenSize", ConnectionPointType::Vector2),
    ("vignetteSettings1", ConnectionPointType::Vector4),
    ("vignetteSettings2", ConnectionPointType::Vector4),
    ("vCameraColorCurveNegative", ConnectionPointType::Vector4),
    ("vCameraColorCurveNeutral", ConnectionPointType::Vector4),
    ("vCameraColorCurvePositive", ConnectionPointType::Vector4),
    ("colorTransformSettings", ConnectionPointType::Vector4),
    ("ditherIntensity", ConnectionPointType::Float),
];

pub const COLOR_TRANSFORM_SAMPLER: &str = "txColorTransform";

const PROPERTIES: &[PropertyDescriptor] = &[PropertyDescriptor {
    name: "convertInputToLinearSpace",
    label: "Convert input to linear space",
    kind: PropertyKind::Boolean,
    group: "ADVANCED",
}];

/// Applies the material's image-processing configuration to a color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageProcessingBlock {
    pub convert_input_to_linear_space: bool,
}

impl Default for ImageProcessingBlock {
    fn default() -> Self {
        Self {
            convert_input_to_linear_space: true,
        }
    }
}

impl ImageProcessingBlock {
    pub fn from_record(record: &BlockRecord, _ctx: &DeserializeContext) -> Result<Box<dyn Block>> {
        Ok(Box::new(Self {
            convert_input_to_linear_space: parse_bool(&record.params, "convertInputToLinearSpace")
                .unwrap_or(true),
        }))
    }
}

impl Buildable for ImageProcessingBlock {
    fn class_name(&self) -> &'static str {
        "ImageProcessingBlock"
    }

    fn target(&self) -> BlockTarget {
        BlockTarget::Fragment
    }

    fn register_ports(&self, ports: &mut PortRegistrar) {
        use ConnectionPointType::*;
        ports
            .register_input("color", AutoDetect)
            .allow_only(&[Color3, Color4, Vector3, Vector4])
            .optional();
        ports.register_output("output", Color4);
        ports.register_output("rgb", Color3);
    }

    fn initialize(&self, state: &mut InitState<'_>) -> CompileResult<()> {
        for (name, _) in UNIFORMS {
            state.exclude_variable_name(name);
        }
        state.exclude_variable_name(COLOR_TRANSFORM_SAMPLER);
        Ok(())
    }

    fn build(&self, state: &mut BuildState<'_>, io: &BlockIo) -> CompileResult<()> {
        for (name, ty) in UNIFORMS {
            state.declare_uniform(name, ty)?;
        }
        state.declare_sampler(COLOR_TRANSFORM_SAMPLER, Some("COLORGRADING"))?;

        state.register_for_defines()?;
        state.register_for_binding()?;
        state.register_as_blocking()?;

        state.emit_function_from_include("helperFunctions", "Helper functions", &[])?;
        state.emit_function_from_include(
            "imageProcessingDeclaration",
            "Image processing declaration",
            &[],
        )?;
        state.emit_function_from_include(
            "imageProcessingFunctions",
            "Image processing functions",
            &[],
        )?;

        let color = io.input(0)?;
        let Some(input) = color.variable.as_deref() else {
            return Ok(());
        };

        let decl = state.declare_output(io.output(0)?)?;
        let out = decl.name.clone();
        if color.resolved_type()?.has_four_components() {
            state.push_code(&format!("{decl} = {input};\n"));
        } else {
            state.push_code(&format!("{decl} = vec4({input}, 1.0);\n"));
        }

        let to_linear = format!("{out} = vec4(toLinearSpace({out}.rgb), {out}.a);\n");
        let mut code = String::from("#ifdef IMAGEPROCESSINGPOSTPROCESS\n");
        if self.convert_input_to_linear_space {
            code.push_str(&to_linear);
        }
        code.push_str("#else\n#ifdef IMAGEPROCESSING\n");
        if self.convert_input_to_linear_space {
            code.push_str(&to_linear);
        }
        code.push_str(&format!("{out} = applyImageProcessing({out});\n"));
        code.push_str("#endif\n#endif\n");
        state.push_code(&code);

        let rgb = io.output(1)?;
        if rgb.has_endpoints {
            let rgb_decl = state.declare_output(rgb)?;
            state.push_code(&format!("{rgb_decl} = {out}.xyz;\n"));
        }
        Ok(())
    }
}

impl SerializableBlock for ImageProcessingBlock {
    fn serialize_fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(
            "convertInputToLinearSpace".into(),
            json!(self.convert_input_to_linear_space),
        );
        map
    }
}

impl DefineContributor for ImageProcessingBlock {
    fn prepare_defines(&self, draw: &DrawContext, defines: &mut MaterialDefines) {
        if !defines.is_image_processing_dirty() {
            return;
        }
        if let Some(config) = draw.image_processing() {
            config.prepare_defines(defines);
        }
    }
}

impl ReadinessCheck for ImageProcessingBlock {
    fn is_ready(&self, draw: &DrawContext, defines: &MaterialDefines) -> bool {
        match draw.image_processing() {
            Some(config) if defines.is_image_processing_dirty() => config.is_ready(),
            _ => true,
        }
    }
}

impl Bindable for ImageProcessingBlock {
    fn bind(&self, phase: BindPhase, scope: &BindScope<'_>, effect: &mut dyn Effect) {
        if scope.draw.mesh.is_none() {
            return;
        }
        let Some(config) = scope.draw.image_processing() else {
            return;
        };
        match phase {
            BindPhase::Textures => config.bind_textures(effect),
            BindPhase::Values => config.bind_values(effect, scope.draw.scene.render_size),
        }
    }
}

impl Block for ImageProcessingBlock {
    fn properties(&self) -> &'static [PropertyDescriptor] {
        PROPERTIES
    }

    fn as_bindable(&self) -> Option<&dyn Bindable> {
        Some(self)
    }

    fn as_define_contributor(&self) -> Option<&dyn DefineContributor> {
        Some(self)
    }

    fn as_readiness_check(&self) -> Option<&dyn ReadinessCheck> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
