//! Turns the per-stage build output into complete GLSL programs.

use std::fmt::Write as _;

use super::build_state::{SharedBuildData, StageSource};
use super::types::{ConnectionPointType, ShaderDialect, ShaderStage};

fn glsl_type(ty: ConnectionPointType) -> &'static str {
    ty.glsl().unwrap_or("float")
}

fn location_slots(ty: ConnectionPointType) -> usize {
    if ty == ConnectionPointType::Matrix { 4 } else { 1 }
}

pub(crate) fn assemble_stage(
    stage: ShaderStage,
    dialect: ShaderDialect,
    shared: &SharedBuildData,
    source: &StageSource,
) -> String {
    let mut out = String::new();

    match dialect {
        ShaderDialect::Gles300 => {
            out.push_str("#version 300 es\n");
            if stage == ShaderStage::Fragment {
                out.push_str("precision highp float;\n");
            }
        }
        ShaderDialect::Glsl450 => out.push_str("#version 450\n"),
    }
    out.push('\n');

    if stage == ShaderStage::Vertex && !shared.attributes.is_empty() {
        let mut location = 0usize;
        for attr in &shared.attributes {
            match dialect {
                ShaderDialect::Gles300 => {
                    let _ = writeln!(out, "in {} {};", glsl_type(attr.ty), attr.name);
                }
                ShaderDialect::Glsl450 => {
                    let _ = writeln!(
                        out,
                        "layout(location = {location}) in {} {};",
                        glsl_type(attr.ty),
                        attr.name
                    );
                }
            }
            location += location_slots(attr.ty);
        }
        out.push('\n');
    }

    write_uniforms(&mut out, stage, dialect, shared);
    write_samplers(&mut out, stage, dialect, shared);

    if !shared.varyings.is_empty() {
        let direction = match stage {
            ShaderStage::Vertex => "out",
            ShaderStage::Fragment => "in",
        };
        let mut location = 0usize;
        for varying in &shared.varyings {
            let flat = if varying.ty == ConnectionPointType::Int { "flat " } else { "" };
            match dialect {
                ShaderDialect::Gles300 => {
                    let _ = writeln!(
                        out,
                        "{flat}{direction} {} {};",
                        glsl_type(varying.ty),
                        varying.name
                    );
                }
                ShaderDialect::Glsl450 => {
                    let _ = writeln!(
                        out,
                        "layout(location = {location}) {flat}{direction} {} {};",
                        glsl_type(varying.ty),
                        varying.name
                    );
                }
            }
            location += location_slots(varying.ty);
        }
        out.push('\n');
    }

    if stage == ShaderStage::Fragment {
        match dialect {
            ShaderDialect::Gles300 => out.push_str("out vec4 glFragColor;\n\n"),
            ShaderDialect::Glsl450 => {
                out.push_str("layout(location = 0) out vec4 glFragColor;\n\n")
            }
        }
    }

    for (_, code) in &source.functions {
        out.push_str(code);
        if !code.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
    }

    out.push_str("void main() {\n");
    out.push_str(&source.code);
    out.push_str("}\n");
    out
}

fn write_uniforms(
    out: &mut String,
    stage: ShaderStage,
    dialect: ShaderDialect,
    shared: &SharedBuildData,
) {
    match dialect {
        ShaderDialect::Gles300 => {
            let mut any = false;
            for uniform in shared.uniforms.iter().filter(|u| u.stages.contains(&stage)) {
                let _ = writeln!(out, "uniform {} {};", glsl_type(uniform.ty), uniform.name);
                any = true;
            }
            if any {
                out.push('\n');
            }
        }
        ShaderDialect::Glsl450 => {
            // One block shared by both stages keeps the std140 layout identical.
            if shared.uniforms.is_empty() {
                return;
            }
            out.push_str("layout(std140, set = 0, binding = 0) uniform Uniforms {\n");
            for uniform in &shared.uniforms {
                let _ = writeln!(out, "    {} {};", glsl_type(uniform.ty), uniform.name);
            }
            out.push_str("};\n\n");
        }
    }
}

fn write_samplers(
    out: &mut String,
    stage: ShaderStage,
    dialect: ShaderDialect,
    shared: &SharedBuildData,
) {
    let mut any = false;
    for (index, sampler) in shared.samplers.iter().enumerate() {
        if !sampler.stages.contains(&stage) {
            continue;
        }
        if let Some(guard) = &sampler.guard {
            let _ = writeln!(out, "#ifdef {guard}");
        }
        match dialect {
            ShaderDialect::Gles300 => {
                let _ = writeln!(out, "uniform sampler2D {};", sampler.name);
            }
            ShaderDialect::Glsl450 => {
                let _ = writeln!(
                    out,
                    "layout(set = 0, binding = {}) uniform sampler2D {};",
                    index + 1,
                    sampler.name
                );
            }
        }
        if sampler.guard.is_some() {
            out.push_str("#endif\n");
        }
        any = true;
    }
    if any {
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::build_state::BuildState;
    use crate::compiler::connection::BlockId;

    fn shared_with_time() -> SharedBuildData {
        let mut shared = SharedBuildData::default();
        let mut state = BuildState::new(ShaderStage::Fragment, &mut shared, false);
        state.begin_block(BlockId(0), "time");
        state
            .declare_uniform("time", ConnectionPointType::Float)
            .unwrap();
        state
            .declare_sampler("txColorTransform", Some("COLORGRADING"))
            .unwrap();
        drop(state);
        shared
    }

    #[test]
    fn gles_fragment_layout() {
        let shared = shared_with_time();
        let src = StageSource {
            code: "glFragColor = vec4(time);\n".to_string(),
            functions: Vec::new(),
        };
        let text = assemble_stage(ShaderStage::Fragment, ShaderDialect::Gles300, &shared, &src);
        assert!(text.starts_with("#version 300 es\nprecision highp float;\n"));
        assert!(text.contains("uniform float time;\n"));
        assert!(text.contains("#ifdef COLORGRADING\nuniform sampler2D txColorTransform;\n#endif\n"));
        assert!(text.contains("out vec4 glFragColor;"));
        assert!(text.ends_with("void main() {\nglFragColor = vec4(time);\n}\n"));
    }

    #[test]
    fn glsl450_uses_a_uniform_block() {
        let shared = shared_with_time();
        let text = assemble_stage(
            ShaderStage::Vertex,
            ShaderDialect::Glsl450,
            &shared,
            &StageSource::default(),
        );
        assert!(text.starts_with("#version 450\n"));
        assert!(text.contains("uniform Uniforms {\n    float time;\n};"));
        // The sampler was only requested by the fragment stage.
        assert!(!text.contains("txColorTransform"));
        assert!(!text.contains("precision"));
    }
}
