//! GLSL validation of compiled programs using the naga library.

use anyhow::{Context, Result, anyhow, bail};

use super::compile::CompiledShader;
use super::types::{ShaderDialect, ShaderStage};
use crate::runtime::defines::{DefineValue, MaterialDefines};

fn naga_defines(defines: &MaterialDefines) -> naga::FastHashMap<String, String> {
    defines
        .iter()
        .filter(|(_, value)| *value != DefineValue::Bool(false))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// Parse and validate one `#version 450` stage with `defines` fed to the
/// preprocessor.
pub fn validate_glsl(
    source: &str,
    stage: ShaderStage,
    defines: &MaterialDefines,
) -> Result<naga::Module> {
    let options = naga::front::glsl::Options {
        stage: match stage {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        },
        defines: naga_defines(defines),
    };

    let module = naga::front::glsl::Frontend::default()
        .parse(&options, source)
        .map_err(|e| {
            anyhow!(
                "GLSL parse failed:\n{}",
                format_naga_error(source, &format!("{e:?}"))
            )
        })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| {
        anyhow!(
            "GLSL validation failed:\n{}",
            format_naga_error(source, &format!("{e:?}"))
        )
    })?;

    Ok(module)
}

/// Validates both stages of a `Glsl450` compile.
pub fn validate_compiled(shader: &CompiledShader, defines: &MaterialDefines) -> Result<()> {
    if shader.dialect != ShaderDialect::Glsl450 {
        bail!(
            "only glsl450 output can be validated, got {:?}",
            shader.dialect
        );
    }
    for stage in ShaderStage::ALL {
        validate_glsl(shader.source(stage), stage, defines)
            .with_context(|| format!("{stage} stage generated invalid GLSL"))?;
    }
    Ok(())
}

fn format_naga_error(source: &str, error: &str) -> String {
    let mut output = format!("  {error}\n\nGenerated GLSL:\n---\n");
    for (line_num, line) in source.lines().enumerate() {
        output.push_str(&format!("{:4} | {}\n", line_num + 1, line));
    }
    output.push_str("---\n");
    output
}
