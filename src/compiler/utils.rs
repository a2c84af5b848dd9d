//! Small formatting helpers shared by the blocks.

use super::types::ConnectionPointType;

/// Format a float as a GLSL literal. Integral values keep a `.0` suffix so
/// the literal stays a float.
pub fn write_float(v: f32) -> String {
    if !v.is_finite() {
        return "0.0".to_string();
    }
    if v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

/// A float literal widened to `ty`, e.g. `vec3(0.5)`. Scalars stay bare.
pub fn splat(ty: ConnectionPointType, v: f32) -> String {
    match ty {
        ConnectionPointType::Float => write_float(v),
        other => format!("{}({})", other.glsl().unwrap_or("float"), write_float(v)),
    }
}

/// Sanitize a string to be a valid GLSL identifier.
pub fn sanitize_glsl_ident(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        let ch = if ch.is_ascii_alphanumeric() { ch } else { '_' };
        // `__` is reserved in GLSL.
        if ch == '_' && out.ends_with('_') {
            continue;
        }
        out.push(ch);
    }
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, 'v');
    }
    if out.starts_with("gl_") {
        out.insert_str(0, "v_");
    }
    out
}

const RESERVED: &[&str] = &[
    "attribute", "bool", "break", "bvec2", "bvec3", "bvec4", "const", "continue", "discard", "do",
    "else", "false", "flat", "float", "for", "highp", "if", "in", "inout", "int", "invariant",
    "ivec2", "ivec3", "ivec4", "layout", "lowp", "main", "mat2", "mat3", "mat4", "mediump", "out",
    "precision", "return", "sampler2D", "sampler3D", "smooth", "struct", "switch", "texture",
    "true", "uint", "uniform", "varying", "vec2", "vec3", "vec4", "void", "while",
    // builtins the templates rely on
    "abs", "clamp", "dot", "exp2", "floor", "fract", "mix", "pow", "round", "sin",
    // names used by the assembled program
    "glFragColor", "Uniforms",
];

pub fn is_reserved_glsl_ident(name: &str) -> bool {
    name.starts_with("gl_") || RESERVED.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_keep_a_decimal_point() {
        assert_eq!(write_float(1.0), "1.0");
        assert_eq!(write_float(0.0), "0.0");
        assert_eq!(write_float(0.2), "0.2");
        assert_eq!(write_float(-3.0), "-3.0");
        assert_eq!(write_float(f32::NAN), "0.0");
    }

    #[test]
    fn splat_widens_non_scalar_types() {
        assert_eq!(splat(ConnectionPointType::Float, 0.5), "0.5");
        assert_eq!(splat(ConnectionPointType::Vector2, 1.0), "vec2(1.0)");
        assert_eq!(splat(ConnectionPointType::Color4, 0.0), "vec4(0.0)");
        assert_eq!(splat(ConnectionPointType::Int, 2.0), "int(2.0)");
    }

    #[test]
    fn sanitize_produces_valid_identifiers() {
        assert_eq!(sanitize_glsl_ident("World Pos"), "World_Pos");
        assert_eq!(sanitize_glsl_ident("a--b"), "a_b");
        assert_eq!(sanitize_glsl_ident("3d"), "v3d");
        assert_eq!(sanitize_glsl_ident(""), "v");
        assert_eq!(sanitize_glsl_ident("gl_Position"), "v_gl_Position");
    }

    #[test]
    fn reserved_names() {
        assert!(is_reserved_glsl_ident("float"));
        assert!(is_reserved_glsl_ident("gl_FragCoord"));
        assert!(!is_reserved_glsl_ident("Clamp_output"));
    }
}
