pub(super) const HELPER_FUNCTIONS: &str = r#"vec3 toLinearSpace(vec3 color) {
    return pow(color, vec3(2.2));
}

vec3 toGammaSpace(vec3 color) {
    return pow(color, vec3(0.45454545));
}

float getLuminance(vec3 color) {
    return clamp(dot(color, vec3(0.2126, 0.7152, 0.0722)), 0.0, 1.0);
}

float getRand(vec2 seed) {
    return fract(sin(dot(seed, vec2(12.9898, 78.233))) * 43758.5453);
}
"#;
