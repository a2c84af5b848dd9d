//! Fragment programs of the post-processes and procedural textures.

const BLOOM_MERGE: &str = r#"#version 300 es
precision highp float;

uniform sampler2D textureSampler;
uniform sampler2D bloomBlur;
uniform float bloomWeight;

in vec2 vUV;
out vec4 glFragColor;

void main() {
    vec4 original = texture(textureSampler, vUV);
    vec3 blurred = texture(bloomBlur, vUV).rgb;
    glFragColor = vec4(original.rgb + blurred * bloomWeight, original.a);
}
"#;

const GRASS: &str = r#"#version 300 es
precision highp float;

uniform vec3 herb1Color;
uniform vec3 herb2Color;
uniform vec3 herb3Color;
uniform vec3 groundColor;

in vec2 vUV;
out vec4 glFragColor;

float rand(vec2 n) {
    return fract(cos(dot(n, vec2(12.9898, 4.1414))) * 43758.5453);
}

float noise(vec2 n) {
    const vec2 d = vec2(0.0, 1.0);
    vec2 b = floor(n);
    vec2 f = smoothstep(vec2(0.0), vec2(1.0), fract(n));
    return mix(mix(rand(b), rand(b + d.yx), f.x), mix(rand(b + d.xy), rand(b + d.yy), f.x), f.y);
}

float fbm(vec2 n) {
    float total = 0.0;
    float amplitude = 1.0;
    vec2 p = n;
    for (int i = 0; i < 4; i++) {
        total += noise(p) * amplitude;
        p = p + p;
        amplitude *= 0.5;
    }
    return total;
}

void main() {
    vec3 color = mix(groundColor, herb1Color, rand(gl_FragCoord.xy * 4.0));
    color = mix(color, herb2Color, rand(gl_FragCoord.xy * 8.0));
    color = mix(color, herb3Color, rand(gl_FragCoord.xy));
    color = mix(color, herb1Color, fbm(vUV * 16.0));
    glFragColor = vec4(color, 1.0);
}
"#;

pub fn fragment(name: &str) -> Option<&'static str> {
    match name {
        "bloomMerge" => Some(BLOOM_MERGE),
        "grassProceduralTexture" => Some(GRASS),
        _ => None,
    }
}
