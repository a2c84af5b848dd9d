use std::path::{Path, PathBuf};

use node_material_compiler::compiler::blocks::{WaveBlock, WaveKind};
use node_material_compiler::compiler::validation::validate_compiled;
use node_material_compiler::compiler::{CompiledShader, NodeGraph, ShaderDialect, compile_graph};
use node_material_compiler::config::CompileOptions;
use node_material_compiler::dsl::{self, DeserializeContext};
use node_material_compiler::runtime::MaterialDefines;
use node_material_compiler::schema::default_registry;

fn cases_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("cases")
}

fn list_json_cases(dir: &Path) -> Vec<PathBuf> {
    let mut cases: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", dir.display()))
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        })
        .collect();
    cases.sort();
    cases
}

fn load_case(name: &str) -> NodeGraph {
    let path = cases_root().join(format!("{name}.json"));
    let dsl = dsl::load_graph_from_path(&path).unwrap();
    dsl::graph_from_dsl(&dsl, default_registry(), &DeserializeContext::default())
        .unwrap_or_else(|e| panic!("case {name}: {e:#}"))
}

fn compile(graph: &NodeGraph, dialect: ShaderDialect) -> CompiledShader {
    let options = CompileOptions {
        dialect,
        ..Default::default()
    };
    compile_graph(graph, &options).unwrap_or_else(|e| panic!("compile failed: {e}"))
}

#[test]
fn every_case_compiles_and_validates_as_glsl450() {
    let cases = list_json_cases(&cases_root());
    assert!(!cases.is_empty(), "no cases under {}", cases_root().display());

    for path in cases {
        let dsl = dsl::load_graph_from_path(&path).unwrap();
        let graph = dsl::graph_from_dsl(&dsl, default_registry(), &DeserializeContext::default())
            .unwrap_or_else(|e| panic!("case {}: {e:#}", path.display()));

        let gles = compile(&graph, ShaderDialect::Gles300);
        assert!(gles.vertex.starts_with("#version 300 es\n"));
        assert!(gles.fragment.contains("precision highp float;"));
        assert!(!gles.vertex.contains("precision highp float;"));

        let desktop = compile(&graph, ShaderDialect::Glsl450);
        validate_compiled(&desktop, &MaterialDefines::new())
            .unwrap_or_else(|e| panic!("case {}: {e:#}", path.display()));
    }
}

#[test]
fn compiling_twice_gives_identical_programs() {
    for path in list_json_cases(&cases_root()) {
        let dsl = dsl::load_graph_from_path(&path).unwrap();
        let graph = dsl::graph_from_dsl(&dsl, default_registry(), &DeserializeContext::default())
            .unwrap();
        let first = compile(&graph, ShaderDialect::Gles300);
        let second = compile(&graph, ShaderDialect::Gles300);
        assert_eq!(first, second, "case {}", path.display());
    }
}

#[test]
fn clamped_color_widens_bounds_to_the_input_type() {
    let shader = compile(&load_case("clamped_color"), ShaderDialect::Gles300);
    assert!(shader.fragment.contains("uniform vec4 u_tint;"));
    assert!(
        shader
            .fragment
            .contains("vec4 clamp_output = clamp(u_tint, vec4(0.1), vec4(0.9));")
    );
    assert!(shader.fragment.contains("glFragColor = clamp_output;"));
    assert!(shader.vertex.contains("in vec3 position;"));
    assert!(shader.vertex.contains("uniform mat4 viewProjection;"));
    assert!(!shader.fragment.contains("viewProjection"));
}

#[test]
fn glsl450_shares_one_uniform_block_between_stages() {
    let shader = compile(&load_case("clamped_color"), ShaderDialect::Glsl450);
    let block = "layout(std140, set = 0, binding = 0) uniform Uniforms {";
    assert!(shader.vertex.contains(block));
    assert!(shader.fragment.contains(block));
    assert!(shader.vertex.contains("    vec4 u_tint;"));
    assert!(shader.fragment.contains("    mat4 viewProjection;"));
    assert!(shader.fragment.contains("layout(location = 0) out vec4 glFragColor;"));
}

#[test]
fn wave_feeds_alpha_and_gamma_conversion_follows_the_write() {
    let shader = compile(&load_case("wave_time"), ShaderDialect::Gles300);
    let frag = &shader.fragment;
    assert!(frag.contains("uniform float time;"));
    assert!(frag.contains("float wave_output = 2.0 * abs(2.0 * (time - floor(0.5 + time))) - 1.0;"));
    assert!(frag.contains("vec3 base_output = vec3(0.1, 0.6, 0.3);"));

    let write = frag
        .find("glFragColor = vec4(base_output, wave_output);")
        .expect("fragment write");
    let gamma = frag
        .find("glFragColor = vec4(toGammaSpace(glFragColor.rgb), glFragColor.a);")
        .expect("gamma conversion");
    assert!(write < gamma);
    assert!(frag.contains("vec3 toGammaSpace(vec3 color)"));
}

#[test]
fn every_wave_kind_compiles_into_the_fragment() {
    let expected = [
        (WaveKind::SawTooth, "float wave_output = time - floor(0.5 + time);"),
        (WaveKind::Square, "float wave_output = 1.0 - 2.0 * round(fract(time));"),
    ];
    for (kind, line) in expected {
        let mut graph = load_case("wave_time");
        let wave = graph
            .block_ids()
            .find(|id| graph.block_as::<WaveBlock>(*id).is_some())
            .expect("wave block");
        if let Some(block) = graph.block_as_mut::<WaveBlock>(wave) {
            block.kind = kind;
        }
        let shader = compile(&graph, ShaderDialect::Gles300);
        assert!(shader.fragment.contains(line), "{kind:?}:\n{}", shader.fragment);
        assert!(shader.fragment.contains("glFragColor = vec4(base_output, wave_output);"));

        let desktop = compile(&graph, ShaderDialect::Glsl450);
        validate_compiled(&desktop, &MaterialDefines::new()).unwrap();
    }
}

#[test]
fn image_processing_converts_its_input_to_linear_space() {
    let shader = compile(&load_case("image_processing"), ShaderDialect::Gles300);
    let frag = &shader.fragment;
    assert!(frag.contains("in vec4 v_color;"));
    assert!(frag.contains(
        "imageProcessing_output = vec4(toLinearSpace(imageProcessing_output.rgb), imageProcessing_output.a);"
    ));
    assert!(frag.contains("#ifdef IMAGEPROCESSINGPOSTPROCESS"));
    assert!(frag.contains("applyImageProcessing(imageProcessing_output)"));
    assert!(frag.contains("glFragColor = imageProcessing_output;"));
    // the color-grading sampler only exists behind its define
    assert!(frag.contains("#ifdef COLORGRADING\nuniform sampler2D txColorTransform;\n#endif"));
}

#[test]
fn clip_planes_span_both_stages() {
    let shader = compile(&load_case("image_processing"), ShaderDialect::Gles300);
    assert!(shader.vertex.contains("uniform vec4 vClipPlane;"));
    assert!(shader.vertex.contains("uniform vec4 vClipPlane6;"));
    assert!(shader.vertex.contains("out float fClipDistance;"));
    assert!(shader.vertex.contains("fClipDistance = computeClipDistance(worldPos_output, vClipPlane);"));
    assert!(shader.fragment.contains("in float fClipDistance;"));
    assert!(shader.fragment.contains("discard;"));
    // the declaration include's own uniform lines are replaced by ours
    assert_eq!(shader.vertex.matches("uniform vec4 vClipPlane;").count(), 1);
}

#[test]
fn clip_plane_branches_validate_with_their_defines() {
    let shader = compile(&load_case("image_processing"), ShaderDialect::Glsl450);
    let mut defines = MaterialDefines::new();
    defines.set_value("CLIPPLANE", true, false);
    defines.set_value("CLIPPLANE4", true, false);
    validate_compiled(&shader, &defines).unwrap();
}
