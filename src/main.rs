use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use node_material_compiler::compiler::validation::validate_compiled;
use node_material_compiler::compiler::{ShaderDialect, ShaderStage};
use node_material_compiler::config::{self, CompileOptions};
use node_material_compiler::runtime::{DrawContext, MaterialDefines, NodeMaterial};
use node_material_compiler::{dsl, schema};

#[derive(Debug, Default, Clone)]
struct Cli {
    graph: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    options: Option<PathBuf>,
    dialect: Option<ShaderDialect>,
    validate: bool,
    list_blocks: bool,
}

const USAGE: &str = "supported: --graph <graph.json>, --output-dir <dir>, --options <options.json>, \
--dialect gles300|glsl450, --validate, --list-blocks";

fn parse_dialect(v: &str) -> Result<ShaderDialect> {
    match v {
        "gles300" => Ok(ShaderDialect::Gles300),
        "glsl450" => Ok(ShaderDialect::Glsl450),
        other => Err(anyhow!("unknown dialect: {other} (expected gles300 or glsl450)")),
    }
}

fn flag_value(args: &[String], i: usize) -> Result<&str> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing value for {}", args[i]))
}

fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--graph" => {
                cli.graph = Some(PathBuf::from(flag_value(args, i)?));
                i += 2;
            }
            "--outputdir" | "--output-dir" => {
                cli.output_dir = Some(PathBuf::from(flag_value(args, i)?));
                i += 2;
            }
            "--options" => {
                cli.options = Some(PathBuf::from(flag_value(args, i)?));
                i += 2;
            }
            "--dialect" => {
                cli.dialect = Some(parse_dialect(flag_value(args, i)?)?);
                i += 2;
            }
            "--validate" => {
                cli.validate = true;
                i += 1;
            }
            "--list-blocks" => {
                cli.list_blocks = true;
                i += 1;
            }
            other => return Err(anyhow!("unknown argument: {other} ({USAGE})")),
        }
    }
    Ok(cli)
}

fn list_blocks() {
    for registration in schema::default_registry().registrations() {
        println!("{}", registration.tag);
        for property in registration.properties {
            println!(
                "    {} ({}) [{}] {:?}",
                property.name, property.label, property.group, property.kind
            );
        }
    }
}

fn stage_output_path(output_dir: &Path, stem: &str, stage: ShaderStage) -> PathBuf {
    output_dir.join(format!("{stem}.{}.glsl", stage.as_str()))
}

fn run_compile(cli: &Cli, graph_path: &Path) -> Result<()> {
    let mut options = match &cli.options {
        Some(path) => config::load_options_from_path(path)?,
        None => CompileOptions::default(),
    };
    if let Some(dialect) = cli.dialect {
        options.dialect = dialect;
    }

    let dsl_graph = dsl::load_graph_from_path(graph_path)?;
    let root = graph_path
        .parent()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let graph = dsl::graph_from_dsl(
        &dsl_graph,
        schema::default_registry(),
        &dsl::DeserializeContext::new(root),
    )?;

    let stem = graph_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("material")
        .to_string();
    let name = if dsl_graph.metadata.name.is_empty() {
        stem.clone()
    } else {
        dsl_graph.metadata.name.clone()
    };
    let mut material = NodeMaterial::new(name, graph, options);
    material
        .build()
        .with_context(|| format!("failed to compile {}", graph_path.display()))?;

    let Some(compiled) = material.compiled() else {
        return Err(anyhow!("material has no compiled program"));
    };

    if cli.validate {
        let mut defines = MaterialDefines::new();
        material.prepare_defines(&DrawContext::default(), &mut defines);
        validate_compiled(compiled, &defines)?;
        log::info!("{} passed GLSL validation", material.name);
    }

    let output_dir = cli.output_dir.clone().unwrap_or_else(|| {
        graph_path
            .parent()
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| PathBuf::from("."))
    });
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    for stage in ShaderStage::ALL {
        let out_path = stage_output_path(&output_dir, &stem, stage);
        std::fs::write(&out_path, compiled.source(stage))
            .with_context(|| format!("failed to write {}", out_path.display()))?;
        println!("[compile] saved: {}", out_path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_cli(&argv)?;

    if cli.list_blocks {
        list_blocks();
        return Ok(());
    }

    let graph_path = cli
        .graph
        .clone()
        .ok_or_else(|| anyhow!("nothing to do ({USAGE})"))?;
    run_compile(&cli, &graph_path)
}
