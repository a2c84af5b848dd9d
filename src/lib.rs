pub mod compiler;
pub mod config;
pub mod dsl;
pub mod effects;
pub mod graph;
pub mod runtime;
pub mod schema;

pub use compiler::{CompileError, CompileResult, CompiledShader, NodeGraph, compile_graph};
pub use config::CompileOptions;
pub use runtime::NodeMaterial;
