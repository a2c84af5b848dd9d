//! Node-material shader-graph compiler.

mod assemble;
pub mod block;
pub mod blocks;
pub mod build_state;
mod compile;
pub mod connection;
pub mod error;
pub mod node_graph;
pub mod resolve;
pub mod templates;
pub mod types;
pub mod utils;
pub mod validation;

pub use block::{
    Bindable, BindScope, Block, BlockIo, Buildable, DefineContributor, InputIo, OutputIo,
    ReadinessCheck, SerializableBlock,
};
pub use build_state::{BuildState, InitState, OutputDecl};
pub use compile::{CompiledShader, compile_graph};
pub use connection::{BlockId, ConnectionPoint, InputRef, OutputRef, PortRegistrar};
pub use error::{CompileError, CompileResult};
pub use node_graph::{Link, NodeGraph};
pub use types::{BlockTarget, ConnectionPointType, ShaderDialect, ShaderStage};
