use thiserror::Error;

/// Errors raised while editing or compiling a node graph.
///
/// All variants are fatal for the compile that raised them; connection-time
/// errors leave the graph unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("cannot connect {from} to {to}: {reason}")]
    IncompatibleType {
        from: String,
        to: String,
        reason: String,
    },

    #[error("type resolution failed for {point}: {reason}")]
    TypeResolution { point: String, reason: String },

    #[error("required input {point} is not connected")]
    MissingConnection { point: String },

    #[error("identifier `{name}` {reason}")]
    NameCollision { name: String, reason: String },

    #[error("input {point} already has an upstream connection")]
    InputAlreadyConnected { point: String },

    #[error("cycle detected in graph: {0}")]
    Cycle(String),

    #[error("unknown block index {0}")]
    UnknownBlock(usize),

    #[error("block `{block}` has no {direction} port `{port}`")]
    UnknownPort {
        block: String,
        direction: &'static str,
        port: String,
    },

    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    #[error("shader template `{name}`: {reason}")]
    Template { name: String, reason: String },
}

pub type CompileResult<T> = std::result::Result<T, CompileError>;
