use blockflow_combine::CombineError;
use blockflow_schema::SchemaError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("block produced {produced} outputs but declares {declared}")]
    ShapeMismatch { declared: usize, produced: usize },

    #[error("compute function failed: {0}")]
    Compute(#[source] anyhow::Error),

    #[error("Invalid modifier parameter '{0}': {1}")]
    ModifierParam(String, String),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Combination error: {0}")]
    Combine(#[from] CombineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FlowError>;
