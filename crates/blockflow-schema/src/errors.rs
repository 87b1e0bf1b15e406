use std::io;
use thiserror::Error;

/// Errors that can occur while building schemas or loading configuration
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse block config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Invalid option '{0}': {1}")]
    InvalidOption(String, String),
}
