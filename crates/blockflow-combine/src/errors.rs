use thiserror::Error;

/// Errors raised by the combination engine. These surface to the immediate
/// caller and are not recoverable locally; the caller must fix the grid or
/// spec.
#[derive(Error, Debug)]
pub enum CombineError {
    #[error("zipped sequences have mismatched lengths: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("parameter '{0}' has no default and is missing from a grid entry")]
    MissingParameter(String),

    #[error("malformed parameter spec: {0}")]
    MalformedSpec(String),

    #[error("compute function failed: {0}")]
    Compute(#[source] anyhow::Error),
}
