//! Error types for mobile-transformers

use thiserror::Error;

/// Result type alias for runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or driving a model
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while reading a fetched artifact
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error (model configuration descriptor)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Model configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// An operation that needs an inference session ran before `load`
    /// or after `release`
    #[error("Session is undefined")]
    SessionUndefined,

    /// Logits tensor with the wrong rank or a zero-sized dimension
    #[error("Invalid tensor dimensions: {0:?}")]
    InvalidDimensions(Vec<usize>),

    /// Non-finite value encountered during token selection
    #[error("found non-finite value in logits")]
    NonFiniteLogits,

    /// The engine did not produce a required named output
    #[error("Missing output: {0}")]
    MissingOutput(String),

    /// Neither recognized hidden-state output name was present
    #[error("No embedding output found in model outputs")]
    NoEmbeddingOutput,

    /// Tensor buffer does not match its declared shape
    #[error("Shape mismatch: expected {expected} bytes, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    /// Element type not usable for the requested conversion
    #[error("Unsupported dtype: {0}")]
    UnsupportedDType(String),

    /// Artifact fetch failure, kept distinct from engine failures so
    /// callers can tell network/IO apart from model logic
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Failure reported by the inference engine (creation, run or release)
    #[error("Engine error: {0}")]
    Engine(String),

    /// Tokenizer error
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),
}
