//! mobile-transformers: on-device transformer decoding and embedding
//!
//! Drives an autoregressive language model (or a companion embedding model)
//! through a pluggable inference engine, owning the token-generation loop,
//! the per-layer key/value attention cache, and greedy decoding.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     mobile-transformers                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────────────┐      ┌───────────────────────────┐    │
//! │  │ TextGeneration    │      │ TextEmbedding             │    │
//! │  │ (greedy decode)   │      │ (mean pooling)            │    │
//! │  └─────────┬─────────┘      └─────────────┬─────────────┘    │
//! │            └───────────┬─────────────────-┘                  │
//! │  ┌─────────────────────┴────────────────────────────────┐    │
//! │  │ ModelRuntime                                         │    │
//! │  │ (session lifecycle, KV cache feed, argmax)           │    │
//! │  └─────────────────────┬────────────────────────────────┘    │
//! ├────────────────────────┼─────────────────────────────────────┤
//! │  InferenceEngine / InferenceSession / Fetch (trait seams)    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine and the artifact fetcher are external collaborators reached
//! through traits; the runtime never performs network I/O or graph
//! execution itself. A single runtime instance is single-threaded: callers
//! must not drive one instance from two concurrent `generate`/`embed`
//! calls.

pub mod error;
pub mod fetch;
pub mod inference;
pub mod model;
pub mod pipeline;
pub mod session;
pub mod tensor;
pub mod tokenizer;

// Re-exports
pub use error::{Error, Result};
pub use fetch::{Fetch, HubFetcher, PassthroughFetcher};
pub use inference::{
    GenerateOptions, LoadOptions, ModelRuntime, StopHandle, TextEmbedding, TextGeneration,
};
pub use model::ModelConfig;
pub use pipeline::{PipelineOptions, TextEmbeddingPipeline, TextGenerationPipeline};
pub use session::{
    ExecutionProvider, Feed, GraphOptimizationLevel, InferenceEngine, InferenceSession,
    SessionOptions, SessionOutputs,
};
pub use tensor::{DType, Location, Tensor};
pub use tokenizer::TextTokenizer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
