//! Text-level pipelines
//!
//! Glue combining a tokenizer with a decode or embedding engine behind a
//! prompt-in, text-out surface. Pipelines are explicit context objects
//! constructed and torn down by the caller; nothing here is process-wide.

mod text_embedding;
mod text_generation;

pub use text_embedding::TextEmbeddingPipeline;
pub use text_generation::TextGenerationPipeline;

use crate::inference::LoadOptions;

/// Pipeline initialization options
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Keep special tokens in decoded output
    pub show_special: bool,
    /// Options forwarded to the model runtime
    pub load: LoadOptions,
}
