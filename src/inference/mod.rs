//! Decode and embedding engines over the shared model runtime

mod embedding;
mod generation;
mod runtime;

pub use embedding::TextEmbedding;
pub use generation::{
    GenerateOptions, StopHandle, TextGeneration, DEFAULT_SECONDARY_STOP_TOKEN,
};
pub use runtime::{argmax, update_kv_cache, LoadOptions, ModelRuntime};
