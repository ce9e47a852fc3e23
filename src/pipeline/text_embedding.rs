//! Text-to-vector embedding pipeline

use crate::inference::TextEmbedding;
use crate::session::InferenceEngine;
use crate::tokenizer::TextTokenizer;
use crate::Result;

use super::PipelineOptions;

/// Tokenizer + embedding engine behind a text-in, vector-out surface
pub struct TextEmbeddingPipeline {
    tokenizer: TextTokenizer,
    model: TextEmbedding,
    max_tokens: usize,
}

impl TextEmbeddingPipeline {
    /// Load the tokenizer and model for a repository
    pub fn init(
        engine: &dyn InferenceEngine,
        model: &str,
        weights_path: &str,
        options: &PipelineOptions,
    ) -> Result<Self> {
        let tokenizer = TextTokenizer::from_registry(model, options.load.fetch.as_ref())?;
        let mut embedding = TextEmbedding::new();
        embedding.load(engine, model, weights_path, &options.load)?;
        Ok(Self {
            tokenizer,
            model: embedding,
            max_tokens: options.load.max_tokens,
        })
    }

    /// Embed text into a single vector of length `hidden_size`.
    /// Input is truncated to the configured token ceiling.
    pub fn embed(&mut self, text: &str) -> Result<Vec<f32>> {
        let mut input_ids = self.tokenizer.encode(text)?;
        input_ids.truncate(self.max_tokens);
        self.model.embed(&input_ids)
    }

    pub fn model(&self) -> &TextEmbedding {
        &self.model
    }

    /// Release the model session
    pub fn release(&mut self) -> Result<()> {
        self.model.release()
    }
}
