//! Sentence embedding
//!
//! Single forward pass over the full token sequence, reduced to one
//! fixed-size vector by mean pooling across the sequence axis.

use crate::session::InferenceEngine;
use crate::tensor::Tensor;
use crate::{Error, Result};

use super::runtime::{LoadOptions, ModelRuntime};

/// Output names under which models expose per-token hidden states
const HIDDEN_STATE_OUTPUTS: [&str; 2] = ["last_hidden_state", "embeddings"];

/// Embedding engine built on [`ModelRuntime`]
#[derive(Default)]
pub struct TextEmbedding {
    runtime: ModelRuntime,
}

impl TextEmbedding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(
        &mut self,
        engine: &dyn InferenceEngine,
        model: &str,
        weights_path: &str,
        options: &LoadOptions,
    ) -> Result<()> {
        self.runtime.load(engine, model, weights_path, options)
    }

    /// Embed a token sequence into a single vector of length `hidden_size`.
    ///
    /// Mean pooling is unweighted: padding tokens, if any, are averaged in.
    pub fn embed(&mut self, tokens: &[i64]) -> Result<Vec<f32>> {
        if !self.runtime.has_session() {
            return Err(Error::SessionUndefined);
        }

        let len = tokens.len();
        self.runtime
            .feed_mut()
            .insert("input_ids".into(), Tensor::from_i64(tokens, vec![1, len])?);
        self.runtime.feed_mut().insert(
            "attention_mask".into(),
            Tensor::from_i64(&vec![1i64; len], vec![1, len])?,
        );

        let outputs = self.runtime.run()?;
        let hidden = HIDDEN_STATE_OUTPUTS
            .iter()
            .find_map(|name| outputs.get(name))
            .ok_or(Error::NoEmbeddingOutput)?;

        let dims = hidden.shape();
        if dims.len() != 3 || dims.iter().any(|&d| d == 0) {
            return Err(Error::InvalidDimensions(dims.to_vec()));
        }
        let (seq_len, hidden_size) = (dims[1], dims[2]);

        let data = hidden.to_f32_vec();
        let mut pooled = vec![0.0f32; hidden_size];
        for (h, slot) in pooled.iter_mut().enumerate() {
            let mut sum = 0.0f32;
            for s in 0..seq_len {
                sum += data[s * hidden_size + h];
            }
            *slot = sum / seq_len as f32;
        }
        Ok(pooled)
    }

    pub fn runtime(&self) -> &ModelRuntime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut ModelRuntime {
        &mut self.runtime
    }

    /// Release the engine session
    pub fn release(&mut self) -> Result<()> {
        self.runtime.release()
    }
}
