//! Tokenizer glue over HuggingFace tokenizers
//!
//! Thin wrapper converting between text and the `i64` token ids the
//! runtime feeds the engine. Loaded from the same registry as the model
//! weights, through the caller's fetch capability.

use tokenizers::Tokenizer;

use crate::fetch::{registry_url, Fetch};
use crate::{Error, Result};

/// Wrapper around a HuggingFace tokenizer
pub struct TextTokenizer {
    tokenizer: Tokenizer,
}

impl TextTokenizer {
    /// Resolve and load `tokenizer.json` from a model repository
    pub fn from_registry(model: &str, fetch: &dyn Fetch) -> Result<Self> {
        let path = fetch.fetch(&registry_url(model, "tokenizer.json"))?;
        Self::from_file(&path)
    }

    /// Load a tokenizer from a local `tokenizer.json`
    pub fn from_file(path: &str) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| Error::Tokenizer(format!("failed to load tokenizer.json: {e}")))?;
        Ok(Self { tokenizer })
    }

    /// Encode text to token ids
    pub fn encode(&self, text: &str) -> Result<Vec<i64>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| Error::Tokenizer(format!("encoding failed: {e}")))?;
        Ok(encoding.get_ids().iter().map(|&id| id as i64).collect())
    }

    /// Decode token ids back to text
    pub fn decode(&self, ids: &[i64], skip_special_tokens: bool) -> Result<String> {
        let ids: Vec<u32> = ids.iter().map(|&id| id as u32).collect();
        self.tokenizer
            .decode(&ids, skip_special_tokens)
            .map_err(|e| Error::Tokenizer(format!("decoding failed: {e}")))
    }

    /// Vocabulary size including added tokens
    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }
}
