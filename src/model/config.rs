//! Model configuration parsing

use crate::{Error, Result};
use serde::Deserialize;

/// Model configuration parsed from the remote `config.json` descriptor.
/// Immutable after load; every field below is required.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Token id that terminates generation
    pub eos_token_id: i64,

    /// Number of key/value heads (GQA)
    pub num_key_value_heads: usize,

    /// Hidden size (embedding dimension)
    pub hidden_size: usize,

    /// Number of attention heads
    pub num_attention_heads: usize,

    /// Number of transformer layers
    pub num_hidden_layers: usize,
}

impl ModelConfig {
    /// Parse a raw JSON descriptor
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let config: ModelConfig = serde_json::from_slice(bytes)?;
        // validate up front so a bad shape fails at load, not mid-generation
        config.head_dim()?;
        Ok(config)
    }

    /// Per-head dimension. The division must be exact; a remainder means
    /// the descriptor defines an invalid cache shape.
    pub fn head_dim(&self) -> Result<usize> {
        if self.num_attention_heads == 0
            || self.hidden_size % self.num_attention_heads != 0
        {
            return Err(Error::Config(format!(
                "hidden_size {} not divisible by num_attention_heads {}",
                self.hidden_size, self.num_attention_heads
            )));
        }
        Ok(self.hidden_size / self.num_attention_heads)
    }

    /// Shape of an empty key/value cache slot:
    /// `[1, num_key_value_heads, 0, head_dim]`
    pub fn kv_dims(&self) -> Result<Vec<usize>> {
        Ok(vec![1, self.num_key_value_heads, 0, self.head_dim()?])
    }
}
