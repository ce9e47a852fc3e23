//! Shared model runtime
//!
//! Owns the inference session, the named tensor feed (key/value cache plus
//! step inputs), and the model hyperparameters derived from the remote
//! configuration descriptor. The decode and embedding engines embed this
//! state; greedy selection and cache merging are free functions over it.

use std::sync::Arc;

use tracing::{debug, info};

use crate::fetch::{registry_url, Fetch, PassthroughFetcher};
use crate::model::ModelConfig;
use crate::session::{
    ExecutionProvider, Feed, InferenceEngine, InferenceSession, SessionOptions, SessionOutputs,
};
use crate::tensor::{DType, Tensor};
use crate::{Error, Result};

const KV_CACHE_PREFIX: &str = "past_key_values";
const PRESENT_PREFIX: &str = "present";

/// Options for [`ModelRuntime::load`]
#[derive(Clone)]
pub struct LoadOptions {
    /// Ceiling on total sequence length (prefill + generated)
    pub max_tokens: usize,
    /// Enables low-severity engine logging
    pub verbose: bool,
    /// Whether an out-of-band weight artifact must be fetched and attached
    pub external_data: bool,
    /// Capability resolving registry URLs to local resource handles
    pub fetch: Arc<dyn Fetch>,
    /// Acceleration backends to request, in order
    pub execution_providers: Vec<ExecutionProvider>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_tokens: 9999,
            verbose: false,
            external_data: false,
            fetch: Arc::new(PassthroughFetcher),
            execution_providers: vec![ExecutionProvider::Cpu],
        }
    }
}

impl std::fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadOptions")
            .field("max_tokens", &self.max_tokens)
            .field("verbose", &self.verbose)
            .field("external_data", &self.external_data)
            .field("execution_providers", &self.execution_providers)
            .finish()
    }
}

/// Shared runtime state for decode and embedding engines
pub struct ModelRuntime {
    /// Live session, `None` before `load` and after `release`
    session: Option<Box<dyn InferenceSession>>,
    /// Named tensor feed, exclusively owned
    feed: Feed,
    /// End-of-sequence token id
    eos_token_id: i64,
    /// Empty cache-slot shape `[1, kv_heads, 0, head_dim]`
    kv_dims: Vec<usize>,
    /// Number of transformer layers
    num_layers: usize,
    /// Element type of materialized cache tensors
    cache_dtype: DType,
    /// Sequence-length ceiling from the load options
    max_tokens: usize,
}

impl Default for ModelRuntime {
    fn default() -> Self {
        Self {
            session: None,
            feed: Feed::new(),
            eos_token_id: 2,
            kv_dims: Vec::new(),
            num_layers: 0,
            cache_dtype: DType::F32,
            max_tokens: 9999,
        }
    }
}

impl ModelRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch and parse the remote descriptor, create the session, and
    /// initialize the cache.
    ///
    /// One-shot: loading again without an intervening [`release`] leaks the
    /// prior session.
    ///
    /// [`release`]: ModelRuntime::release
    pub fn load(
        &mut self,
        engine: &dyn InferenceEngine,
        model: &str,
        weights_path: &str,
        options: &LoadOptions,
    ) -> Result<()> {
        info!(model, weights_path, "loading model");

        let config_path = options.fetch.fetch(&registry_url(model, "config.json"))?;
        let config_bytes = std::fs::read(&config_path)?;
        let config = ModelConfig::from_slice(&config_bytes)?;

        let artifact = options.fetch.fetch(&registry_url(model, weights_path))?;

        let mut session_options = SessionOptions {
            execution_providers: options.execution_providers.clone(),
            ..SessionOptions::default()
        };
        if options.external_data {
            let data_path = format!("{weights_path}_data");
            session_options
                .external_data
                .push(options.fetch.fetch(&registry_url(model, &data_path))?);
        }
        if options.verbose {
            session_options.log_severity_level = Some(0);
            session_options.log_verbosity_level = Some(0);
        }

        self.session = Some(engine.create_session(&artifact, &session_options)?);
        self.eos_token_id = config.eos_token_id;
        self.kv_dims = config.kv_dims()?;
        self.num_layers = config.num_hidden_layers;
        self.max_tokens = options.max_tokens;

        info!(
            layers = self.num_layers,
            kv_dims = ?self.kv_dims,
            eos = self.eos_token_id,
            "session created"
        );

        self.initialize_feed();
        Ok(())
    }

    /// Reset the key/value cache to empty slots.
    ///
    /// Device-backed tensors held in the feed are released first; host
    /// tensors are simply dropped. With zero layers this produces an empty
    /// feed.
    pub fn initialize_feed(&mut self) {
        for tensor in self.feed.values_mut() {
            if tensor.is_device() {
                tensor.release();
            }
        }
        self.feed.clear();

        for i in 0..self.num_layers {
            self.feed.insert(
                format!("{KV_CACHE_PREFIX}.{i}.key"),
                Tensor::empty(self.cache_dtype, self.kv_dims.clone()),
            );
            self.feed.insert(
                format!("{KV_CACHE_PREFIX}.{i}.value"),
                Tensor::empty(self.cache_dtype, self.kv_dims.clone()),
            );
        }
        debug!(slots = self.feed.len(), "cache reset");
    }

    /// Run the session over the current feed
    pub fn run(&mut self) -> Result<SessionOutputs> {
        let session = self.session.as_mut().ok_or(Error::SessionUndefined)?;
        session.run(&self.feed)
    }

    /// Release the engine session. Idempotent; a release failure from the
    /// engine propagates, with the handle cleared either way.
    pub fn release(&mut self) -> Result<()> {
        if let Some(mut session) = self.session.take() {
            info!("releasing session");
            session.release()?;
        }
        Ok(())
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    pub fn feed_mut(&mut self) -> &mut Feed {
        &mut self.feed
    }

    pub fn eos_token_id(&self) -> i64 {
        self.eos_token_id
    }

    pub fn num_layers(&self) -> usize {
        self.num_layers
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Element type used for empty cache tensors. Must be a float type.
    pub fn set_cache_dtype(&mut self, dtype: DType) {
        self.cache_dtype = dtype;
    }

    #[cfg(test)]
    pub(crate) fn set_session(&mut self, session: Box<dyn InferenceSession>) {
        self.session = Some(session);
    }

    #[cfg(test)]
    pub(crate) fn set_eos_token_id(&mut self, eos: i64) {
        self.eos_token_id = eos;
    }
}

/// Index of the maximum logit in the most recent sequence position.
///
/// The tensor must be rank 3 (`[batch, seq, vocab]`) with no zero
/// dimension. Only the last row along the sequence axis is scanned; a
/// non-finite value anywhere in that row is an error, since letting it
/// through would corrupt every subsequent step. Ties resolve to the lowest
/// index.
pub fn argmax(logits: &Tensor) -> Result<usize> {
    let dims = logits.shape();
    if dims.len() != 3 || dims.iter().any(|&d| d == 0) {
        return Err(Error::InvalidDimensions(dims.to_vec()));
    }

    let vocab = dims[2];
    let start = vocab * (dims[1] - 1);
    let data = logits.to_f32_vec();

    let mut max = f32::NEG_INFINITY;
    let mut max_idx = 0;
    for i in 0..vocab {
        let val = data[start + i];
        if !val.is_finite() {
            return Err(Error::NonFiniteLogits);
        }
        if val > max {
            max = val;
            max_idx = i;
        }
    }
    Ok(max_idx)
}

/// Merge `present.*` outputs into the cache.
///
/// Each matching output replaces the `past_key_values.*` slot of the same
/// suffix, releasing the slot's previous device-backed tensor. An output
/// declared but not materialized clears the slot. Everything else (logits,
/// hidden states) never enters the feed.
pub fn update_kv_cache(feed: &mut Feed, outputs: SessionOutputs) {
    for (name, tensor) in outputs.into_entries() {
        let Some(suffix) = name.strip_prefix(PRESENT_PREFIX) else {
            continue;
        };
        let slot = format!("{KV_CACHE_PREFIX}{suffix}");
        if let Some(mut previous) = feed.remove(&slot) {
            if previous.is_device() {
                previous.release();
            }
        }
        if let Some(tensor) = tensor {
            feed.insert(slot, tensor);
        }
    }
}
