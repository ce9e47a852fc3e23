//! Greedy text generation
//!
//! Prefills the prompt, then produces one token per engine step until the
//! end-of-sequence token, the secondary stop token, the sequence-length
//! ceiling, or a cooperative stop request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::session::InferenceEngine;
use crate::tensor::Tensor;
use crate::{Error, Result};

use super::runtime::{argmax, update_kv_cache, LoadOptions, ModelRuntime};

/// Fallback terminator observed in the Phi tokenizer family; kept as a
/// configurable secondary stop token rather than a silent constant.
pub const DEFAULT_SECONDARY_STOP_TOKEN: i64 = 32007;

/// Per-call generation options
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Ceiling on total sequence length, prefill included
    pub max_tokens: usize,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self { max_tokens: 256 }
    }
}

/// Cloneable handle requesting cooperative termination of a running
/// `generate` loop. There is no hard cancellation; the loop observes the
/// flag once per step.
#[derive(Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Autoregressive decode engine built on [`ModelRuntime`]
pub struct TextGeneration {
    runtime: ModelRuntime,
    /// Accumulated sequence for the current call, prefill included
    output_tokens: Vec<i64>,
    /// The supported model family always consumes absolute position ids
    need_position_ids: bool,
    secondary_stop_token: i64,
    stop: StopHandle,
}

impl Default for TextGeneration {
    fn default() -> Self {
        Self {
            runtime: ModelRuntime::new(),
            output_tokens: Vec::new(),
            need_position_ids: true,
            secondary_stop_token: DEFAULT_SECONDARY_STOP_TOKEN,
            stop: StopHandle::default(),
        }
    }
}

impl TextGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the model and reset generation state
    pub fn load(
        &mut self,
        engine: &dyn InferenceEngine,
        model: &str,
        weights_path: &str,
        options: &LoadOptions,
    ) -> Result<()> {
        self.runtime.load(engine, model, weights_path, options)?;
        self.output_tokens.clear();
        Ok(())
    }

    /// Reset the cache and discard accumulated output tokens
    pub fn initialize_feed(&mut self) {
        self.runtime.initialize_feed();
        self.output_tokens.clear();
    }

    /// Generate tokens by greedy search.
    ///
    /// `on_step` receives the full accumulated sequence after every
    /// generated token; it runs synchronously inside the loop, so a slow
    /// callback stalls generation.
    pub fn generate(
        &mut self,
        tokens: &[i64],
        mut on_step: impl FnMut(&[i64]),
        options: &GenerateOptions,
    ) -> Result<Vec<i64>> {
        if !self.runtime.has_session() {
            return Err(Error::SessionUndefined);
        }

        let max_tokens = options.max_tokens;
        self.stop.clear();

        let input_len = tokens.len();
        self.runtime.feed_mut().insert(
            "input_ids".into(),
            Tensor::from_i64(tokens, vec![1, input_len])?,
        );
        self.output_tokens.extend_from_slice(tokens);

        let mut last_token: i64 = 0;
        let mut seqlen = self.output_tokens.len();

        // absolute positions for every prefilled token
        if self.need_position_ids {
            let positions: Vec<i64> = (0..input_len)
                .map(|i| (seqlen - input_len + i) as i64)
                .collect();
            self.runtime.feed_mut().insert(
                "position_ids".into(),
                Tensor::from_i64(&positions, vec![1, input_len])?,
            );
        }

        while last_token != self.runtime.eos_token_id()
            && last_token != self.secondary_stop_token
            && self.output_tokens.len() < max_tokens
            && !self.stop.is_stopped()
        {
            seqlen = self.output_tokens.len();
            self.runtime.feed_mut().insert(
                "attention_mask".into(),
                Tensor::from_i64(&vec![1i64; seqlen], vec![1, seqlen])?,
            );

            let outputs = self.runtime.run()?;
            let logits = outputs
                .get("logits")
                .ok_or_else(|| Error::MissingOutput("logits".into()))?;
            last_token = argmax(logits)? as i64;
            self.output_tokens.push(last_token);
            debug!(token = last_token, length = self.output_tokens.len(), "generated token");

            on_step(&self.output_tokens);

            update_kv_cache(self.runtime.feed_mut(), outputs);
            self.runtime.feed_mut().insert(
                "input_ids".into(),
                Tensor::from_i64(&[last_token], vec![1, 1])?,
            );
            if self.need_position_ids {
                // the new token sits at absolute position `seqlen`
                self.runtime.feed_mut().insert(
                    "position_ids".into(),
                    Tensor::from_i64(&[seqlen as i64], vec![1, 1])?,
                );
            }
        }

        Ok(self.output_tokens.clone())
    }

    /// Handle for requesting cooperative termination from another context
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Override the secondary stop token (defaults to
    /// [`DEFAULT_SECONDARY_STOP_TOKEN`])
    pub fn set_secondary_stop_token(&mut self, token: i64) {
        self.secondary_stop_token = token;
    }

    /// Tokens accumulated by the current or most recent `generate` call
    pub fn output_tokens(&self) -> &[i64] {
        &self.output_tokens
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Feed, InferenceSession, SessionOutputs};
    use crate::tensor::DType;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    struct StepRecord {
        input_ids: Vec<i64>,
        attention_mask_len: usize,
        position_ids: Vec<i64>,
    }

    /// Session that always selects `next_token` and records every feed it saw
    struct ScriptedSession {
        vocab: usize,
        next_token: usize,
        calls: Arc<Mutex<Vec<StepRecord>>>,
    }

    impl ScriptedSession {
        fn new(vocab: usize, next_token: usize) -> (Self, Arc<Mutex<Vec<StepRecord>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    vocab,
                    next_token,
                    calls: Arc::clone(&calls),
                },
                calls,
            )
        }
    }

    impl InferenceSession for ScriptedSession {
        fn run(&mut self, feed: &Feed) -> Result<SessionOutputs> {
            let record = StepRecord {
                input_ids: feed["input_ids"].to_i64_vec(),
                attention_mask_len: feed["attention_mask"].numel(),
                position_ids: feed["position_ids"].to_i64_vec(),
            };
            self.calls.lock().unwrap().push(record);

            let mut logits = vec![0.0f32; self.vocab];
            logits[self.next_token] = 1.0;
            let mut outputs = SessionOutputs::new();
            outputs.insert(
                "logits",
                Tensor::from_f32(&logits, DType::F32, vec![1, 1, self.vocab])?,
            );
            outputs.insert(
                "present.0.key",
                Tensor::empty(DType::F32, vec![1, 1, 1, 1]),
            );
            outputs.insert(
                "present.0.value",
                Tensor::empty(DType::F32, vec![1, 1, 1, 1]),
            );
            Ok(outputs)
        }

        fn release(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn model_with(session: ScriptedSession, eos: i64) -> TextGeneration {
        let mut model = TextGeneration::new();
        model.runtime_mut().set_session(Box::new(session));
        model.runtime_mut().set_eos_token_id(eos);
        model
    }

    #[test]
    fn test_generate_stops_at_eos() {
        let (session, calls) = ScriptedSession::new(4, 2);
        let mut model = model_with(session, 2);

        let mut steps = 0;
        let result = model
            .generate(
                &[7, 8],
                |tokens| {
                    steps += 1;
                    assert_eq!(tokens, &[7, 8, 2]);
                },
                &GenerateOptions { max_tokens: 10 },
            )
            .unwrap();

        assert_eq!(result, vec![7, 8, 2]);
        assert_eq!(steps, 1);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_generate_respects_max_tokens() {
        let (session, calls) = ScriptedSession::new(4, 3);
        let mut model = model_with(session, 2);

        let result = model
            .generate(&[7, 8], |_| {}, &GenerateOptions { max_tokens: 5 })
            .unwrap();

        // prefill + generated never exceeds the ceiling
        assert_eq!(result, vec![7, 8, 3, 3, 3]);
        assert_eq!(calls.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_generate_with_prefill_at_ceiling_runs_zero_steps() {
        let (session, calls) = ScriptedSession::new(4, 3);
        let mut model = model_with(session, 2);

        let result = model
            .generate(&[1, 2, 3], |_| {}, &GenerateOptions { max_tokens: 3 })
            .unwrap();

        assert_eq!(result, vec![1, 2, 3]);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_generate_stops_at_secondary_stop_token() {
        let (session, calls) = ScriptedSession::new(8, 5);
        let mut model = model_with(session, 2);
        model.set_secondary_stop_token(5);

        let result = model
            .generate(&[1], |_| {}, &GenerateOptions { max_tokens: 10 })
            .unwrap();

        assert_eq!(result, vec![1, 5]);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_default_secondary_stop_token_terminates() {
        let (session, calls) =
            ScriptedSession::new(DEFAULT_SECONDARY_STOP_TOKEN as usize + 1, 32007);
        let mut model = model_with(session, 2);

        let result = model
            .generate(&[1], |_| {}, &GenerateOptions { max_tokens: 10 })
            .unwrap();

        assert_eq!(result, vec![1, 32007]);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_generate_without_session_fails_before_any_engine_call() {
        let mut model = TextGeneration::new();
        let mut steps = 0;
        let err = model
            .generate(&[1, 2], |_| steps += 1, &GenerateOptions { max_tokens: 10 })
            .unwrap_err();

        assert!(matches!(err, Error::SessionUndefined));
        assert_eq!(steps, 0);
        assert!(model.output_tokens().is_empty());
    }

    #[test]
    fn test_stop_handle_terminates_loop() {
        let (session, calls) = ScriptedSession::new(4, 3);
        let mut model = model_with(session, 2);
        let handle = model.stop_handle();

        let result = model
            .generate(
                &[7],
                |_| handle.stop(),
                &GenerateOptions { max_tokens: 100 },
            )
            .unwrap();

        assert_eq!(result, vec![7, 3]);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_feed_wiring_across_steps() {
        let (session, calls) = ScriptedSession::new(4, 1);
        let mut model = model_with(session, 2);

        model
            .generate(&[5, 6], |_| {}, &GenerateOptions { max_tokens: 4 })
            .unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);

        // prefill: full prompt, absolute positions from zero
        assert_eq!(calls[0].input_ids, vec![5, 6]);
        assert_eq!(calls[0].attention_mask_len, 2);
        assert_eq!(calls[0].position_ids, vec![0, 1]);

        // continuation: single new token at its absolute position
        assert_eq!(calls[1].input_ids, vec![1]);
        assert_eq!(calls[1].attention_mask_len, 3);
        assert_eq!(calls[1].position_ids, vec![2]);
    }

    #[test]
    fn test_present_outputs_merge_into_cache() {
        let (session, _calls) = ScriptedSession::new(4, 2);
        let mut model = model_with(session, 2);

        model
            .generate(&[1], |_| {}, &GenerateOptions { max_tokens: 10 })
            .unwrap();

        let feed = model.runtime().feed();
        assert!(feed.contains_key("past_key_values.0.key"));
        assert!(feed.contains_key("past_key_values.0.value"));
        assert!(!feed.contains_key("present.0.key"));
        assert!(!feed.contains_key("logits"));
    }

    #[test]
    fn test_initialize_feed_clears_output_tokens() {
        let (session, _calls) = ScriptedSession::new(4, 2);
        let mut model = model_with(session, 2);

        model
            .generate(&[1], |_| {}, &GenerateOptions { max_tokens: 10 })
            .unwrap();
        assert!(!model.output_tokens().is_empty());

        model.initialize_feed();
        assert!(model.output_tokens().is_empty());
    }

    #[test]
    fn test_callback_receives_growing_sequences() {
        let (session, _calls) = ScriptedSession::new(4, 3);
        let mut model = model_with(session, 2);

        let mut seen = Vec::new();
        model
            .generate(
                &[9],
                |tokens| seen.push(tokens.to_vec()),
                &GenerateOptions { max_tokens: 4 },
            )
            .unwrap();

        assert_eq!(
            seen,
            vec![vec![9, 3], vec![9, 3, 3], vec![9, 3, 3, 3]]
        );
    }
}
