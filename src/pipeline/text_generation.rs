//! Prompt-to-text generation pipeline

use crate::inference::{GenerateOptions, StopHandle, TextGeneration};
use crate::session::InferenceEngine;
use crate::tokenizer::TextTokenizer;
use crate::Result;

use super::PipelineOptions;

/// Tokenizer + decode engine behind a prompt-in, text-out surface
pub struct TextGenerationPipeline {
    tokenizer: TextTokenizer,
    model: TextGeneration,
    show_special: bool,
    max_tokens: usize,
}

impl TextGenerationPipeline {
    /// Load the tokenizer and model for a repository
    pub fn init(
        engine: &dyn InferenceEngine,
        model: &str,
        weights_path: &str,
        options: &PipelineOptions,
    ) -> Result<Self> {
        let tokenizer = TextTokenizer::from_registry(model, options.load.fetch.as_ref())?;
        let mut generation = TextGeneration::new();
        generation.load(engine, model, weights_path, &options.load)?;
        Ok(Self {
            tokenizer,
            model: generation,
            show_special: options.show_special,
            max_tokens: options.load.max_tokens,
        })
    }

    /// Generate text for a prompt.
    ///
    /// `on_text` receives the decoded text of everything generated so far,
    /// once per token. Returns the final decoded text.
    pub fn generate(
        &mut self,
        prompt: &str,
        mut on_text: impl FnMut(&str),
    ) -> Result<String> {
        let input_ids = self.tokenizer.encode(prompt)?;

        // discard context from previous prompts
        self.model.initialize_feed();
        let output_index = self.model.output_tokens().len() + input_ids.len();

        let tokenizer = &self.tokenizer;
        let show_special = self.show_special;
        let model = &mut self.model;

        // decode failures inside the step callback surface after the loop
        let mut step_error = None;
        let output_tokens = model.generate(
            &input_ids,
            |tokens| {
                if step_error.is_some() {
                    return;
                }
                match tokenizer.decode(&tokens[output_index..], !show_special) {
                    Ok(text) => on_text(&text),
                    Err(err) => step_error = Some(err),
                }
            },
            &GenerateOptions {
                max_tokens: self.max_tokens,
            },
        )?;
        if let Some(err) = step_error {
            return Err(err);
        }

        self.tokenizer
            .decode(&output_tokens[output_index..], !self.show_special)
    }

    /// Handle for cooperative termination of a running `generate`
    pub fn stop_handle(&self) -> StopHandle {
        self.model.stop_handle()
    }

    pub fn model(&self) -> &TextGeneration {
        &self.model
    }

    /// Release the model session
    pub fn release(&mut self) -> Result<()> {
        self.model.release()
    }
}
