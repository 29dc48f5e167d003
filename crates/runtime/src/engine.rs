// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The inference engine with type-state enforced pipeline.
//!
//! ```text
//! InferenceEngine<Idle>
//!     │  .configure()   resolve hyperparameters, open the weight source
//!     ▼
//! InferenceEngine<Configured>
//!     │  .load()        assemble the model
//!     ▼
//! InferenceEngine<Ready>
//!     │  .run(&tokens)
//!     ▼
//!   InferenceOutput
//! ```
//!
//! Each state transition consumes the old value and returns a new one,
//! making invalid state sequences a compile error. Each state owns exactly
//! the data that exists at that point of the pipeline.

use std::time::Instant;

use gemma_model::{GemmaConfig, GemmaModel};
use tensor_core::Tensor;

use crate::{InferenceMetrics, RuntimeConfig, RuntimeError, WeightLoader};

// ── Type-state markers ─────────────────────────────────────────

/// Engine is created but nothing is resolved.
#[derive(Debug)]
pub struct Idle;

/// Hyperparameters are resolved and the weight source is open.
#[derive(Debug)]
pub struct Configured {
    model_config: GemmaConfig,
    loader: WeightLoader,
}

/// The model is assembled and ready to run.
#[derive(Debug)]
pub struct Ready {
    model_config: GemmaConfig,
    model: GemmaModel,
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Idle {}
    impl Sealed for super::Configured {}
    impl Sealed for super::Ready {}
}

/// Sealed trait for engine states.
pub trait EngineState: sealed::Sealed + std::fmt::Debug {}
impl EngineState for Idle {}
impl EngineState for Configured {}
impl EngineState for Ready {}

// ── Inference output ───────────────────────────────────────────

/// The result of a single forward pass.
#[derive(Debug)]
pub struct InferenceOutput {
    /// `(batch, seq_len, vocab_size)` logits.
    pub logits: Tensor,
    /// Per-stage timing; empty stage list when profiling is disabled.
    pub metrics: InferenceMetrics,
}

impl InferenceOutput {
    /// The highest-scoring token id at every position, one row per batch
    /// entry. Ties resolve to the lowest id.
    pub fn argmax(&self) -> Vec<Vec<usize>> {
        let dims = self.logits.shape().dims();
        let (seq_len, vocab) = match dims {
            [_, s, v] => (*s, *v),
            _ => return Vec::new(),
        };
        if vocab == 0 || seq_len == 0 {
            return Vec::new();
        }
        let rows: Vec<usize> = self
            .logits
            .as_f32_slice()
            .chunks_exact(vocab)
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, f32::NEG_INFINITY), |(best, max), (i, &x)| {
                        if x > max {
                            (i, x)
                        } else {
                            (best, max)
                        }
                    })
                    .0
            })
            .collect();
        rows.chunks(seq_len).map(<[usize]>::to_vec).collect()
    }
}

// ── Engine ─────────────────────────────────────────────────────

/// The primary inference engine.
///
/// `S` is a type-state marker that enforces the pipeline ordering at
/// compile time. You cannot call `.run()` on an `Idle` engine or
/// `.load()` on a `Ready` engine.
///
/// # Example
/// ```no_run
/// use runtime::{InferenceEngine, RuntimeConfig};
/// use tensor_core::{Shape, Tensor};
///
/// # fn example() -> Result<(), runtime::RuntimeError> {
/// let engine = InferenceEngine::new(RuntimeConfig::for_model("./models/gemma-2b"))
///     .configure()?
///     .load()?;
/// let tokens = Tensor::from_i64(Shape::matrix(1, 3), &[1, 2, 3])?;
/// let output = engine.run(&tokens)?;
/// println!("{}", output.metrics.summary());
/// # Ok(())
/// # }
/// ```
pub struct InferenceEngine<S: EngineState = Idle> {
    config: RuntimeConfig,
    state: S,
}

impl<S: EngineState> InferenceEngine<S> {
    /// Returns the runtime configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}

// ── Idle → Configured ──────────────────────────────────────────

impl InferenceEngine<Idle> {
    /// Creates a new engine from the given configuration.
    pub fn new(config: RuntimeConfig) -> Self {
        tracing::info!("engine created for '{}'", config.model_path.display());
        Self { config, state: Idle }
    }

    /// Resolves and validates the model hyperparameters and opens the
    /// weight source (synthetic when the weight file is absent).
    /// Transitions to the `Configured` state.
    pub fn configure(self) -> Result<InferenceEngine<Configured>, RuntimeError> {
        let model_config = self.config.resolve_model_config()?;
        tracing::info!(
            "model config: {} blocks, embed {}, {} heads (head_dim {}), ffn {}, vocab {}",
            model_config.num_hidden_layers,
            model_config.embed_dim(),
            model_config.num_attention_heads,
            model_config.head_dim(),
            model_config.intermediate_size,
            model_config.vocab_size,
        );

        let loader = WeightLoader::from_config(&self.config)?;
        tracing::info!(
            "weight loader: {} mode",
            if loader.is_file_backed() { "file-backed" } else { "synthetic" }
        );

        Ok(InferenceEngine {
            config: self.config,
            state: Configured {
                model_config,
                loader,
            },
        })
    }

    /// Convenience: wraps a pre-built model (for testing and embedding).
    pub fn from_model(
        config: RuntimeConfig,
        model_config: GemmaConfig,
        model: GemmaModel,
    ) -> InferenceEngine<Ready> {
        InferenceEngine {
            config,
            state: Ready {
                model_config,
                model,
            },
        }
    }
}

// ── Configured → Ready ─────────────────────────────────────────

impl InferenceEngine<Configured> {
    /// Returns the resolved hyperparameters.
    pub fn model_config(&self) -> &GemmaConfig {
        &self.state.model_config
    }

    /// Returns the weight source.
    pub fn weight_loader(&self) -> &WeightLoader {
        &self.state.loader
    }

    /// Assembles the model from the weight source.
    /// Transitions to the `Ready` state.
    pub fn load(self) -> Result<InferenceEngine<Ready>, RuntimeError> {
        let start = Instant::now();
        let model = self.state.loader.build_model(&self.state.model_config)?;
        tracing::info!("model loaded in {:.2}ms", start.elapsed().as_secs_f64() * 1000.0);

        Ok(InferenceEngine {
            config: self.config,
            state: Ready {
                model_config: self.state.model_config,
                model,
            },
        })
    }
}

// ── Ready: run inference ───────────────────────────────────────

impl InferenceEngine<Ready> {
    /// Returns the resolved hyperparameters.
    pub fn model_config(&self) -> &GemmaConfig {
        &self.state.model_config
    }

    /// Returns the assembled model.
    pub fn model(&self) -> &GemmaModel {
        &self.state.model
    }

    /// Runs one forward pass over `(batch, seq_len)` `I64` token ids.
    ///
    /// Takes `&self`, so a `Ready` engine can be shared across threads.
    pub fn run(&self, tokens: &Tensor) -> Result<InferenceOutput, RuntimeError> {
        let run_start = Instant::now();
        let mut metrics = InferenceMetrics::new();
        let profiling = self.config.enable_profiling;

        tracing::debug!("starting inference: tokens {}", tokens.shape());

        let logits = self.state.model.forward_traced(tokens, |stage, elapsed| {
            if profiling {
                metrics.record_stage(stage, elapsed);
            }
        })?;

        metrics.finalise(run_start.elapsed(), tokens.num_elements());
        tracing::info!("{}", metrics.summary());

        Ok(InferenceOutput { logits, metrics })
    }
}

impl<S: EngineState> std::fmt::Debug for InferenceEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("state", &std::any::type_name::<S>())
            .field("model_path", &self.config.model_path)
            .field("profiling", &self.config.enable_profiling)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::{DType, Shape};

    fn synthetic_config() -> RuntimeConfig {
        RuntimeConfig {
            model: Some(GemmaConfig::toy()),
            ..RuntimeConfig::for_model("/nonexistent/gemma-rt-test")
        }
    }

    fn demo_tokens() -> Tensor {
        Tensor::from_i64(Shape::matrix(1, 5), &[10, 25, 5, 78, 99]).unwrap()
    }

    #[test]
    fn test_full_pipeline_synthetic() {
        let configured = InferenceEngine::new(synthetic_config()).configure().unwrap();
        assert!(!configured.weight_loader().is_file_backed());
        assert_eq!(configured.model_config(), &GemmaConfig::toy());

        let engine = configured.load().unwrap();
        let output = engine.run(&demo_tokens()).unwrap();

        assert_eq!(output.logits.shape(), &Shape::from([1, 5, 100]));
        // embedding + 2 blocks + final norm + output projection
        assert_eq!(output.metrics.stages.len(), 5);
        assert_eq!(output.metrics.tokens_processed, 5);
    }

    #[test]
    fn test_profiling_disabled_records_no_stages() {
        let config = RuntimeConfig {
            enable_profiling: false,
            ..synthetic_config()
        };
        let engine = InferenceEngine::new(config).configure().unwrap().load().unwrap();

        let output = engine.run(&demo_tokens()).unwrap();

        assert!(output.metrics.stages.is_empty());
        assert_eq!(output.metrics.tokens_processed, 5);
    }

    #[test]
    fn test_configure_without_model_config_fails() {
        let result = InferenceEngine::new(RuntimeConfig::for_model("/nonexistent")).configure();
        assert!(matches!(result, Err(RuntimeError::ModelConfigNotFound(_))));
    }

    #[test]
    fn test_run_rejects_out_of_range_tokens() {
        let engine = InferenceEngine::new(synthetic_config())
            .configure()
            .unwrap()
            .load()
            .unwrap();
        let tokens = Tensor::from_i64(Shape::matrix(1, 2), &[0, 100]).unwrap();

        assert!(matches!(
            engine.run(&tokens),
            Err(RuntimeError::ModelError(
                gemma_model::ModelError::TokenOutOfRange { token_id: 100, .. }
            ))
        ));
    }

    #[test]
    fn test_argmax_picks_highest_logit() {
        // batch 1, seq 2, vocab 3
        let logits = Tensor::from_f32(
            Shape::from([1, 2, 3]),
            &[0.1, 0.9, 0.3, 2.0, -1.0, 2.0],
        )
        .unwrap();
        let output = InferenceOutput {
            logits,
            metrics: InferenceMetrics::new(),
        };
        assert_eq!(output.argmax(), vec![vec![1, 0]]);
    }

    #[test]
    fn test_argmax_non_logit_shape_is_empty() {
        let output = InferenceOutput {
            logits: Tensor::zeros(Shape::vector(3), DType::F32),
            metrics: InferenceMetrics::new(),
        };
        assert!(output.argmax().is_empty());
    }

    #[test]
    fn test_debug_shows_state() {
        let engine = InferenceEngine::new(synthetic_config());
        let dbg = format!("{engine:?}");
        assert!(dbg.contains("Idle"));
    }
}
