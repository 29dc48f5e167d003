// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! Everything around the model needed to run it: configuration, weight
//! loading, assembly and profiled execution.
//!
//! The runtime takes:
//! - A [`RuntimeConfig`] (TOML) naming the model directory.
//! - A HuggingFace-style `config.json` (or an inline `[model]` table).
//! - A `model.safetensors` checkpoint, or seeded synthetic weights when the
//!   file is absent.
//!
//! And produces a [`gemma_model::GemmaModel`] wrapped in an engine that
//! records per-stage timing for every forward pass.
//!
//! # Type-State Pipeline
//! The runtime enforces a type-safe pipeline:
//! ```text
//! InferenceEngine<Idle> → InferenceEngine<Configured> → InferenceEngine<Ready>
//! ```
//! Transitions are compile-time checked.
//!
//! # Execution
//! The forward pass is synchronous and CPU-bound. A `Ready` engine runs
//! through `&self`, so callers may drive it from several threads at once.

mod config;
mod engine;
mod error;
mod metrics;
mod weight_loader;

pub use config::RuntimeConfig;
pub use engine::{Configured, EngineState, Idle, InferenceEngine, InferenceOutput, Ready};
pub use error::RuntimeError;
pub use metrics::{InferenceMetrics, StageMetrics};
pub use weight_loader::{TensorInfo, WeightLoader};
