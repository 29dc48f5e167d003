// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the inference runtime.

/// Errors that can occur while configuring, loading or running a model.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// A weight tensor is missing, malformed or has the wrong shape.
    #[error("weight loading failed for '{tensor}': {detail}")]
    WeightLoadError { tensor: String, detail: String },

    /// Model construction or the forward pass failed.
    #[error("model error: {0}")]
    ModelError(#[from] gemma_model::ModelError),

    /// A tensor could not be built from loaded data.
    #[error("tensor error: {0}")]
    TensorError(#[from] tensor_core::TensorError),

    /// Neither a config file nor an inline `[model]` table exists.
    #[error("no model config at '{}' and no inline [model] table", .0.display())]
    ModelConfigNotFound(std::path::PathBuf),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
