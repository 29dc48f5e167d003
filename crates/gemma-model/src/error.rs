// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for layer construction and the forward pass.

use tensor_core::{Shape, TensorError};

/// Errors raised by model components.
///
/// Construction-time problems surface as [`ModelError::Configuration`];
/// everything else happens inside a forward pass.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A layer received an input that violates its shape contract.
    #[error("shape mismatch in {layer}: expected {expected}, got {actual}")]
    ShapeMismatch {
        layer: &'static str,
        expected: Shape,
        actual: Shape,
    },

    /// A tensor kernel rejected its operands inside a layer.
    #[error("tensor operation failed in {layer}: {source}")]
    Tensor {
        layer: &'static str,
        #[source]
        source: TensorError,
    },

    /// A token id is outside the embedding table.
    #[error("token id {token_id} at position {position} is out of range for vocabulary of size {vocab_size}")]
    TokenOutOfRange {
        token_id: i64,
        position: usize,
        vocab_size: usize,
    },

    /// Hyperparameters or weights are inconsistent.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The configuration file could not be read.
    #[error("failed to read model config: {0}")]
    ConfigRead(#[from] std::io::Error),

    /// The configuration JSON is malformed.
    #[error("failed to parse model config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// Attaches the failing layer's name to a kernel error.
pub(crate) trait InLayer<T> {
    fn in_layer(self, layer: &'static str) -> Result<T, ModelError>;
}

impl<T> InLayer<T> for Result<T, TensorError> {
    fn in_layer(self, layer: &'static str) -> Result<T, ModelError> {
        self.map_err(|source| ModelError::Tensor { layer, source })
    }
}
