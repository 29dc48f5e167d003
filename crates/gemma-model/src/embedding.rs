// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Token embedding lookup.

use tensor_core::{gather_rows, DType, Shape, Tensor, TensorError};

use crate::ModelError;

/// Maps `(batch, seq_len)` token ids to `(batch, seq_len, embed_dim)` rows
/// of a `(vocab_size, embed_dim)` table.
#[derive(Debug, Clone)]
pub struct EmbeddingLayer {
    weight: Tensor,
}

impl EmbeddingLayer {
    /// Wraps a rank-2 `F32` table.
    pub fn new(weight: Tensor) -> Result<Self, ModelError> {
        if weight.dtype() != DType::F32 || weight.shape().rank() != 2 {
            return Err(ModelError::Configuration(format!(
                "embedding table must be a rank-2 f32 tensor, got {} {}",
                weight.dtype(),
                weight.shape()
            )));
        }
        Ok(Self { weight })
    }

    /// Number of rows in the table.
    pub fn vocab_size(&self) -> usize {
        self.weight.shape().dims()[0]
    }

    /// Width of each embedding row.
    pub fn embed_dim(&self) -> usize {
        self.weight.shape().dims()[1]
    }

    /// Looks up every id. Ids outside `[0, vocab_size)` fail with
    /// [`ModelError::TokenOutOfRange`].
    pub fn forward(&self, token_ids: &Tensor) -> Result<Tensor, ModelError> {
        let shape = token_ids.shape();
        if shape.rank() != 2 {
            return Err(ModelError::ShapeMismatch {
                layer: "embedding",
                expected: Shape::matrix(1, shape.num_elements()),
                actual: shape.clone(),
            });
        }

        let mut dims = shape.dims().to_vec();
        dims.push(self.embed_dim());
        let mut output = Tensor::zeros(dims.into(), DType::F32);

        gather_rows(&self.weight.view(), &token_ids.view(), &mut output).map_err(
            |source| match source {
                TensorError::IndexOutOfRange {
                    index,
                    bound,
                    position,
                    ..
                } => ModelError::TokenOutOfRange {
                    token_id: index,
                    position,
                    vocab_size: bound,
                },
                source => ModelError::Tensor {
                    layer: "embedding",
                    source,
                },
            },
        )?;
        Ok(output)
    }
}
