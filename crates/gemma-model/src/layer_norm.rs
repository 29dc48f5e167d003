// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Learnable layer normalization over the feature axis.

use tensor_core::{layer_norm, DType, Shape, Tensor};

use crate::error::InLayer;
use crate::ModelError;

/// Normalises each last-axis slice to zero mean and unit (biased) variance,
/// then applies `gamma` and `beta`.
#[derive(Debug, Clone)]
pub struct LayerNorm {
    gamma: Tensor,
    beta: Tensor,
    eps: f32,
}

impl LayerNorm {
    /// Builds a norm from rank-1 `gamma` (scale) and `beta` (shift) of equal
    /// length.
    ///
    /// # Errors
    /// [`ModelError::Configuration`] on mismatched parameters or a negative
    /// or non-finite `eps`.
    pub fn new(gamma: Tensor, beta: Tensor, eps: f32) -> Result<Self, ModelError> {
        if gamma.dtype() != DType::F32 || gamma.shape().rank() != 1 {
            return Err(ModelError::Configuration(format!(
                "layer norm gamma must be a rank-1 f32 tensor, got {}",
                gamma.shape()
            )));
        }
        if beta.dtype() != DType::F32 || beta.shape() != gamma.shape() {
            return Err(ModelError::Configuration(format!(
                "layer norm beta {} does not match gamma {}",
                beta.shape(),
                gamma.shape()
            )));
        }
        if !eps.is_finite() || eps < 0.0 {
            return Err(ModelError::Configuration(format!(
                "layer norm epsilon must be finite and non-negative, got {eps}"
            )));
        }
        Ok(Self { gamma, beta, eps })
    }

    /// Unit scale, zero shift.
    pub fn identity(features: usize, eps: f32) -> Result<Self, ModelError> {
        Self::new(
            Tensor::full(Shape::vector(features), 1.0),
            Tensor::zeros(Shape::vector(features), DType::F32),
            eps,
        )
    }

    /// Number of features normalised per row.
    pub fn features(&self) -> usize {
        self.gamma.num_elements()
    }

    /// Normalises every row along the last axis; the output has the shape
    /// of `input`.
    pub fn forward(&self, input: &Tensor) -> Result<Tensor, ModelError> {
        let shape = input.shape();
        if shape.last_dim() != Some(self.features()) {
            return Err(ModelError::ShapeMismatch {
                layer: "layer_norm",
                expected: shape.with_last_dim(self.features()),
                actual: shape.clone(),
            });
        }
        let mut output = Tensor::zeros(shape.clone(), DType::F32);
        layer_norm(
            &input.view(),
            &self.gamma.view(),
            &self.beta.view(),
            self.eps,
            &mut output,
        )
        .in_layer("layer_norm")?;
        Ok(output)
    }
}
